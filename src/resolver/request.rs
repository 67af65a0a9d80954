//! Resolution request and policy types

use crate::domain::{FloatBehavior, NuGetVersion, TargetFramework, VersionRange};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// How far a resolved version may move away from the referenced one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum VersionLock {
    /// Any newer version
    #[default]
    None,
    /// Stay within the current major version
    Major,
    /// Stay within the current major.minor version
    Minor,
}

/// Whether prerelease versions are eligible
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PrereleaseReporting {
    /// Only when the referenced version is a prerelease
    #[default]
    Auto,
    Always,
    Never,
}

impl PrereleaseReporting {
    /// Decide prerelease eligibility for a referenced version
    pub fn include_prerelease(&self, referenced: &NuGetVersion) -> bool {
        match self {
            PrereleaseReporting::Auto => referenced.is_prerelease(),
            PrereleaseReporting::Always => true,
            PrereleaseReporting::Never => false,
        }
    }
}

impl VersionLock {
    /// The floating behavior used to search for newer versions
    pub fn float_behavior(&self, include_prerelease: bool) -> FloatBehavior {
        match (self, include_prerelease) {
            (VersionLock::None, false) => FloatBehavior::Major,
            (VersionLock::None, true) => FloatBehavior::AbsoluteLatest,
            (VersionLock::Major, false) => FloatBehavior::Minor,
            (VersionLock::Major, true) => FloatBehavior::PrereleaseMinor,
            (VersionLock::Minor, false) => FloatBehavior::Patch,
            (VersionLock::Minor, true) => FloatBehavior::PrereleasePatch,
        }
    }
}

impl FromStr for VersionLock {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(VersionLock::None),
            "major" => Ok(VersionLock::Major),
            "minor" => Ok(VersionLock::Minor),
            other => Err(format!("unknown version lock '{}'", other)),
        }
    }
}

impl FromStr for PrereleaseReporting {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(PrereleaseReporting::Auto),
            "always" => Ok(PrereleaseReporting::Always),
            "never" => Ok(PrereleaseReporting::Never),
            other => Err(format!("unknown prerelease policy '{}'", other)),
        }
    }
}

impl fmt::Display for VersionLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Everything needed to resolve the latest allowed version of one dependency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveRequest {
    pub package: String,
    pub referenced_version: Option<NuGetVersion>,
    pub sources: Vec<String>,
    pub current_range: Option<VersionRange>,
    pub version_lock: VersionLock,
    pub prerelease: PrereleaseReporting,
    /// Overrides the label anchor taken from a prerelease referenced version
    pub prerelease_label: Option<String>,
    pub target_framework: TargetFramework,
    pub manifest_path: PathBuf,
    pub development_dependency: bool,
    /// Only consider versions published at least this many days ago
    pub older_than_days: Option<u32>,
}

impl ResolveRequest {
    /// Create a request with default policy
    pub fn new(package: impl Into<String>, target_framework: TargetFramework) -> Self {
        Self {
            package: package.into(),
            referenced_version: None,
            sources: Vec::new(),
            current_range: None,
            version_lock: VersionLock::default(),
            prerelease: PrereleaseReporting::default(),
            prerelease_label: None,
            target_framework,
            manifest_path: PathBuf::new(),
            development_dependency: false,
            older_than_days: None,
        }
    }

    pub fn with_referenced_version(mut self, version: Option<NuGetVersion>) -> Self {
        self.referenced_version = version;
        self
    }

    pub fn with_current_range(mut self, range: Option<VersionRange>) -> Self {
        self.current_range = range;
        self
    }

    pub fn with_sources(mut self, sources: Vec<String>) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_version_lock(mut self, lock: VersionLock) -> Self {
        self.version_lock = lock;
        self
    }

    pub fn with_prerelease(mut self, prerelease: PrereleaseReporting) -> Self {
        self.prerelease = prerelease;
        self
    }

    pub fn with_prerelease_label(mut self, label: Option<String>) -> Self {
        self.prerelease_label = label;
        self
    }

    pub fn with_manifest_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.manifest_path = path.into();
        self
    }

    pub fn with_development_dependency(mut self, value: bool) -> Self {
        self.development_dependency = value;
        self
    }

    pub fn with_older_than_days(mut self, days: Option<u32>) -> Self {
        self.older_than_days = days;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_behavior_matrix() {
        assert_eq!(VersionLock::None.float_behavior(false), FloatBehavior::Major);
        assert_eq!(
            VersionLock::None.float_behavior(true),
            FloatBehavior::AbsoluteLatest
        );
        assert_eq!(VersionLock::Major.float_behavior(false), FloatBehavior::Minor);
        assert_eq!(
            VersionLock::Major.float_behavior(true),
            FloatBehavior::PrereleaseMinor
        );
        assert_eq!(VersionLock::Minor.float_behavior(false), FloatBehavior::Patch);
        assert_eq!(
            VersionLock::Minor.float_behavior(true),
            FloatBehavior::PrereleasePatch
        );
    }

    #[test]
    fn test_include_prerelease() {
        let stable = NuGetVersion::parse("1.0.0").unwrap();
        let pre = NuGetVersion::parse("1.0.0-rc.1").unwrap();
        assert!(!PrereleaseReporting::Auto.include_prerelease(&stable));
        assert!(PrereleaseReporting::Auto.include_prerelease(&pre));
        assert!(PrereleaseReporting::Always.include_prerelease(&stable));
        assert!(!PrereleaseReporting::Never.include_prerelease(&pre));
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("Major".parse::<VersionLock>(), Ok(VersionLock::Major));
        assert_eq!(
            "never".parse::<PrereleaseReporting>(),
            Ok(PrereleaseReporting::Never)
        );
        assert!("sometimes".parse::<PrereleaseReporting>().is_err());
    }
}
