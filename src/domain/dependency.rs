//! Dependency information structures

use super::{NuGetVersion, VersionRange};
use std::fmt;

/// A package dependency of one target framework of a project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    /// Package id as written in the project
    pub name: String,
    /// Requested version range, absent when it could not be resolved
    pub version_range: Option<VersionRange>,
    /// Version chosen by restore, absent when the lock document has no match
    pub resolved_version: Option<NuGetVersion>,
    /// Implicitly referenced by the SDK
    pub auto_referenced: bool,
    /// Pulled in by another package rather than declared by the project
    pub transitive: bool,
    /// Marked `developmentDependency` in its nuspec
    pub development_dependency: bool,
    /// Version comes from a central version file
    pub centrally_managed: bool,
}

impl Dependency {
    /// Creates a new direct dependency
    pub fn new(name: impl Into<String>, version_range: Option<VersionRange>) -> Self {
        Self {
            name: name.into(),
            version_range,
            resolved_version: None,
            auto_referenced: false,
            transitive: false,
            development_dependency: false,
            centrally_managed: false,
        }
    }

    /// Sets the resolved version (builder pattern)
    pub fn with_resolved_version(mut self, version: Option<NuGetVersion>) -> Self {
        self.resolved_version = version;
        self
    }

    pub fn with_auto_referenced(mut self, value: bool) -> Self {
        self.auto_referenced = value;
        self
    }

    pub fn with_transitive(mut self, value: bool) -> Self {
        self.transitive = value;
        self
    }

    pub fn with_development_dependency(mut self, value: bool) -> Self {
        self.development_dependency = value;
        self
    }

    pub fn with_centrally_managed(mut self, value: bool) -> Self {
        self.centrally_managed = value;
        self
    }

    /// Returns true if `name` names this package (case-insensitive)
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let version = self
            .resolved_version
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_else(|| "?".to_string());
        let marker = if self.transitive { " (transitive)" } else { "" };
        write!(f, "{}@{}{}", self.name, version, marker)
    }
}

/// How large the jump from the resolved version to the latest version is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UpgradeSeverity {
    None,
    Patch,
    Minor,
    Major,
    Unknown,
}

impl UpgradeSeverity {
    /// Classify the move from `resolved` to `latest`.
    ///
    /// Leaving a prerelease counts as a major move even when the numeric
    /// major component is unchanged.
    pub fn classify(resolved: Option<&NuGetVersion>, latest: Option<&NuGetVersion>) -> Self {
        let (Some(resolved), Some(latest)) = (resolved, latest) else {
            return UpgradeSeverity::Unknown;
        };
        if latest.major() > resolved.major() || resolved.is_prerelease() {
            UpgradeSeverity::Major
        } else if latest.minor() > resolved.minor() {
            UpgradeSeverity::Minor
        } else if latest.patch() > resolved.patch() || latest.revision() > resolved.revision() {
            UpgradeSeverity::Patch
        } else {
            UpgradeSeverity::None
        }
    }
}

impl fmt::Display for UpgradeSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            UpgradeSeverity::None => "none",
            UpgradeSeverity::Patch => "patch",
            UpgradeSeverity::Minor => "minor",
            UpgradeSeverity::Major => "major",
            UpgradeSeverity::Unknown => "unknown",
        };
        write!(f, "{}", label)
    }
}

/// A dependency together with its latest allowed version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzedDependency {
    pub dependency: Dependency,
    pub latest_version: Option<NuGetVersion>,
    pub severity: UpgradeSeverity,
}

impl AnalyzedDependency {
    pub fn new(dependency: Dependency, latest_version: Option<NuGetVersion>) -> Self {
        let severity = UpgradeSeverity::classify(
            dependency.resolved_version.as_ref(),
            latest_version.as_ref(),
        );
        Self {
            dependency,
            latest_version,
            severity,
        }
    }

    /// Returns true if a newer version than the resolved one exists
    pub fn is_outdated(&self) -> bool {
        match (&self.dependency.resolved_version, &self.latest_version) {
            (Some(resolved), Some(latest)) => latest > resolved,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> NuGetVersion {
        NuGetVersion::parse(s).unwrap()
    }

    #[test]
    fn test_dependency_builder() {
        let dep = Dependency::new("Serilog", VersionRange::parse("3.0.0").ok())
            .with_resolved_version(Some(v("3.0.1")))
            .with_transitive(true)
            .with_development_dependency(true);
        assert!(dep.transitive);
        assert!(dep.development_dependency);
        assert!(!dep.auto_referenced);
        assert!(dep.is_named("serilog"));
        assert_eq!(dep.to_string(), "Serilog@3.0.1 (transitive)");
    }

    #[test]
    fn test_severity_unknown() {
        assert_eq!(
            UpgradeSeverity::classify(None, Some(&v("1.0.0"))),
            UpgradeSeverity::Unknown
        );
        assert_eq!(
            UpgradeSeverity::classify(Some(&v("1.0.0")), None),
            UpgradeSeverity::Unknown
        );
    }

    #[test]
    fn test_severity_levels() {
        let classify = |a: &str, b: &str| UpgradeSeverity::classify(Some(&v(a)), Some(&v(b)));
        assert_eq!(classify("1.2.0", "2.1.0"), UpgradeSeverity::Major);
        assert_eq!(classify("1.2.0", "1.3.0"), UpgradeSeverity::Minor);
        assert_eq!(classify("1.2.0", "1.2.2"), UpgradeSeverity::Patch);
        assert_eq!(classify("1.2.0", "1.2.0.1"), UpgradeSeverity::Patch);
        assert_eq!(classify("1.2.0", "1.2.0"), UpgradeSeverity::None);
    }

    #[test]
    fn test_severity_prerelease_counts_as_major() {
        assert_eq!(
            UpgradeSeverity::classify(Some(&v("3.0.0-pre.1")), Some(&v("3.0.0"))),
            UpgradeSeverity::Major
        );
    }

    #[test]
    fn test_analyzed_dependency_outdated() {
        let dep = Dependency::new("xunit", None).with_resolved_version(Some(v("2.4.0")));
        let analyzed = AnalyzedDependency::new(dep.clone(), Some(v("2.9.0")));
        assert!(analyzed.is_outdated());
        assert_eq!(analyzed.severity, UpgradeSeverity::Minor);

        let analyzed = AnalyzedDependency::new(dep, Some(v("2.4.0")));
        assert!(!analyzed.is_outdated());
    }
}
