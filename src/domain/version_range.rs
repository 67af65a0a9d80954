//! NuGet version ranges and floating versions
//!
//! Handles range notation like:
//! - `1.0` (minimum, inclusive)
//! - `[1.0,2.0)`, `(1.0,)`, `(,2.0]` (interval notation)
//! - `[1.0]` (exact)
//! - `1.*`, `1.2.*`, `1.0.0-*`, `*-*` (floating)

use super::NuGetVersion;
use crate::error::ValidationError;
use std::cmp::Ordering;
use std::fmt;

/// How far above a minimum version a floating range may reach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatBehavior {
    /// No floating, the minimum version only
    None,
    /// Prereleases of the exact minimum version (`1.0.0-*`)
    Prerelease,
    /// Same major.minor.patch (`1.0.0.*`)
    Revision,
    /// Same major.minor (`1.0.*`)
    Patch,
    /// Same major (`1.*`)
    Minor,
    /// Any stable version (`*`)
    Major,
    /// Same major.minor.patch including prereleases (`1.0.0.*-*`)
    PrereleaseRevision,
    /// Same major.minor including prereleases (`1.0.*-*`)
    PrereleasePatch,
    /// Same major including prereleases (`1.*-*`)
    PrereleaseMinor,
    /// Any version including prereleases with the label prefix (`*-rc*`)
    PrereleaseMajor,
    /// Anything at all (`*-*`)
    AbsoluteLatest,
}

impl FloatBehavior {
    /// Returns true if the behavior admits prerelease versions
    pub fn includes_prerelease(&self) -> bool {
        matches!(
            self,
            FloatBehavior::Prerelease
                | FloatBehavior::PrereleaseRevision
                | FloatBehavior::PrereleasePatch
                | FloatBehavior::PrereleaseMinor
                | FloatBehavior::PrereleaseMajor
                | FloatBehavior::AbsoluteLatest
        )
    }
}

/// A floating version: a behavior anchored at a minimum version and label prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FloatRange {
    behavior: FloatBehavior,
    min_version: NuGetVersion,
    release_prefix: String,
}

impl FloatRange {
    /// Create a float range anchored at `min_version`
    pub fn new(
        behavior: FloatBehavior,
        min_version: NuGetVersion,
        release_prefix: Option<String>,
    ) -> Self {
        Self {
            behavior,
            min_version,
            release_prefix: release_prefix.unwrap_or_default(),
        }
    }

    /// Parse floating notation such as `1.*`, `1.2.*-beta*` or `*-*`
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let invalid = |message: &str| ValidationError::InvalidVersionRange {
            value: value.to_string(),
            message: message.to_string(),
        };

        let trimmed = value.trim();
        let (numbers, release) = match trimmed.split_once('-') {
            Some((numbers, release)) => (numbers, Some(release)),
            None => (trimmed, None),
        };

        let release_float = match release {
            Some(release) if release.ends_with('*') => {
                Some(release.trim_end_matches('*').trim_end_matches('.').to_string())
            }
            Some(_) => None,
            None => None,
        };

        if numbers.ends_with('*') {
            let fixed: Vec<&str> = numbers
                .trim_end_matches('*')
                .trim_end_matches('.')
                .split('.')
                .filter(|s| !s.is_empty())
                .collect();
            if fixed.len() > 3 {
                return Err(invalid("too many version components"));
            }
            let floor = if fixed.is_empty() {
                "0.0.0".to_string()
            } else {
                let mut parts = fixed.clone();
                while parts.len() < 3 {
                    parts.push("0");
                }
                parts.join(".")
            };

            let prefix = release_float.clone();
            let floor = match &prefix {
                Some(label) if !label.is_empty() => format!("{}-{}", floor, label),
                Some(_) => format!("{}-0", floor),
                None => floor,
            };
            let min_version = NuGetVersion::parse(&floor).map_err(|_| invalid("bad floor"))?;

            let behavior = match (fixed.len(), prefix.is_some()) {
                (0, false) => FloatBehavior::Major,
                (1, false) => FloatBehavior::Minor,
                (2, false) => FloatBehavior::Patch,
                (3, false) => FloatBehavior::Revision,
                (0, true) => {
                    if prefix.as_deref() == Some("") {
                        FloatBehavior::AbsoluteLatest
                    } else {
                        FloatBehavior::PrereleaseMajor
                    }
                }
                (1, true) => FloatBehavior::PrereleaseMinor,
                (2, true) => FloatBehavior::PrereleasePatch,
                _ => FloatBehavior::PrereleaseRevision,
            };
            return Ok(Self::new(behavior, min_version, prefix));
        }

        match release_float {
            Some(label) => {
                let floor = if label.is_empty() {
                    format!("{}-0", numbers)
                } else {
                    format!("{}-{}", numbers, label)
                };
                let min_version = NuGetVersion::parse(&floor).map_err(|_| invalid("bad floor"))?;
                Ok(Self::new(FloatBehavior::Prerelease, min_version, Some(label)))
            }
            None => Err(invalid("not a floating version")),
        }
    }

    pub fn behavior(&self) -> FloatBehavior {
        self.behavior
    }

    pub fn min_version(&self) -> &NuGetVersion {
        &self.min_version
    }

    pub fn release_prefix(&self) -> &str {
        &self.release_prefix
    }

    fn label_matches(&self, version: &NuGetVersion) -> bool {
        !version.is_prerelease()
            || version
                .release()
                .to_lowercase()
                .starts_with(&self.release_prefix.to_lowercase())
    }

    /// Returns true if `version` lies inside the floating window
    pub fn satisfies(&self, version: &NuGetVersion) -> bool {
        let min = &self.min_version;
        let same_major = min.major() == version.major();
        let same_minor = same_major && min.minor() == version.minor();
        let same_patch = same_minor && min.patch() == version.patch();

        match self.behavior {
            FloatBehavior::None => min == version,
            FloatBehavior::Prerelease => {
                min.cmp_numeric(version) == Ordering::Equal && self.label_matches(version)
            }
            FloatBehavior::Revision => same_patch && !version.is_prerelease(),
            FloatBehavior::Patch => same_minor && !version.is_prerelease(),
            FloatBehavior::Minor => same_major && !version.is_prerelease(),
            FloatBehavior::Major => !version.is_prerelease(),
            FloatBehavior::PrereleaseRevision => same_patch && self.label_matches(version),
            FloatBehavior::PrereleasePatch => same_minor && self.label_matches(version),
            FloatBehavior::PrereleaseMinor => same_major && self.label_matches(version),
            FloatBehavior::PrereleaseMajor => self.label_matches(version),
            FloatBehavior::AbsoluteLatest => true,
        }
    }
}

/// A NuGet version range with optional bounds and an optional floating window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    min: Option<NuGetVersion>,
    min_inclusive: bool,
    max: Option<NuGetVersion>,
    max_inclusive: bool,
    float: Option<FloatRange>,
}

impl VersionRange {
    /// Create a range from explicit bounds
    pub fn new(
        min: Option<NuGetVersion>,
        min_inclusive: bool,
        max: Option<NuGetVersion>,
        max_inclusive: bool,
    ) -> Self {
        Self {
            min,
            min_inclusive,
            max,
            max_inclusive,
            float: None,
        }
    }

    /// `[version, )`
    pub fn at_least(version: NuGetVersion) -> Self {
        Self::new(Some(version), true, None, false)
    }

    /// `[version]`
    pub fn exact(version: NuGetVersion) -> Self {
        Self::new(Some(version.clone()), true, Some(version), true)
    }

    /// Copy the bounds of `range` and attach a floating window
    pub fn with_float(range: &VersionRange, float: FloatRange) -> Self {
        Self {
            float: Some(float),
            ..range.clone()
        }
    }

    /// Parse NuGet range notation
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let invalid = |message: &str| ValidationError::InvalidVersionRange {
            value: value.to_string(),
            message: message.to_string(),
        };

        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty range"));
        }

        let starts_interval = trimmed.starts_with('[') || trimmed.starts_with('(');
        if !starts_interval {
            if trimmed.contains('*') {
                let float = FloatRange::parse(trimmed)?;
                let mut range = Self::at_least(float.min_version().clone());
                range.float = Some(float);
                return Ok(range);
            }
            let version = NuGetVersion::parse(trimmed).map_err(|_| invalid("bad version"))?;
            return Ok(Self::at_least(version));
        }

        let min_inclusive = trimmed.starts_with('[');
        let max_inclusive = trimmed.ends_with(']');
        if !(trimmed.ends_with(']') || trimmed.ends_with(')')) || trimmed.len() < 3 {
            return Err(invalid("unterminated interval"));
        }
        let inner = &trimmed[1..trimmed.len() - 1];

        let Some((low, high)) = inner.split_once(',') else {
            if !(min_inclusive && max_inclusive) {
                return Err(invalid("exact ranges must use []"));
            }
            let version = NuGetVersion::parse(inner).map_err(|_| invalid("bad version"))?;
            return Ok(Self::exact(version));
        };

        let parse_bound = |text: &str| -> Result<Option<NuGetVersion>, ValidationError> {
            let text = text.trim();
            if text.is_empty() {
                Ok(None)
            } else {
                NuGetVersion::parse(text)
                    .map(Some)
                    .map_err(|_| invalid("bad bound"))
            }
        };

        let min = parse_bound(low)?;
        let max = parse_bound(high)?;
        if min.is_none() && max.is_none() && (min_inclusive || max_inclusive) {
            return Err(invalid("unbounded ranges cannot be inclusive"));
        }
        if let (Some(low), Some(high)) = (&min, &max) {
            if low > high {
                return Err(invalid("minimum is above maximum"));
            }
        }

        Ok(Self::new(min, min_inclusive, max, max_inclusive))
    }

    pub fn min_version(&self) -> Option<&NuGetVersion> {
        self.min.as_ref()
    }

    pub fn max_version(&self) -> Option<&NuGetVersion> {
        self.max.as_ref()
    }

    pub fn has_lower_bound(&self) -> bool {
        self.min.is_some()
    }

    pub fn is_floating(&self) -> bool {
        self.float.is_some()
    }

    pub fn float_range(&self) -> Option<&FloatRange> {
        self.float.as_ref()
    }

    /// Returns true if `version` lies within the bounds (the float window is not checked)
    pub fn satisfies(&self, version: &NuGetVersion) -> bool {
        if let Some(min) = &self.min {
            match version.cmp(min) {
                Ordering::Less => return false,
                Ordering::Equal if !self.min_inclusive => return false,
                _ => {}
            }
        }
        if let Some(max) = &self.max {
            match version.cmp(max) {
                Ordering::Greater => return false,
                Ordering::Equal if !self.max_inclusive => return false,
                _ => {}
            }
        }
        true
    }

    /// Decide whether `considering` is a better pick than `current`
    fn is_better(&self, current: Option<&NuGetVersion>, considering: &NuGetVersion) -> bool {
        if !self.satisfies(considering) {
            return false;
        }
        let Some(current) = current else {
            return true;
        };
        if current == considering {
            return false;
        }

        if let Some(float) = &self.float {
            let current_in = float.satisfies(current);
            let considering_in = float.satisfies(considering);
            return match (current_in, considering_in) {
                (true, false) => false,
                (false, true) => true,
                (true, true) => current < considering,
                (false, false) => {
                    let current_low = current < float.min_version();
                    let considering_low = considering < float.min_version();
                    match (current_low, considering_low) {
                        // Prefer anything above the window over anything below it
                        (true, false) => true,
                        (false, true) => false,
                        // Above the window: prefer the lowest
                        (false, false) => current > considering,
                        // Below the window: prefer the highest
                        (true, true) => current < considering,
                    }
                }
            };
        }

        // Non-floating ranges prefer the lowest satisfying version
        current > considering
    }

    /// Pick the best version out of `versions` for this range
    pub fn find_best_match<'a, I>(&self, versions: I) -> Option<&'a NuGetVersion>
    where
        I: IntoIterator<Item = &'a NuGetVersion>,
    {
        let mut best: Option<&NuGetVersion> = None;
        for version in versions {
            if self.is_better(best, version) {
                best = Some(version);
            }
        }
        best
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (Some(min), Some(max)) = (&self.min, &self.max) {
            if min == max && self.min_inclusive && self.max_inclusive {
                return write!(f, "[{}]", min);
            }
        }
        let open = if self.min_inclusive { '[' } else { '(' };
        let close = if self.max_inclusive { ']' } else { ')' };
        let min = self.min.as_ref().map(|v| v.to_string()).unwrap_or_default();
        let max = self.max.as_ref().map(|v| v.to_string()).unwrap_or_default();
        write!(f, "{}{}, {}{}", open, min, max, close)
    }
}
