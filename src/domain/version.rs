//! NuGet package versions
//!
//! NuGet versions are SemVer 2.0 with an optional fourth `Revision`
//! component: `Major.Minor.Patch[.Revision][-label.label][+metadata]`.
//! Release labels compare case-insensitively and build metadata is ignored
//! for ordering and equality.

use crate::error::ValidationError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A parsed NuGet package version
#[derive(Debug, Clone)]
pub struct NuGetVersion {
    major: u64,
    minor: u64,
    patch: u64,
    revision: u64,
    release_labels: Vec<String>,
    metadata: Option<String>,
}

impl NuGetVersion {
    /// Create a stable version from its numeric components
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            revision: 0,
            release_labels: Vec::new(),
            metadata: None,
        }
    }

    /// Parse a version string, returning a validation error on malformed input
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidVersion {
            value: value.to_string(),
        };

        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(invalid());
        }

        let (rest, metadata) = match trimmed.split_once('+') {
            Some((rest, meta)) if !meta.is_empty() => (rest, Some(meta.to_string())),
            Some(_) => return Err(invalid()),
            None => (trimmed, None),
        };

        let (numbers, release) = match rest.split_once('-') {
            Some((numbers, release)) => (numbers, Some(release)),
            None => (rest, None),
        };

        let parts: Vec<&str> = numbers.split('.').collect();
        if parts.is_empty() || parts.len() > 4 {
            return Err(invalid());
        }

        let mut components = [0u64; 4];
        for (slot, part) in components.iter_mut().zip(parts.iter()) {
            if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid());
            }
            *slot = part.parse().map_err(|_| invalid())?;
        }

        let release_labels = match release {
            Some(release) => {
                let labels: Vec<String> = release.split('.').map(str::to_string).collect();
                let valid = labels.iter().all(|label| {
                    !label.is_empty()
                        && label
                            .chars()
                            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
                });
                if !valid {
                    return Err(invalid());
                }
                labels
            }
            None => Vec::new(),
        };

        Ok(Self {
            major: components[0],
            minor: components[1],
            patch: components[2],
            revision: components[3],
            release_labels,
            metadata,
        })
    }

    pub fn major(&self) -> u64 {
        self.major
    }

    pub fn minor(&self) -> u64 {
        self.minor
    }

    pub fn patch(&self) -> u64 {
        self.patch
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Release label segments, e.g. `["beta", "2"]` for `1.0.0-beta.2`
    pub fn release_labels(&self) -> &[String] {
        &self.release_labels
    }

    /// The full release label, e.g. `beta.2` for `1.0.0-beta.2`
    pub fn release(&self) -> String {
        self.release_labels.join(".")
    }

    /// Build metadata after `+`, if any
    pub fn metadata(&self) -> Option<&str> {
        self.metadata.as_deref()
    }

    /// Returns true if the version carries a release label
    pub fn is_prerelease(&self) -> bool {
        !self.release_labels.is_empty()
    }

    /// Compare only the numeric components, ignoring release labels
    pub fn cmp_numeric(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch, self.revision).cmp(&(
            other.major,
            other.minor,
            other.patch,
            other.revision,
        ))
    }

    /// Lower-cased normalized form, as used for package folder names
    pub fn to_folder_name(&self) -> String {
        self.to_string().to_lowercase()
    }
}

fn compare_label(a: &str, b: &str) -> Ordering {
    let a_num = a.chars().all(|c| c.is_ascii_digit());
    let b_num = b.chars().all(|c| c.is_ascii_digit());
    match (a_num, b_num) {
        (true, true) => match (a.parse::<u64>(), b.parse::<u64>()) {
            (Ok(x), Ok(y)) => x.cmp(&y),
            _ => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
        },
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.to_lowercase().cmp(&b.to_lowercase()),
    }
}

impl Ord for NuGetVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let numeric = self.cmp_numeric(other);
        if numeric != Ordering::Equal {
            return numeric;
        }

        // A stable release sorts after every prerelease of the same number
        match (self.is_prerelease(), other.is_prerelease()) {
            (false, false) => return Ordering::Equal,
            (false, true) => return Ordering::Greater,
            (true, false) => return Ordering::Less,
            (true, true) => {}
        }

        for (a, b) in self.release_labels.iter().zip(other.release_labels.iter()) {
            let ord = compare_label(a, b);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        self.release_labels.len().cmp(&other.release_labels.len())
    }
}

impl PartialOrd for NuGetVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for NuGetVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for NuGetVersion {}

impl Hash for NuGetVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.major, self.minor, self.patch, self.revision).hash(state);
        for label in &self.release_labels {
            match label.parse::<u64>() {
                Ok(number) => number.hash(state),
                Err(_) => label.to_lowercase().hash(state),
            }
        }
    }
}

impl fmt::Display for NuGetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if self.revision > 0 {
            write!(f, ".{}", self.revision)?;
        }
        if self.is_prerelease() {
            write!(f, "-{}", self.release())?;
        }
        Ok(())
    }
}

impl FromStr for NuGetVersion {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for NuGetVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NuGetVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NuGetVersion::parse(&raw).map_err(serde::de::Error::custom)
    }
}
