//! Target framework monikers
//!
//! Accepts both the short folder form used in project files (`net8.0`,
//! `netstandard2.0`, `net472`, `netcoreapp3.1`, `net8.0-windows`) and the
//! long form used by lock documents and feeds (`.NETCoreApp,Version=v8.0`).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Framework family
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FrameworkIdentifier {
    /// .NET Core and .NET 5+
    NetCoreApp,
    /// .NET Standard
    NetStandard,
    /// .NET Framework
    NetFramework,
    /// Framework-agnostic
    Any,
    /// Anything else, kept verbatim (lower-cased)
    Other(String),
}

/// A parsed target framework
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetFramework {
    identifier: FrameworkIdentifier,
    version: (u32, u32, u32),
    platform: Option<String>,
}

impl TargetFramework {
    pub fn new(identifier: FrameworkIdentifier, version: (u32, u32, u32)) -> Self {
        Self {
            identifier,
            version,
            platform: None,
        }
    }

    /// The framework-agnostic moniker
    pub fn any() -> Self {
        Self::new(FrameworkIdentifier::Any, (0, 0, 0))
    }

    /// Parse a short or long moniker. Empty strings parse as `any`.
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("any") {
            return Self::any();
        }
        if let Some((name, rest)) = trimmed.split_once(',') {
            return Self::parse_long(name, rest);
        }
        Self::parse_short(trimmed)
    }

    fn parse_long(name: &str, rest: &str) -> Self {
        let identifier = match name.trim().to_lowercase().as_str() {
            ".netcoreapp" => FrameworkIdentifier::NetCoreApp,
            ".netstandard" => FrameworkIdentifier::NetStandard,
            ".netframework" => FrameworkIdentifier::NetFramework,
            "any" | "" => FrameworkIdentifier::Any,
            other => FrameworkIdentifier::Other(other.to_string()),
        };

        let mut version = (0, 0, 0);
        let mut platform = None;
        for part in rest.split(',') {
            let Some((key, val)) = part.split_once('=') else {
                continue;
            };
            match key.trim().to_lowercase().as_str() {
                "version" => {
                    version = parse_dotted(val.trim().trim_start_matches(['v', 'V']));
                }
                "profile" if !val.trim().is_empty() => {
                    platform = Some(val.trim().to_lowercase());
                }
                _ => {}
            }
        }

        Self {
            identifier,
            version,
            platform,
        }
    }

    fn parse_short(value: &str) -> Self {
        let lower = value.to_lowercase();
        let (moniker, platform) = match lower.split_once('-') {
            Some((moniker, platform)) => (moniker.to_string(), Some(platform.to_string())),
            None => (lower.clone(), None),
        };

        let split_at = moniker
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(moniker.len());
        let (name, digits) = moniker.split_at(split_at);

        let (identifier, version) = match name {
            "netcoreapp" | ".netcoreapp" => (FrameworkIdentifier::NetCoreApp, parse_dotted(digits)),
            "netstandard" | ".netstandard" => {
                (FrameworkIdentifier::NetStandard, parse_dotted(digits))
            }
            ".netframework" => (FrameworkIdentifier::NetFramework, parse_dotted(digits)),
            "net" if digits.contains('.') => {
                let version = parse_dotted(digits);
                if version.0 >= 5 {
                    (FrameworkIdentifier::NetCoreApp, version)
                } else {
                    (FrameworkIdentifier::NetFramework, version)
                }
            }
            // net45, net472, net48
            "net" => (FrameworkIdentifier::NetFramework, parse_compact(digits)),
            other => (
                FrameworkIdentifier::Other(other.to_string()),
                parse_dotted(digits),
            ),
        };

        // Platform versions (windows7.0) are not significant for compatibility
        let platform = platform.map(|p| {
            p.trim_end_matches(|c: char| c.is_ascii_digit() || c == '.')
                .to_string()
        });

        Self {
            identifier,
            version,
            platform: platform.filter(|p| !p.is_empty()),
        }
    }

    pub fn identifier(&self) -> &FrameworkIdentifier {
        &self.identifier
    }

    pub fn version(&self) -> (u32, u32, u32) {
        self.version
    }

    pub fn platform(&self) -> Option<&str> {
        self.platform.as_deref()
    }

    pub fn is_any(&self) -> bool {
        self.identifier == FrameworkIdentifier::Any
    }

    /// Returns true if both monikers name the same framework, whatever their spelling
    pub fn is_equivalent(&self, other: &TargetFramework) -> bool {
        self == other
    }

    /// Returns true if a project targeting `self` can consume a package
    /// dependency group built for `group`
    pub fn is_compatible_with(&self, group: &TargetFramework) -> bool {
        if group.is_any() {
            return true;
        }
        if let Some(platform) = group.platform() {
            if self.platform() != Some(platform) {
                return false;
            }
        }
        if self.identifier == group.identifier {
            return group.version <= self.version;
        }
        if group.identifier == FrameworkIdentifier::NetStandard {
            return self
                .max_netstandard()
                .is_some_and(|supported| group.version <= supported);
        }
        false
    }

    /// Highest .NET Standard version this framework implements
    fn max_netstandard(&self) -> Option<(u32, u32, u32)> {
        match self.identifier {
            FrameworkIdentifier::NetCoreApp if self.version.0 >= 3 => Some((2, 1, 0)),
            FrameworkIdentifier::NetCoreApp if self.version.0 >= 2 => Some((2, 0, 0)),
            FrameworkIdentifier::NetCoreApp => Some((1, 6, 0)),
            FrameworkIdentifier::NetFramework => match self.version {
                v if v >= (4, 6, 1) => Some((2, 0, 0)),
                v if v >= (4, 6, 0) => Some((1, 3, 0)),
                v if v >= (4, 5, 1) => Some((1, 2, 0)),
                v if v >= (4, 5, 0) => Some((1, 1, 0)),
                _ => None,
            },
            _ => None,
        }
    }

    /// The short folder name, e.g. `net8.0` or `net472`
    pub fn short_name(&self) -> String {
        let (major, minor, patch) = self.version;
        let base = match &self.identifier {
            FrameworkIdentifier::Any => return "any".to_string(),
            FrameworkIdentifier::NetCoreApp if major >= 5 => format!("net{}.{}", major, minor),
            FrameworkIdentifier::NetCoreApp => format!("netcoreapp{}.{}", major, minor),
            FrameworkIdentifier::NetStandard => format!("netstandard{}.{}", major, minor),
            FrameworkIdentifier::NetFramework if patch > 0 => {
                format!("net{}{}{}", major, minor, patch)
            }
            FrameworkIdentifier::NetFramework => format!("net{}{}", major, minor),
            FrameworkIdentifier::Other(name) => format!("{}{}.{}", name, major, minor),
        };
        match &self.platform {
            Some(platform) => format!("{}-{}", base, platform),
            None => base,
        }
    }
}

fn parse_dotted(value: &str) -> (u32, u32, u32) {
    let mut parts = value
        .split('.')
        .map(|p| p.trim().parse::<u32>().unwrap_or(0));
    (
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
    )
}

fn parse_compact(value: &str) -> (u32, u32, u32) {
    let mut digits = value.chars().filter_map(|c| c.to_digit(10));
    (
        digits.next().unwrap_or(0),
        digits.next().unwrap_or(0),
        digits.next().unwrap_or(0),
    )
}

impl fmt::Display for TargetFramework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_name())
    }
}

impl Serialize for TargetFramework {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TargetFramework {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(TargetFramework::parse(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_short_forms() {
        let fw = TargetFramework::parse("net8.0");
        assert_eq!(fw.identifier(), &FrameworkIdentifier::NetCoreApp);
        assert_eq!(fw.version(), (8, 0, 0));

        let fw = TargetFramework::parse("net472");
        assert_eq!(fw.identifier(), &FrameworkIdentifier::NetFramework);
        assert_eq!(fw.version(), (4, 7, 2));

        let fw = TargetFramework::parse("netstandard2.0");
        assert_eq!(fw.identifier(), &FrameworkIdentifier::NetStandard);

        let fw = TargetFramework::parse("netcoreapp3.1");
        assert_eq!(fw.short_name(), "netcoreapp3.1");

        let fw = TargetFramework::parse(".NETStandard2.0");
        assert_eq!(fw.short_name(), "netstandard2.0");
    }

    #[test]
    fn test_parse_long_form_is_equivalent() {
        let long = TargetFramework::parse(".NETCoreApp,Version=v8.0");
        let short = TargetFramework::parse("net8.0");
        assert!(long.is_equivalent(&short));

        let long = TargetFramework::parse(".NETFramework,Version=v4.7.2");
        assert!(long.is_equivalent(&TargetFramework::parse("net472")));
    }

    #[test]
    fn test_parse_platform() {
        let fw = TargetFramework::parse("net8.0-windows7.0");
        assert_eq!(fw.platform(), Some("windows"));
        assert_eq!(fw.short_name(), "net8.0-windows");
        assert!(!fw.is_equivalent(&TargetFramework::parse("net8.0")));
    }

    #[test]
    fn test_empty_is_any() {
        assert!(TargetFramework::parse("").is_any());
        assert_eq!(TargetFramework::any().to_string(), "any");
    }

    #[test]
    fn test_compatible_same_family() {
        let project = TargetFramework::parse("net8.0");
        assert!(project.is_compatible_with(&TargetFramework::parse("net6.0")));
        assert!(project.is_compatible_with(&TargetFramework::parse("netcoreapp3.1")));
        assert!(!project.is_compatible_with(&TargetFramework::parse("net9.0")));
    }

    #[test]
    fn test_compatible_netstandard() {
        assert!(TargetFramework::parse("net8.0")
            .is_compatible_with(&TargetFramework::parse("netstandard2.1")));
        assert!(!TargetFramework::parse("netcoreapp2.1")
            .is_compatible_with(&TargetFramework::parse("netstandard2.1")));
        assert!(TargetFramework::parse("net472")
            .is_compatible_with(&TargetFramework::parse("netstandard2.0")));
        assert!(!TargetFramework::parse("net45")
            .is_compatible_with(&TargetFramework::parse("netstandard2.0")));
    }

    #[test]
    fn test_netcoreapp1_implements_netstandard16() {
        let project = TargetFramework::parse("netcoreapp1.1");
        assert!(project.is_compatible_with(&TargetFramework::parse("netstandard1.6")));
        assert!(!project.is_compatible_with(&TargetFramework::parse("netstandard2.0")));
        assert!(TargetFramework::parse("netcoreapp2.0")
            .is_compatible_with(&TargetFramework::parse("netstandard2.0")));
    }

    #[test]
    fn test_incompatible_families() {
        assert!(!TargetFramework::parse("net8.0")
            .is_compatible_with(&TargetFramework::parse("net48")));
        assert!(TargetFramework::parse("net48").is_compatible_with(&TargetFramework::any()));
    }
}
