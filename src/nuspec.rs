//! `.nuspec` package metadata reader

use crate::domain::{NuGetVersion, TargetFramework};
use crate::error::ManifestError;
use std::path::{Path, PathBuf};

/// The parts of a nuspec this tool cares about
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Nuspec {
    pub id: String,
    pub version: Option<NuGetVersion>,
    pub development_dependency: bool,
    /// Target frameworks of the `<dependencies><group>` elements
    pub dependency_groups: Vec<TargetFramework>,
}

impl Nuspec {
    /// Parse nuspec XML. `path` is only used in error messages.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ManifestError> {
        let doc = roxmltree::Document::parse(content)
            .map_err(|e| ManifestError::xml_parse_error(path, e.to_string()))?;

        let Some(metadata) = doc
            .descendants()
            .find(|n| n.is_element() && n.tag_name().name() == "metadata")
        else {
            return Err(ManifestError::xml_parse_error(path, "missing <metadata>"));
        };

        let text_of = |name: &str| {
            metadata
                .children()
                .find(|n| n.is_element() && n.tag_name().name() == name)
                .and_then(|n| n.text())
                .map(|t| t.trim().to_string())
        };

        let dependency_groups = metadata
            .children()
            .filter(|n| n.is_element() && n.tag_name().name() == "dependencies")
            .flat_map(|deps| deps.children())
            .filter(|n| n.is_element() && n.tag_name().name() == "group")
            .map(|group| TargetFramework::parse(group.attribute("targetFramework").unwrap_or("")))
            .collect();

        Ok(Self {
            id: text_of("id").unwrap_or_default(),
            version: text_of("version").and_then(|v| NuGetVersion::parse(&v).ok()),
            development_dependency: text_of("developmentDependency")
                .is_some_and(|v| v.eq_ignore_ascii_case("true")),
            dependency_groups,
        })
    }

    /// Read and parse a nuspec file
    pub fn read(path: &Path) -> Result<Self, ManifestError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ManifestError::read_error(path, e))?;
        Self::parse(&content, path)
    }
}

/// Location of a package's nuspec in a v3 folder layout
/// (`<root>/<id>/<version>/<id>.nuspec`, all lower-cased)
pub fn nuspec_path(root: &Path, id: &str, version: &NuGetVersion) -> PathBuf {
    let id = id.to_lowercase();
    root.join(&id)
        .join(version.to_folder_name())
        .join(format!("{}.nuspec", id))
}

/// Returns true if the installed package is marked as a development dependency.
/// A missing or unreadable nuspec counts as not.
pub fn is_development_dependency(packages_path: &Path, id: &str, version: &NuGetVersion) -> bool {
    let path = nuspec_path(packages_path, id, version);
    match Nuspec::read(&path) {
        Ok(nuspec) => nuspec.development_dependency,
        Err(e) => {
            tracing::trace!("No usable nuspec for {} {}: {}", id, version, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const NUSPEC: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<package xmlns="http://schemas.microsoft.com/packaging/2013/05/nuspec.xsd">
  <metadata>
    <id>StyleCop.Analyzers</id>
    <version>1.1.118</version>
    <developmentDependency>true</developmentDependency>
    <dependencies>
      <group targetFramework=".NETStandard2.0" />
      <group targetFramework="net8.0" />
    </dependencies>
  </metadata>
</package>"#;

    #[test]
    fn test_parse_nuspec() {
        let nuspec = Nuspec::parse(NUSPEC, Path::new("x.nuspec")).unwrap();
        assert_eq!(nuspec.id, "StyleCop.Analyzers");
        assert_eq!(nuspec.version, NuGetVersion::parse("1.1.118").ok());
        assert!(nuspec.development_dependency);
        assert_eq!(nuspec.dependency_groups.len(), 2);
        assert_eq!(nuspec.dependency_groups[1].short_name(), "net8.0");
    }

    #[test]
    fn test_parse_invalid_xml() {
        let err = Nuspec::parse("<package><metadata>", Path::new("bad.nuspec")).unwrap_err();
        assert!(matches!(err, ManifestError::XmlParseError { .. }));
    }

    #[test]
    fn test_development_dependency_lookup() {
        let temp = TempDir::new().unwrap();
        let version = NuGetVersion::parse("1.1.118").unwrap();
        let path = nuspec_path(temp.path(), "StyleCop.Analyzers", &version);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, NUSPEC).unwrap();

        assert!(path.ends_with("stylecop.analyzers/1.1.118/stylecop.analyzers.nuspec"));
        assert!(is_development_dependency(temp.path(), "StyleCop.Analyzers", &version));
        assert!(!is_development_dependency(temp.path(), "Serilog", &version));
    }
}
