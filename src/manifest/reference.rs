//! Direct edits of package reference elements

use super::writer::{apply_splice, read_manifest, UpdateOutcome};
use super::xml::{self, Splice};
use crate::error::ManifestError;
use std::path::Path;

/// Where a package's version lives inside one file
pub(super) enum VersionSite {
    Literal(Splice),
    Indirect(String),
}

/// Find the `Version` attribute of the first package element for `package`.
///
/// Only elements named in `elements` are considered.
pub(super) fn locate_version(
    content: &str,
    path: &Path,
    package: &str,
    new_version: &str,
    elements: &[&str],
) -> Result<VersionSite, ManifestError> {
    xml::with_document(content, path, |doc| {
        let node = doc
            .descendants()
            .filter(|n| {
                xml::package_element_name(n).is_some_and(|name| elements.contains(&name))
            })
            .find(|n| xml::package_identity(n).is_some_and(|id| id.eq_ignore_ascii_case(package)))
            .ok_or_else(|| ManifestError::package_not_found(package, path))?;

        let missing = || ManifestError::MissingVersionAttribute {
            package: package.to_string(),
            path: path.to_path_buf(),
        };
        let current = xml::attribute(&node, "Version").ok_or_else(missing)?;
        if current.contains("$(") {
            return Ok(VersionSite::Indirect(current.to_string()));
        }
        xml::version_attribute_splice(&node, new_version)
            .map(VersionSite::Literal)
            .ok_or_else(missing)
    })
}

/// Returns true if `content` declares `package` in one of `elements`
pub(super) fn declares_package(
    content: &str,
    path: &Path,
    package: &str,
    elements: &[&str],
) -> Result<bool, ManifestError> {
    xml::with_document(content, path, |doc| {
        Ok(doc.descendants().any(|n| {
            xml::package_element_name(&n).is_some_and(|name| elements.contains(&name))
                && xml::package_identity(&n).is_some_and(|id| id.eq_ignore_ascii_case(package))
        }))
    })
}

/// Rewrite the `Version` attribute of `package` in `file`.
///
/// The element is matched by `Include` or `Update`, ignoring case. A version
/// given through a build variable is left alone and reported as skipped.
pub fn update_package_reference(
    file: &Path,
    package: &str,
    new_version: &str,
) -> Result<UpdateOutcome, ManifestError> {
    let content = read_manifest(file)?;
    match locate_version(&content, file, package, new_version, xml::PACKAGE_ELEMENTS)? {
        VersionSite::Literal(splice) => apply_splice(file, &content, &splice),
        VersionSite::Indirect(value) => Ok(UpdateOutcome::Skipped {
            path: file.to_path_buf(),
            reason: format!("version of '{}' is given by '{}'", package, value),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn project(temp: &TempDir, content: &str) -> std::path::PathBuf {
        let path = temp.path().join("App.csproj");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_update_package_reference() {
        let temp = TempDir::new().unwrap();
        let content = r#"<Project Sdk="Microsoft.NET.Sdk">
  <!-- logging -->
  <ItemGroup>
    <PackageReference Include="Serilog" Version="2.10.0" />
    <PackageReference Include="Newtonsoft.Json" Version="12.0.1" />
  </ItemGroup>
</Project>
"#;
        let path = project(&temp, content);

        let outcome = update_package_reference(&path, "newtonsoft.json", "13.0.3").unwrap();
        assert!(matches!(outcome, UpdateOutcome::Updated { .. }));
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            content.replace("12.0.1", "13.0.3")
        );

        let outcome = update_package_reference(&path, "Newtonsoft.Json", "13.0.3").unwrap();
        assert!(matches!(outcome, UpdateOutcome::Unchanged { .. }));
    }

    #[test]
    fn test_update_matches_update_attribute() {
        let temp = TempDir::new().unwrap();
        let path = project(
            &temp,
            r#"<Project><ItemGroup><PackageReference Update="Serilog" Version="2.0.0" /></ItemGroup></Project>"#,
        );
        update_package_reference(&path, "Serilog", "3.1.1").unwrap();
        assert!(fs::read_to_string(&path)
            .unwrap()
            .contains(r#"Update="Serilog" Version="3.1.1""#));
    }

    #[test]
    fn test_update_errors() {
        let temp = TempDir::new().unwrap();
        let path = project(
            &temp,
            r#"<Project><ItemGroup><PackageReference Include="Serilog" /></ItemGroup></Project>"#,
        );

        let err = update_package_reference(&path, "Missing", "1.0.0").unwrap_err();
        assert!(matches!(err, ManifestError::PackageNotFound { .. }));

        let err = update_package_reference(&path, "Serilog", "1.0.0").unwrap_err();
        assert!(matches!(err, ManifestError::MissingVersionAttribute { .. }));
    }

    #[test]
    fn test_variable_version_is_skipped() {
        let temp = TempDir::new().unwrap();
        let content = r#"<Project><ItemGroup><PackageReference Include="Serilog" Version="$(SerilogVersion)" /></ItemGroup></Project>"#;
        let path = project(&temp, content);

        let outcome = update_package_reference(&path, "Serilog", "3.0.0").unwrap();
        assert!(matches!(outcome, UpdateOutcome::Skipped { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), content);
    }
}
