//! Central package management (`Directory.Packages.props`)

use super::reference::{declares_package, locate_version, VersionSite};
use super::writer::{apply_splice, read_manifest, UpdateOutcome};
use crate::error::ManifestError;
use std::path::{Path, PathBuf};

pub const CENTRAL_FILE_NAME: &str = "Directory.Packages.props";

const CENTRAL_ELEMENTS: &[&str] = &["PackageVersion", "GlobalPackageReference"];

/// Nearest `Directory.Packages.props` above `project` that declares `package`.
///
/// Files that fail to parse are logged and passed over.
pub fn find_central_file(project: &Path, package: &str) -> Result<Option<PathBuf>, ManifestError> {
    let Some(start) = project.parent() else {
        return Ok(None);
    };

    for dir in start.ancestors() {
        let candidate = dir.join(CENTRAL_FILE_NAME);
        if !candidate.is_file() {
            continue;
        }
        let content = read_manifest(&candidate)?;
        match declares_package(&content, &candidate, package, CENTRAL_ELEMENTS) {
            Ok(true) => return Ok(Some(candidate)),
            Ok(false) => {}
            Err(e) => tracing::warn!("{}", e),
        }
    }
    Ok(None)
}

/// Patch the central version of `package` for `project`.
///
/// Returns `Ok(None)` when no central file declares the package.
pub fn update_central_version(
    project: &Path,
    package: &str,
    new_version: &str,
) -> Result<Option<UpdateOutcome>, ManifestError> {
    let Some(file) = find_central_file(project, package)? else {
        return Ok(None);
    };

    let content = read_manifest(&file)?;
    let outcome = match locate_version(&content, &file, package, new_version, CENTRAL_ELEMENTS)? {
        VersionSite::Literal(splice) => apply_splice(&file, &content, &splice)?,
        VersionSite::Indirect(value) => UpdateOutcome::Skipped {
            path: file.clone(),
            reason: format!("central version of '{}' is given by '{}'", package, value),
        },
    };
    Ok(Some(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const CENTRAL: &str = r#"<Project>
  <ItemGroup>
    <PackageVersion Include="Serilog" Version="2.10.0" />
    <GlobalPackageReference Include="Nerdbank.GitVersioning" Version="3.6.133" />
  </ItemGroup>
</Project>
"#;

    fn layout() -> (TempDir, PathBuf) {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CENTRAL_FILE_NAME), CENTRAL).unwrap();
        let project_dir = temp.path().join("src").join("App");
        fs::create_dir_all(&project_dir).unwrap();
        let project = project_dir.join("App.csproj");
        fs::write(
            &project,
            r#"<Project><ItemGroup><PackageReference Include="Serilog" /></ItemGroup></Project>"#,
        )
        .unwrap();
        (temp, project)
    }

    #[test]
    fn test_find_central_file_walks_up() {
        let (temp, project) = layout();
        let found = find_central_file(&project, "serilog").unwrap();
        assert_eq!(found, Some(temp.path().join(CENTRAL_FILE_NAME)));
        assert_eq!(find_central_file(&project, "Unknown").unwrap(), None);
    }

    #[test]
    fn test_nearest_declaring_file_wins() {
        let (temp, project) = layout();
        // Nearer file without the package is skipped
        fs::write(
            temp.path().join("src").join(CENTRAL_FILE_NAME),
            "<Project><ItemGroup><PackageVersion Include=\"Other\" Version=\"1.0.0\" /></ItemGroup></Project>",
        )
        .unwrap();
        let found = find_central_file(&project, "Serilog").unwrap();
        assert_eq!(found, Some(temp.path().join(CENTRAL_FILE_NAME)));
    }

    #[test]
    fn test_update_central_version() {
        let (temp, project) = layout();
        let outcome = update_central_version(&project, "Serilog", "3.1.1")
            .unwrap()
            .unwrap();
        assert!(matches!(outcome, UpdateOutcome::Updated { .. }));

        let content = fs::read_to_string(temp.path().join(CENTRAL_FILE_NAME)).unwrap();
        assert_eq!(content, CENTRAL.replace("2.10.0", "3.1.1"));

        let outcome = update_central_version(&project, "Nerdbank.GitVersioning", "3.6.133")
            .unwrap()
            .unwrap();
        assert!(matches!(outcome, UpdateOutcome::Unchanged { .. }));

        assert!(update_central_version(&project, "Unknown", "1.0.0")
            .unwrap()
            .is_none());
    }
}
