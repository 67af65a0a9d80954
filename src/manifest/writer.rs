//! Manifest file reading and writing
//!
//! This module provides:
//! - read/write helpers mapping IO failures to `ManifestError`
//! - `apply_splice`, which writes a file only when its content changes
//! - `UpdateOutcome`, the result of every version mutation

use super::xml::Splice;
use crate::error::ManifestError;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// What a version mutation did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The file was rewritten
    Updated { path: PathBuf },
    /// The file already carried the requested version
    Unchanged { path: PathBuf },
    /// The version is defined through another variable and was left alone
    Skipped { path: PathBuf, reason: String },
}

impl UpdateOutcome {
    pub fn path(&self) -> &Path {
        match self {
            UpdateOutcome::Updated { path }
            | UpdateOutcome::Unchanged { path }
            | UpdateOutcome::Skipped { path, .. } => path,
        }
    }

    /// Returns true if the file is at the requested version afterwards
    pub fn is_applied(&self) -> bool {
        !matches!(self, UpdateOutcome::Skipped { .. })
    }
}

impl fmt::Display for UpdateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateOutcome::Updated { path } => write!(f, "updated {}", path.display()),
            UpdateOutcome::Unchanged { path } => write!(f, "{} already up to date", path.display()),
            UpdateOutcome::Skipped { path, reason } => {
                write!(f, "skipped {}: {}", path.display(), reason)
            }
        }
    }
}

/// Read a manifest file content safely
pub fn read_manifest(path: &Path) -> Result<String, ManifestError> {
    if !path.exists() {
        return Err(ManifestError::NotFound {
            path: path.to_path_buf(),
        });
    }
    fs::read_to_string(path).map_err(|e| ManifestError::read_error(path, e))
}

/// Write content to a manifest file
pub fn write_manifest(path: &Path, content: &str) -> Result<(), ManifestError> {
    fs::write(path, content).map_err(|e| ManifestError::write_error(path, e))
}

/// Apply `splice` to `content` and write the result if it differs
pub fn apply_splice(
    path: &Path,
    content: &str,
    splice: &Splice,
) -> Result<UpdateOutcome, ManifestError> {
    let updated = splice.apply(content);
    if updated == content {
        return Ok(UpdateOutcome::Unchanged {
            path: path.to_path_buf(),
        });
    }
    write_manifest(path, &updated)?;
    tracing::debug!("Rewrote {}", path.display());
    Ok(UpdateOutcome::Updated {
        path: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_missing_manifest() {
        let err = read_manifest(Path::new("/definitely/missing.csproj")).unwrap_err();
        assert!(matches!(err, ManifestError::NotFound { .. }));
    }

    #[test]
    fn test_apply_splice_writes_only_on_change() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("App.csproj");
        let content = "<Project>1.0</Project>";
        write_manifest(&path, content).unwrap();

        let same = Splice {
            range: 9..12,
            replacement: "1.0".to_string(),
        };
        let outcome = apply_splice(&path, content, &same).unwrap();
        assert_eq!(outcome, UpdateOutcome::Unchanged { path: path.clone() });

        let different = Splice {
            range: 9..12,
            replacement: "2.0".to_string(),
        };
        let outcome = apply_splice(&path, content, &different).unwrap();
        assert!(matches!(outcome, UpdateOutcome::Updated { .. }));
        assert_eq!(read_manifest(&path).unwrap(), "<Project>2.0</Project>");
    }

    #[test]
    fn test_outcome_display() {
        let outcome = UpdateOutcome::Skipped {
            path: PathBuf::from("Directory.Build.props"),
            reason: "nested variable".to_string(),
        };
        assert!(!outcome.is_applied());
        assert!(outcome.to_string().contains("nested variable"));
    }
}
