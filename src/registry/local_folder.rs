//! Local folder feed in the v3 layout (`<root>/<id>/<version>/<id>.nuspec`)

use super::{FeedVersion, PackageFeed};
use crate::domain::NuGetVersion;
use crate::error::RegistryError;
use crate::nuspec::{nuspec_path, Nuspec};
use async_trait::async_trait;
use std::path::PathBuf;

pub struct LocalFolderFeed {
    source: String,
    root: PathBuf,
}

impl LocalFolderFeed {
    pub fn new(source: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            root: root.into(),
        }
    }
}

#[async_trait]
impl PackageFeed for LocalFolderFeed {
    fn source(&self) -> &str {
        &self.source
    }

    async fn fetch_versions(&self, package: &str) -> Result<Vec<FeedVersion>, RegistryError> {
        let package_dir = self.root.join(package.to_lowercase());
        let mut entries = match tokio::fs::read_dir(&package_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(RegistryError::network_error(package, &self.source, e.to_string()))
            }
        };

        let mut versions = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| RegistryError::network_error(package, &self.source, e.to_string()))?
        {
            let Some(folder) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let Ok(version) = NuGetVersion::parse(&folder) else {
                continue;
            };

            let path = nuspec_path(&self.root, package, &version);
            let framework_groups = match tokio::fs::read_to_string(&path).await {
                Ok(content) => match Nuspec::parse(&content, &path) {
                    Ok(nuspec) => nuspec.dependency_groups,
                    Err(e) => {
                        tracing::debug!("{}: {}", self.source, e);
                        Vec::new()
                    }
                },
                // Folders without a nuspec are incomplete extractions
                Err(_) => continue,
            };

            versions.push(FeedVersion {
                version,
                published: None,
                listed: true,
                framework_groups,
            });
        }

        Ok(versions)
    }
}
