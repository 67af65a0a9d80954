//! NuGet v3 HTTP feed
//!
//! Versions come from the registration resource:
//! service index -> `RegistrationsBaseUrl` -> `{base}{id}/index.json` -> pages.
//! Pages without inline items are fetched from their `@id`.

use super::{FeedVersion, HttpClient, PackageFeed};
use crate::domain::{NuGetVersion, TargetFramework};
use crate::error::RegistryError;
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use serde::Deserialize;
use tokio::sync::OnceCell;

/// Registration resource types in order of preference
const REGISTRATION_TYPES: &[&str] = &[
    "RegistrationsBaseUrl/3.6.0",
    "RegistrationsBaseUrl/3.4.0",
    "RegistrationsBaseUrl/3.0.0-rc",
    "RegistrationsBaseUrl",
];

#[derive(Debug, Deserialize)]
struct ServiceIndex {
    #[serde(default)]
    resources: Vec<ServiceResource>,
}

#[derive(Debug, Deserialize)]
struct ServiceResource {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct RegistrationIndex {
    #[serde(default)]
    items: Vec<RegistrationPage>,
}

#[derive(Debug, Deserialize)]
struct RegistrationPage {
    #[serde(rename = "@id")]
    id: String,
    items: Option<Vec<RegistrationLeaf>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistrationLeaf {
    catalog_entry: CatalogEntry,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogEntry {
    version: String,
    published: Option<String>,
    listed: Option<bool>,
    #[serde(default)]
    dependency_groups: Vec<DependencyGroup>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DependencyGroup {
    target_framework: Option<String>,
}

impl CatalogEntry {
    fn into_feed_version(self) -> Option<FeedVersion> {
        let version = NuGetVersion::parse(&self.version).ok()?;
        let published = self
            .published
            .as_deref()
            .and_then(|p| DateTime::parse_from_rfc3339(p).ok())
            .map(|p| p.with_timezone(&Utc));
        // nuget.org marks unlisted packages with a 1900 publish date
        let listed = self.listed.unwrap_or(true) && published.is_none_or(|p| p.year() > 1900);

        Some(FeedVersion {
            version,
            published,
            listed,
            framework_groups: self
                .dependency_groups
                .into_iter()
                .map(|g| TargetFramework::parse(g.target_framework.as_deref().unwrap_or("")))
                .collect(),
        })
    }
}

/// A NuGet v3 feed reached over HTTP
pub struct NuGetV3Feed {
    source: String,
    client: HttpClient,
    registration_base: OnceCell<String>,
}

impl NuGetV3Feed {
    pub fn new(source: impl Into<String>, client: HttpClient) -> Self {
        Self {
            source: source.into(),
            client,
            registration_base: OnceCell::new(),
        }
    }

    async fn registration_base(&self, package: &str) -> Result<&str, RegistryError> {
        let base = self
            .registration_base
            .get_or_try_init(|| async {
                let index: ServiceIndex = self
                    .client
                    .get_json(&self.source, package, &self.source)
                    .await?;
                select_registration_base(&index.resources).ok_or_else(|| {
                    RegistryError::invalid_response(
                        package,
                        &self.source,
                        "service index has no RegistrationsBaseUrl resource",
                    )
                })
            })
            .await?;
        Ok(base.as_str())
    }
}

fn select_registration_base(resources: &[ServiceResource]) -> Option<String> {
    REGISTRATION_TYPES.iter().find_map(|kind| {
        resources
            .iter()
            .find(|r| r.kind == *kind)
            .map(|r| {
                let mut base = r.id.clone();
                if !base.ends_with('/') {
                    base.push('/');
                }
                base
            })
    })
}

#[async_trait]
impl PackageFeed for NuGetV3Feed {
    fn source(&self) -> &str {
        &self.source
    }

    async fn fetch_versions(&self, package: &str) -> Result<Vec<FeedVersion>, RegistryError> {
        let base = self.registration_base(package).await?;
        let url = format!("{}{}/index.json", base, package.to_lowercase());
        let index: RegistrationIndex = self.client.get_json(&url, package, &self.source).await?;

        let mut versions = Vec::new();
        for page in index.items {
            let leaves = match page.items {
                Some(items) => items,
                None => {
                    let page: RegistrationPage =
                        self.client.get_json(&page.id, package, &self.source).await?;
                    page.items.unwrap_or_default()
                }
            };
            versions.extend(
                leaves
                    .into_iter()
                    .filter_map(|leaf| leaf.catalog_entry.into_feed_version()),
            );
        }

        tracing::debug!("{}: {} versions of {}", self.source, versions.len(), package);
        Ok(versions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_registration_base_prefers_semver2() {
        let resources = vec![
            ServiceResource {
                id: "https://api.nuget.org/v3/registration5-semver1/".to_string(),
                kind: "RegistrationsBaseUrl".to_string(),
            },
            ServiceResource {
                id: "https://api.nuget.org/v3/registration5-gz-semver2".to_string(),
                kind: "RegistrationsBaseUrl/3.6.0".to_string(),
            },
        ];
        assert_eq!(
            select_registration_base(&resources),
            Some("https://api.nuget.org/v3/registration5-gz-semver2/".to_string())
        );
        assert_eq!(select_registration_base(&[]), None);
    }

    #[test]
    fn test_parse_registration_index() {
        let json = r#"{
          "items": [
            {
              "@id": "https://feed/serilog/index.json#page/1.0.0/2.0.0",
              "items": [
                {
                  "catalogEntry": {
                    "version": "2.0.0",
                    "published": "2016-06-07T02:30:36.25+00:00",
                    "dependencyGroups": [ { "targetFramework": ".NETStandard1.0" } ]
                  }
                },
                {
                  "catalogEntry": {
                    "version": "1.5.0",
                    "published": "1900-01-01T00:00:00+00:00",
                    "listed": true
                  }
                },
                { "catalogEntry": { "version": "1.4.0", "listed": false } }
              ]
            },
            { "@id": "https://feed/serilog/page/3.0.0/4.0.0.json" }
          ]
        }"#;
        let index: RegistrationIndex = serde_json::from_str(json).unwrap();
        assert_eq!(index.items.len(), 2);
        assert!(index.items[1].items.is_none());

        let versions: Vec<FeedVersion> = index
            .items
            .into_iter()
            .flat_map(|p| p.items.unwrap_or_default())
            .filter_map(|leaf| leaf.catalog_entry.into_feed_version())
            .collect();
        assert_eq!(versions.len(), 3);
        assert!(versions[0].listed);
        assert!(versions[0].published.is_some());
        assert_eq!(versions[0].framework_groups[0].short_name(), "netstandard1.0");
        assert!(!versions[1].listed);
        assert!(!versions[2].listed);
    }
}
