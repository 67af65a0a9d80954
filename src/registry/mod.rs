//! Package feeds for fetching available versions
//!
//! This module provides:
//! - HTTP client shared foundation with retry logic
//! - NuGet v3 HTTP feed
//! - Local folder feed
//! - `FeedProvider`, which maps package source URIs to memoized feeds

mod client;
mod local_folder;
mod nuget_v3;

pub use client::HttpClient;
pub use local_folder::LocalFolderFeed;
pub use nuget_v3::NuGetV3Feed;

use crate::domain::{NuGetVersion, TargetFramework};
use crate::error::RegistryError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// One version of a package as a feed reports it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedVersion {
    pub version: NuGetVersion,
    /// Publish time, when the feed knows it
    pub published: Option<DateTime<Utc>>,
    pub listed: bool,
    /// Target frameworks of the version's dependency groups
    pub framework_groups: Vec<TargetFramework>,
}

impl FeedVersion {
    /// A listed version with no date and no dependency groups
    pub fn new(version: NuGetVersion) -> Self {
        Self {
            version,
            published: None,
            listed: true,
            framework_groups: Vec::new(),
        }
    }

    pub fn with_published(mut self, published: DateTime<Utc>) -> Self {
        self.published = Some(published);
        self
    }

    pub fn with_listed(mut self, listed: bool) -> Self {
        self.listed = listed;
        self
    }

    pub fn with_framework_groups(mut self, groups: Vec<TargetFramework>) -> Self {
        self.framework_groups = groups;
        self
    }

    /// Returns true if a project targeting `framework` can use this version.
    /// Versions without dependency groups are usable everywhere.
    pub fn supports(&self, framework: &TargetFramework) -> bool {
        self.framework_groups.is_empty()
            || self
                .framework_groups
                .iter()
                .any(|group| framework.is_compatible_with(group))
    }
}

/// Trait for package feeds
#[async_trait]
pub trait PackageFeed: Send + Sync {
    /// The source URI this feed was created for
    fn source(&self) -> &str;

    /// Fetch every version of a package the feed knows
    async fn fetch_versions(&self, package: &str) -> Result<Vec<FeedVersion>, RegistryError>;
}

/// Creates feeds for package sources and keeps one feed per source
pub struct FeedProvider {
    client: HttpClient,
    feeds: DashMap<String, Arc<dyn PackageFeed>>,
}

impl FeedProvider {
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            feeds: DashMap::new(),
        }
    }

    /// Use `feed` for `source` instead of creating one
    pub fn with_feed(self, source: impl Into<String>, feed: Arc<dyn PackageFeed>) -> Self {
        self.feeds.insert(source.into(), feed);
        self
    }

    /// The feed for `source`, created on first use
    pub fn feed_for(&self, source: &str) -> Result<Arc<dyn PackageFeed>, RegistryError> {
        if let Some(feed) = self.feeds.get(source) {
            return Ok(Arc::clone(feed.value()));
        }

        let feed = self.create(source)?;
        let feed = self
            .feeds
            .entry(source.to_string())
            .or_insert(feed)
            .value()
            .clone();
        Ok(feed)
    }

    fn create(&self, source: &str) -> Result<Arc<dyn PackageFeed>, RegistryError> {
        let lower = source.to_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return Ok(Arc::new(NuGetV3Feed::new(source, self.client.clone())));
        }

        let path = PathBuf::from(source.strip_prefix("file://").unwrap_or(source));
        if path.is_dir() {
            return Ok(Arc::new(LocalFolderFeed::new(source, path)));
        }

        Err(RegistryError::UnsupportedSource {
            source_uri: source.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> NuGetVersion {
        NuGetVersion::parse(s).unwrap()
    }

    #[test]
    fn test_feed_version_supports() {
        let any = FeedVersion::new(v("1.0.0"));
        assert!(any.supports(&TargetFramework::parse("net48")));

        let core = FeedVersion::new(v("2.0.0"))
            .with_framework_groups(vec![TargetFramework::parse("net8.0")]);
        assert!(core.supports(&TargetFramework::parse("net9.0")));
        assert!(!core.supports(&TargetFramework::parse("net6.0")));
    }

    #[test]
    fn test_provider_memoizes_feeds() {
        let provider = FeedProvider::new(HttpClient::new().unwrap());
        let a = provider
            .feed_for("https://api.nuget.org/v3/index.json")
            .unwrap();
        let b = provider
            .feed_for("https://api.nuget.org/v3/index.json")
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_provider_local_folder() {
        let temp = tempfile::TempDir::new().unwrap();
        let provider = FeedProvider::new(HttpClient::new().unwrap());
        let source = temp.path().display().to_string();
        let feed = provider.feed_for(&source).unwrap();
        assert_eq!(feed.source(), source);
    }

    #[test]
    fn test_provider_unsupported_source() {
        let provider = FeedProvider::new(HttpClient::new().unwrap());
        let err = provider.feed_for("/no/such/feed/folder").err().unwrap();
        assert!(matches!(err, RegistryError::UnsupportedSource { .. }));
        assert!(!err.is_network());
    }
}
