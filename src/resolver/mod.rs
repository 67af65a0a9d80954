//! Latest-allowed version resolution
//!
//! This module provides:
//! - `ResolveRequest` and the lock / prerelease policies
//! - A single-flight cache of available versions per package key
//! - `VersionResolver`, which fetches versions from every source of a
//!   dependency and picks the best match under a floating range

mod cache;
mod request;

pub use cache::{CacheKey, VersionCache};
pub use request::{PrereleaseReporting, ResolveRequest, VersionLock};

use crate::domain::{FloatRange, NuGetVersion, TargetFramework, VersionRange};
use crate::error::{ResolveError, ValidationError};
use crate::registry::{FeedProvider, FeedVersion, PackageFeed};
use cache::FetchResult;
use chrono::{DateTime, Utc};
use futures::future::{join_all, FutureExt};
use std::sync::Arc;

/// Resolves the latest allowed version of dependencies
pub struct VersionResolver {
    feeds: Arc<FeedProvider>,
    cache: VersionCache,
    ignore_failed_sources: bool,
    /// Fixed clock for the age window, `None` means the real time
    now: Option<DateTime<Utc>>,
}

/// Everything a cache fill needs, owned so the fetch can outlive the caller
struct FetchPlan {
    feeds: Arc<FeedProvider>,
    package: String,
    sources: Vec<String>,
    include_prerelease: bool,
    framework: TargetFramework,
    development_dependency: bool,
    cutoff: Option<DateTime<Utc>>,
    ignore_failed_sources: bool,
}

impl VersionResolver {
    pub fn new(feeds: Arc<FeedProvider>) -> Self {
        Self {
            feeds,
            cache: VersionCache::new(),
            ignore_failed_sources: false,
            now: None,
        }
    }

    /// Create a resolver with a custom current time (for testing)
    pub fn with_time(feeds: Arc<FeedProvider>, now: DateTime<Utc>) -> Self {
        Self {
            now: Some(now),
            ..Self::new(feeds)
        }
    }

    /// Log and skip non-network feed failures instead of failing resolution
    pub fn with_ignore_failed_sources(mut self, ignore: bool) -> Self {
        self.ignore_failed_sources = ignore;
        self
    }

    /// Forget every memoized version list
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Resolve the latest version allowed by the request's policy.
    ///
    /// Returns the referenced version unchanged when nothing better matches.
    pub async fn resolve(&self, request: &ResolveRequest) -> Result<NuGetVersion, ResolveError> {
        let referenced = request.referenced_version.as_ref().ok_or_else(|| {
            ValidationError::MissingReferencedVersion {
                package: request.package.clone(),
            }
        })?;
        let current = request.current_range.as_ref().ok_or_else(|| {
            ValidationError::MissingVersionRange {
                package: request.package.clone(),
            }
        })?;
        if !current.has_lower_bound() {
            return Err(ValidationError::MissingMinimumVersion {
                package: request.package.clone(),
                range: current.to_string(),
            }
            .into());
        }

        let include_prerelease = request.prerelease.include_prerelease(referenced);
        let versions = self.available_versions(request, include_prerelease).await?;

        let behavior = request.version_lock.float_behavior(include_prerelease);
        let label = if referenced.is_prerelease() {
            request
                .prerelease_label
                .clone()
                .or_else(|| referenced.release_labels().first().cloned())
        } else {
            None
        };
        let range = VersionRange::with_float(
            current,
            FloatRange::new(behavior, referenced.clone(), label),
        );

        let resolved = range
            .find_best_match(versions.iter())
            .cloned()
            .unwrap_or_else(|| referenced.clone());
        tracing::debug!(
            "{} {} -> {} ({:?}, {} candidates)",
            request.package,
            referenced,
            resolved,
            behavior,
            versions.len()
        );
        Ok(resolved)
    }

    /// The filtered version list for a request, fetched at most once per key
    async fn available_versions(
        &self,
        request: &ResolveRequest,
        include_prerelease: bool,
    ) -> FetchResult {
        let key = CacheKey::new(
            &request.package,
            include_prerelease,
            request.target_framework.clone(),
            request.older_than_days,
        );
        let now = self.now.unwrap_or_else(Utc::now);
        let plan = FetchPlan {
            feeds: Arc::clone(&self.feeds),
            package: request.package.clone(),
            sources: request.sources.clone(),
            include_prerelease,
            framework: request.target_framework.clone(),
            development_dependency: request.development_dependency,
            cutoff: request
                .older_than_days
                .map(|days| now - chrono::Duration::days(i64::from(days))),
            ignore_failed_sources: self.ignore_failed_sources,
        };

        self.cache
            .get_or_fetch(key, move || plan.fetch().boxed())
            .await
    }
}

impl FetchPlan {
    async fn fetch(self) -> FetchResult {
        let mut feeds: Vec<Arc<dyn PackageFeed>> = Vec::new();
        for source in &self.sources {
            match self.feeds.feed_for(source) {
                Ok(feed) => feeds.push(feed),
                Err(e) => tracing::warn!("Skipping package source {}: {}", source, e),
            }
        }

        let results = join_all(feeds.iter().map(|feed| feed.fetch_versions(&self.package))).await;

        let mut found: Vec<FeedVersion> = Vec::new();
        for (feed, result) in feeds.iter().zip(results) {
            match result {
                Ok(versions) => found.extend(versions),
                Err(e) if e.is_network() || self.ignore_failed_sources => {
                    tracing::warn!("{}: {}", feed.source(), e);
                }
                Err(e) => {
                    return Err(ResolveError::Feed {
                        package: self.package.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        let mut versions: Vec<NuGetVersion> = found
            .into_iter()
            .filter(|v| self.is_eligible(v))
            .map(|v| v.version)
            .collect();
        versions.sort();
        versions.dedup();
        Ok(Arc::new(versions))
    }

    fn is_eligible(&self, candidate: &FeedVersion) -> bool {
        if !candidate.listed {
            return false;
        }
        if !self.include_prerelease && candidate.version.is_prerelease() {
            return false;
        }
        if let (Some(cutoff), Some(published)) = (self.cutoff, candidate.published) {
            if published > cutoff {
                return false;
            }
        }
        self.development_dependency || candidate.supports(&self.framework)
    }
}
