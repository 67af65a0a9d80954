//! Single-flight version cache
//!
//! Each key maps to a shared future. The first caller for a key inserts the
//! fetch and every concurrent caller awaits that same future, so one key
//! costs one feed query no matter how many resolutions race on it. Failed
//! fetches are evicted so a later call can try again.

use crate::domain::{NuGetVersion, TargetFramework};
use crate::error::ResolveError;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::Arc;

pub type FetchResult = Result<Arc<Vec<NuGetVersion>>, ResolveError>;

type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

/// Identity of one memoized version list
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    package: String,
    include_prerelease: bool,
    framework: TargetFramework,
    older_than_days: Option<u32>,
}

impl CacheKey {
    pub fn new(
        package: &str,
        include_prerelease: bool,
        framework: TargetFramework,
        older_than_days: Option<u32>,
    ) -> Self {
        Self {
            package: package.to_lowercase(),
            include_prerelease,
            framework,
            older_than_days,
        }
    }
}

#[derive(Default)]
pub struct VersionCache {
    entries: DashMap<CacheKey, SharedFetch>,
}

impl VersionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached list for `key`, running `fetch` only if no caller
    /// has started one yet
    pub async fn get_or_fetch<F>(&self, key: CacheKey, fetch: F) -> FetchResult
    where
        F: FnOnce() -> BoxFuture<'static, FetchResult>,
    {
        // The map guard must be released before awaiting
        let shared = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| fetch().shared())
            .value()
            .clone();

        let result = shared.clone().await;
        if result.is_err() {
            self.entries
                .remove_if(&key, |_, current| current.ptr_eq(&shared));
        }
        result
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn key(name: &str) -> CacheKey {
        CacheKey::new(name, false, TargetFramework::parse("net8.0"), None)
    }

    #[test]
    fn test_key_is_case_insensitive() {
        assert_eq!(key("Serilog"), key("SERILOG"));
        assert_ne!(
            key("Serilog"),
            CacheKey::new("Serilog", true, TargetFramework::parse("net8.0"), None)
        );
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_fetch() {
        let cache = Arc::new(VersionCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                tokio::spawn(async move {
                    cache
                        .get_or_fetch(key("Serilog"), move || {
                            async move {
                                calls.fetch_add(1, Ordering::SeqCst);
                                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                                Ok(Arc::new(vec![NuGetVersion::new(1, 0, 0)]))
                            }
                            .boxed()
                        })
                        .await
                })
            })
            .collect();

        for task in tasks {
            let versions = task.await.unwrap().unwrap();
            assert_eq!(versions.len(), 1);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_evicted() {
        let cache = VersionCache::new();
        let result = cache
            .get_or_fetch(key("Broken"), || {
                async {
                    Err(ResolveError::Feed {
                        package: "Broken".to_string(),
                        message: "bad json".to_string(),
                    })
                }
                .boxed()
            })
            .await;
        assert!(result.is_err());
        assert!(cache.is_empty());

        let result = cache
            .get_or_fetch(key("Broken"), || async { Ok(Arc::new(Vec::new())) }.boxed())
            .await;
        assert!(result.is_ok());
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }
}
