//! HTTP client shared by the package feeds
//!
//! This module provides a shared HTTP client with:
//! - Configurable timeout and User-Agent
//! - Exponential backoff retry logic (max 3 retries)
//! - Rate limit handling
//! - JSON decoding with feed-aware error context

use crate::error::RegistryError;
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Default timeout for HTTP requests (30 seconds)
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default User-Agent header
const DEFAULT_USER_AGENT: &str = concat!("nugup/", env!("CARGO_PKG_VERSION"));

/// Maximum number of retry attempts
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (in milliseconds)
const BASE_DELAY_MS: u64 = 100;

/// HTTP client wrapper with retry logic. Clones share one connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    max_retries: u32,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self, RegistryError> {
        Self::with_config(DEFAULT_TIMEOUT, DEFAULT_USER_AGENT)
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_config(timeout: Duration, user_agent: &str) -> Result<Self, RegistryError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| {
                RegistryError::network_error(
                    "",
                    "HTTP client",
                    format!("failed to create HTTP client: {}", e),
                )
            })?;

        Ok(Self {
            client,
            max_retries: MAX_RETRIES,
        })
    }

    /// Set the maximum number of retries
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// GET `url`, retrying transport failures and 429 responses with backoff.
    /// `package` and `feed` only label errors.
    pub async fn get_with_context(
        &self,
        url: &str,
        package: &str,
        feed: &str,
    ) -> Result<reqwest::Response, RegistryError> {
        let mut last_error = None;
        let mut delay = BASE_DELAY_MS;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                delay *= 2;
            }

            let response = match self.client.get(url).send().await {
                Ok(response) => response,
                Err(e) => {
                    tracing::debug!("GET {} failed (attempt {}): {}", url, attempt + 1, e);
                    last_error = Some(if e.is_timeout() {
                        RegistryError::timeout(package, feed)
                    } else {
                        RegistryError::network_error(package, feed, e.to_string())
                    });
                    continue;
                }
            };

            match response.status() {
                StatusCode::TOO_MANY_REQUESTS => {
                    last_error = Some(RegistryError::RateLimitExceeded {
                        registry: feed.to_string(),
                    });
                }
                StatusCode::NOT_FOUND => {
                    return Err(RegistryError::package_not_found(package, feed));
                }
                status if status.is_server_error() => {
                    last_error = Some(RegistryError::network_error(
                        package,
                        feed,
                        format!("HTTP {}", status),
                    ));
                }
                status if !status.is_success() => {
                    return Err(RegistryError::network_error(
                        package,
                        feed,
                        format!("HTTP {}", status),
                    ));
                }
                _ => return Ok(response),
            }
        }

        Err(last_error
            .unwrap_or_else(|| RegistryError::network_error(package, feed, "unknown error")))
    }

    /// GET `url` and decode the JSON body
    pub async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        package: &str,
        feed: &str,
    ) -> Result<T, RegistryError> {
        let response = self.get_with_context(url, package, feed).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| RegistryError::network_error(package, feed, e.to_string()))?;
        serde_json::from_slice(&body).map_err(|e| {
            RegistryError::invalid_response(package, feed, format!("failed to parse JSON: {}", e))
        })
    }
}
