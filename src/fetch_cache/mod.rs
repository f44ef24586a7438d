//! HTTP fetching with an on-disk response cache and bounded retry.
//!
//! One `Fetcher` is shared by every network-facing tool. Requests are
//! strictly sequential; the politeness pause between them is the only
//! intentional scheduling delay in the system.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use xxhash_rust::xxh3::xxh3_64;

use crate::config::SiteProfile;
use crate::error::MigrateError;

/// Request timeout for every outbound call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Stable cache key for a URL.
#[must_use]
pub fn cache_key(url: &str) -> String {
    hex::encode(xxh3_64(url.as_bytes()).to_be_bytes())
}

/// Sequential HTTP client with page caching and per-item retry.
pub struct Fetcher {
    client: reqwest::Client,
    cache_dir: PathBuf,
    delay: Duration,
    max_retries: u32,
    force: bool,
}

impl Fetcher {
    pub fn new(profile: &SiteProfile) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(profile.user_agent())
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            cache_dir: profile.cache_dir().to_path_buf(),
            delay: profile.delay(),
            max_retries: profile.max_retries().max(1),
            force: profile.force(),
        })
    }

    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Cache file for a page URL.
    #[must_use]
    pub fn cache_path(&self, url: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.html", cache_key(url)))
    }

    /// Block the (single) caller for the politeness delay.
    pub async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }

    /// Fetch a page's HTML, serving from the on-disk cache when present.
    ///
    /// A cache hit never touches the network. On a miss the response is
    /// written to the cache before being returned, so later tools can scan
    /// the raw documents offline.
    pub async fn fetch_page(&self, url: &str) -> Result<String> {
        let cache_file = self.cache_path(url);
        if !self.force && cache_file.exists() {
            log::debug!("cache hit: {url}");
            return tokio::fs::read_to_string(&cache_file)
                .await
                .with_context(|| format!("failed to read cache file {}", cache_file.display()));
        }

        log::info!("fetching {url}");
        let body = self.get_text(url).await?;

        tokio::fs::create_dir_all(&self.cache_dir)
            .await
            .with_context(|| format!("failed to create {}", self.cache_dir.display()))?;
        tokio::fs::write(&cache_file, &body)
            .await
            .with_context(|| format!("failed to write cache file {}", cache_file.display()))?;

        Ok(body)
    }

    /// Download raw bytes with bounded retry and exponential backoff.
    ///
    /// After the configured number of attempts the item is reported as
    /// failed; callers record the failure and continue with the batch.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let mut last_reason = String::new();
        for attempt in 0..self.max_retries {
            match self.get_bytes(url).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) => {
                    last_reason = e.to_string();
                    log::warn!(
                        "attempt {}/{} failed for {url}: {last_reason}",
                        attempt + 1,
                        self.max_retries
                    );
                    if attempt + 1 < self.max_retries {
                        tokio::time::sleep(Duration::from_secs(1u64 << attempt.min(6))).await;
                    }
                }
            }
        }

        Err(MigrateError::Fetch {
            url: url.to_string(),
            reason: last_reason,
        }
        .into())
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| MigrateError::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        response.text().await.map_err(|e| {
            MigrateError::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| MigrateError::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        let bytes = response.bytes().await.map_err(|e| MigrateError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_is_stable() {
        let a = cache_key("https://example.com/page");
        let b = cache_key("https://example.com/page");
        assert_eq!(a, b);
        assert_ne!(a, cache_key("https://example.com/other"));
    }

    #[test]
    fn test_cache_path_uses_html_extension() {
        let profile = SiteProfile::builder()
            .cache_dir("/tmp/cache")
            .base_url("https://example.com")
            .build()
            .unwrap();
        let fetcher = Fetcher::new(&profile).unwrap();
        let path = fetcher.cache_path("https://example.com/page");
        assert!(path.to_string_lossy().ends_with(".html"));
        assert!(path.starts_with("/tmp/cache"));
    }
}
