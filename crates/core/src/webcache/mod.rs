//! Expiring in-memory cache for web responses.
//!
//! Maps a URL to the last fetched content for that URL. Expiry is checked
//! lazily on read; there is no background sweep. Each entry carries one
//! tagged slot for a value derived from its content so that expensive
//! post-processing is done at most once per fetch.

pub mod entry;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use crate::{AppConfig, Error};

pub use entry::{CacheEntry, refreshed_label};

/// Default time-to-live for cache entries (15 minutes).
pub const DEFAULT_TTL: Duration = Duration::from_secs(900);

/// Retrieves the raw bytes behind a URL.
///
/// Implementations follow redirects and report transport failures and
/// non-success statuses as errors.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Bytes, Error>;
}

#[async_trait]
impl<F: Fetcher + ?Sized> Fetcher for Arc<F> {
    async fn fetch(&self, url: &str) -> Result<Bytes, Error> {
        (**self).fetch(url).await
    }
}

/// In-memory URL cache with a uniform TTL.
///
/// Uses a HashMap behind a tokio RwLock. The lock is never held while a
/// fetch is outstanding, so a slow endpoint does not stall lookups for
/// other URLs. Two concurrent refreshes of the same URL may both fetch;
/// the last one to finish wins the slot.
#[derive(Clone)]
pub struct WebCache {
    entries: Arc<RwLock<HashMap<String, Arc<CacheEntry>>>>,
    fetcher: Arc<dyn Fetcher>,
    ttl: Duration,
    fetch_timeout: Option<Duration>,
}

impl std::fmt::Debug for WebCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebCache")
            .field("ttl", &self.ttl)
            .field("fetch_timeout", &self.fetch_timeout)
            .finish_non_exhaustive()
    }
}

impl WebCache {
    /// Create a cache whose entries stay fresh for `ttl`.
    pub fn new(fetcher: impl Fetcher + 'static, ttl: Duration) -> Self {
        Self { entries: Arc::new(RwLock::new(HashMap::new())), fetcher: Arc::new(fetcher), ttl, fetch_timeout: None }
    }

    /// Create a cache using the TTL and fetch timeout from the application config.
    pub fn with_config(fetcher: impl Fetcher + 'static, config: &AppConfig) -> Self {
        Self::new(fetcher, config.cache_ttl()).with_fetch_timeout(config.timeout())
    }

    /// Bound how long a single fetch may stay outstanding.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cache entry for the given URL.
    ///
    /// A fresh entry is returned as is. A missing or expired entry is
    /// fetched and replaces whatever was stored. Fetch failures are not
    /// cached; an expired entry whose refresh failed is dropped, and the
    /// next call fetches again.
    pub async fn get(&self, url: &str) -> Result<Arc<CacheEntry>, Error> {
        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(url)
                && !entry.is_expired()
            {
                tracing::debug!(url, "returning cached content");
                return Ok(Arc::clone(entry));
            }
        }

        tracing::debug!(url, "retrieving content");
        let content = match self.fetch(url).await {
            Ok(content) => content,
            Err(err) => {
                self.remove_expired(url).await;
                return Err(err);
            }
        };
        let entry = Arc::new(CacheEntry::new(content, self.ttl));

        let mut entries = self.entries.write().await;
        entries.insert(url.to_string(), Arc::clone(&entry));

        Ok(entry)
    }

    /// Returns the derived value of `kind` for the fresh entry at `url`.
    ///
    /// If the entry has no such value yet, `derive` runs on its content and
    /// the result is attached to that same entry.
    pub async fn get_or_derive<F>(&self, url: &str, kind: &str, derive: F) -> Result<(Arc<CacheEntry>, Bytes), Error>
    where
        F: FnOnce(&Bytes) -> Result<Bytes, Error>,
    {
        let entry = self.get(url).await?;

        if let Some(value) = entry.extra(kind) {
            tracing::debug!(url, kind, "using cached derived value");
            return Ok((entry, value));
        }

        tracing::debug!(url, kind, "deriving value from content");
        let value = derive(entry.content())?;
        entry.set_extra(kind, value.clone());

        Ok((entry, value))
    }

    /// Attach (or with `None`, remove) derived data on the current entry for `url`.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotCached` if nothing has been fetched for `url`.
    pub async fn set_extra(&self, url: &str, kind: &str, value: Option<Bytes>) -> Result<(), Error> {
        let entries = self.entries.read().await;
        let entry = entries.get(url).ok_or_else(|| Error::NotCached(url.to_string()))?;

        match value {
            Some(value) => entry.set_extra(kind, value),
            None => entry.clear_extra(),
        }

        Ok(())
    }

    /// Clears the cache entry for the given URL. The next `get` fetches it again.
    pub async fn clear(&self, url: &str) {
        if self.entries.write().await.remove(url).is_some() {
            tracing::debug!(url, "cleared cache entry");
        }
    }

    /// Drop every expired entry.
    ///
    /// Returns the number of removed entries. Never called automatically.
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        before - entries.len()
    }

    /// Number of entries currently held, including expired ones.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Remove the entry for `url` only if it is expired; a fresh entry stored
    /// by a concurrent refresh stays.
    async fn remove_expired(&self, url: &str) {
        let mut entries = self.entries.write().await;
        if entries.get(url).is_some_and(|entry| entry.is_expired()) {
            entries.remove(url);
            tracing::debug!(url, "dropped expired entry after failed refresh");
        }
    }

    async fn fetch(&self, url: &str) -> Result<Bytes, Error> {
        match self.fetch_timeout {
            Some(limit) => tokio::time::timeout(limit, self.fetcher.fetch(url))
                .await
                .map_err(|_| Error::FetchTimeout(format!("{url} did not respond within {}ms", limit.as_millis())))?,
            None => self.fetcher.fetch(url).await,
        }
    }
}
