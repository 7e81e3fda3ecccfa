//! Cache entries and their derived-artifact slot.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// A derived value tagged with the kind of derivation that produced it.
#[derive(Debug, Clone)]
struct Derived {
    kind: String,
    value: Bytes,
}

/// One fetched response held by the [`WebCache`](super::WebCache).
///
/// The raw content never changes after creation. The only mutable part is a
/// single tagged slot for a value derived from the content (a transcoded
/// image, a pre-encoded payload). A refetch produces a brand-new entry, so
/// derived data never outlives the content it was computed from.
#[derive(Debug)]
pub struct CacheEntry {
    created_at: Instant,
    expires_at: Instant,
    fetched_at: DateTime<Utc>,
    content: Bytes,
    extra: Mutex<Option<Derived>>,
}

impl CacheEntry {
    /// Create an entry for freshly fetched content that stays valid for `ttl`.
    pub fn new(content: Bytes, ttl: Duration) -> Self {
        let created_at = Instant::now();
        Self { created_at, expires_at: created_at + ttl, fetched_at: Utc::now(), content, extra: Mutex::new(None) }
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// Wall-clock time of the fetch, for display.
    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// Raw content as retrieved from the URL.
    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    /// Time since the entry was fetched.
    pub fn age(&self) -> Duration {
        Instant::now().saturating_duration_since(self.created_at)
    }

    /// Returns the derived value if one of the given kind is attached.
    pub fn extra(&self, kind: &str) -> Option<Bytes> {
        let slot = self.extra.lock().unwrap_or_else(PoisonError::into_inner);
        slot.as_ref().filter(|d| d.kind == kind).map(|d| d.value.clone())
    }

    /// Attach a derived value, replacing whatever was in the slot.
    pub fn set_extra(&self, kind: impl Into<String>, value: Bytes) {
        let mut slot = self.extra.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Derived { kind: kind.into(), value });
    }

    pub fn clear_extra(&self) {
        self.extra.lock().unwrap_or_else(PoisonError::into_inner).take();
    }

    pub fn has_extra(&self) -> bool {
        self.extra.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Human-readable freshness, e.g. "Refreshed 3 minutes ago".
    pub fn last_refreshed(&self) -> String {
        refreshed_label(self.age())
    }
}

/// Formats an elapsed time as whole minutes since the last refresh.
pub fn refreshed_label(elapsed: Duration) -> String {
    match elapsed.as_secs() / 60 {
        0 => "Just refreshed".to_string(),
        1 => "Refreshed 1 minute ago".to_string(),
        n => format!("Refreshed {n} minutes ago"),
    }
}
