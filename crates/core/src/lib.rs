//! Core types and shared functionality for hamclub.
//!
//! This crate provides:
//! - Expiring in-memory web cache with derived-artifact memoization
//! - Guild-scoped persistent key/value store with SQLite backend
//! - Club info record model
//! - Unified error types
//! - Configuration structures

pub mod club;
pub mod config;
pub mod error;
pub mod store;
pub mod webcache;

pub use club::{Card, CardField, ClubRecord, RecordKind};
pub use config::AppConfig;
pub use error::Error;
pub use store::{GuildDb, PersistentGuildStore};
pub use webcache::{CacheEntry, Fetcher, WebCache};
