//! SQLite-backed, guild-scoped key/value store.
//!
//! This module provides durable storage for admin-curated content using
//! SQLite with async access via tokio-rusqlite. It supports:
//!
//! - One shared table partitioned by guild id
//! - Schema initialization tracked by `PRAGMA user_version`
//! - WAL mode for concurrent access
//! - Prefix key listing for autocomplete

pub mod connection;
pub mod guild;
pub mod migrations;

pub use crate::Error;

pub use connection::GuildDb;
pub use guild::PersistentGuildStore;
