//! Guild-scoped key/value operations.
//!
//! Every operation is a single statement against the shared `storage`
//! table, filtered by the store's guild id.

use std::path::Path;

use super::connection::GuildDb;
use crate::Error;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::OptionalExtension;

/// Key/value storage for a single guild.
///
/// Many stores may share one [`GuildDb`]; keys written through one guild's
/// store are never visible through another's.
#[derive(Clone, Debug)]
pub struct PersistentGuildStore {
    db: GuildDb,
    guild_id: i64,
}

impl PersistentGuildStore {
    pub(crate) fn new(db: GuildDb, guild_id: i64) -> Self {
        Self { db, guild_id }
    }

    /// Open the database at `path` and scope it to `guild_id`.
    pub async fn open(guild_id: i64, path: impl AsRef<Path>) -> Result<Self, Error> {
        Ok(GuildDb::open(path).await?.guild(guild_id))
    }

    pub fn guild_id(&self) -> i64 {
        self.guild_id
    }

    pub(crate) fn db(&self) -> &GuildDb {
        &self.db
    }

    /// Get the value stored for `key`.
    ///
    /// Returns None if the key doesn't exist for this guild.
    pub async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let guild_id = self.guild_id;
        let key = key.to_string();
        self.db
            .conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let value = conn
                    .query_row(
                        "SELECT value FROM storage WHERE guild_id = ?1 AND key = ?2",
                        params![guild_id, key],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(value)
            })
            .await
            .map_err(Error::from)
    }

    /// Get the value stored for `key`, or `default` if there is none.
    pub async fn get_or(&self, key: &str, default: &str) -> Result<String, Error> {
        Ok(self.get(key).await?.unwrap_or_else(|| default.to_string()))
    }

    /// Store `value` under `key`.
    ///
    /// Uses UPSERT semantics: inserts if the key doesn't exist,
    /// replaces the value if it does.
    pub async fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        let guild_id = self.guild_id;
        let key = key.to_string();
        let value = value.to_string();
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO storage (guild_id, key, value) VALUES (?1, ?2, ?3)
                    ON CONFLICT(guild_id, key) DO UPDATE SET value = excluded.value",
                    params![guild_id, key, value],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Delete `key` from this guild's storage.
    ///
    /// Returns whether a value was removed; deleting a missing key is a no-op.
    pub async fn delete(&self, key: &str) -> Result<bool, Error> {
        let guild_id = self.guild_id;
        let key = key.to_string();
        self.db
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute(
                    "DELETE FROM storage WHERE guild_id = ?1 AND key = ?2",
                    params![guild_id, key],
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// List keys starting with `prefix` (all keys when `None` or empty), sorted ascending.
    ///
    /// Matching is a plain case-sensitive prefix test; `%` and `_` have no
    /// special meaning.
    pub async fn list_keys(&self, prefix: Option<&str>) -> Result<Vec<String>, Error> {
        let guild_id = self.guild_id;
        let prefix = prefix.unwrap_or_default().to_string();
        self.db
            .conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT key FROM storage
                    WHERE guild_id = ?1 AND substr(key, 1, length(?2)) = ?2
                    ORDER BY key ASC",
                )?;
                let keys = stmt
                    .query_map(params![guild_id, prefix], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of keys stored for this guild.
    pub async fn count(&self) -> Result<usize, Error> {
        let guild_id = self.guild_id;
        self.db
            .conn
            .call(move |conn| -> Result<usize, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM storage WHERE guild_id = ?1", params![guild_id], |row| {
                        row.get(0)
                    })?;
                Ok(count as usize)
            })
            .await
            .map_err(Error::from)
    }
}
