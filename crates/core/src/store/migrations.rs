//! Database schema migrations.
//!
//! The applied schema version lives in SQLite's `PRAGMA user_version`:
//! 0 means the file has never been initialized. Each migration is a SQL
//! batch that moves the schema forward by one version.

use super::Error;
use tokio_rusqlite::Connection;

/// Migration list: (version, SQL).
///
/// Migrations must be applied in order. All migrations are idempotent
/// using CREATE IF NOT EXISTS.
const MIGRATIONS: &[(i64, &str)] = &[(1, include_str!("../../migrations/001_storage.sql"))];

/// Schema version this build expects.
pub const CURRENT_VERSION: i64 = 1;

/// Run any pending migrations.
///
/// Reads `user_version`, applies every migration above it inside a single
/// transaction and records the new version. Re-running on an initialized
/// database is a cheap no-op.
///
/// # Errors
///
/// Returns an error if a migration SQL fails to execute or if the database
/// was written by a newer schema than this build knows.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        let current: i64 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .map_err(Error::from)?;

        if current > CURRENT_VERSION {
            return Err(Error::MigrationFailed(format!(
                "database schema version {current} is newer than supported version {CURRENT_VERSION}"
            )));
        }

        if current == CURRENT_VERSION {
            return Ok(());
        }

        tracing::info!(from = current, to = CURRENT_VERSION, "initializing guild storage schema");

        let tx = conn.transaction()?;
        for (version, sql) in MIGRATIONS {
            if *version > current {
                tx.execute_batch(sql)
                    .map_err(|e| Error::MigrationFailed(format!("version {version}: {e}")))?;
                tx.pragma_update(None, "user_version", version)?;
            }
        }
        tx.commit()?;

        tracing::info!(version = CURRENT_VERSION, "guild storage schema ready");
        Ok(())
    })
    .await
    .map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn user_version(conn: &Connection) -> i64 {
        conn.call(|conn| conn.query_row("PRAGMA user_version", [], |row| row.get(0)))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_migrations_idempotent() {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn).await.unwrap();
        run(&conn).await.unwrap();

        let has_storage: bool = conn
            .call(|conn| {
                conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='storage')",
                    [],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();

        assert!(has_storage);
    }

    #[tokio::test]
    async fn test_migrations_version_tracking() {
        let conn = Connection::open_in_memory().await.unwrap();
        assert_eq!(user_version(&conn).await, 0);

        run(&conn).await.unwrap();
        assert_eq!(user_version(&conn).await, CURRENT_VERSION);
        assert_eq!(MIGRATIONS.last().map(|(v, _)| *v), Some(CURRENT_VERSION));
    }

    #[tokio::test]
    async fn test_newer_schema_rejected() {
        let conn = Connection::open_in_memory().await.unwrap();
        conn.call(|conn| conn.pragma_update(None, "user_version", CURRENT_VERSION + 1))
            .await
            .unwrap();

        let result = run(&conn).await;
        assert!(matches!(result, Err(Error::MigrationFailed(_))));
    }
}
