//! SQLite stay store.
//!
//! Connections run in WAL mode with `synchronous = NORMAL` and wait up to
//! [`BUSY_TIMEOUT`] for a lock held by a backup or another process.

pub mod migrations;
pub mod schema;
pub mod store;

use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

pub use store::{BatchReport, DeleteReport, ItemFailure, Store};

pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open the store file (creating its directory), configure the connection
/// and bring the schema up to date.
///
/// # Errors
///
/// Returns an error if the directory, the file, a pragma or a migration
/// fails.
pub fn open_store(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .map_err(|e| Error::io(format!("create store directory {}", dir.display()), e))?;
    }

    let mut conn = Connection::open(path)?;
    configure_connection(&conn)?;
    let version = migrations::migrate(&mut conn)?;
    tracing::debug!(path = %path.display(), version, "store opened");
    Ok(conn)
}

pub(crate) fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    // journal_mode answers with a row, so it cannot go through pragma_update
    let mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    if !mode.eq_ignore_ascii_case("wal") {
        tracing::debug!(mode = %mode, "store is not in WAL mode");
    }
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.busy_timeout(BUSY_TIMEOUT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opened_store_is_wal_with_busy_timeout() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("data").join("hotel_cleaning.db");
        let conn = open_store(&path).expect("open");
        assert!(path.is_file());

        let mode: String = conn
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .expect("journal_mode");
        assert!(mode.eq_ignore_ascii_case("wal"));

        let timeout_ms: i64 = conn
            .pragma_query_value(None, "busy_timeout", |row| row.get(0))
            .expect("busy_timeout");
        assert_eq!(timeout_ms, 5_000);

        assert_eq!(
            migrations::schema_version(&conn).expect("version"),
            migrations::SCHEMA_VERSION
        );
    }
}
