//! `PRAGMA user_version` ladder for the stay store.
//!
//! Files written before versioning was introduced report version 0 but
//! already hold the v1 tables. v1 only uses `IF NOT EXISTS`, so it is a
//! no-op on them and the ladder continues at v2.

use super::schema;
use rusqlite::{Connection, types::Type};

struct Step {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const STEPS: &[Step] = &[
    Step {
        version: 1,
        name: "stay and schedule tables",
        sql: schema::MIGRATION_V1_SQL,
    },
    Step {
        version: 2,
        name: "origin, override flag, schedule index",
        sql: schema::MIGRATION_V2_SQL,
    },
];

/// Version a freshly migrated store ends up at.
pub const SCHEMA_VERSION: u32 = 2;

/// # Errors
///
/// Fails if the pragma cannot be read or holds a negative value.
pub fn schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    let raw: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    u32::try_from(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Integer, Box::new(e)))
}

/// Run every step above the stored version, each in its own transaction,
/// and return the version reached.
///
/// # Errors
///
/// Fails on the first step that does not apply; earlier steps stay
/// committed.
pub fn migrate(conn: &mut Connection) -> rusqlite::Result<u32> {
    let start = schema_version(conn)?;
    let mut reached = start;
    for step in STEPS.iter().filter(|s| s.version > start) {
        let tx = conn.transaction()?;
        tx.execute_batch(step.sql)?;
        tx.pragma_update(None, "user_version", i64::from(step.version))?;
        tx.commit()?;
        tracing::debug!(version = step.version, step = step.name, "store migrated");
        reached = step.version;
    }
    Ok(reached)
}
