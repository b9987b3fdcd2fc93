//! Durable record of which migration scripts have been applied.
//!
//! The ledger lives in the target database as the `migrations` table. A name
//! is inserted in the same transaction that executed its script, so the two
//! can never disagree after a crash.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use serde::Serialize;

use crate::database::column_timestamp;
use crate::migrations::MigrationError;

pub const LEDGER_TABLE: &str = "migrations";

/// One applied script.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationRecord {
    pub id: i64,
    pub name: String,
    pub applied_at: DateTime<Utc>,
}

/// Create the ledger table if it is absent. Safe on every startup.
pub fn ensure_ledger_exists(conn: &Connection) -> Result<(), MigrationError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS migrations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        );",
    )
    .map_err(MigrationError::LedgerBootstrapFailed)
}

/// Names of all applied scripts, in the order they were applied.
pub fn list_applied_names(conn: &Connection) -> Result<Vec<String>, MigrationError> {
    let mut stmt = conn
        .prepare("SELECT name FROM migrations ORDER BY id")
        .map_err(MigrationError::LedgerReadFailed)?;

    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(MigrationError::LedgerReadFailed)?;

    rows.collect::<Result<Vec<_>, _>>()
        .map_err(MigrationError::LedgerReadFailed)
}

/// Full ledger contents, oldest first.
pub fn list_records(conn: &Connection) -> Result<Vec<MigrationRecord>, MigrationError> {
    let mut stmt = conn
        .prepare("SELECT id, name, applied_at FROM migrations ORDER BY id")
        .map_err(MigrationError::LedgerReadFailed)?;

    let rows = stmt
        .query_map([], |row| {
            Ok(MigrationRecord {
                id: row.get(0)?,
                name: row.get(1)?,
                applied_at: column_timestamp(row, 2)?,
            })
        })
        .map_err(MigrationError::LedgerReadFailed)?;

    rows.collect::<Result<Vec<_>, _>>()
        .map_err(MigrationError::LedgerReadFailed)
}

/// Append `name` to the ledger.
///
/// Pass the open [`rusqlite::Transaction`] that executed the script; it
/// derefs to a `Connection`.
pub fn record_applied(conn: &Connection, name: &str) -> Result<(), MigrationError> {
    conn.execute("INSERT INTO migrations (name) VALUES (?1)", params![name])
        .map(|_| ())
        .map_err(|source| MigrationError::LedgerWriteFailed {
            name: name.to_string(),
            source,
        })
}

/// Whether the ledger table has been created in this database.
pub fn ledger_exists(conn: &Connection) -> Result<bool, MigrationError> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = ?1",
        params![LEDGER_TABLE],
        |row| row.get(0),
    )
    .map_err(MigrationError::LedgerReadFailed)
}

/// Count of applied scripts, used by the status endpoint.
pub fn applied_count(conn: &Connection) -> Result<usize, MigrationError> {
    if !ledger_exists(conn)? {
        return Ok(0);
    }
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM migrations", [], |row| row.get(0))
        .map_err(MigrationError::LedgerReadFailed)?;
    Ok(count as usize)
}
