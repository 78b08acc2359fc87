use chrono::{DateTime, Utc};
use rusqlite::{Connection, OpenFlags};

use crate::error::StoreError;

pub const RESULTS_TABLE_DDL: &str = "\
CREATE TABLE IF NOT EXISTS calculation_results (
    request_id  TEXT PRIMARY KEY NOT NULL,
    building_type TEXT NOT NULL,
    result_json TEXT NOT NULL,
    stored_at   TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_calculation_results_stored_at
    ON calculation_results (stored_at);
";

/// One persisted calculation, with the result kept as opaque JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub request_id: String,
    pub building_type: String,
    pub result_json: String,
    pub stored_at: DateTime<Utc>,
}

/// SQLite-backed result table.
///
/// `rusqlite::Connection` is not `Sync`; share it behind a `Mutex`.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path` and ensure the schema.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.execute_batch(RESULTS_TABLE_DDL)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(RESULTS_TABLE_DDL)?;
        Ok(Self { conn })
    }

    pub fn get(&self, request_id: &str) -> Result<Option<ResultRow>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT request_id, building_type, result_json, stored_at \
             FROM calculation_results WHERE request_id = ?1",
        )?;

        let result = stmt.query_row(rusqlite::params![request_id], |row| {
            Ok(ResultRow {
                request_id: row.get(0)?,
                building_type: row.get(1)?,
                result_json: row.get(2)?,
                stored_at: row.get(3)?,
            })
        });

        match result {
            Ok(row) => Ok(Some(row)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Sqlite(e)),
        }
    }

    /// Most recently stored rows first.
    pub fn recent(&self, limit: usize) -> Result<Vec<ResultRow>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare_cached(
            "SELECT request_id, building_type, result_json, stored_at \
             FROM calculation_results ORDER BY stored_at DESC, request_id LIMIT ?1",
        )?;

        let rows = stmt
            .query_map(rusqlite::params![limit], |row| {
                Ok(ResultRow {
                    request_id: row.get(0)?,
                    building_type: row.get(1)?,
                    result_json: row.get(2)?,
                    stored_at: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Insert or replace the row for `row.request_id`.
    pub fn insert(&self, row: &ResultRow) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO calculation_results \
             (request_id, building_type, result_json, stored_at) \
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![row.request_id, row.building_type, row.result_json, row.stored_at],
        )?;
        Ok(())
    }

    /// Returns whether a row was removed.
    pub fn delete(&self, request_id: &str) -> Result<bool, StoreError> {
        let removed = self.conn.execute(
            "DELETE FROM calculation_results WHERE request_id = ?1",
            rusqlite::params![request_id],
        )?;
        Ok(removed > 0)
    }

    pub fn count(&self) -> Result<u64, StoreError> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM calculation_results", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}
