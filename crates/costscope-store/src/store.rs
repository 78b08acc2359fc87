use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use costscope_models::config::StoreConfig;
use costscope_models::result::CalculationResult;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::memory::MemoryCache;
use crate::sqlite::{ResultRow, SqliteStore};

/// A calculation result as persisted under its request id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredResult {
    pub request_id: String,
    pub stored_at: DateTime<Utc>,
    pub result: CalculationResult,
}

impl StoredResult {
    pub fn new(request_id: impl Into<String>, result: CalculationResult) -> Self {
        Self {
            request_id: request_id.into(),
            stored_at: Utc::now(),
            result,
        }
    }

    fn to_row(&self) -> Result<ResultRow, StoreError> {
        Ok(ResultRow {
            request_id: self.request_id.clone(),
            building_type: self.result.project_info.building_type.clone(),
            result_json: serde_json::to_string(&self.result)?,
            stored_at: self.stored_at,
        })
    }

    fn from_row(row: ResultRow) -> Result<Self, StoreError> {
        Ok(Self {
            result: serde_json::from_str(&row.result_json)?,
            request_id: row.request_id,
            stored_at: row.stored_at,
        })
    }
}

/// Persistence for calculation results. The engine never calls this; the
/// facade stores results after a successful calculation.
pub trait ResultStore: Send + Sync {
    fn put(&self, record: &StoredResult) -> Result<(), StoreError>;

    fn get(&self, request_id: &str) -> Result<Option<StoredResult>, StoreError>;

    /// Most recently stored first.
    fn recent(&self, limit: usize) -> Result<Vec<StoredResult>, StoreError>;
}

/// Write-through, read-through store: moka (hot) in front of SQLite.
///
/// Writes go to SQLite first and then refresh the hot entry. Reads check
/// moka, then SQLite, promoting SQLite hits.
pub struct CachedStore {
    memory: MemoryCache,
    sqlite: Mutex<SqliteStore>,
}

impl CachedStore {
    pub fn new(sqlite: SqliteStore, max_capacity: u64) -> Self {
        Self {
            memory: MemoryCache::new(max_capacity),
            sqlite: Mutex::new(sqlite),
        }
    }

    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let sqlite = SqliteStore::open(&config.sqlite_path)?;
        info!(
            path = %config.sqlite_path,
            memory_max_capacity = config.memory_max_capacity,
            "Result store opened"
        );
        Ok(Self::new(sqlite, config.memory_max_capacity))
    }

    fn sqlite(&self) -> Result<MutexGuard<'_, SqliteStore>, StoreError> {
        self.sqlite
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("SQLite mutex poisoned: {e}")))
    }

    /// Remove a result from both tiers. Returns whether SQLite held it.
    pub fn remove(&self, request_id: &str) -> Result<bool, StoreError> {
        let removed = self.sqlite()?.delete(request_id)?;
        self.memory.invalidate(request_id);
        Ok(removed)
    }

    pub fn len(&self) -> Result<u64, StoreError> {
        self.sqlite()?.count()
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Number of entries in the hot moka cache.
    pub fn hot_cache_size(&self) -> u64 {
        self.memory.entry_count()
    }
}

impl ResultStore for CachedStore {
    fn put(&self, record: &StoredResult) -> Result<(), StoreError> {
        self.sqlite()?.insert(&record.to_row()?)?;
        self.memory
            .insert(record.request_id.clone(), serde_json::to_string(record)?);
        debug!(request_id = %record.request_id, "Result stored");
        Ok(())
    }

    fn get(&self, request_id: &str) -> Result<Option<StoredResult>, StoreError> {
        if let Some(json) = self.memory.get(request_id) {
            debug!(request_id, "Hot cache hit");
            return Ok(Some(serde_json::from_str(&json)?));
        }

        let row = self.sqlite()?.get(request_id)?;
        let Some(row) = row else {
            return Ok(None);
        };

        let record = StoredResult::from_row(row)?;
        self.memory
            .insert(request_id.to_string(), serde_json::to_string(&record)?);
        debug!(request_id, "Promoted result from SQLite");
        Ok(Some(record))
    }

    fn recent(&self, limit: usize) -> Result<Vec<StoredResult>, StoreError> {
        let rows = self.sqlite()?.recent(limit)?;
        rows.into_iter().map(StoredResult::from_row).collect()
    }
}
