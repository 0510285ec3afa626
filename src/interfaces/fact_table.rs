//! Fact table persistence interface.

use async_trait::async_trait;

use crate::model::{BusinessKey, CombinedDailyMetric};

/// Fact table name, as exposed to the downstream query layer.
pub const FACT_TABLE_NAME: &str = "fct_daily_store_metrics";

/// Result type for fact table operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors from fact table operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Write conflict: exclusive access to fact table unavailable: {0}")]
    WriteConflict(String),

    #[error("Duplicate key in merge batch: {key}")]
    DuplicateKey { key: BusinessKey },

    #[error("Invalid key in stored row: store_id={store_id:?}, dt={dt:?}")]
    InvalidKey { store_id: String, dt: String },

    #[error("Invalid measure {column} for {key}: {value}")]
    InvalidMeasure {
        key: BusinessKey,
        column: &'static str,
        value: i64,
    },

    #[cfg(any(feature = "sqlite", feature = "postgres"))]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported storage backend: {0}")]
    Unsupported(String),
}

/// Counts of rows written by one merge batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Keys that did not exist before the batch.
    pub inserted: usize,
    /// Keys whose existing row was replaced.
    pub replaced: usize,
}

/// Interface for the persisted daily store metrics fact.
///
/// Implementations:
/// - `MemoryFactTable`: in-process map, for tests and dry runs
/// - `SqlFactTable`: SQLite or PostgreSQL via sea-query
///
/// At most one writer may run against a table at a time. The caller is
/// responsible for serializing runs; implementations only guarantee that a
/// single batch is applied atomically and report `WriteConflict` when they
/// cannot obtain exclusive access.
#[async_trait]
pub trait FactTable: Send + Sync {
    /// Upsert a batch of rows as one unit.
    ///
    /// Each row fully replaces any stored row with the same business key;
    /// keys absent from the batch are left untouched. Callers must not pass
    /// a batch containing the same key twice.
    async fn upsert_batch(&self, rows: &[CombinedDailyMetric]) -> Result<MergeOutcome>;

    /// Get the committed row for a key.
    async fn get(&self, key: &BusinessKey) -> Result<Option<CombinedDailyMetric>>;

    /// All committed rows ordered by (store_id, dt).
    async fn scan(&self) -> Result<Vec<CombinedDailyMetric>>;
}
