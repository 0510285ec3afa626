//! In-memory FactTable implementation.
//!
//! Used for tests and dry runs. Nothing is persisted across processes.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::interfaces::{FactTable, MergeOutcome, Result, StorageError};
use crate::model::{BusinessKey, CombinedDailyMetric};

#[cfg(test)]
mod tests;

/// Fact table held in a map ordered by business key.
///
/// A batch is applied under a single write guard, so readers observe either
/// the state before the batch or after it. If the guard cannot be taken
/// immediately the batch fails with `WriteConflict` instead of waiting.
#[derive(Default)]
pub struct MemoryFactTable {
    rows: RwLock<BTreeMap<BusinessKey, CombinedDailyMetric>>,
}

impl MemoryFactTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the table with existing rows.
    pub fn with_rows(rows: impl IntoIterator<Item = CombinedDailyMetric>) -> Self {
        let rows = rows.into_iter().map(|row| (row.key(), row)).collect();
        Self {
            rows: RwLock::new(rows),
        }
    }

    /// Take the write guard as a concurrent writer would.
    #[cfg(test)]
    pub(crate) async fn hold_write_lock(
        &self,
    ) -> tokio::sync::RwLockWriteGuard<'_, BTreeMap<BusinessKey, CombinedDailyMetric>> {
        self.rows.write().await
    }
}

#[async_trait]
impl FactTable for MemoryFactTable {
    async fn upsert_batch(&self, rows: &[CombinedDailyMetric]) -> Result<MergeOutcome> {
        let mut table = self.rows.try_write().map_err(|_| {
            StorageError::WriteConflict("memory fact table is held by another run".to_string())
        })?;

        let mut outcome = MergeOutcome::default();
        for row in rows {
            match table.insert(row.key(), row.clone()) {
                Some(_) => outcome.replaced += 1,
                None => outcome.inserted += 1,
            }
        }
        Ok(outcome)
    }

    async fn get(&self, key: &BusinessKey) -> Result<Option<CombinedDailyMetric>> {
        Ok(self.rows.read().await.get(key).cloned())
    }

    async fn scan(&self) -> Result<Vec<CombinedDailyMetric>> {
        Ok(self.rows.read().await.values().cloned().collect())
    }
}
