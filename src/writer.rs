//! Merge/upsert writer.
//!
//! The only component that mutates the fact table. Each candidate row
//! replaces the stored row for its key or is inserted; keys outside the
//! candidate batch are never touched. Replace semantics make re-applying a
//! batch a no-op, which is what makes an interrupted run safe to retry.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{error, info};

use crate::interfaces::{FactTable, MergeOutcome, Result, StorageError};
use crate::model::{BusinessKey, CombinedDailyMetric};

/// Applies candidate batches to a fact table.
///
/// Holds the table as an explicit handle. The single-writer-per-table
/// discipline is the caller's responsibility.
#[derive(Clone)]
pub struct MergeWriter {
    table: Arc<dyn FactTable>,
}

impl MergeWriter {
    pub fn new(table: Arc<dyn FactTable>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &Arc<dyn FactTable> {
        &self.table
    }

    /// Upsert `batch` as one unit.
    ///
    /// The batch is checked for repeated keys before anything is written.
    pub async fn apply(&self, batch: &[CombinedDailyMetric]) -> Result<MergeOutcome> {
        check_unique(batch)?;

        if batch.is_empty() {
            info!("Empty merge batch, fact table untouched");
            return Ok(MergeOutcome::default());
        }

        match self.table.upsert_batch(batch).await {
            Ok(outcome) => {
                info!(
                    rows = batch.len(),
                    inserted = outcome.inserted,
                    replaced = outcome.replaced,
                    "Merge batch committed"
                );
                Ok(outcome)
            }
            Err(e) => {
                error!(error = %e, rows = batch.len(), "Merge batch failed");
                Err(e)
            }
        }
    }
}

fn check_unique(batch: &[CombinedDailyMetric]) -> Result<()> {
    let mut seen: HashSet<BusinessKey> = HashSet::with_capacity(batch.len());
    for row in batch {
        let key = row.key();
        if seen.contains(&key) {
            return Err(StorageError::DuplicateKey { key });
        }
        seen.insert(key);
    }
    Ok(())
}
