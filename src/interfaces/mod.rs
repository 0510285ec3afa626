//! Abstract interfaces for pipeline components.
//!
//! These traits define the contracts for:
//! - Fact table persistence (upsert by business key)

pub mod fact_table;

pub use fact_table::{FactTable, MergeOutcome, Result, StorageError, FACT_TABLE_NAME};
