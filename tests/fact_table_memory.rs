//! In-memory fact table integration tests.
//!
//! Run with: cargo test --test fact_table_memory

mod fact_table;

use std::sync::Arc;

use daily_store_metrics::interfaces::{FactTable, StorageError};
use daily_store_metrics::storage::MemoryFactTable;

#[tokio::test]
async fn test_memory_fact_table() {
    println!("=== Memory FactTable Tests ===");

    let table = Arc::new(MemoryFactTable::new());
    run_fact_table_tests!(table);

    println!("=== All Memory FactTable tests PASSED ===");
}

#[tokio::test]
async fn test_concurrent_batches_never_interleave() {
    let table = Arc::new(MemoryFactTable::new());
    let batch = |revenue: f64| -> Vec<_> {
        (1..=20)
            .map(|day| fact_table::fact_table_tests::make_metric("concurrent", day, revenue))
            .collect()
    };

    let (first_batch, second_batch) = (batch(1.0), batch(2.0));

    let (a, b) = tokio::join!(
        table.upsert_batch(&first_batch),
        table.upsert_batch(&second_batch)
    );

    // A losing writer fails as a whole; the table holds exactly one batch.
    for result in [&a, &b] {
        if let Err(e) = result {
            assert!(matches!(e, StorageError::WriteConflict(_)));
        }
    }
    assert!(a.is_ok() || b.is_ok());

    let rows = table.scan().await.unwrap();
    assert_eq!(rows.len(), 20);
    let first = rows[0].revenue;
    assert!(rows.iter().all(|row| row.revenue == first));
}
