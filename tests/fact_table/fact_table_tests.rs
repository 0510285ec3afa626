//! FactTable interface tests.
//!
//! These tests verify the contract of the FactTable trait.
//! Each storage implementation should run these tests. Every test writes
//! under its own store ids so they can share one table.

use std::sync::Arc;

use chrono::NaiveDate;

use daily_store_metrics::config::RunConfig;
use daily_store_metrics::interfaces::{FactTable, MergeOutcome};
use daily_store_metrics::model::{BusinessKey, CombinedDailyMetric, StoreId};
use daily_store_metrics::writer::MergeWriter;

pub fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).expect("valid test date")
}

pub fn key(store: &str, day: u32) -> BusinessKey {
    BusinessKey::new(StoreId::parse(store).expect("valid store id"), date(day))
}

/// Create a metric row with distinguishable measures.
pub fn make_metric(store: &str, day: u32, revenue: f64) -> CombinedDailyMetric {
    CombinedDailyMetric {
        revenue,
        order_count: 2,
        converted_leads: 1,
        sessions: 5,
        ..CombinedDailyMetric::zeroed(key(store, day))
    }
}

fn rows_for(rows: Vec<CombinedDailyMetric>, prefix: &str) -> Vec<CombinedDailyMetric> {
    rows.into_iter()
        .filter(|row| row.store_id.as_str().starts_with(prefix))
        .collect()
}

// =============================================================================
// FactTable::get tests
// =============================================================================

pub async fn test_get_nonexistent<S: FactTable>(table: &S) {
    let row = table
        .get(&key("test_get_missing", 1))
        .await
        .expect("get should succeed");
    assert!(row.is_none(), "nonexistent row should be None");
}

pub async fn test_get_preserves_measures<S: FactTable>(table: &S) {
    let row = CombinedDailyMetric {
        revenue: 1234.56,
        order_count: 7,
        converted_leads: 3,
        sessions: 1_000_000,
        ..CombinedDailyMetric::zeroed(key("test_get_measures", 1))
    };

    table
        .upsert_batch(std::slice::from_ref(&row))
        .await
        .expect("upsert should succeed");

    let stored = table
        .get(&row.key())
        .await
        .expect("get should succeed")
        .expect("row should exist");
    assert_eq!(stored, row);
}

// =============================================================================
// FactTable::upsert_batch tests
// =============================================================================

pub async fn test_upsert_inserts_new_keys<S: FactTable>(table: &S) {
    let batch = vec![
        make_metric("test_insert", 1, 10.0),
        make_metric("test_insert", 2, 20.0),
        make_metric("test_insert_other", 1, 30.0),
    ];

    let outcome = table.upsert_batch(&batch).await.expect("upsert should succeed");

    assert_eq!(outcome, MergeOutcome { inserted: 3, replaced: 0 });
}

pub async fn test_upsert_replaces_whole_row<S: FactTable>(table: &S) {
    let old = CombinedDailyMetric {
        revenue: 50.0,
        order_count: 4,
        converted_leads: 2,
        sessions: 9,
        ..CombinedDailyMetric::zeroed(key("test_replace", 1))
    };
    table.upsert_batch(&[old.clone()]).await.expect("seed should succeed");

    let candidate = CombinedDailyMetric {
        revenue: 75.0,
        ..CombinedDailyMetric::zeroed(old.key())
    };
    let outcome = table
        .upsert_batch(std::slice::from_ref(&candidate))
        .await
        .expect("upsert should succeed");

    assert_eq!(outcome, MergeOutcome { inserted: 0, replaced: 1 });
    let stored = table.get(&old.key()).await.unwrap().expect("row should exist");
    assert_eq!(stored, candidate, "zero measures must overwrite stored values");
}

pub async fn test_upsert_leaves_other_keys<S: FactTable>(table: &S) {
    let untouched = make_metric("test_untouched", 1, 10.0);
    table
        .upsert_batch(&[untouched.clone(), make_metric("test_untouched", 2, 1.0)])
        .await
        .expect("seed should succeed");

    table
        .upsert_batch(&[make_metric("test_untouched", 2, 2.0)])
        .await
        .expect("upsert should succeed");

    assert_eq!(table.get(&untouched.key()).await.unwrap(), Some(untouched));
}

pub async fn test_upsert_twice_is_idempotent<S: FactTable>(table: &S) {
    let batch = vec![
        make_metric("test_idempotent", 1, 1.5),
        make_metric("test_idempotent", 2, 2.5),
    ];

    table.upsert_batch(&batch).await.expect("first upsert should succeed");
    let once = rows_for(table.scan().await.unwrap(), "test_idempotent");

    let outcome = table.upsert_batch(&batch).await.expect("second upsert should succeed");
    let twice = rows_for(table.scan().await.unwrap(), "test_idempotent");

    assert_eq!(once, twice);
    assert_eq!(outcome, MergeOutcome { inserted: 0, replaced: 2 });
}

pub async fn test_upsert_empty_batch<S: FactTable>(table: &S) {
    let before = table.scan().await.unwrap();
    let outcome = table.upsert_batch(&[]).await.expect("empty upsert should succeed");

    assert_eq!(outcome, MergeOutcome::default());
    assert_eq!(table.scan().await.unwrap(), before);
}

pub async fn test_upsert_large_batch<S: FactTable>(table: &S) {
    let batch: Vec<CombinedDailyMetric> = (0..1200)
        .map(|i| make_metric(&format!("test_large_{i:04}"), 1 + (i % 28) as u32, i as f64))
        .collect();

    let outcome = table.upsert_batch(&batch).await.expect("upsert should succeed");

    assert_eq!(outcome.inserted, 1200);
    assert_eq!(rows_for(table.scan().await.unwrap(), "test_large_").len(), 1200);
}

// =============================================================================
// FactTable::scan tests
// =============================================================================

pub async fn test_scan_ordered_by_key<S: FactTable>(table: &S) {
    table
        .upsert_batch(&[
            make_metric("test_scan_b", 1, 1.0),
            make_metric("test_scan_a", 3, 1.0),
            make_metric("test_scan_a", 1, 1.0),
        ])
        .await
        .expect("upsert should succeed");

    let keys: Vec<BusinessKey> = rows_for(table.scan().await.unwrap(), "test_scan_")
        .iter()
        .map(CombinedDailyMetric::key)
        .collect();

    assert_eq!(
        keys,
        vec![key("test_scan_a", 1), key("test_scan_a", 3), key("test_scan_b", 1)]
    );
}

// =============================================================================
// Writer over FactTable
// =============================================================================

pub async fn test_writer_rejects_duplicate_keys<S: FactTable + 'static>(table: Arc<S>) {
    let writer = MergeWriter::new(table.clone());

    let result = writer
        .apply(&[
            make_metric("test_dup", 1, 1.0),
            make_metric("test_dup", 1, 2.0),
        ])
        .await;

    assert!(result.is_err(), "duplicate keys must be rejected");
    assert!(table.get(&key("test_dup", 1)).await.unwrap().is_none());
}

pub async fn test_incremental_window_preserves_history<S: FactTable + 'static>(table: Arc<S>) {
    let history = make_metric("test_window", 1, 999.0);
    table
        .upsert_batch(std::slice::from_ref(&history))
        .await
        .expect("seed should succeed");

    let combined = vec![
        make_metric("test_window", 1, 1.0),
        make_metric("test_window", 9, 9.0),
    ];
    let selection = RunConfig::incremental(7)
        .with_as_of_date(date(10))
        .selector()
        .select(combined);
    assert_eq!(selection.cutoff, Some(date(3)));

    MergeWriter::new(table.clone())
        .apply(&selection.rows)
        .await
        .expect("apply should succeed");

    assert_eq!(table.get(&history.key()).await.unwrap(), Some(history));
    let recent = table.get(&key("test_window", 9)).await.unwrap();
    assert_eq!(recent.map(|row| row.revenue), Some(9.0));
}

// =============================================================================
// Test runner macro
// =============================================================================

/// Run all FactTable interface tests against a shared table.
#[macro_export]
macro_rules! run_fact_table_tests {
    ($table:expr) => {
        use $crate::fact_table::fact_table_tests::*;

        let table = $table;

        // get tests
        test_get_nonexistent(table.as_ref()).await;
        println!("  test_get_nonexistent: PASSED");

        test_get_preserves_measures(table.as_ref()).await;
        println!("  test_get_preserves_measures: PASSED");

        // upsert tests
        test_upsert_inserts_new_keys(table.as_ref()).await;
        println!("  test_upsert_inserts_new_keys: PASSED");

        test_upsert_replaces_whole_row(table.as_ref()).await;
        println!("  test_upsert_replaces_whole_row: PASSED");

        test_upsert_leaves_other_keys(table.as_ref()).await;
        println!("  test_upsert_leaves_other_keys: PASSED");

        test_upsert_twice_is_idempotent(table.as_ref()).await;
        println!("  test_upsert_twice_is_idempotent: PASSED");

        test_upsert_empty_batch(table.as_ref()).await;
        println!("  test_upsert_empty_batch: PASSED");

        test_upsert_large_batch(table.as_ref()).await;
        println!("  test_upsert_large_batch: PASSED");

        // scan tests
        test_scan_ordered_by_key(table.as_ref()).await;
        println!("  test_scan_ordered_by_key: PASSED");

        // writer tests
        test_writer_rejects_duplicate_keys(table.clone()).await;
        println!("  test_writer_rejects_duplicate_keys: PASSED");

        test_incremental_window_preserves_history(table.clone()).await;
        println!("  test_incremental_window_preserves_history: PASSED");
    };
}
