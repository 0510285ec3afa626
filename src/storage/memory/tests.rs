use chrono::NaiveDate;

use super::*;
use crate::model::StoreId;

fn key(store: &str, day: u32) -> BusinessKey {
    BusinessKey::new(
        StoreId::parse(store).unwrap(),
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
    )
}

fn metric(store: &str, day: u32, revenue: f64) -> CombinedDailyMetric {
    CombinedDailyMetric {
        revenue,
        order_count: 1,
        ..CombinedDailyMetric::zeroed(key(store, day))
    }
}

#[tokio::test]
async fn test_upsert_counts_inserts_and_replacements() {
    let table = MemoryFactTable::with_rows(vec![metric("1", 1, 10.0)]);

    let outcome = table
        .upsert_batch(&[metric("1", 1, 20.0), metric("1", 2, 5.0)])
        .await
        .unwrap();

    assert_eq!(outcome, MergeOutcome { inserted: 1, replaced: 1 });
    assert_eq!(table.get(&key("1", 1)).await.unwrap().unwrap().revenue, 20.0);
}

#[tokio::test]
async fn test_scan_is_ordered_by_key() {
    let table = MemoryFactTable::new();
    table
        .upsert_batch(&[metric("2", 1, 1.0), metric("1", 3, 1.0), metric("1", 2, 1.0)])
        .await
        .unwrap();

    let keys: Vec<BusinessKey> = table
        .scan()
        .await
        .unwrap()
        .iter()
        .map(CombinedDailyMetric::key)
        .collect();
    assert_eq!(keys, vec![key("1", 2), key("1", 3), key("2", 1)]);
}

#[tokio::test]
async fn test_held_lock_is_a_write_conflict() {
    let table = MemoryFactTable::with_rows(vec![metric("1", 1, 10.0)]);

    let guard = table.rows.write().await;
    let err = table.upsert_batch(&[metric("1", 1, 99.0)]).await.unwrap_err();
    drop(guard);

    assert!(matches!(err, StorageError::WriteConflict(_)));
    assert_eq!(table.get(&key("1", 1)).await.unwrap().unwrap().revenue, 10.0);
}
