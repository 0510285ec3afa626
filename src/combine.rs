//! Full outer join of the per-source aggregates.
//!
//! Builds a map from business key to a partially-filled record, fills in the
//! measures each source provides, then zero-fills whatever no source touched.

use std::collections::BTreeMap;

use tracing::{debug, error};

use crate::model::{
    BusinessKey, CombinedDailyMetric, LeadAggregate, OrderAggregate, SourceKind, WebAggregate,
};

/// Result type for combine operations.
pub type Result<T> = std::result::Result<T, CombineError>;

/// Errors from combining source aggregates.
#[derive(Debug, thiserror::Error)]
pub enum CombineError {
    /// An aggregator emitted two rows for one key. No partial combine is
    /// attempted.
    #[error("Duplicate key {key} in {kind} aggregate")]
    DuplicateKey { kind: SourceKind, key: BusinessKey },
}

impl CombineError {
    /// Number of business keys implicated by the error.
    pub fn affected_keys(&self) -> usize {
        match self {
            CombineError::DuplicateKey { .. } => 1,
        }
    }
}

#[derive(Debug, Default)]
struct PartialMetric {
    orders: Option<(f64, u64)>,
    converted_leads: Option<u64>,
    sessions: Option<u64>,
}

impl PartialMetric {
    fn complete(self, key: BusinessKey) -> CombinedDailyMetric {
        let (revenue, order_count) = self.orders.unwrap_or((0.0, 0));
        CombinedDailyMetric {
            revenue,
            order_count,
            converted_leads: self.converted_leads.unwrap_or(0),
            sessions: self.sessions.unwrap_or(0),
            ..CombinedDailyMetric::zeroed(key)
        }
    }
}

/// Fill one slot, rejecting a second value for the same (key, source).
fn fill<T>(slot: &mut Option<T>, value: T, kind: SourceKind, key: &BusinessKey) -> Result<()> {
    if slot.is_some() {
        error!(source = %kind, key = %key, "Duplicate key from source aggregator");
        return Err(CombineError::DuplicateKey {
            kind,
            key: key.clone(),
        });
    }
    *slot = Some(value);
    Ok(())
}

/// Combine the three source aggregates into one row per key in their union.
///
/// Output is ordered by (store_id, dt). A key present in only one source
/// still yields a complete row with the other sources' measures at zero.
pub fn combine<O, L, W>(orders: O, leads: L, web: W) -> Result<Vec<CombinedDailyMetric>>
where
    O: IntoIterator<Item = OrderAggregate>,
    L: IntoIterator<Item = LeadAggregate>,
    W: IntoIterator<Item = WebAggregate>,
{
    let mut partials: BTreeMap<BusinessKey, PartialMetric> = BTreeMap::new();

    for row in orders {
        let slot = &mut partials.entry(row.key.clone()).or_default().orders;
        fill(slot, (row.revenue, row.order_count), SourceKind::Orders, &row.key)?;
    }
    for row in leads {
        let slot = &mut partials.entry(row.key.clone()).or_default().converted_leads;
        fill(slot, row.converted_leads, SourceKind::Leads, &row.key)?;
    }
    for row in web {
        let slot = &mut partials.entry(row.key.clone()).or_default().sessions;
        fill(slot, row.sessions, SourceKind::Web, &row.key)?;
    }

    let combined: Vec<CombinedDailyMetric> = partials
        .into_iter()
        .map(|(key, partial)| partial.complete(key))
        .collect();

    debug!(rows = combined.len(), "Sources combined");
    Ok(combined)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::model::StoreId;

    fn key(store: &str, day: u32) -> BusinessKey {
        BusinessKey::new(
            StoreId::parse(store).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
        )
    }

    fn orders(store: &str, day: u32, revenue: f64, order_count: u64) -> OrderAggregate {
        OrderAggregate {
            key: key(store, day),
            revenue,
            order_count,
        }
    }

    fn leads(store: &str, day: u32, converted_leads: u64) -> LeadAggregate {
        LeadAggregate {
            key: key(store, day),
            converted_leads,
        }
    }

    fn web(store: &str, day: u32, sessions: u64) -> WebAggregate {
        WebAggregate {
            key: key(store, day),
            sessions,
        }
    }

    #[test]
    fn test_missing_leads_are_zero_filled() {
        let rows = combine(vec![orders("1", 1, 100.0, 2)], vec![], vec![web("1", 1, 5)]).unwrap();

        assert_eq!(
            rows,
            vec![CombinedDailyMetric {
                store_id: StoreId::parse("1").unwrap(),
                dt: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                revenue: 100.0,
                order_count: 2,
                converted_leads: 0,
                sessions: 5,
            }]
        );
    }

    #[test]
    fn test_union_of_keys_one_row_each() {
        let rows = combine(
            vec![orders("1", 1, 10.0, 1), orders("2", 1, 20.0, 2)],
            vec![leads("1", 1, 3), leads("3", 2, 1)],
            vec![web("2", 1, 7), web("4", 5, 9)],
        )
        .unwrap();

        let keys: Vec<BusinessKey> = rows.iter().map(CombinedDailyMetric::key).collect();
        assert_eq!(keys, vec![key("1", 1), key("2", 1), key("3", 2), key("4", 5)]);

        assert_eq!(rows[0].converted_leads, 3);
        assert_eq!(rows[0].sessions, 0);
        assert_eq!(rows[1].sessions, 7);
        assert_eq!(rows[1].converted_leads, 0);
        assert_eq!(rows[2].revenue, 0.0);
        assert_eq!(rows[2].order_count, 0);
        assert_eq!(rows[3].sessions, 9);
    }

    #[test]
    fn test_all_sources_empty() {
        let rows = combine(vec![], vec![], vec![]).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_single_source_present() {
        let rows = combine(vec![], vec![], vec![web("9", 3, 1)]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0],
            CombinedDailyMetric {
                sessions: 1,
                ..CombinedDailyMetric::zeroed(key("9", 3))
            }
        );
    }

    #[test]
    fn test_duplicate_key_within_source_is_fatal() {
        let err = combine(
            vec![orders("1", 1, 10.0, 1)],
            vec![leads("1", 1, 1), leads("1", 1, 2)],
            vec![],
        )
        .unwrap_err();

        match err {
            CombineError::DuplicateKey { kind, key: k } => {
                assert_eq!(kind, SourceKind::Leads);
                assert_eq!(k, key("1", 1));
            }
        }
    }

    #[test]
    fn test_same_key_across_sources_is_not_a_duplicate() {
        let rows = combine(
            vec![orders("1", 1, 1.0, 1)],
            vec![leads("1", 1, 1)],
            vec![web("1", 1, 1)],
        )
        .unwrap();
        assert_eq!(rows.len(), 1);
    }
}
