//! Source aggregators.
//!
//! Each source stream is reduced to one row per (store_id, dt). Events with a
//! null store_id or dt are dropped and counted; they never form a bucket of
//! their own.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::model::{BusinessKey, RawEvent, SourceKind};

pub mod leads;
pub mod loader;
pub mod orders;
pub mod web;

pub use leads::Leads;
pub use loader::{load_leads, load_orders, load_web, SourceError};
pub use orders::Orders;
pub use web::Web;

/// Reduction of one source kind to its per-key measures.
///
/// The accumulator starts at `Default` for every new key and is folded over
/// that key's events in input order.
pub trait SourceAggregator {
    /// Raw event consumed by this aggregator.
    type Event: RawEvent;
    /// Running state for one key.
    type Acc: Default;
    /// Aggregate row produced per key.
    type Row;

    const KIND: SourceKind;

    fn accumulate(acc: &mut Self::Acc, event: &Self::Event);

    fn finish(key: BusinessKey, acc: Self::Acc) -> Self::Row;
}

/// Counters describing one aggregation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateStats {
    pub source: SourceKind,
    pub events_seen: usize,
    pub dropped_invalid_key: usize,
    pub rows: usize,
}

/// Aggregate rows plus the counters for the pass that produced them.
#[derive(Debug, Clone)]
pub struct Aggregated<R> {
    pub rows: Vec<R>,
    pub stats: AggregateStats,
}

/// Group `events` by business key and reduce each group with `A`.
///
/// Output order is unspecified. Empty input yields no rows and is logged as
/// a warning, never an error.
pub fn aggregate<A, I>(events: I) -> Aggregated<A::Row>
where
    A: SourceAggregator,
    I: IntoIterator<Item = A::Event>,
{
    let mut groups: HashMap<BusinessKey, A::Acc> = HashMap::new();
    let mut events_seen = 0;
    let mut dropped_invalid_key = 0;

    for event in events {
        events_seen += 1;
        let Some(key) = event.key() else {
            dropped_invalid_key += 1;
            continue;
        };
        A::accumulate(groups.entry(key).or_default(), &event);
    }

    if events_seen == 0 {
        warn!(source = %A::KIND, "Source received no events");
    }
    if dropped_invalid_key > 0 {
        warn!(
            source = %A::KIND,
            dropped = dropped_invalid_key,
            "Dropped events with null store_id or dt"
        );
    }

    let rows: Vec<A::Row> = groups
        .into_iter()
        .map(|(key, acc)| A::finish(key, acc))
        .collect();

    debug!(
        source = %A::KIND,
        events = events_seen,
        rows = rows.len(),
        "Source aggregated"
    );

    Aggregated {
        stats: AggregateStats {
            source: A::KIND,
            events_seen,
            dropped_invalid_key,
            rows: rows.len(),
        },
        rows,
    }
}
