//! Web events: sessions per store-day.

use crate::model::{BusinessKey, SourceKind, WebAggregate, WebEvent};

use super::SourceAggregator;

/// Web aggregator. Each event carrying an `event_id` is one session.
pub struct Web;

impl SourceAggregator for Web {
    type Event = WebEvent;
    type Acc = u64;
    type Row = WebAggregate;

    const KIND: SourceKind = SourceKind::Web;

    fn accumulate(acc: &mut u64, event: &WebEvent) {
        if event.event_id.is_some() {
            *acc += 1;
        }
    }

    fn finish(key: BusinessKey, sessions: u64) -> WebAggregate {
        WebAggregate { key, sessions }
    }
}
