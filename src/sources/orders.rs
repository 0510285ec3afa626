//! ERP orders: revenue and order count per store-day.

use crate::model::{BusinessKey, OrderAggregate, OrderEvent, SourceKind};

use super::SourceAggregator;

/// Orders aggregator.
pub struct Orders;

#[derive(Debug, Default)]
pub struct OrderTotals {
    revenue: f64,
    order_count: u64,
}

impl SourceAggregator for Orders {
    type Event = OrderEvent;
    type Acc = OrderTotals;
    type Row = OrderAggregate;

    const KIND: SourceKind = SourceKind::Orders;

    fn accumulate(acc: &mut OrderTotals, event: &OrderEvent) {
        acc.revenue += event.order_value;
        if event.order_id.is_some() {
            acc.order_count += 1;
        }
    }

    fn finish(key: BusinessKey, acc: OrderTotals) -> OrderAggregate {
        OrderAggregate {
            key,
            revenue: acc.revenue,
            order_count: acc.order_count,
        }
    }
}
