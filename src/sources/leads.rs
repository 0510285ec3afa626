//! CRM leads: converted leads per store-day.

use crate::model::{BusinessKey, LeadAggregate, LeadEvent, SourceKind, CONVERTED_STATUS};

use super::SourceAggregator;

/// Leads aggregator.
///
/// Every lead opens a row for its key; only leads whose status is exactly
/// `"converted"` are counted.
pub struct Leads;

impl SourceAggregator for Leads {
    type Event = LeadEvent;
    type Acc = u64;
    type Row = LeadAggregate;

    const KIND: SourceKind = SourceKind::Leads;

    fn accumulate(acc: &mut u64, event: &LeadEvent) {
        if event.status.as_deref() == Some(CONVERTED_STATUS) {
            *acc += 1;
        }
    }

    fn finish(key: BusinessKey, converted_leads: u64) -> LeadAggregate {
        LeadAggregate {
            key,
            converted_leads,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::model::StoreId;
    use crate::sources::aggregate;

    fn lead(store: &str, status: Option<&str>) -> LeadEvent {
        LeadEvent {
            lead_id: None,
            store_id: StoreId::parse(store),
            dt: NaiveDate::from_ymd_opt(2024, 1, 1),
            status: status.map(str::to_string),
        }
    }

    #[test]
    fn test_counts_only_converted() {
        let out = aggregate::<Leads, _>(vec![
            lead("1", Some("converted")),
            lead("1", Some("new")),
            lead("1", Some("converted")),
            lead("1", None),
        ]);

        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].converted_leads, 2);
    }

    #[test]
    fn test_key_with_no_conversions_still_has_row() {
        let out = aggregate::<Leads, _>(vec![lead("5", Some("qualified"))]);

        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].converted_leads, 0);
    }

    #[test]
    fn test_status_match_is_exact() {
        let out = aggregate::<Leads, _>(vec![
            lead("1", Some("Converted")),
            lead("1", Some("converted ")),
        ]);

        assert_eq!(out.rows[0].converted_leads, 0);
    }
}
