//! Core data model for the daily store metrics fact.
//!
//! Raw events carry nullable keys exactly as they arrive from staging.
//! Everything downstream of the source aggregators works with
//! [`BusinessKey`], which cannot be constructed from a null or blank key.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Lead status sentinel counted as a conversion.
pub const CONVERTED_STATUS: &str = "converted";

/// Store identifier.
///
/// Surrounding whitespace is trimmed; an identifier that is empty after
/// trimming is treated as null and cannot be represented. Numeric
/// identifiers are rendered in one canonical form (`"007"`, `7` and `7.0`
/// are all `"7"`) so CSV and JSON sources agree on the key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StoreId(String);

impl StoreId {
    /// Normalize a raw identifier, returning `None` for null-equivalent input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let canonical = canonical_integer(trimmed).unwrap_or_else(|| trimmed.to_string());
        Some(Self(canonical))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Decimal rendering of integral numeric text: sign kept, leading zeros and
/// an all-zero fraction dropped. Anything else is not a number here.
fn canonical_integer(text: &str) -> Option<String> {
    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    if whole.is_empty()
        || !whole.bytes().all(|b| b.is_ascii_digit())
        || !fraction.bytes().all(|b| b == b'0')
    {
        return None;
    }

    match whole.trim_start_matches('0') {
        "" => Some("0".to_string()),
        digits if negative => Some(format!("-{digits}")),
        digits => Some(digits.to_string()),
    }
}

impl TryFrom<String> for StoreId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| "store_id must not be blank".to_string())
    }
}

impl From<StoreId> for String {
    fn from(value: StoreId) -> Self {
        value.0
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Business key of one fact row: (store_id, dt).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BusinessKey {
    pub store_id: StoreId,
    pub dt: NaiveDate,
}

impl BusinessKey {
    pub fn new(store_id: StoreId, dt: NaiveDate) -> Self {
        Self { store_id, dt }
    }
}

impl fmt::Display for BusinessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.store_id, self.dt)
    }
}

/// Source stream discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Orders,
    Leads,
    Web,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceKind::Orders => "orders",
            SourceKind::Leads => "leads",
            SourceKind::Web => "web",
        };
        f.write_str(name)
    }
}

/// Access to the nullable business key of a raw event.
pub trait RawEvent {
    fn store_id(&self) -> Option<&StoreId>;

    fn dt(&self) -> Option<NaiveDate>;

    /// The business key, or `None` when either half is null.
    fn key(&self) -> Option<BusinessKey> {
        Some(BusinessKey::new(self.store_id()?.clone(), self.dt()?))
    }
}

/// ERP order transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderEvent {
    pub order_id: Option<String>,
    pub customer_id: Option<String>,
    pub store_id: Option<StoreId>,
    pub dt: Option<NaiveDate>,
    pub order_value: f64,
    pub status: Option<String>,
}

/// CRM lead event.
#[derive(Debug, Clone, PartialEq)]
pub struct LeadEvent {
    pub lead_id: Option<String>,
    pub store_id: Option<StoreId>,
    pub dt: Option<NaiveDate>,
    pub status: Option<String>,
}

/// Web analytics event. Each event counts as one session.
#[derive(Debug, Clone, PartialEq)]
pub struct WebEvent {
    pub event_id: Option<String>,
    pub visitor_id: Option<String>,
    pub store_id: Option<StoreId>,
    pub dt: Option<NaiveDate>,
    pub page: Option<String>,
    pub event_type: Option<String>,
}

macro_rules! impl_raw_event {
    ($($event:ty),+) => {
        $(
            impl RawEvent for $event {
                fn store_id(&self) -> Option<&StoreId> {
                    self.store_id.as_ref()
                }

                fn dt(&self) -> Option<NaiveDate> {
                    self.dt
                }
            }
        )+
    };
}

impl_raw_event!(OrderEvent, LeadEvent, WebEvent);

/// Orders reduced to one row per business key.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderAggregate {
    pub key: BusinessKey,
    pub revenue: f64,
    pub order_count: u64,
}

/// Leads reduced to one row per business key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadAggregate {
    pub key: BusinessKey,
    pub converted_leads: u64,
}

/// Web events reduced to one row per business key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebAggregate {
    pub key: BusinessKey,
    pub sessions: u64,
}

/// One row of the daily store metrics fact.
///
/// Every measure is always present; a source with no row for the key
/// contributes zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedDailyMetric {
    pub store_id: StoreId,
    pub dt: NaiveDate,
    pub revenue: f64,
    pub order_count: u64,
    pub converted_leads: u64,
    pub sessions: u64,
}

impl CombinedDailyMetric {
    /// A row for `key` with every measure at its zero default.
    pub fn zeroed(key: BusinessKey) -> Self {
        Self {
            store_id: key.store_id,
            dt: key.dt,
            revenue: 0.0,
            order_count: 0,
            converted_leads: 0,
            sessions: 0,
        }
    }

    pub fn key(&self) -> BusinessKey {
        BusinessKey::new(self.store_id.clone(), self.dt)
    }
}
