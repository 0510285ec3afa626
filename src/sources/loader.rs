//! Staged source file loaders.
//!
//! Orders and leads are staged as CSV, web events as JSON lines. Loaders
//! normalize keys and dates but do not validate payload semantics; schema and
//! range checks belong to the upstream data quality stage.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use tracing::{info, warn};

use crate::model::{LeadEvent, OrderEvent, StoreId, WebEvent};

/// Errors reading staged source files.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed CSV in {}: {source}", .path.display())]
    Csv { path: PathBuf, source: csv::Error },

    #[error("Malformed JSON in {} at record {record}: {source}", .path.display())]
    Json {
        path: PathBuf,
        record: usize,
        source: serde_json::Error,
    },

    #[error("Invalid date {value:?} in {} at record {record}", .path.display())]
    InvalidDate {
        path: PathBuf,
        record: usize,
        value: String,
    },
}

/// Identifier column that may be staged as a number or a string.
///
/// The CSV reader infers scalar types per field, so any scalar must be
/// accepted here; a payload identifier is never a reason to fail a load.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawIdentifier {
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl RawIdentifier {
    fn into_string(self) -> String {
        match self {
            RawIdentifier::Int(n) => n.to_string(),
            RawIdentifier::UInt(n) => n.to_string(),
            // `Display` renders integral floats without a fraction: 1.0 -> "1".
            RawIdentifier::Float(n) => n.to_string(),
            RawIdentifier::Bool(b) => b.to_string(),
            RawIdentifier::Text(s) => s,
        }
    }
}

fn identifier(raw: Option<RawIdentifier>) -> Option<String> {
    raw.map(RawIdentifier::into_string)
}

fn store_id(raw: Option<RawIdentifier>) -> Option<StoreId> {
    identifier(raw).as_deref().and_then(StoreId::parse)
}

#[derive(Debug, Deserialize)]
struct StagedOrder {
    order_id: Option<RawIdentifier>,
    customer_id: Option<RawIdentifier>,
    store_id: Option<RawIdentifier>,
    dt: Option<String>,
    order_value: Option<f64>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StagedLead {
    lead_id: Option<RawIdentifier>,
    status: Option<String>,
    store_id: Option<RawIdentifier>,
    dt: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StagedWebEvent {
    event_id: Option<RawIdentifier>,
    visitor_id: Option<RawIdentifier>,
    store_id: Option<RawIdentifier>,
    dt: Option<String>,
    page: Option<String>,
    event_type: Option<String>,
}

/// Parse a staged `dt` value into a calendar date.
///
/// Accepts `YYYY-MM-DD`, RFC 3339 timestamps and naive `YYYY-MM-DD HH:MM:SS`
/// timestamps; timestamps are truncated to their date.
pub fn parse_event_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.date_naive());
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|ts| ts.date())
}

/// A blank `dt` is null; anything else must parse.
fn event_date(
    raw: Option<String>,
    path: &Path,
    record: usize,
) -> Result<Option<NaiveDate>, SourceError> {
    match raw {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => match parse_event_date(&raw) {
            Some(date) => Ok(Some(date)),
            None => Err(SourceError::InvalidDate {
                path: path.to_path_buf(),
                record,
                value: raw,
            }),
        },
    }
}

/// Open a staged file, treating a missing file as an absent source.
fn open(path: &Path) -> Result<Option<BufReader<File>>, SourceError> {
    match File::open(path) {
        Ok(file) => Ok(Some(BufReader::new(file))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "Source file missing, treating as empty");
            Ok(None)
        }
        Err(source) => Err(SourceError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn csv_error(path: &Path) -> impl Fn(csv::Error) -> SourceError + '_ {
    move |source| SourceError::Csv {
        path: path.to_path_buf(),
        source,
    }
}

/// Load staged ERP orders from CSV.
pub fn load_orders(path: &Path) -> Result<Vec<OrderEvent>, SourceError> {
    let events = match open(path)? {
        Some(reader) => parse_orders(reader, path)?,
        None => Vec::new(),
    };
    info!(path = %path.display(), events = events.len(), "Loaded orders");
    Ok(events)
}

/// Load staged CRM leads from CSV.
pub fn load_leads(path: &Path) -> Result<Vec<LeadEvent>, SourceError> {
    let events = match open(path)? {
        Some(reader) => parse_leads(reader, path)?,
        None => Vec::new(),
    };
    info!(path = %path.display(), events = events.len(), "Loaded leads");
    Ok(events)
}

/// Load staged web events from JSON lines.
pub fn load_web(path: &Path) -> Result<Vec<WebEvent>, SourceError> {
    let events = match open(path)? {
        Some(reader) => parse_web(reader, path)?,
        None => Vec::new(),
    };
    info!(path = %path.display(), events = events.len(), "Loaded web events");
    Ok(events)
}

pub(crate) fn parse_orders<R: Read>(reader: R, path: &Path) -> Result<Vec<OrderEvent>, SourceError> {
    let mut csv = csv::Reader::from_reader(reader);
    let mut events = Vec::new();

    for (record, row) in csv.deserialize::<StagedOrder>().enumerate() {
        let row = row.map_err(csv_error(path))?;
        events.push(OrderEvent {
            order_id: identifier(row.order_id),
            customer_id: identifier(row.customer_id),
            store_id: store_id(row.store_id),
            dt: event_date(row.dt, path, record)?,
            order_value: row.order_value.unwrap_or(0.0),
            status: row.status,
        });
    }

    Ok(events)
}

pub(crate) fn parse_leads<R: Read>(reader: R, path: &Path) -> Result<Vec<LeadEvent>, SourceError> {
    let mut csv = csv::Reader::from_reader(reader);
    let mut events = Vec::new();

    for (record, row) in csv.deserialize::<StagedLead>().enumerate() {
        let row = row.map_err(csv_error(path))?;
        events.push(LeadEvent {
            lead_id: identifier(row.lead_id),
            store_id: store_id(row.store_id),
            dt: event_date(row.dt, path, record)?,
            status: row.status,
        });
    }

    Ok(events)
}

pub(crate) fn parse_web<R: Read>(reader: R, path: &Path) -> Result<Vec<WebEvent>, SourceError> {
    let stream = serde_json::Deserializer::from_reader(reader).into_iter::<StagedWebEvent>();
    let mut events = Vec::new();

    for (record, row) in stream.enumerate() {
        let row = row.map_err(|source| SourceError::Json {
            path: path.to_path_buf(),
            record,
            source,
        })?;
        events.push(WebEvent {
            event_id: identifier(row.event_id),
            visitor_id: identifier(row.visitor_id),
            store_id: store_id(row.store_id),
            dt: event_date(row.dt, path, record)?,
            page: row.page,
            event_type: row.event_type,
        });
    }

    Ok(events)
}
