//! Daily Store Metrics - incremental multi-source merge engine
//!
//! Aggregates ERP orders, CRM leads and web events to one row per
//! (store_id, dt), outer-joins the three sources and upserts the result into
//! a fact table, either in full or over a trailing window.

pub mod combine;
pub mod config;
pub mod export;
pub mod interfaces;
pub mod model;
pub mod pipeline;
pub mod sources;
pub mod storage;
pub mod utils;
pub mod window;
pub mod writer;
