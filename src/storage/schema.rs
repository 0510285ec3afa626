//! Database schema definitions using sea-query.
//!
//! These define the table and column identifiers for type-safe query building.

use sea_query::{ColumnDef, Index, Table, TableCreateStatement};

/// Daily store metrics fact table schema.
#[derive(sea_query::Iden)]
pub enum FctDailyStoreMetrics {
    Table,
    #[iden = "store_id"]
    StoreId,
    #[iden = "dt"]
    Dt,
    #[iden = "revenue"]
    Revenue,
    #[iden = "order_count"]
    OrderCount,
    #[iden = "converted_leads"]
    ConvertedLeads,
    #[iden = "sessions"]
    Sessions,
}

/// Measure columns, overwritten as a whole on conflict.
///
/// There is no load timestamp column: re-applying a batch must leave the
/// table identical.
pub const MEASURE_COLUMNS: [FctDailyStoreMetrics; 4] = [
    FctDailyStoreMetrics::Revenue,
    FctDailyStoreMetrics::OrderCount,
    FctDailyStoreMetrics::ConvertedLeads,
    FctDailyStoreMetrics::Sessions,
];

/// CREATE TABLE for the fact table, keyed by (store_id, dt).
///
/// `dt` is stored as `YYYY-MM-DD` text so that lexical and calendar order
/// agree on every backend.
pub fn create_fact_table() -> TableCreateStatement {
    Table::create()
        .table(FctDailyStoreMetrics::Table)
        .if_not_exists()
        .col(ColumnDef::new(FctDailyStoreMetrics::StoreId).text().not_null())
        .col(ColumnDef::new(FctDailyStoreMetrics::Dt).text().not_null())
        .col(ColumnDef::new(FctDailyStoreMetrics::Revenue).double().not_null())
        .col(ColumnDef::new(FctDailyStoreMetrics::OrderCount).big_integer().not_null())
        .col(ColumnDef::new(FctDailyStoreMetrics::ConvertedLeads).big_integer().not_null())
        .col(ColumnDef::new(FctDailyStoreMetrics::Sessions).big_integer().not_null())
        .primary_key(
            Index::create()
                .col(FctDailyStoreMetrics::StoreId)
                .col(FctDailyStoreMetrics::Dt),
        )
        .to_owned()
}
