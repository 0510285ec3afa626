//! Unified SQL FactTable implementation.
//!
//! Uses a macro to generate implementations for each SQL backend,
//! eliminating code duplication while maintaining type safety.

use std::marker::PhantomData;

use chrono::NaiveDate;
use sea_query::{Alias, Expr, Func, OnConflict, Order, Query};

use super::SqlDatabase;
use crate::interfaces::{Result, StorageError};
use crate::model::{BusinessKey, CombinedDailyMetric, StoreId};
use crate::storage::schema::{FctDailyStoreMetrics, MEASURE_COLUMNS};

/// Rows per INSERT statement. Values are inlined, so this bounds statement
/// length.
const UPSERT_CHUNK_ROWS: usize = 500;

/// SQL-based implementation of FactTable.
///
/// This generic implementation works with any SQL database that implements
/// the `SqlDatabase` trait (PostgreSQL, SQLite). A batch is applied inside a
/// single transaction; a lock conflict surfaces as `WriteConflict` and rolls
/// the whole batch back.
pub struct SqlFactTable<DB: SqlDatabase> {
    pool: DB::Pool,
    _marker: PhantomData<DB>,
}

impl<DB: SqlDatabase> SqlFactTable<DB> {
    /// Create a new SQL fact table with the given pool.
    pub fn new(pool: DB::Pool) -> Self {
        Self {
            pool,
            _marker: PhantomData,
        }
    }

    /// Get the underlying pool.
    pub fn pool(&self) -> &DB::Pool {
        &self.pool
    }
}

/// Map a sqlx error to `WriteConflict` when the backend reports a lock.
fn classify<DB: SqlDatabase>(err: sqlx::Error) -> StorageError {
    let conflict = err
        .as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| DB::is_write_conflict(&code));
    if conflict {
        StorageError::WriteConflict(err.to_string())
    } else {
        StorageError::Database(err)
    }
}

fn count_stmt() -> sea_query::SelectStatement {
    Query::select()
        .expr_as(
            Func::count(Expr::col(FctDailyStoreMetrics::StoreId)),
            Alias::new("n"),
        )
        .from(FctDailyStoreMetrics::Table)
        .to_owned()
}

fn select_stmt() -> sea_query::SelectStatement {
    Query::select()
        .columns([
            FctDailyStoreMetrics::StoreId,
            FctDailyStoreMetrics::Dt,
            FctDailyStoreMetrics::Revenue,
            FctDailyStoreMetrics::OrderCount,
            FctDailyStoreMetrics::ConvertedLeads,
            FctDailyStoreMetrics::Sessions,
        ])
        .from(FctDailyStoreMetrics::Table)
        .to_owned()
}

fn get_stmt(key: &BusinessKey) -> sea_query::SelectStatement {
    select_stmt()
        .and_where(Expr::col(FctDailyStoreMetrics::StoreId).eq(key.store_id.as_str()))
        .and_where(Expr::col(FctDailyStoreMetrics::Dt).eq(key.dt.to_string()))
        .to_owned()
}

fn scan_stmt() -> sea_query::SelectStatement {
    select_stmt()
        .order_by(FctDailyStoreMetrics::StoreId, Order::Asc)
        .order_by(FctDailyStoreMetrics::Dt, Order::Asc)
        .to_owned()
}

/// Build one multi-row upsert. Conflicting keys have every measure replaced.
fn upsert_stmt(
    rows: &[CombinedDailyMetric],
) -> std::result::Result<sea_query::InsertStatement, sea_query::error::Error> {
    let mut stmt = Query::insert();
    stmt.into_table(FctDailyStoreMetrics::Table).columns([
        FctDailyStoreMetrics::StoreId,
        FctDailyStoreMetrics::Dt,
        FctDailyStoreMetrics::Revenue,
        FctDailyStoreMetrics::OrderCount,
        FctDailyStoreMetrics::ConvertedLeads,
        FctDailyStoreMetrics::Sessions,
    ]);

    for row in rows {
        stmt.values([
            row.store_id.as_str().into(),
            row.dt.to_string().into(),
            row.revenue.into(),
            measure_to_sql(row.order_count).into(),
            measure_to_sql(row.converted_leads).into(),
            measure_to_sql(row.sessions).into(),
        ])?;
    }

    stmt.on_conflict(
        OnConflict::columns([FctDailyStoreMetrics::StoreId, FctDailyStoreMetrics::Dt])
            .update_columns(MEASURE_COLUMNS)
            .to_owned(),
    );

    Ok(stmt)
}

/// Counts are stored as BIGINT.
fn measure_to_sql(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn measure_from_sql(key: &BusinessKey, column: &'static str, value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| StorageError::InvalidMeasure {
        key: key.clone(),
        column,
        value,
    })
}

/// Rebuild a metric from stored column values.
fn metric_from_columns(
    store_id: String,
    dt: String,
    revenue: f64,
    order_count: i64,
    converted_leads: i64,
    sessions: i64,
) -> Result<CombinedDailyMetric> {
    let parsed_store = StoreId::parse(&store_id);
    let parsed_dt = NaiveDate::parse_from_str(&dt, "%Y-%m-%d").ok();
    let (Some(store_id), Some(dt)) = (parsed_store, parsed_dt) else {
        return Err(StorageError::InvalidKey { store_id, dt });
    };

    let key = BusinessKey::new(store_id, dt);
    Ok(CombinedDailyMetric {
        revenue,
        order_count: measure_from_sql(&key, "order_count", order_count)?,
        converted_leads: measure_from_sql(&key, "converted_leads", converted_leads)?,
        sessions: measure_from_sql(&key, "sessions", sessions)?,
        ..CombinedDailyMetric::zeroed(key)
    })
}

/// Macro to implement FactTable for a specific SQL backend.
///
/// This eliminates duplication between PostgreSQL and SQLite implementations
/// while maintaining full type safety.
macro_rules! impl_fact_table {
    ($db_type:ty, $row_type:ty, $feature:literal) => {
        #[cfg(feature = $feature)]
        impl SqlFactTable<$db_type> {
            /// Create the fact table if it does not exist.
            pub async fn init(&self) -> Result<()> {
                let sql = <$db_type>::build_create(crate::storage::schema::create_fact_table());
                sqlx::query(&sql).execute(&self.pool).await?;
                tracing::info!(
                    table = crate::interfaces::FACT_TABLE_NAME,
                    "Fact table schema initialized"
                );
                Ok(())
            }

            fn decode(row: &$row_type) -> Result<CombinedDailyMetric> {
                use sqlx::Row;

                metric_from_columns(
                    row.try_get("store_id")?,
                    row.try_get("dt")?,
                    row.try_get("revenue")?,
                    row.try_get("order_count")?,
                    row.try_get("converted_leads")?,
                    row.try_get("sessions")?,
                )
            }
        }

        #[cfg(feature = $feature)]
        #[async_trait::async_trait]
        impl crate::interfaces::FactTable for SqlFactTable<$db_type> {
            async fn upsert_batch(
                &self,
                rows: &[CombinedDailyMetric],
            ) -> Result<crate::interfaces::MergeOutcome> {
                use sqlx::Row;

                if rows.is_empty() {
                    return Ok(crate::interfaces::MergeOutcome::default());
                }

                let to_storage_error = classify::<$db_type>;
                let count_sql = <$db_type>::build_select(count_stmt());

                let mut tx = self.pool.begin().await.map_err(to_storage_error)?;

                let before: i64 = sqlx::query(&count_sql)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(to_storage_error)?
                    .try_get("n")?;

                for chunk in rows.chunks(UPSERT_CHUNK_ROWS) {
                    let stmt = upsert_stmt(chunk)
                        .map_err(|e| sqlx::Error::Protocol(e.to_string()))?;
                    let sql = <$db_type>::build_insert(stmt);
                    sqlx::query(&sql).execute(&mut *tx).await.map_err(to_storage_error)?;
                }

                let after: i64 = sqlx::query(&count_sql)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(to_storage_error)?
                    .try_get("n")?;

                tx.commit().await.map_err(to_storage_error)?;

                let inserted = usize::try_from(after - before).unwrap_or(0);
                Ok(crate::interfaces::MergeOutcome {
                    inserted,
                    replaced: rows.len().saturating_sub(inserted),
                })
            }

            async fn get(&self, key: &BusinessKey) -> Result<Option<CombinedDailyMetric>> {
                let sql = <$db_type>::build_select(get_stmt(key));
                let row = sqlx::query(&sql).fetch_optional(&self.pool).await?;

                row.as_ref().map(Self::decode).transpose()
            }

            async fn scan(&self) -> Result<Vec<CombinedDailyMetric>> {
                let sql = <$db_type>::build_select(scan_stmt());
                let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

                rows.iter().map(Self::decode).collect()
            }
        }
    };
}

// Generate implementations for each SQL backend
impl_fact_table!(super::postgres::Postgres, sqlx::postgres::PgRow, "postgres");
impl_fact_table!(super::sqlite::Sqlite, sqlx::sqlite::SqliteRow, "sqlite");
