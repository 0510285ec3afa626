//! Storage implementations.

use std::sync::Arc;

use tracing::{error, info};

use crate::config::{StorageConfig, StorageType};
use crate::interfaces::{FactTable, Result, StorageError};

pub mod memory;
#[cfg(any(feature = "sqlite", feature = "postgres"))]
pub mod schema;
#[cfg(any(feature = "sqlite", feature = "postgres"))]
pub mod sql;

pub use memory::MemoryFactTable;

#[cfg(feature = "postgres")]
pub use sql::postgres::PostgresFactTable;
#[cfg(feature = "sqlite")]
pub use sql::sqlite::SqliteFactTable;

/// Connect to a SQLite database file, creating it if missing.
#[cfg(feature = "sqlite")]
pub async fn connect_sqlite(path: &str) -> Result<sqlx::SqlitePool> {
    if let Some(parent) = std::path::Path::new(path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = sqlx::sqlite::SqliteConnectOptions::new()
        .filename(path.trim_start_matches("sqlite:"))
        .create_if_missing(true);
    Ok(sqlx::sqlite::SqlitePool::connect_with(options).await?)
}

/// Initialize the fact table based on configuration.
///
/// SQL backends have their schema created before they are returned.
pub async fn init_fact_table(config: &StorageConfig) -> Result<Arc<dyn FactTable>> {
    match config.storage_type {
        StorageType::Memory => {
            info!("Storage: memory");
            Ok(Arc::new(MemoryFactTable::new()))
        }
        #[cfg(feature = "sqlite")]
        StorageType::Sqlite => {
            info!("Storage: sqlite at {}", config.sqlite.path);
            let pool = connect_sqlite(&config.sqlite.path).await?;
            let table = SqliteFactTable::new(pool);
            table.init().await?;
            Ok(Arc::new(table))
        }
        #[cfg(feature = "postgres")]
        StorageType::Postgres => {
            info!("Storage: postgres");
            let pool = sqlx::PgPool::connect(&config.postgres.uri).await?;
            let table = PostgresFactTable::new(pool);
            table.init().await?;
            Ok(Arc::new(table))
        }
        #[allow(unreachable_patterns)]
        ref other => {
            error!("Storage type {:?} requested but its feature is not enabled", other);
            Err(StorageError::Unsupported(format!("{other:?}")))
        }
    }
}
