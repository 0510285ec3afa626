//! Unified SQL storage implementations.
//!
//! This module provides shared implementations for SQL-based storage backends
//! (PostgreSQL, SQLite). The implementations are parameterized by database type
//! using the `SqlDatabase` trait.

mod fact_table;
mod query;

pub use fact_table::SqlFactTable;
pub use query::SqlDatabase;

#[cfg(feature = "postgres")]
pub mod postgres {
    //! PostgreSQL database backend.

    use sea_query::PostgresQueryBuilder;
    use sqlx::PgPool;

    /// PostgreSQL database marker type.
    pub struct Postgres;

    impl super::SqlDatabase for Postgres {
        type Pool = PgPool;

        fn build_select(stmt: sea_query::SelectStatement) -> String {
            stmt.to_string(PostgresQueryBuilder)
        }

        fn build_insert(stmt: sea_query::InsertStatement) -> String {
            stmt.to_string(PostgresQueryBuilder)
        }

        fn build_create(stmt: sea_query::TableCreateStatement) -> String {
            stmt.to_string(PostgresQueryBuilder)
        }

        fn is_write_conflict(code: &str) -> bool {
            // serialization_failure, deadlock_detected, lock_not_available
            matches!(code, "40001" | "40P01" | "55P03")
        }
    }

    /// PostgreSQL fact table.
    pub type PostgresFactTable = super::SqlFactTable<Postgres>;
}

#[cfg(feature = "sqlite")]
pub mod sqlite {
    //! SQLite database backend.

    use sea_query::SqliteQueryBuilder;
    use sqlx::SqlitePool;

    /// SQLite database marker type.
    pub struct Sqlite;

    impl super::SqlDatabase for Sqlite {
        type Pool = SqlitePool;

        fn build_select(stmt: sea_query::SelectStatement) -> String {
            stmt.to_string(SqliteQueryBuilder)
        }

        fn build_insert(stmt: sea_query::InsertStatement) -> String {
            stmt.to_string(SqliteQueryBuilder)
        }

        fn build_create(stmt: sea_query::TableCreateStatement) -> String {
            stmt.to_string(SqliteQueryBuilder)
        }

        fn is_write_conflict(code: &str) -> bool {
            // SQLITE_BUSY (5) and SQLITE_LOCKED (6), including extended codes.
            code.parse::<i32>()
                .map(|code| matches!(code & 0xff, 5 | 6))
                .unwrap_or(false)
        }
    }

    /// SQLite fact table.
    pub type SqliteFactTable = super::SqlFactTable<Sqlite>;

}
