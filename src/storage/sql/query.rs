//! SQL database abstraction trait.

/// Trait for SQL database backends.
///
/// This trait abstracts over different SQL databases (PostgreSQL, SQLite)
/// by providing the pool type, query building and error classification.
pub trait SqlDatabase: Send + Sync + 'static {
    /// The connection pool type for this database.
    type Pool: Clone + Send + Sync;

    /// Build a SQL query string from a sea-query SELECT statement.
    fn build_select(stmt: sea_query::SelectStatement) -> String;

    /// Build a SQL query string from a sea-query INSERT statement.
    fn build_insert(stmt: sea_query::InsertStatement) -> String;

    /// Build a SQL query string from a sea-query CREATE TABLE statement.
    fn build_create(stmt: sea_query::TableCreateStatement) -> String;

    /// Whether a database error code means another writer holds the table.
    fn is_write_conflict(code: &str) -> bool;
}
