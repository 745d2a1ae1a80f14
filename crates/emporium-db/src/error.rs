//! Database error types.

use thiserror::Error;

/// Errors that can occur when using the database.
#[derive(Error, Debug)]
pub enum DbError {
    /// Failed to open the connection pool.
    #[error("Failed to connect to database: {0}")]
    ConnectError(String),

    /// Failed to apply the schema.
    #[error("Schema migration failed: {0}")]
    MigrationError(String),

    /// Failed to execute a query.
    #[error("Query execution failed: {0}")]
    QueryError(String),

    /// The configuration is unusable.
    #[error("Invalid database configuration: {0}")]
    ConfigError(String),
}

impl From<sqlx::Error> for DbError {
    fn from(e: sqlx::Error) -> Self {
        DbError::QueryError(e.to_string())
    }
}
