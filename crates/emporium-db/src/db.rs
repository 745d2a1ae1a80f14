//! Pool construction and schema setup.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::{schema, DbConfig, DbError};

/// A connected Postgres database.
///
/// Cloning is cheap; the pool is reference counted.
#[derive(Debug, Clone)]
pub struct Db {
    pool: PgPool,
}

impl Db {
    /// Open a pool using the given configuration.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let db = Db::connect(&DbConfig::default()).await?;
    /// ```
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        config.validate()?;

        tracing::debug!(
            url = %config.redacted_url(),
            max_connections = config.max_connections,
            "opening database pool"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| DbError::ConnectError(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create every table and index that does not exist yet.
    ///
    /// Runs in a single transaction so a failure leaves the schema untouched.
    pub async fn migrate(&self) -> Result<(), DbError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::MigrationError(e.to_string()))?;

        for statement in schema::STATEMENTS {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(|e| DbError::MigrationError(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::MigrationError(e.to_string()))?;

        tracing::info!(statements = schema::STATEMENTS.len(), "schema is up to date");
        Ok(())
    }

    /// Get the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
