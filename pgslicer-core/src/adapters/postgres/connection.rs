//! PostgreSQL connection pool management.
//!
//! The slicer issues one query at a time, so the pool holds a single
//! connection. Session settings are applied to it by `after_connect`.

use super::PostgresAdapter;
use crate::Result;
use crate::config::ConnectionConfig;
use crate::error::{SlicerError, redact_database_url};
use sqlx::PgPool;

impl PostgresAdapter {
    /// Creates a new PostgreSQL adapter.
    ///
    /// The pool connects lazily: no connection is opened until the first
    /// query, so this must be called from within a tokio runtime but does
    /// not touch the network.
    ///
    /// # Errors
    /// Returns error if the configuration is invalid or the pool cannot be
    /// created.
    pub fn new(config: ConnectionConfig) -> Result<Self> {
        config.validate()?;
        let pool = Self::create_connection_pool(&config)?;
        Ok(Self { pool, config })
    }

    /// Creates the connection pool.
    ///
    /// # Session settings (every connection)
    /// - `default_transaction_read_only = on`
    /// - `application_name = 'pg-slicer-<version>'`
    /// - `timezone = 'UTC'` and `datestyle = 'ISO'` so temporal values
    ///   reload unambiguously
    /// - `statement_timeout` when configured
    pub(crate) fn create_connection_pool(config: &ConnectionConfig) -> Result<PgPool> {
        use sqlx::Executor;

        let url = config.to_url()?;
        let statement_timeout_ms = config.statement_timeout.map(|t| t.as_millis());

        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(config.connect_timeout)
            .test_before_acquire(true)
            .after_connect(move |conn, _meta| {
                Box::pin(async move {
                    conn.execute("SET default_transaction_read_only = on")
                        .await?;

                    let app_name = format!("pg-slicer-{}", env!("CARGO_PKG_VERSION"));
                    conn.execute(format!("SET application_name = '{}'", app_name).as_str())
                        .await?;

                    conn.execute("SET timezone = 'UTC'").await?;
                    conn.execute("SET datestyle = 'ISO'").await?;

                    if let Some(timeout_ms) = statement_timeout_ms {
                        conn.execute(format!("SET statement_timeout = {}", timeout_ms).as_str())
                            .await?;
                    }

                    Ok(())
                })
            })
            .connect_lazy(url.as_str())
            .map_err(|e| {
                SlicerError::connection_failed(
                    format!(
                        "Failed to create PostgreSQL connection pool to {}",
                        redact_database_url(url.as_str())
                    ),
                    e,
                )
            })?;

        Ok(pool)
    }

    /// Closes the connection pool gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
