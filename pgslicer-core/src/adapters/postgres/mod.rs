//! PostgreSQL source adapter.
//!
//! # Module Structure
//! - `connection`: single-connection pool with a read-only session
//! - `schema_collection`: tables, columns, indexes, relations, sequences
//!   and extensions from `pg_catalog`
//! - `views`: view definitions
//! - `sampling`: sampling queries and value tagging
//!
//! # Security Guarantees
//! - Every session runs with `default_transaction_read_only = on`
//! - Connection strings are redacted in error messages

mod connection;
mod sampling;
mod schema_collection;
mod views;


use super::{SelectQuery, SourceAdapter};
use crate::Result;
use crate::config::ConnectionConfig;
use crate::error::SlicerError;
use crate::models::{CellValue, DatabaseSchema};
use async_trait::async_trait;
use sqlx::PgPool;

pub use sampling::tag_text_value;

/// PostgreSQL adapter backed by a pool of one connection.
pub struct PostgresAdapter {
    pub pool: PgPool,
    pub config: ConnectionConfig,
}

impl std::fmt::Debug for PostgresAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresAdapter")
            .field("target", &self.config.to_string())
            .field("pool_size", &self.pool.size())
            .field("pool_idle", &self.pool.num_idle())
            .finish()
    }
}

#[async_trait]
impl SourceAdapter for PostgresAdapter {
    async fn test_connection(&self) -> Result<()> {
        let connectivity_result: i32 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                SlicerError::connection_failed(format!("cannot reach {}", self.config), e)
            })?;

        if connectivity_result != 1 {
            return Err(SlicerError::configuration(
                "Basic connectivity test failed: unexpected result",
            ));
        }

        tracing::debug!("Connected to {}", self.config);
        Ok(())
    }

    async fn collect_schema(&self) -> Result<DatabaseSchema> {
        schema_collection::collect_schema(self).await
    }

    async fn fetch_rows(&self, query: &SelectQuery) -> Result<Vec<Vec<CellValue>>> {
        sampling::fetch_rows(&self.pool, query).await
    }
}
