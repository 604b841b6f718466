//! Source database seam.
//!
//! The slicer only talks to the database through [`SourceAdapter`]: one
//! call to introspect the catalog and one call per sampling query. Tests
//! drive the slicer with an in-memory implementation.
//!
//! # Module Structure
//! - `helpers`: identifier/literal quoting and row extraction
//! - `postgres`: the `sqlx` implementation (feature `postgresql`)

use crate::Result;
use crate::config::ConnectionConfig;
use crate::models::{CellValue, DatabaseSchema};
use async_trait::async_trait;

pub mod helpers;

#[cfg(feature = "postgresql")]
pub mod postgres;

pub use helpers::{quote_ident, quote_literal};

/// A sampling query against one table.
///
/// Rendered as an explicit column list in declared order, an optional
/// filter, `ORDER BY 1 DESC` and an optional limit.
///
/// # Example
/// ```rust
/// use pgslicer_core::adapters::SelectQuery;
///
/// let query = SelectQuery::new("orders", vec!["id".to_string(), "user_id".to_string()])
///     .with_filter("(\"user_id\" IN (1, 2))")
///     .with_limit(Some(10));
///
/// assert_eq!(
///     query.to_sql(),
///     "SELECT \"id\", \"user_id\" FROM \"orders\" WHERE (\"user_id\" IN (1, 2)) ORDER BY 1 DESC LIMIT 10"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectQuery {
    pub table: String,
    pub columns: Vec<String>,
    /// Boolean SQL expression used verbatim as the WHERE clause
    pub filter: Option<String>,
    /// `None` selects every matching row
    pub limit: Option<usize>,
}

impl SelectQuery {
    /// Creates an unfiltered, unlimited query.
    pub fn new(table: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            table: table.into(),
            columns,
            filter: None,
            limit: None,
        }
    }

    /// Builder method to set the WHERE expression.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Builder method to set the row limit.
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Renders the statement text.
    pub fn to_sql(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");

        let mut sql = format!("SELECT {} FROM {}", columns, quote_ident(&self.table));
        if let Some(filter) = &self.filter {
            sql.push_str(" WHERE ");
            sql.push_str(filter);
        }
        sql.push_str(" ORDER BY 1 DESC");
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        sql
    }
}

/// Read-only access to the source database.
///
/// # Object Safety
/// This trait is object-safe, allowing for dynamic dispatch through
/// `Box<dyn SourceAdapter>`.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Tests the database connection without collecting schema.
    ///
    /// # Errors
    /// Returns error if connection fails or times out
    async fn test_connection(&self) -> Result<()>;

    /// Introspects tables, sequences, extensions and views.
    ///
    /// # Errors
    /// Returns [`crate::SlicerError::Introspection`] when a catalog query fails.
    async fn collect_schema(&self) -> Result<DatabaseSchema>;

    /// Runs one sampling query and returns its rows with values tagged.
    ///
    /// Each row holds one cell per entry of `query.columns`, in order.
    ///
    /// # Errors
    /// Returns [`crate::SlicerError::QueryExecution`] naming the table and SQL.
    async fn fetch_rows(&self, query: &SelectQuery) -> Result<Vec<Vec<CellValue>>>;
}

/// Creates the PostgreSQL adapter for `config`.
///
/// The connection is opened lazily; call
/// [`SourceAdapter::test_connection`] to fail fast.
///
/// # Errors
/// Returns error if the configuration is invalid or the crate was built
/// without the `postgresql` feature.
pub fn create_adapter(config: &ConnectionConfig) -> Result<Box<dyn SourceAdapter>> {
    config.validate()?;

    #[cfg(feature = "postgresql")]
    {
        let adapter = postgres::PostgresAdapter::new(config.clone())?;
        Ok(Box::new(adapter))
    }

    #[cfg(not(feature = "postgresql"))]
    {
        Err(crate::error::SlicerError::configuration(
            "PostgreSQL support not compiled in. Use --features postgresql",
        ))
    }
}
