//! In-memory [`SourceAdapter`] for unit tests.

use crate::Result;
use crate::adapters::{SelectQuery, SourceAdapter};
use crate::error::SlicerError;
use crate::models::{CellValue, DatabaseSchema};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Serves canned rows per table and records every query.
///
/// Filters are not evaluated; the configured rows are returned as-is,
/// truncated to the query limit.
pub(crate) struct FakeAdapter {
    schema: DatabaseSchema,
    rows: HashMap<String, Vec<Vec<CellValue>>>,
    failing: HashSet<String>,
    queries: Mutex<Vec<SelectQuery>>,
}

impl FakeAdapter {
    pub(crate) fn new(schema: DatabaseSchema) -> Self {
        Self {
            schema,
            rows: HashMap::new(),
            failing: HashSet::new(),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_rows(mut self, table: &str, rows: Vec<Vec<CellValue>>) -> Self {
        self.rows.insert(table.to_string(), rows);
        self
    }

    pub(crate) fn failing_on(mut self, table: &str) -> Self {
        self.failing.insert(table.to_string());
        self
    }

    pub(crate) fn queries(&self) -> Vec<SelectQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceAdapter for FakeAdapter {
    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn collect_schema(&self) -> Result<DatabaseSchema> {
        Ok(self.schema.clone())
    }

    async fn fetch_rows(&self, query: &SelectQuery) -> Result<Vec<Vec<CellValue>>> {
        self.queries.lock().unwrap().push(query.clone());

        if self.failing.contains(&query.table) {
            return Err(SlicerError::query_failed(
                &query.table,
                &query.to_sql(),
                std::io::Error::other("relation is locked"),
            ));
        }

        let rows = self.rows.get(&query.table).cloned().unwrap_or_default();
        Ok(match query.limit {
            Some(limit) => rows.into_iter().take(limit).collect(),
            None => rows,
        })
    }
}
