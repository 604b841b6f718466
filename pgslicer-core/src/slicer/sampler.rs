//! Per-table sampling policy and execution.

use super::encoder::encode_value;
use super::{SampleContext, SampledRow, condition};
use crate::Result;
use crate::adapters::{SelectQuery, SourceAdapter};
use crate::config::SliceOptions;
use crate::models::{DatabaseSchema, Table};

/// Samples tables one at a time into a [`SampleContext`].
///
/// Options and schema are read-only; the context is the only state that
/// changes.
pub struct Sampler<'a> {
    adapter: &'a dyn SourceAdapter,
    schema: &'a DatabaseSchema,
    options: &'a SliceOptions,
}

impl<'a> Sampler<'a> {
    /// Creates a sampler reading through `adapter`.
    pub fn new(
        adapter: &'a dyn SourceAdapter,
        schema: &'a DatabaseSchema,
        options: &'a SliceOptions,
    ) -> Self {
        Self {
            adapter,
            schema,
            options,
        }
    }

    /// Builds the query for `table` from the options and the rows already
    /// sampled from its parents.
    pub fn query_for(&self, table: &Table, context: &SampleContext) -> SelectQuery {
        let columns = table.columns.iter().map(|c| c.name.clone()).collect();
        let filter = match self.options.condition_for(&table.name) {
            Some(custom) => Some(custom.to_string()),
            None => condition::combine(self.schema, table, context),
        };

        let query = SelectQuery::new(&table.name, columns)
            .with_limit(self.options.limit_for(&table.name));
        match filter {
            Some(filter) => query.with_filter(filter),
            None => query,
        }
    }

    /// Samples `table` and returns the number of newly accepted rows.
    ///
    /// Calling this again for a table already sampled only queries when the
    /// table's set is below its limit and the table is neither dumped in
    /// full nor custom-filtered. Rows whose first column was seen before are
    /// discarded.
    ///
    /// # Errors
    /// Returns [`crate::SlicerError::QueryExecution`] when the query fails.
    pub async fn sample(&self, table: &Table, context: &mut SampleContext) -> Result<usize> {
        if table.columns.is_empty() {
            tracing::debug!("Skipping table '{}' without columns", table.name);
            return Ok(0);
        }

        let limit = self.options.limit_for(&table.name);
        if let Some(existing) = context.get(&table.name) {
            let settled = self.options.is_dump_full(&table.name)
                || self.options.has_custom_condition(&table.name)
                || limit.is_some_and(|limit| existing.len() >= limit);
            if settled {
                tracing::trace!("Table '{}' already sampled", table.name);
                return Ok(0);
            }
        }

        let query = self.query_for(table, context);
        tracing::debug!("Sampling '{}': {}", table.name, query.to_sql());
        let rows = self.adapter.fetch_rows(&query).await?;
        let fetched = rows.len();

        let set = context.entry(&table.name);
        let mut accepted = 0;
        for cells in rows {
            if limit.is_some_and(|limit| set.len() >= limit) {
                break;
            }
            let Some(first) = cells.first() else {
                continue;
            };
            if set.contains_key(&encode_value(first)) {
                continue;
            }
            if set.insert(SampledRow::new(cells)) {
                accepted += 1;
            }
        }

        tracing::info!(
            "Sampled {} rows from '{}' ({} fetched)",
            accepted,
            table.name,
            fetched
        );
        Ok(accepted)
    }
}
