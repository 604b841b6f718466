//! Referential-integrity-preserving row sampling.
//!
//! A run layers the tables ([`graph`]), then samples them in that order
//! ([`sampler`]). A child table is filtered down to rows whose mandatory
//! foreign keys point at rows already sampled from the parent
//! ([`condition`]). Accepted rows are kept encoded for bulk loading
//! ([`encoder`]).
//!
//! All state of a run lives in a [`SampleContext`] owned by that run.

pub mod condition;
pub mod encoder;
pub mod graph;
pub mod sampler;

use crate::Result;
use crate::adapters::SourceAdapter;
use crate::config::SliceOptions;
use crate::models::{CellValue, DatabaseSchema};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

pub use graph::{Layering, RelaxedEdge};
pub use sampler::Sampler;

/// A sampled row: typed cells for building conditions, encoded fields for
/// output.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledRow {
    /// Typed values in column order
    pub cells: Vec<CellValue>,
    /// COPY-encoded values, one per cell
    pub fields: Vec<String>,
}

impl SampledRow {
    /// Encodes `cells`.
    pub fn new(cells: Vec<CellValue>) -> Self {
        let fields = encoder::encode_row(&cells);
        Self { cells, fields }
    }

    /// Deduplication key: the encoded first field.
    pub fn key(&self) -> Option<&str> {
        self.fields.first().map(String::as_str)
    }
}

/// Rows accepted for one table, in acceptance order.
///
/// Rows are deduplicated on the encoded first column; once a key is
/// present, later rows with the same key are dropped.
#[derive(Debug, Clone, Default)]
pub struct SampleSet {
    rows: Vec<SampledRow>,
    keys: HashSet<String>,
}

impl SampleSet {
    /// Number of accepted rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether no row was accepted.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Accepted rows in acceptance order.
    pub fn rows(&self) -> &[SampledRow] {
        &self.rows
    }

    /// Whether a row with this deduplication key was accepted.
    pub fn contains_key(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Appends `row` unless its key is already present. Returns whether the
    /// row was added.
    pub fn insert(&mut self, row: SampledRow) -> bool {
        let Some(key) = row.key() else {
            return false;
        };
        if !self.keys.insert(key.to_string()) {
            return false;
        }
        self.rows.push(row);
        true
    }

    /// Encoded rows, ready for [`encoder::copy_block`].
    pub fn encoded_rows(&self) -> impl Iterator<Item = &[String]> {
        self.rows.iter().map(|row| row.fields.as_slice())
    }
}

/// Sample sets of one run, keyed by table name.
///
/// A table has a set once it has been queried, even if no row came back.
#[derive(Debug, Clone, Default)]
pub struct SampleContext {
    sets: HashMap<String, SampleSet>,
}

impl SampleContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// The set for `table`, if it has been queried.
    pub fn get(&self, table: &str) -> Option<&SampleSet> {
        self.sets.get(table)
    }

    /// Whether `table` has been queried.
    pub fn contains(&self, table: &str) -> bool {
        self.sets.contains_key(table)
    }

    /// The set for `table`, created empty on first use.
    pub fn entry(&mut self, table: &str) -> &mut SampleSet {
        self.sets.entry(table.to_string()).or_default()
    }

    /// Number of tables that have been queried.
    pub fn table_count(&self) -> usize {
        self.sets.len()
    }

    /// Total rows across all sets.
    pub fn total_rows(&self) -> usize {
        self.sets.values().map(SampleSet::len).sum()
    }
}

/// Statistics of a finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceSummary {
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the last query finished
    pub finished_at: DateTime<Utc>,
    /// Tables queried at least once
    pub tables_sampled: usize,
    /// Rows accepted across all tables
    pub rows_sampled: usize,
    /// Foreign keys ignored for ordering because of cycles
    pub relaxed_edges: usize,
}

impl SliceSummary {
    /// Wall-clock duration in milliseconds.
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

/// Result of [`Slicer::run`].
#[derive(Debug, Clone)]
pub struct SliceOutcome {
    /// Processing order and relaxed edges
    pub layering: Layering,
    /// Accepted rows per table
    pub context: SampleContext,
    /// Run statistics
    pub summary: SliceSummary,
}

impl SliceOutcome {
    /// Table names in processing order.
    pub fn order(&self) -> Vec<&str> {
        self.layering.order().collect()
    }

    /// Foreign keys dropped from ordering to break cycles.
    pub fn relaxed_edges(&self) -> &[RelaxedEdge] {
        self.layering.relaxed_edges()
    }

    /// Bulk-load blocks of every non-empty sample, in processing order.
    pub fn copy_blocks(&self) -> String {
        self.layering
            .order()
            .filter_map(|table| {
                let set = self.context.get(table)?;
                encoder::copy_block(table, set.encoded_rows())
            })
            .collect()
    }
}

/// Runs the sampler over a whole schema.
pub struct Slicer<'a> {
    adapter: &'a dyn SourceAdapter,
    schema: &'a DatabaseSchema,
    options: &'a SliceOptions,
}

impl<'a> Slicer<'a> {
    /// Creates a slicer over `schema` that queries through `adapter`.
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

    /// Layers the schema and samples every table in order.
    ///
    /// Queries run one at a time.
    ///
    /// # Errors
    /// Stops at the first failed query.
    pub async fn run(&self) -> Result<SliceOutcome> {
        let started_at = Utc::now();
        let layering = graph::layer(self.schema);
        let sampler = Sampler::new(self.adapter, self.schema, self.options);
        let mut context = SampleContext::new();

        for name in layering.order() {
            let Some(table) = self.schema.table(name) else {
                continue;
            };
            sampler.sample(table, &mut context).await?;
        }

        let summary = SliceSummary {
            started_at,
            finished_at: Utc::now(),
            tables_sampled: context.table_count(),
            rows_sampled: context.total_rows(),
            relaxed_edges: layering.relaxed_edges().len(),
        };

        tracing::info!(
            "Sampled {} rows from {} tables in {}ms",
            summary.rows_sampled,
            summary.tables_sampled,
            summary.duration_ms()
        );

        Ok(SliceOutcome {
            layering,
            context,
            summary,
        })
    }
}

#[cfg(test)]
pub(crate) mod testing;
