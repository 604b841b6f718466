//! Sampling options for a slicing run.

use crate::Result;
use crate::error::SlicerError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Rows sampled per table when nothing else is configured.
pub const DEFAULT_LIMIT: usize = 100;

/// Per-run sampling options, read-only while sampling.
///
/// Per-table settings resolve in this order: a custom limit wins over a
/// full dump, which wins over the default limit. A custom condition replaces
/// the foreign-key filter entirely.
///
/// # Example
/// ```rust
/// use pgslicer_core::config::SliceOptions;
///
/// let options = SliceOptions::new()
///     .with_limit(20)
///     .with_table_limit("orders", 5)
///     .with_dump_full("countries");
///
/// assert_eq!(options.limit_for("orders"), Some(5));
/// assert_eq!(options.limit_for("countries"), None);
/// assert_eq!(options.limit_for("users"), Some(20));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceOptions {
    /// Default row limit per table
    pub limit: usize,
    /// Per-table row limits
    pub custom_limits: BTreeMap<String, usize>,
    /// Tables sampled without a limit
    pub dump_full: BTreeSet<String>,
    /// Raw SQL boolean expressions used as the WHERE clause
    pub custom_conditions: BTreeMap<String, String>,
    /// Emit foreign-key constraints after the data
    pub emit_foreign_keys: bool,
}

impl Default for SliceOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            custom_limits: BTreeMap::new(),
            dump_full: BTreeSet::new(),
            custom_conditions: BTreeMap::new(),
            emit_foreign_keys: false,
        }
    }
}

impl SliceOptions {
    /// Creates options with the default limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the default limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Builder method to cap one table. Replaces a full dump of that table.
    pub fn with_table_limit(mut self, table: impl Into<String>, limit: usize) -> Self {
        let table = table.into();
        self.dump_full.remove(&table);
        self.custom_limits.insert(table, limit);
        self
    }

    /// Builder method to dump one table in full. Replaces its custom limit.
    pub fn with_dump_full(mut self, table: impl Into<String>) -> Self {
        let table = table.into();
        self.custom_limits.remove(&table);
        self.dump_full.insert(table);
        self
    }

    /// Builder method to set a custom WHERE expression for one table.
    pub fn with_table_condition(
        mut self,
        table: impl Into<String>,
        condition: impl Into<String>,
    ) -> Self {
        self.custom_conditions.insert(table.into(), condition.into());
        self
    }

    /// Builder method to enable/disable the post-data foreign-key section.
    pub fn with_foreign_keys(mut self, enabled: bool) -> Self {
        self.emit_foreign_keys = enabled;
        self
    }

    /// Resolved row limit for `table`; `None` means unbounded.
    pub fn limit_for(&self, table: &str) -> Option<usize> {
        if let Some(limit) = self.custom_limits.get(table) {
            return Some(*limit);
        }
        if self.dump_full.contains(table) {
            return None;
        }
        Some(self.limit)
    }

    /// Custom WHERE expression for `table`, if any.
    pub fn condition_for(&self, table: &str) -> Option<&str> {
        self.custom_conditions.get(table).map(String::as_str)
    }

    /// Whether `table` is sampled without a limit.
    pub fn is_dump_full(&self, table: &str) -> bool {
        self.dump_full.contains(table)
    }

    /// Whether `table` has a custom WHERE expression.
    pub fn has_custom_condition(&self, table: &str) -> bool {
        self.custom_conditions.contains_key(table)
    }

    /// Validates the options.
    ///
    /// # Errors
    /// Returns error for a zero default limit or a blank custom condition.
    pub fn validate(&self) -> Result<()> {
        if self.limit == 0 {
            return Err(SlicerError::configuration("limit must be greater than 0"));
        }

        if let Some((table, _)) = self
            .custom_conditions
            .iter()
            .find(|(_, condition)| condition.trim().is_empty())
        {
            return Err(SlicerError::configuration(format!(
                "condition for table '{}' cannot be empty",
                table
            )));
        }

        Ok(())
    }
}
