//! Filter conditions derived from already-sampled parent rows.

use super::SampleContext;
use crate::adapters::{quote_ident, quote_literal};
use crate::models::{CellValue, DatabaseSchema, Relation, Table};
use std::collections::HashSet;

/// Builds `"<local column>" IN (...)` for one parent relation of `table`.
///
/// Returns `None` when the relation cannot constrain the table: it is not a
/// mandatory parent relation, a column position does not resolve, or the
/// parent has no sampled row carrying a non-null value.
pub fn build(
    schema: &DatabaseSchema,
    table: &Table,
    relation: &Relation,
    context: &SampleContext,
) -> Option<String> {
    if !table.is_mandatory(relation) {
        return None;
    }
    let local = table.local_column(relation)?;
    let parent = schema.table(&relation.table)?;
    let index = parent.column_index(relation.destination_position?)?;
    let sample = context.get(&parent.name).filter(|set| !set.is_empty())?;

    let mut seen = HashSet::new();
    let values: Vec<String> = sample
        .rows()
        .iter()
        .filter_map(|row| row.cells.get(index))
        .filter(|cell| !cell.is_null())
        .map(render_literal)
        .filter(|literal| seen.insert(literal.clone()))
        .collect();

    if values.is_empty() {
        return None;
    }

    Some(format!(
        "{} IN ({})",
        quote_ident(&local.name),
        values.join(", ")
    ))
}

/// OR-combines the conditions of every relation of `table`.
///
/// Each contributing condition is parenthesised. A row is kept when it
/// matches any sampled parent.
pub fn combine(schema: &DatabaseSchema, table: &Table, context: &SampleContext) -> Option<String> {
    let parts: Vec<String> = table
        .relations
        .iter()
        .filter_map(|relation| {
            let condition = build(schema, table, relation, context);
            if condition.is_none() && relation.is_parent() {
                tracing::debug!(
                    "Relation '{}' of '{}' contributes no condition",
                    relation.constraint_name,
                    table.name
                );
            }
            condition
        })
        .map(|condition| format!("({})", condition))
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" OR "))
    }
}

fn render_literal(cell: &CellValue) -> String {
    match cell {
        CellValue::Int(value) => value.to_string(),
        CellValue::Bool(true) => quote_literal("t"),
        CellValue::Bool(false) => quote_literal("f"),
        CellValue::Float(value) => quote_literal(&value.to_string()),
        CellValue::Json(document) => quote_literal(&document.to_string()),
        CellValue::Text(text) | CellValue::Other(text) => quote_literal(text),
        CellValue::Null => "NULL".to_string(),
    }
}
