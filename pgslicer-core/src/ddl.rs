//! SQL schema rendering from introspected metadata.
//!
//! The schema half of a dump recreates extensions, sequences, tables (with
//! their primary/unique/exclusion constraints, indexes and comments) and
//! views. Foreign keys are not part of it: they are rendered separately by
//! [`render_foreign_keys`] so they can be applied after the data.

use crate::adapters::{quote_ident, quote_literal};
use crate::models::{DatabaseSchema, Extension, Sequence, Table, View};
use std::fmt::Write;

/// Renders the schema DDL, creating tables in `order`.
///
/// Tables of the schema that `order` does not name are created after the
/// ordered ones, in schema order.
pub fn render_schema<'a, I>(schema: &DatabaseSchema, order: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut sql = String::new();

    for extension in &schema.extensions {
        sql.push_str(&render_extension(extension));
    }
    if !schema.extensions.is_empty() {
        sql.push('\n');
    }

    for sequence in &schema.sequences {
        sql.push_str(&render_sequence(sequence));
        sql.push('\n');
    }

    let mut ordered: Vec<&Table> = Vec::with_capacity(schema.tables.len());
    for name in order {
        if let Some(table) = schema.table(name) {
            if !ordered.iter().any(|t| t.name == table.name) {
                ordered.push(table);
            }
        }
    }
    for table in &schema.tables {
        if !ordered.iter().any(|t| t.name == table.name) {
            ordered.push(table);
        }
    }

    for table in ordered {
        sql.push_str(&render_table(table));
        sql.push('\n');
    }

    for view in &schema.views {
        sql.push_str(&render_view(view));
        sql.push('\n');
    }

    sql
}

/// Renders `ALTER TABLE ONLY ... ADD CONSTRAINT ...` for every foreign key.
pub fn render_foreign_keys(schema: &DatabaseSchema) -> String {
    let mut sql = String::new();
    for table in &schema.tables {
        for relation in table.parent_relations() {
            if relation.definition.is_empty() {
                continue;
            }
            let _ = writeln!(
                sql,
                "ALTER TABLE ONLY {} ADD CONSTRAINT {} {};",
                quote_ident(&table.name),
                quote_ident(&relation.constraint_name),
                relation.definition
            );
        }
    }
    if !sql.is_empty() {
        sql.push('\n');
    }
    sql
}

fn render_extension(extension: &Extension) -> String {
    let mut sql = format!(
        "CREATE EXTENSION IF NOT EXISTS {} WITH SCHEMA {};\n",
        quote_ident(&extension.name),
        quote_ident(&extension.schema)
    );
    if let Some(comment) = &extension.comment {
        let _ = writeln!(
            sql,
            "COMMENT ON EXTENSION {} IS {};",
            quote_ident(&extension.name),
            quote_literal(comment)
        );
    }
    sql
}

fn render_sequence(sequence: &Sequence) -> String {
    let name = quote_ident(&sequence.name);
    let mut sql = format!(
        "CREATE SEQUENCE IF NOT EXISTS {} INCREMENT {} MINVALUE {} START {};\n",
        name, sequence.increment_by, sequence.min_value, sequence.start_value
    );
    if let Some(last_value) = sequence.last_value {
        let _ = writeln!(
            sql,
            "SELECT pg_catalog.setval({}, {}, true);",
            quote_literal(&name),
            last_value
        );
    }
    sql
}

fn render_table(table: &Table) -> String {
    let table_name = quote_ident(&table.name);

    let mut lines: Vec<String> = table
        .columns
        .iter()
        .map(|column| {
            let mut line = format!("\t{} {}", quote_ident(&column.name), column.data_type);
            if let Some(default) = &column.default_value {
                line.push_str(" DEFAULT ");
                line.push_str(default);
            }
            if column.not_null {
                line.push_str(" NOT NULL");
            }
            line
        })
        .collect();

    lines.extend(table.indexes.iter().filter_map(|index| {
        index
            .constraint_definition
            .as_ref()
            .map(|definition| format!("\tCONSTRAINT {} {}", quote_ident(&index.name), definition))
    }));

    let mut sql = format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{}\n);\n",
        table_name,
        lines.join(",\n")
    );

    for index in table
        .indexes
        .iter()
        .filter(|index| index.constraint_definition.is_none())
    {
        let _ = writeln!(sql, "{};", index.create_statement);
    }

    if let Some(comment) = &table.comment {
        let _ = writeln!(
            sql,
            "COMMENT ON TABLE {} IS {};",
            table_name,
            quote_literal(comment)
        );
    }
    for column in &table.columns {
        if let Some(comment) = &column.comment {
            let _ = writeln!(
                sql,
                "COMMENT ON COLUMN {}.{} IS {};",
                table_name,
                quote_ident(&column.name),
                quote_literal(comment)
            );
        }
    }

    sql
}

fn render_view(view: &View) -> String {
    let definition = view.definition.trim_end();
    let terminator = if definition.ends_with(';') { "" } else { ";" };
    format!(
        "CREATE OR REPLACE VIEW {} AS\n{}{}\n",
        quote_ident(&view.name),
        definition,
        terminator
    )
}
