//! Sampling queries.
//!
//! Rows are fetched through the simple query protocol, so every value
//! arrives in PostgreSQL's text output format. Each value is tagged once,
//! here, from the column's type name; nothing downstream inspects types.

use crate::Result;
use crate::adapters::SelectQuery;
use crate::error::SlicerError;
use crate::models::CellValue;
use futures::TryStreamExt;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row, TypeInfo, ValueRef};

/// Types whose text output is written as-is (no escaping needed).
const PLAIN_TEXT_TYPES: &[&str] = &[
    "NUMERIC",
    "DATE",
    "TIME",
    "TIMETZ",
    "TIMESTAMP",
    "TIMESTAMPTZ",
    "INTERVAL",
    "UUID",
    "INET",
    "CIDR",
    "MACADDR",
    "MACADDR8",
    "MONEY",
    "BIT",
    "VARBIT",
];

/// Runs `query` and returns every row with its values tagged.
pub(crate) async fn fetch_rows(pool: &PgPool, query: &SelectQuery) -> Result<Vec<Vec<CellValue>>> {
    let sql = query.to_sql();
    tracing::debug!("Sampling {} with query: {}", query.table, sql);

    let mut stream = sqlx::raw_sql(&sql).fetch(pool);
    let mut rows = Vec::new();

    while let Some(row) = stream
        .try_next()
        .await
        .map_err(|e| SlicerError::query_failed(&query.table, &sql, e))?
    {
        rows.push(decode_row(&row).map_err(|e| SlicerError::query_failed(&query.table, &sql, e))?);
    }

    tracing::debug!("Fetched {} rows from {}", rows.len(), query.table);
    Ok(rows)
}

fn decode_row(row: &PgRow) -> std::result::Result<Vec<CellValue>, sqlx::Error> {
    (0..row.len()).map(|index| decode_value(row, index)).collect()
}

fn decode_value(row: &PgRow, index: usize) -> std::result::Result<CellValue, sqlx::Error> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(CellValue::Null);
    }

    let type_name = raw.type_info().name().to_string();
    let text = <&str as sqlx::Decode<sqlx::Postgres>>::decode(raw).map_err(sqlx::Error::Decode)?;
    Ok(tag_text_value(&type_name, text))
}

/// Tags a value in text output format by its PostgreSQL type name.
///
/// Booleans, integers, finite floats and JSON documents become typed
/// values; scalar types whose text output never needs escaping become
/// [`CellValue::Other`]; everything else, including arrays, `bytea`, enums
/// and unknown types, is [`CellValue::Text`] so that it gets escaped.
/// A value that does not parse as its declared type falls back to text.
///
/// ```rust
/// use pgslicer_core::adapters::postgres::tag_text_value;
/// use pgslicer_core::models::CellValue;
///
/// assert_eq!(tag_text_value("INT4", "42"), CellValue::Int(42));
/// assert_eq!(tag_text_value("BOOL", "t"), CellValue::Bool(true));
/// assert_eq!(tag_text_value("TEXT", "a\tb"), CellValue::Text("a\tb".to_string()));
/// ```
pub fn tag_text_value(type_name: &str, text: &str) -> CellValue {
    match type_name {
        "BOOL" => match text {
            "t" => CellValue::Bool(true),
            "f" => CellValue::Bool(false),
            other => CellValue::Other(other.to_string()),
        },
        "INT2" | "INT4" | "INT8" | "OID" => text
            .parse()
            .map_or_else(|_| CellValue::Other(text.to_string()), CellValue::Int),
        "FLOAT4" | "FLOAT8" => match text.parse::<f64>() {
            Ok(value) if value.is_finite() => CellValue::Float(value),
            _ => CellValue::Other(text.to_string()),
        },
        "JSON" | "JSONB" => serde_json::from_str(text)
            .map_or_else(|_| CellValue::Text(text.to_string()), CellValue::Json),
        name if PLAIN_TEXT_TYPES.contains(&name) => CellValue::Other(text.to_string()),
        _ => CellValue::Text(text.to_string()),
    }
}
