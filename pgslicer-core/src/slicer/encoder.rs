//! Bulk-load encoding in PostgreSQL `COPY ... FROM stdin` text format.
//!
//! Per value, in priority order:
//! 1. null: `\N`
//! 2. boolean: `t` / `f`
//! 3. JSON document: compact serialization, written as-is
//! 4. integer, float and other scalars: their text rendering
//! 5. text: escaped by [`escape_text`]

use crate::models::CellValue;

/// Null marker of the text format.
pub const NULL_MARKER: &str = "\\N";

/// Line ending a COPY data section.
pub const END_OF_DATA: &str = "\\.";

/// Keywords that cannot be used as a bare table name: reserved keywords
/// and type/function-name keywords.
const RESERVED_WORDS: &[&str] = &[
    "authorization", "binary", "collation", "concurrently", "cross", "current_schema",
    "freeze", "full", "ilike", "inner", "is", "isnull", "join", "left", "like", "natural",
    "notnull", "outer", "overlaps", "right", "similar", "tablesample", "verbose",
    "all", "analyse", "analyze", "and", "any", "array", "as", "asc", "asymmetric", "both",
    "case", "cast", "check", "collate", "column", "constraint", "create", "current_catalog",
    "current_date", "current_role", "current_time", "current_timestamp", "current_user",
    "default", "deferrable", "desc", "distinct", "do", "else", "end", "except", "false", "fetch",
    "for", "foreign", "from", "grant", "group", "having", "in", "initially", "intersect", "into",
    "lateral", "leading", "limit", "localtime", "localtimestamp", "not", "null", "offset", "on",
    "only", "or", "order", "placing", "primary", "references", "returning", "select",
    "session_user", "some", "symmetric", "system_user", "table", "then", "to", "trailing",
    "true", "union", "unique", "user", "using", "variadic", "when", "where", "window", "with",
];

/// Encodes one value.
pub fn encode_value(cell: &CellValue) -> String {
    match cell {
        CellValue::Null => NULL_MARKER.to_string(),
        CellValue::Bool(true) => "t".to_string(),
        CellValue::Bool(false) => "f".to_string(),
        CellValue::Json(document) => document.to_string(),
        CellValue::Int(value) => value.to_string(),
        CellValue::Float(value) => value.to_string(),
        CellValue::Other(text) => text.clone(),
        CellValue::Text(text) => escape_text(text),
    }
}

/// Encodes a row into its fields.
///
/// ```rust
/// use pgslicer_core::models::CellValue;
/// use pgslicer_core::slicer::encoder::encode_row;
///
/// let fields = encode_row(&[
///     CellValue::Null,
///     CellValue::Bool(true),
///     CellValue::Bool(false),
///     CellValue::from("a\tb"),
/// ]);
/// assert_eq!(fields, ["\\N", "t", "f", "a\\tb"]);
/// ```
pub fn encode_row(cells: &[CellValue]) -> Vec<String> {
    cells.iter().map(encode_value).collect()
}

/// Escapes text, applying left to right: `\` to `\\`, CRLF to LF, LF to
/// the escape `\r\n`, TAB to the escape `\t`.
///
/// CRLF and LF both come out as `\r\n`, so line endings are normalized.
pub fn escape_text(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace("\r\n", "\n")
        .replace('\n', "\\r\\n")
        .replace('\t', "\\t")
}

/// Name as written after `COPY`: bare for a plain lower-case identifier,
/// double-quoted otherwise.
pub fn copy_target(table: &str) -> String {
    let mut chars = table.chars();
    let plain = chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && !RESERVED_WORDS.contains(&table);

    if plain {
        table.to_string()
    } else {
        crate::adapters::quote_ident(table)
    }
}

/// Renders one bulk-load block, or `None` when there are no rows.
///
/// Fields are tab-separated and rows newline-separated; the block ends with
/// the `\.` line and a blank line.
pub fn copy_block<'a, I>(table: &str, rows: I) -> Option<String>
where
    I: IntoIterator<Item = &'a [String]>,
{
    let lines: Vec<String> = rows.into_iter().map(|fields| fields.join("\t")).collect();
    if lines.is_empty() {
        return None;
    }

    Some(format!(
        "COPY {} FROM stdin;\n{}\n{}\n\n",
        copy_target(table),
        lines.join("\n"),
        END_OF_DATA
    ))
}
