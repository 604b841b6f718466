//! Helper utilities shared by the adapter and the SQL generators.

/// Quotes an SQL identifier, doubling embedded double quotes.
///
/// ```rust
/// use pgslicer_core::adapters::quote_ident;
///
/// assert_eq!(quote_ident("users"), "\"users\"");
/// assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
/// ```
pub fn quote_ident(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// Quotes an SQL string literal, doubling embedded single quotes.
///
/// ```rust
/// use pgslicer_core::adapters::quote_literal;
///
/// assert_eq!(quote_literal("O'Brien"), "'O''Brien'");
/// ```
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(feature = "postgresql")]
pub use row::RowExt;

#[cfg(feature = "postgresql")]
mod row {
    use crate::Result;
    use crate::error::SlicerError;
    use sqlx::{Row, postgres::PgRow};

    /// Extension trait for extracting typed values from database rows
    /// with consistent error handling.
    ///
    /// # Example
    /// ```rust,ignore
    /// use pgslicer_core::adapters::helpers::RowExt;
    ///
    /// let name: String = row.get_field("relname", Some("pg_class"))?;
    /// let comment: Option<String> = row.get_field("comment", None)?;
    /// ```
    pub trait RowExt {
        /// Extracts a typed field from the row with proper error context.
        ///
        /// # Arguments
        /// * `field_name` - Name of the column to extract
        /// * `table_context` - Optional table name for error messages
        fn get_field<'r, T>(&'r self, field_name: &str, table_context: Option<&str>) -> Result<T>
        where
            T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>;
    }

    impl RowExt for PgRow {
        fn get_field<'r, T>(&'r self, field_name: &str, table_context: Option<&str>) -> Result<T>
        where
            T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
        {
            self.try_get(field_name)
                .map_err(|e| SlicerError::parse_field(field_name, table_context, e))
        }
    }
}
