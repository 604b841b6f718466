//! Dump generation: schema DDL, sampled data and optional foreign keys.

use crate::Result;
use crate::adapters::SourceAdapter;
use crate::config::SliceOptions;
use crate::ddl;
use crate::slicer::{SliceSummary, Slicer};

/// A generated dump, kept in memory until every query has succeeded.
#[derive(Debug, Clone)]
pub struct Dump {
    /// Table, sequence and extension definitions
    pub schema_sql: String,
    /// COPY blocks in processing order
    pub data_sql: String,
    /// Foreign-key constraints, when requested
    pub post_data_sql: Option<String>,
    /// Statistics of the sampling run
    pub summary: SliceSummary,
}

impl Dump {
    /// Concatenates the sections in load order.
    pub fn render(&self) -> String {
        let mut output = String::with_capacity(
            self.schema_sql.len()
                + self.data_sql.len()
                + self.post_data_sql.as_ref().map_or(0, String::len),
        );
        output.push_str(&self.schema_sql);
        output.push_str(&self.data_sql);
        if let Some(post_data) = &self.post_data_sql {
            output.push_str(post_data);
        }
        output
    }
}

/// Introspects the source, samples every table and renders the dump.
///
/// # Errors
/// Returns error for invalid options or the first failing catalog or
/// sampling query.
pub async fn generate_dump(adapter: &dyn SourceAdapter, options: &SliceOptions) -> Result<Dump> {
    options.validate()?;

    let schema = adapter.collect_schema().await?;
    tracing::info!(
        "Collected {} objects from database '{}'",
        schema.object_count(),
        schema.database_name
    );

    let outcome = Slicer::new(adapter, &schema, options).run().await?;

    let schema_sql = ddl::render_schema(&schema, outcome.layering.order());
    let data_sql = outcome.copy_blocks();
    let post_data_sql = options
        .emit_foreign_keys
        .then(|| ddl::render_foreign_keys(&schema));

    Ok(Dump {
        schema_sql,
        data_sql,
        post_data_sql,
        summary: outcome.summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CellValue, Column, DatabaseSchema, Relation, Table};
    use crate::slicer::testing::FakeAdapter;

    fn schema() -> DatabaseSchema {
        DatabaseSchema::new("shop")
            .with_table(
                Table::new("orders")
                    .with_column(Column::new("id", "integer", 1).not_null())
                    .with_column(Column::new("user_id", "integer", 2).not_null())
                    .with_relation(
                        Relation::parent("users", "orders_user_fk", 2, 1)
                            .with_definition("FOREIGN KEY (user_id) REFERENCES users(id)"),
                    ),
            )
            .with_table(
                Table::new("users")
                    .with_column(Column::new("id", "integer", 1).not_null())
                    .with_relation(Relation::child("orders", "orders_user_fk")),
            )
    }

    fn adapter() -> FakeAdapter {
        FakeAdapter::new(schema())
            .with_rows("users", vec![vec![CellValue::Int(1)]])
            .with_rows("orders", vec![vec![CellValue::Int(5), CellValue::Int(1)]])
    }

    #[tokio::test]
    async fn test_generate_dump_sections_in_order() {
        let adapter = adapter();
        let dump = generate_dump(&adapter, &SliceOptions::new()).await.unwrap();

        let rendered = dump.render();
        let users_table = rendered.find("CREATE TABLE IF NOT EXISTS \"users\"").unwrap();
        let orders_table = rendered.find("CREATE TABLE IF NOT EXISTS \"orders\"").unwrap();
        let users_data = rendered.find("COPY users FROM stdin;").unwrap();
        let orders_data = rendered.find("COPY orders FROM stdin;").unwrap();
        assert!(users_table < orders_table);
        assert!(orders_table < users_data);
        assert!(users_data < orders_data);
        assert!(dump.post_data_sql.is_none());
        assert!(!rendered.contains("ALTER TABLE"));
        assert_eq!(dump.summary.rows_sampled, 2);
    }

    #[tokio::test]
    async fn test_generate_dump_with_foreign_keys() {
        let adapter = adapter();
        let options = SliceOptions::new().with_foreign_keys(true);
        let dump = generate_dump(&adapter, &options).await.unwrap();

        let rendered = dump.render();
        assert!(rendered.ends_with(
            "ALTER TABLE ONLY \"orders\" ADD CONSTRAINT \"orders_user_fk\" \
             FOREIGN KEY (user_id) REFERENCES users(id);\n\n"
        ));
    }

    #[tokio::test]
    async fn test_generate_dump_rejects_invalid_options() {
        let adapter = adapter();
        let result = generate_dump(&adapter, &SliceOptions::new().with_limit(0)).await;
        assert!(matches!(
            result,
            Err(crate::SlicerError::Configuration { .. })
        ));
        assert!(adapter.queries().is_empty());
    }

    #[tokio::test]
    async fn test_generate_dump_fails_without_partial_output() {
        let adapter = adapter().failing_on("orders");
        let result = generate_dump(&adapter, &SliceOptions::new()).await;
        assert!(result.is_err());
    }
}
