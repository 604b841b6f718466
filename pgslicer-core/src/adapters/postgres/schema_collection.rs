//! PostgreSQL schema collection.
//!
//! Introspects every ordinary or partitioned table visible on the search
//! path, plus sequences and extensions, from `pg_catalog`. Tables come back
//! ordered by name, which fixes the order every later stage works in.

use super::PostgresAdapter;
use super::views;
use crate::Result;
use crate::adapters::helpers::RowExt;
use crate::error::SlicerError;
use crate::models::*;
use sqlx::postgres::types::Oid;

/// Main entry point for schema collection
pub(crate) async fn collect_schema(adapter: &PostgresAdapter) -> Result<DatabaseSchema> {
    let start_time = std::time::Instant::now();

    tracing::info!("Starting PostgreSQL schema collection for {}", adapter.config);

    let database_name: String = sqlx::query_scalar("SELECT current_database()::text")
        .fetch_one(&adapter.pool)
        .await
        .map_err(|e| SlicerError::introspection_failed("Failed to read database name", e))?;

    let extensions = adapter.collect_extensions().await?;
    let sequences = adapter.collect_sequences().await?;
    let tables = adapter.collect_tables().await?;
    let collected_views = views::collect_views(&adapter.pool).await?;

    tracing::info!(
        "PostgreSQL schema collection completed in {:.2}s - found {} tables, {} sequences, {} extensions, {} views",
        start_time.elapsed().as_secs_f64(),
        tables.len(),
        sequences.len(),
        extensions.len(),
        collected_views.len()
    );

    Ok(DatabaseSchema {
        database_name,
        tables,
        sequences,
        extensions,
        views: collected_views,
    })
}

impl PostgresAdapter {
    /// Collects all visible tables with columns, indexes and relations
    pub(crate) async fn collect_tables(&self) -> Result<Vec<Table>> {
        tracing::debug!("Starting table enumeration for PostgreSQL database");

        // Partitions are sampled through their parent table
        let tables_query = r#"
            SELECT
                c.oid AS table_oid,
                c.relname::text AS table_name,
                pg_catalog.obj_description(c.oid, 'pg_class') AS table_comment
            FROM pg_catalog.pg_class c
            LEFT JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
            WHERE c.relkind IN ('r', 'p')
            AND NOT c.relispartition
            AND n.nspname <> 'pg_catalog'
            AND n.nspname <> 'information_schema'
            AND n.nspname !~ '^pg_toast'
            AND pg_catalog.pg_table_is_visible(c.oid)
            ORDER BY c.relname
        "#;

        let table_rows = sqlx::query(tables_query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to enumerate tables: {}", e);
                SlicerError::introspection_failed("Failed to enumerate database tables", e)
            })?;

        let mut tables = Vec::with_capacity(table_rows.len());

        for row in &table_rows {
            let oid: Oid = row.get_field("table_oid", Some("pg_class"))?;
            let table_name: String = row.get_field("table_name", Some("pg_class"))?;
            let comment: Option<String> = row.get_field("table_comment", Some("pg_class"))?;

            let mut table = Table::new(&table_name);
            table.comment = comment;
            table.columns = self.collect_table_columns(oid, &table_name).await?;
            table.indexes = self.collect_table_indexes(oid, &table_name).await?;
            table.relations = self.collect_table_relations(oid, &table_name).await?;

            tracing::debug!(
                "Collected table '{}' with {} columns, {} relations, {} indexes",
                table.name,
                table.columns.len(),
                table.relations.len(),
                table.indexes.len()
            );

            tables.push(table);
        }

        tracing::info!("Successfully collected {} tables", tables.len());
        Ok(tables)
    }

    /// Collects column metadata for a specific table
    pub(crate) async fn collect_table_columns(
        &self,
        oid: Oid,
        table_name: &str,
    ) -> Result<Vec<Column>> {
        let columns_query = r#"
            SELECT
                a.attname::text AS column_name,
                pg_catalog.format_type(a.atttypid, a.atttypmod) AS data_type,
                pg_catalog.pg_get_expr(d.adbin, d.adrelid) AS default_value,
                a.attnotnull AS not_null,
                a.attnum::int4 AS position,
                pg_catalog.col_description(a.attrelid, a.attnum) AS column_comment
            FROM pg_catalog.pg_attribute a
            LEFT JOIN pg_catalog.pg_attrdef d
                ON d.adrelid = a.attrelid AND d.adnum = a.attnum AND a.atthasdef
            WHERE a.attrelid = $1
            AND a.attnum > 0
            AND NOT a.attisdropped
            ORDER BY a.attnum
        "#;

        let rows = sqlx::query(columns_query)
            .bind(oid)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                SlicerError::introspection_failed(
                    format!("Failed to collect columns for table '{}'", table_name),
                    e,
                )
            })?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            let position: i32 = row.get_field("position", Some(table_name))?;
            let position = u32::try_from(position)
                .map_err(|e| SlicerError::parse_field("position", Some(table_name), e))?;

            columns.push(Column {
                name: row.get_field("column_name", Some(table_name))?,
                data_type: row.get_field("data_type", Some(table_name))?,
                default_value: row.get_field("default_value", Some(table_name))?,
                not_null: row.get_field("not_null", Some(table_name))?,
                position,
                comment: row.get_field("column_comment", Some(table_name))?,
            });
        }

        Ok(columns)
    }

    /// Collects indexes, with the definition of the primary key, unique or
    /// exclusion constraint each one backs
    pub(crate) async fn collect_table_indexes(
        &self,
        oid: Oid,
        table_name: &str,
    ) -> Result<Vec<Index>> {
        let indexes_query = r#"
            SELECT
                c2.relname::text AS index_name,
                i.indisprimary AS is_primary,
                i.indisunique AS is_unique,
                pg_catalog.pg_get_indexdef(i.indexrelid, 0, true) AS create_statement,
                pg_catalog.pg_get_constraintdef(con.oid, true) AS constraint_definition
            FROM pg_catalog.pg_index i
            JOIN pg_catalog.pg_class c2 ON c2.oid = i.indexrelid
            LEFT JOIN pg_catalog.pg_constraint con
                ON con.conrelid = i.indrelid
                AND con.conindid = i.indexrelid
                AND con.contype IN ('p', 'u', 'x')
            WHERE i.indrelid = $1
            ORDER BY i.indisprimary DESC, i.indisunique DESC, c2.relname
        "#;

        let rows = sqlx::query(indexes_query)
            .bind(oid)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                SlicerError::introspection_failed(
                    format!("Failed to collect indexes for table '{}'", table_name),
                    e,
                )
            })?;

        rows.iter()
            .map(|row| -> Result<Index> {
                Ok(Index {
                    name: row.get_field("index_name", Some(table_name))?,
                    is_primary: row.get_field("is_primary", Some(table_name))?,
                    is_unique: row.get_field("is_unique", Some(table_name))?,
                    create_statement: row.get_field("create_statement", Some(table_name))?,
                    constraint_definition: row
                        .get_field("constraint_definition", Some(table_name))?,
                })
            })
            .collect()
    }

    /// Collects parent relations (foreign keys declared on this table)
    /// followed by child relations (foreign keys referencing it).
    ///
    /// Only the first column pair of a composite key is recorded.
    pub(crate) async fn collect_table_relations(
        &self,
        oid: Oid,
        table_name: &str,
    ) -> Result<Vec<Relation>> {
        let parents_query = r#"
            SELECT
                r.conname::text AS constraint_name,
                c.relname::text AS other_table,
                pg_catalog.pg_get_constraintdef(r.oid, true) AS definition,
                r.conkey[1]::int4 AS source_position,
                r.confkey[1]::int4 AS destination_position
            FROM pg_catalog.pg_constraint r
            JOIN pg_catalog.pg_class c ON c.oid = r.confrelid
            WHERE r.conrelid = $1
            AND r.contype = 'f'
            ORDER BY 1
        "#;

        let children_query = r#"
            SELECT
                r.conname::text AS constraint_name,
                c.relname::text AS other_table,
                pg_catalog.pg_get_constraintdef(r.oid, true) AS definition
            FROM pg_catalog.pg_constraint r
            JOIN pg_catalog.pg_class c ON c.oid = r.conrelid
            WHERE r.confrelid = $1
            AND r.contype = 'f'
            ORDER BY 1
        "#;

        let relation_error = |e| {
            SlicerError::introspection_failed(
                format!("Failed to collect foreign keys for table '{}'", table_name),
                e,
            )
        };

        let parent_rows = sqlx::query(parents_query)
            .bind(oid)
            .fetch_all(&self.pool)
            .await
            .map_err(relation_error)?;
        let child_rows = sqlx::query(children_query)
            .bind(oid)
            .fetch_all(&self.pool)
            .await
            .map_err(relation_error)?;

        let mut relations = Vec::with_capacity(parent_rows.len() + child_rows.len());

        for row in &parent_rows {
            let source: Option<i32> = row.get_field("source_position", Some(table_name))?;
            let destination: Option<i32> =
                row.get_field("destination_position", Some(table_name))?;

            relations.push(Relation {
                table: row.get_field("other_table", Some(table_name))?,
                constraint_name: row.get_field("constraint_name", Some(table_name))?,
                kind: RelationKind::Parent,
                definition: row.get_field("definition", Some(table_name))?,
                source_position: source.and_then(|p| u32::try_from(p).ok()),
                destination_position: destination.and_then(|p| u32::try_from(p).ok()),
            });
        }

        for row in &child_rows {
            let other_table: String = row.get_field("other_table", Some(table_name))?;
            let constraint_name: String = row.get_field("constraint_name", Some(table_name))?;
            let definition: String = row.get_field("definition", Some(table_name))?;
            relations.push(Relation::child(other_table, constraint_name).with_definition(definition));
        }

        Ok(relations)
    }

    /// Collects sequences visible on the search path
    pub(crate) async fn collect_sequences(&self) -> Result<Vec<Sequence>> {
        let sequences_query = r#"
            SELECT
                s.sequencename::text AS sequence_name,
                s.start_value,
                s.min_value,
                s.increment_by,
                s.last_value
            FROM pg_catalog.pg_sequences s
            JOIN pg_catalog.pg_namespace n ON n.nspname = s.schemaname
            JOIN pg_catalog.pg_class c ON c.relnamespace = n.oid AND c.relname = s.sequencename
            WHERE pg_catalog.pg_table_is_visible(c.oid)
            ORDER BY s.sequencename
        "#;

        let rows = sqlx::query(sequences_query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| SlicerError::introspection_failed("Failed to enumerate sequences", e))?;

        let sequences = rows
            .iter()
            .map(|row| -> Result<Sequence> {
                Ok(Sequence {
                    name: row.get_field("sequence_name", Some("pg_sequences"))?,
                    start_value: row.get_field("start_value", Some("pg_sequences"))?,
                    min_value: row.get_field("min_value", Some("pg_sequences"))?,
                    increment_by: row.get_field("increment_by", Some("pg_sequences"))?,
                    last_value: row.get_field("last_value", Some("pg_sequences"))?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!("Collected {} sequences", sequences.len());
        Ok(sequences)
    }

    /// Collects installed extensions with their comments
    pub(crate) async fn collect_extensions(&self) -> Result<Vec<Extension>> {
        let extensions_query = r#"
            SELECT
                e.extname::text AS extension_name,
                n.nspname::text AS schema_name,
                d.description AS extension_comment
            FROM pg_catalog.pg_extension e
            LEFT JOIN pg_catalog.pg_namespace n ON n.oid = e.extnamespace
            LEFT JOIN pg_catalog.pg_description d
                ON d.objoid = e.oid
                AND d.classoid = 'pg_catalog.pg_extension'::pg_catalog.regclass
            ORDER BY n.nspname, e.extname
        "#;

        let rows = sqlx::query(extensions_query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| SlicerError::introspection_failed("Failed to enumerate extensions", e))?;

        let extensions = rows
            .iter()
            .map(|row| -> Result<Extension> {
                Ok(Extension {
                    name: row.get_field("extension_name", Some("pg_extension"))?,
                    schema: row.get_field("schema_name", Some("pg_extension"))?,
                    comment: row.get_field("extension_comment", Some("pg_extension"))?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!("Collected {} extensions", extensions.len());
        Ok(extensions)
    }
}
