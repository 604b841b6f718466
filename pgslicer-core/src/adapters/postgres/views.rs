//! PostgreSQL view collection.

use crate::Result;
use crate::adapters::helpers::RowExt;
use crate::error::SlicerError;
use crate::models::View;
use sqlx::PgPool;

/// Collects views visible on the search path.
///
/// Views are returned in creation (oid) order so that a view is normally
/// defined before the views built on it.
pub async fn collect_views(pool: &PgPool) -> Result<Vec<View>> {
    tracing::debug!("Starting view collection for PostgreSQL database");

    let views_query = r#"
        SELECT
            c.relname::text AS view_name,
            pg_catalog.pg_get_viewdef(c.oid, true) AS view_definition
        FROM pg_catalog.pg_class c
        LEFT JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
        WHERE c.relkind = 'v'
        AND n.nspname <> 'pg_catalog'
        AND n.nspname <> 'information_schema'
        AND pg_catalog.pg_table_is_visible(c.oid)
        ORDER BY c.oid
    "#;

    let view_rows = sqlx::query(views_query)
        .fetch_all(pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to enumerate views: {}", e);
            SlicerError::introspection_failed("Failed to enumerate database views", e)
        })?;

    let mut views = Vec::with_capacity(view_rows.len());

    for row in &view_rows {
        let name: String = row.get_field("view_name", Some("pg_class"))?;
        let definition: String = row.get_field("view_definition", Some("pg_class"))?;
        tracing::debug!("Collected view '{}'", name);
        views.push(View { name, definition });
    }

    tracing::info!("Successfully collected {} views", views.len());
    Ok(views)
}
