//! Schema model and row values.
//!
//! These structures are produced by the catalog introspection in
//! [`crate::adapters`] and consumed read-only by the slicer and the DDL
//! generator. A schema never changes during a run.

use serde::{Deserialize, Serialize};

/// Table column as introspected from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    /// Declared type as printed by `format_type`; never interpreted.
    pub data_type: String,
    pub default_value: Option<String>,
    pub not_null: bool,
    /// 1-based attribute number; gaps appear after dropped columns.
    pub position: u32,
    pub comment: Option<String>,
}

impl Column {
    /// Creates a nullable column without default or comment.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, position: u32) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            default_value: None,
            not_null: false,
            position,
            comment: None,
        }
    }

    /// Builder method to mark the column NOT NULL.
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Builder method to set the default expression.
    pub fn with_default(mut self, expression: impl Into<String>) -> Self {
        self.default_value = Some(expression.into());
        self
    }
}

/// Direction of a foreign-key relation as seen from the owning table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationKind {
    /// The owning table references `Relation::table`
    Parent,
    /// `Relation::table` references the owning table
    Child,
}

/// One side of a foreign-key constraint.
///
/// The parent entry on the referencing table and the child entry on the
/// referenced table are independent values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    /// Table at the other end of the constraint
    pub table: String,
    pub constraint_name: String,
    pub kind: RelationKind,
    /// `pg_get_constraintdef` output, e.g. `FOREIGN KEY (user_id) REFERENCES users(id)`
    pub definition: String,
    /// Position of the referencing column (first column of a composite key)
    pub source_position: Option<u32>,
    /// Position of the referenced column on the parent table
    pub destination_position: Option<u32>,
}

impl Relation {
    /// Creates a parent relation from `source_position` on the owning table
    /// to `destination_position` on `table`.
    pub fn parent(
        table: impl Into<String>,
        constraint_name: impl Into<String>,
        source_position: u32,
        destination_position: u32,
    ) -> Self {
        Self {
            table: table.into(),
            constraint_name: constraint_name.into(),
            kind: RelationKind::Parent,
            definition: String::new(),
            source_position: Some(source_position),
            destination_position: Some(destination_position),
        }
    }

    /// Creates a child relation pointing back at the referencing `table`.
    pub fn child(table: impl Into<String>, constraint_name: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            constraint_name: constraint_name.into(),
            kind: RelationKind::Child,
            definition: String::new(),
            source_position: None,
            destination_position: None,
        }
    }

    /// Builder method to set the constraint definition text.
    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = definition.into();
        self
    }

    pub fn is_parent(&self) -> bool {
        self.kind == RelationKind::Parent
    }
}

/// Index descriptor, opaque to the slicer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub is_primary: bool,
    pub is_unique: bool,
    /// `pg_get_indexdef` output
    pub create_statement: String,
    /// Definition of the constraint backed by this index (primary key,
    /// unique or exclusion), if any
    pub constraint_definition: Option<String>,
}

/// Database table with its columns, relations and indexes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub relations: Vec<Relation>,
    pub indexes: Vec<Index>,
    pub comment: Option<String>,
}

impl Table {
    /// Creates an empty table.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            relations: Vec::new(),
            indexes: Vec::new(),
            comment: None,
        }
    }

    /// Builder method to append a column.
    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Builder method to append a relation.
    pub fn with_relation(mut self, relation: Relation) -> Self {
        self.relations.push(relation);
        self
    }

    /// Looks up a column by its attribute position.
    pub fn column_at(&self, position: u32) -> Option<&Column> {
        self.columns.iter().find(|c| c.position == position)
    }

    /// Index into the declared column list (and so into a fetched row) of
    /// the column at `position`.
    pub fn column_index(&self, position: u32) -> Option<usize> {
        self.columns.iter().position(|c| c.position == position)
    }

    pub fn parent_relations(&self) -> impl Iterator<Item = &Relation> {
        self.relations.iter().filter(|r| r.is_parent())
    }

    /// A root table has no parent relation at all, mandatory or optional.
    pub fn is_root(&self) -> bool {
        !self.relations.iter().any(Relation::is_parent)
    }

    /// The local column of a parent relation, if its position resolves.
    pub fn local_column(&self, relation: &Relation) -> Option<&Column> {
        if !relation.is_parent() {
            return None;
        }
        relation.source_position.and_then(|p| self.column_at(p))
    }

    /// A relation is mandatory when it is a parent relation whose local
    /// column resolves and is declared NOT NULL.
    pub fn is_mandatory(&self, relation: &Relation) -> bool {
        self.local_column(relation).is_some_and(|c| c.not_null)
    }
}

/// Sequence definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    pub name: String,
    pub start_value: i64,
    pub min_value: i64,
    pub increment_by: i64,
    /// `None` until `nextval` has been called once
    pub last_value: Option<i64>,
}

/// Installed extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extension {
    pub name: String,
    pub schema: String,
    pub comment: Option<String>,
}

/// View definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    pub name: String,
    pub definition: String,
}

/// Complete introspected schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSchema {
    pub database_name: String,
    /// Tables in catalog order; names are unique
    pub tables: Vec<Table>,
    pub sequences: Vec<Sequence>,
    pub extensions: Vec<Extension>,
    pub views: Vec<View>,
}

impl DatabaseSchema {
    /// Creates an empty schema for `database_name`.
    pub fn new(database_name: impl Into<String>) -> Self {
        Self {
            database_name: database_name.into(),
            ..Default::default()
        }
    }

    /// Builder method to append a table.
    pub fn with_table(mut self, table: Table) -> Self {
        self.tables.push(table);
        self
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn contains_table(&self, name: &str) -> bool {
        self.table(name).is_some()
    }

    /// Root tables in catalog order.
    pub fn root_tables(&self) -> Vec<&str> {
        self.tables
            .iter()
            .filter(|t| t.is_root())
            .map(|t| t.name.as_str())
            .collect()
    }

    /// Gets the total number of schema objects
    pub fn object_count(&self) -> usize {
        self.tables.len() + self.sequences.len() + self.extensions.len() + self.views.len()
    }
}

/// A single fetched column value.
///
/// The tag is decided once when the row is read from the database; the
/// encoder and the condition builder only dispatch on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// `json`/`jsonb` document
    Json(serde_json::Value),
    /// Text output of a non-text scalar type (numeric, temporal, uuid, ...)
    Other(String),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Int(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CellValue::Null, Into::into)
    }
}

#[cfg(test)]
mod tests;
