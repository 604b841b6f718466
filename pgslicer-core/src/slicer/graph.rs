//! Dependency layering of tables.
//!
//! Tables are processed layer by layer so that every table is sampled
//! after the parents its mandatory foreign keys point to:
//!
//! - layer 0 holds the root tables (no parent relation at all);
//! - each following sweep visits the unplaced tables in schema order and
//!   places those whose mandatory parents all sit in earlier layers.
//!
//! Tables placed during a sweep do not satisfy dependencies of other tables
//! in the same sweep. Optional relations, relations without positions,
//! relations to tables outside the schema and self-references never
//! constrain placement.
//!
//! When a sweep places nothing, the remaining tables form a mandatory
//! cycle. The first blocking edge (first unplaced table in schema order,
//! first relation in its order whose target is unplaced) is then ignored
//! for ordering, recorded in [`Layering::relaxed_edges`], and sweeping
//! resumes.

use crate::models::{DatabaseSchema, Relation, Table};
use std::collections::HashSet;

/// A mandatory foreign key ignored for ordering to break a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaxedEdge {
    /// The referencing table
    pub table: String,
    /// The referenced table
    pub parent: String,
    pub constraint_name: String,
}

/// Processing order of a schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layering {
    layers: Vec<Vec<String>>,
    relaxed_edges: Vec<RelaxedEdge>,
}

impl Layering {
    /// The successive layers; no layer is empty.
    pub fn layers(&self) -> &[Vec<String>] {
        &self.layers
    }

    /// Table names in processing order.
    pub fn order(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().flatten().map(String::as_str)
    }

    pub fn relaxed_edges(&self) -> &[RelaxedEdge] {
        &self.relaxed_edges
    }

    /// Number of tables placed.
    pub fn len(&self) -> usize {
        self.layers.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

/// Computes the processing order of `schema`. Deterministic for a given
/// schema.
pub fn layer(schema: &DatabaseSchema) -> Layering {
    let mut layering = Layering::default();
    let mut placed: HashSet<&str> = HashSet::with_capacity(schema.tables.len());
    // (table index, relation index) pairs ignored for ordering
    let mut relaxed: HashSet<(usize, usize)> = HashSet::new();

    let roots: Vec<&str> = schema.root_tables();
    placed.extend(roots.iter().copied());
    push_layer(&mut layering, roots);

    while placed.len() < schema.tables.len() {
        let blocked_by_unplaced = |table_index: usize, relation_index: usize| {
            let table = &schema.tables[table_index];
            let relation = &table.relations[relation_index];
            !relaxed.contains(&(table_index, relation_index))
                && constrains_ordering(schema, table, relation)
                && !placed.contains(relation.table.as_str())
        };

        let sweep: Vec<&str> = schema
            .tables
            .iter()
            .enumerate()
            .filter(|(_, table)| !placed.contains(table.name.as_str()))
            .filter(|(table_index, table)| {
                (0..table.relations.len()).all(|r| !blocked_by_unplaced(*table_index, r))
            })
            .map(|(_, table)| table.name.as_str())
            .collect();

        if sweep.is_empty() {
            let blocking = schema
                .tables
                .iter()
                .enumerate()
                .filter(|(_, table)| !placed.contains(table.name.as_str()))
                .find_map(|(table_index, table)| {
                    (0..table.relations.len())
                        .find(|r| blocked_by_unplaced(table_index, *r))
                        .map(|r| (table_index, r))
                });

            // An unplaced table that placed nothing always has a blocking edge
            let Some((table_index, relation_index)) = blocking else {
                break;
            };

            let table = &schema.tables[table_index];
            let relation = &table.relations[relation_index];
            tracing::warn!(
                "Foreign key cycle: ignoring '{}' ({} -> {}) for ordering",
                relation.constraint_name,
                table.name,
                relation.table
            );
            layering.relaxed_edges.push(RelaxedEdge {
                table: table.name.clone(),
                parent: relation.table.clone(),
                constraint_name: relation.constraint_name.clone(),
            });
            relaxed.insert((table_index, relation_index));
            continue;
        }

        placed.extend(sweep.iter().copied());
        push_layer(&mut layering, sweep);
    }

    tracing::debug!(
        "Layered {} tables into {} layers",
        layering.len(),
        layering.layers.len()
    );
    layering
}

/// Whether `relation` of `table` must be satisfied before `table` is placed.
fn constrains_ordering(schema: &DatabaseSchema, table: &Table, relation: &Relation) -> bool {
    table.is_mandatory(relation)
        && relation.destination_position.is_some()
        && relation.table != table.name
        && schema.contains_table(&relation.table)
}

fn push_layer(layering: &mut Layering, names: Vec<&str>) {
    if !names.is_empty() {
        layering
            .layers
            .push(names.into_iter().map(str::to_string).collect());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Column, Relation, Table};

    fn id_table(name: &str) -> Table {
        Table::new(name).with_column(Column::new("id", "integer", 1).not_null())
    }

    /// `name` with a NOT NULL `<parent>_id` column per parent.
    fn child_of(name: &str, parents: &[&str]) -> Table {
        let mut table = id_table(name);
        for (i, parent) in parents.iter().enumerate() {
            let position = u32::try_from(i).unwrap() + 2;
            table = table
                .with_column(Column::new(format!("{}_id", parent), "integer", position).not_null())
                .with_relation(Relation::parent(
                    *parent,
                    format!("{}_{}_fkey", name, parent),
                    position,
                    1,
                ));
        }
        table
    }

    fn layer_names(layering: &Layering) -> Vec<Vec<&str>> {
        layering
            .layers()
            .iter()
            .map(|l| l.iter().map(String::as_str).collect())
            .collect()
    }

    #[test]
    fn test_roots_come_first() {
        let schema = DatabaseSchema::new("shop")
            .with_table(child_of("orders", &["users"]))
            .with_table(id_table("users"))
            .with_table(id_table("countries"));

        let layering = layer(&schema);
        assert_eq!(
            layer_names(&layering),
            vec![vec!["users", "countries"], vec!["orders"]]
        );
        assert!(layering.relaxed_edges().is_empty());
    }

    #[test]
    fn test_same_sweep_does_not_satisfy_dependencies() {
        // items -> orders -> users; orders and items are both unplaced after
        // layer 0, so items must wait one more sweep
        let schema = DatabaseSchema::new("shop")
            .with_table(child_of("items", &["orders"]))
            .with_table(child_of("orders", &["users"]))
            .with_table(id_table("users"));

        let layering = layer(&schema);
        assert_eq!(
            layer_names(&layering),
            vec![vec!["users"], vec!["orders"], vec!["items"]]
        );
        assert_eq!(
            layering.order().collect::<Vec<_>>(),
            vec!["users", "orders", "items"]
        );
    }

    #[test]
    fn test_optional_relation_does_not_block() {
        let schema = DatabaseSchema::new("shop")
            .with_table(
                id_table("orders")
                    .with_column(Column::new("coupon_id", "integer", 2))
                    .with_relation(Relation::parent("coupons", "orders_coupon_fkey", 2, 1)),
            )
            .with_table(child_of("coupons", &["campaigns"]))
            .with_table(id_table("campaigns"));

        let layering = layer(&schema);
        // orders is not a root, but nothing mandatory holds it back
        assert_eq!(
            layer_names(&layering),
            vec![vec!["campaigns"], vec!["orders", "coupons"]]
        );
    }

    #[test]
    fn test_self_reference_and_missing_target_do_not_block() {
        let schema = DatabaseSchema::new("shop")
            .with_table(child_of("employees", &["employees"]))
            .with_table(child_of("audit", &["archived_users"]));

        let layering = layer(&schema);
        assert_eq!(layer_names(&layering), vec![vec!["employees", "audit"]]);
        assert!(layering.relaxed_edges().is_empty());
    }

    #[test]
    fn test_relation_without_positions_does_not_block() {
        let mut relation = Relation::parent("users", "orders_user_fkey", 2, 1);
        relation.destination_position = None;
        let schema = DatabaseSchema::new("shop")
            .with_table(child_of("users", &["orders"]))
            .with_table(
                id_table("orders")
                    .with_column(Column::new("user_id", "integer", 2).not_null())
                    .with_relation(relation),
            );

        let layering = layer(&schema);
        assert_eq!(layer_names(&layering), vec![vec!["orders"], vec!["users"]]);
    }

    #[test]
    fn test_cycle_is_relaxed_at_first_blocking_edge() {
        let schema = DatabaseSchema::new("shop")
            .with_table(id_table("accounts"))
            .with_table(child_of("a", &["b"]))
            .with_table(child_of("b", &["a"]))
            .with_table(child_of("c", &["b"]));

        let layering = layer(&schema);

        assert_eq!(
            layering.relaxed_edges(),
            &[RelaxedEdge {
                table: "a".to_string(),
                parent: "b".to_string(),
                constraint_name: "a_b_fkey".to_string(),
            }]
        );
        assert_eq!(
            layer_names(&layering),
            vec![vec!["accounts"], vec!["a"], vec!["b"], vec!["c"]]
        );
    }

    #[test]
    fn test_schema_without_roots_terminates() {
        let schema = DatabaseSchema::new("shop")
            .with_table(child_of("x", &["y"]))
            .with_table(child_of("y", &["x"]));

        let layering = layer(&schema);
        assert_eq!(layering.len(), 2);
        assert_eq!(layering.relaxed_edges().len(), 1);
        assert_eq!(layering.order().collect::<Vec<_>>(), vec!["x", "y"]);
    }

    #[test]
    fn test_layering_is_deterministic() {
        let schema = DatabaseSchema::new("shop")
            .with_table(child_of("items", &["orders", "products"]))
            .with_table(child_of("orders", &["users"]))
            .with_table(id_table("products"))
            .with_table(id_table("users"))
            .with_table(child_of("p", &["q"]))
            .with_table(child_of("q", &["p"]));

        let first = layer(&schema);
        for _ in 0..10 {
            assert_eq!(layer(&schema), first);
        }
    }

    #[test]
    fn test_every_table_follows_its_mandatory_parents() {
        let schema = DatabaseSchema::new("shop")
            .with_table(child_of("shipments", &["orders", "warehouses"]))
            .with_table(child_of("items", &["orders", "products"]))
            .with_table(child_of("orders", &["users"]))
            .with_table(child_of("products", &["vendors"]))
            .with_table(id_table("users"))
            .with_table(id_table("vendors"))
            .with_table(id_table("warehouses"));

        let layering = layer(&schema);
        let order: Vec<&str> = layering.order().collect();
        let position = |name: &str| order.iter().position(|n| *n == name).unwrap();

        assert_eq!(order.len(), schema.tables.len());
        for table in &schema.tables {
            for relation in table.parent_relations() {
                assert!(
                    position(&relation.table) < position(&table.name),
                    "{} must follow {}",
                    table.name,
                    relation.table
                );
            }
        }
    }

    #[test]
    fn test_empty_schema() {
        let layering = layer(&DatabaseSchema::new("empty"));
        assert!(layering.is_empty());
        assert_eq!(layering.order().count(), 0);
    }
}
