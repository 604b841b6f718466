//! Tests for the schema model.

use super::*;

fn orders_table() -> Table {
    Table::new("orders")
        .with_column(Column::new("id", "integer", 1).not_null())
        .with_column(Column::new("user_id", "integer", 2).not_null())
        // position 3 was dropped
        .with_column(Column::new("coupon_id", "integer", 4))
        .with_relation(Relation::parent("users", "orders_user_id_fkey", 2, 1))
        .with_relation(Relation::parent("coupons", "orders_coupon_id_fkey", 4, 1))
        .with_relation(Relation::child("order_items", "order_items_order_id_fkey"))
}

#[test]
fn test_column_lookup_by_position_with_gaps() {
    let table = orders_table();

    assert_eq!(table.column_at(4).map(|c| c.name.as_str()), Some("coupon_id"));
    assert_eq!(table.column_index(4), Some(2));
    assert!(table.column_at(3).is_none());
    assert!(table.column_index(3).is_none());
}

#[test]
fn test_mandatory_relations() {
    let table = orders_table();
    let relations: Vec<&Relation> = table.parent_relations().collect();

    assert_eq!(relations.len(), 2);
    assert!(table.is_mandatory(relations[0]));
    assert!(!table.is_mandatory(relations[1]));
}

#[test]
fn test_child_relation_is_never_mandatory() {
    let table = orders_table();
    let child = &table.relations[2];

    assert!(!child.is_parent());
    assert!(table.local_column(child).is_none());
    assert!(!table.is_mandatory(child));
}

#[test]
fn test_relation_without_positions_is_not_mandatory() {
    let mut relation = Relation::parent("users", "orders_user_id_fkey", 2, 1);
    relation.source_position = None;
    relation.destination_position = None;
    let table = orders_table().with_relation(relation.clone());

    assert!(!table.is_mandatory(&relation));
}

#[test]
fn test_root_tables() {
    let schema = DatabaseSchema::new("shop")
        .with_table(Table::new("users").with_relation(Relation::child("orders", "fk")))
        .with_table(orders_table())
        .with_table(Table::new("coupons"));

    assert_eq!(schema.root_tables(), vec!["users", "coupons"]);
    assert!(schema.contains_table("orders"));
    assert!(!schema.contains_table("missing"));
    assert_eq!(schema.object_count(), 3);
}

#[test]
fn test_cell_value_conversions() {
    assert_eq!(CellValue::from(Some(5_i64)), CellValue::Int(5));
    assert_eq!(CellValue::from(None::<i64>), CellValue::Null);
    assert_eq!(CellValue::from("x"), CellValue::Text("x".to_string()));
    assert!(CellValue::from(None::<bool>).is_null());
}

#[test]
fn test_database_schema_serde_roundtrip() {
    let schema = DatabaseSchema::new("shop").with_table(orders_table());

    let json = serde_json::to_string(&schema).expect("serialize");
    let deserialized: DatabaseSchema = serde_json::from_str(&json).expect("deserialize");

    assert_eq!(deserialized, schema);
}
