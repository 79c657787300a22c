#![allow(dead_code)]
//! Shared test utilities for integration tests.
//!
//! Each fixture builds a small [`TypeModel`] covering one area of the engine:
//!
//! - `item_model`: flat struct with a list
//! - `linked_model`: self-referencing struct and self-typed collection
//! - `shop_model`: nested structs, enums, options, maps, arrays, records
//! - `zoo_model`: abstract supertype with concrete subtypes
//! - `generic_model`: generic structs and inherited parameters

use std::sync::Arc;

use specimen::{parse_type_expr, Specimen, TypeDef, TypeExpr, TypeModel, Value};

pub const SHOP_SCHEMA: &str = r#"{
  "types": [
    { "name": "Status", "variants": ["New", "Paid", "Shipped"] },
    { "name": "Address", "fields": [
        { "name": "street", "type": "String" },
        { "name": "city", "type": "String" },
        { "name": "zip", "type": "String" } ] },
    { "name": "Customer", "fields": [
        { "name": "name", "type": "String" },
        { "name": "age", "type": "u8" },
        { "name": "address", "type": "Address" },
        { "name": "tags", "type": "Set<String>" } ] },
    { "name": "Line", "fields": [
        { "name": "sku", "type": "String" },
        { "name": "quantity", "type": "u32" },
        { "name": "price", "type": "f64" } ] },
    { "name": "Money", "record": true, "fields": [
        { "name": "amount", "type": "i64" },
        { "name": "currency", "type": "String" } ] },
    { "name": "Order", "fields": [
        { "name": "id", "type": "Uuid" },
        { "name": "status", "type": "Status" },
        { "name": "customer", "type": "Customer" },
        { "name": "lines", "type": "List<Line>" },
        { "name": "notes", "type": "Option<String>" },
        { "name": "placed", "type": "Date" },
        { "name": "attributes", "type": "Map<String, i64>" },
        { "name": "scores", "type": "[u16]" },
        { "name": "total", "type": "Money" } ] }
  ]
}"#;

pub fn item_model() -> TypeModel {
    let mut model = TypeModel::new();
    model
        .insert(
            TypeDef::structure("Item")
                .field("id", "i32")
                .field("tags", "List<String>")
                .build()
                .unwrap(),
        )
        .unwrap()
        .insert(
            TypeDef::structure("Flags")
                .field("flags", "Set<bool>")
                .build()
                .unwrap(),
        )
        .unwrap()
        .insert(
            TypeDef::structure("Invoice")
                .field("country", "String")
                .field("currency", "String")
                .build()
                .unwrap(),
        )
        .unwrap();
    model
}

pub fn linked_model() -> TypeModel {
    let mut model = TypeModel::new();
    model
        .insert(
            TypeDef::structure("Node")
                .field("value", "i32")
                .field("next", "Node")
                .build()
                .unwrap(),
        )
        .unwrap()
        .insert(
            TypeDef::structure("Tree")
                .field("label", "String")
                .field("children", "List<Tree>")
                .build()
                .unwrap(),
        )
        .unwrap();
    model
}

pub fn shop_model() -> TypeModel {
    TypeModel::from_json(SHOP_SCHEMA).unwrap()
}

pub fn zoo_model() -> TypeModel {
    let mut model = TypeModel::new();
    model
        .insert(
            TypeDef::structure("Animal")
                .abstract_type()
                .field("name", "String")
                .build()
                .unwrap(),
        )
        .unwrap()
        .insert(
            TypeDef::structure("Dog")
                .extends("Animal")
                .field("good", "bool")
                .build()
                .unwrap(),
        )
        .unwrap()
        .insert(
            TypeDef::structure("Cat")
                .extends("Animal")
                .field("lives", "u8")
                .build()
                .unwrap(),
        )
        .unwrap()
        .insert(TypeDef::enumeration("Color", ["Red", "Green"]))
        .unwrap()
        .insert(
            TypeDef::structure("Zoo")
                .field("star", "Animal")
                .field("animals", "List<Animal>")
                .field("color", "Color")
                .build()
                .unwrap(),
        )
        .unwrap();
    model
}

pub fn generic_model() -> TypeModel {
    let mut model = TypeModel::new();
    model
        .insert(
            TypeDef::structure("Pair")
                .param("L")
                .param("R")
                .field("left", "L")
                .field("right", "R")
                .build()
                .unwrap(),
        )
        .unwrap()
        .insert(
            TypeDef::structure("Box")
                .param("T")
                .field("item", "T")
                .build()
                .unwrap(),
        )
        .unwrap()
        .insert(
            TypeDef::structure("IntBox")
                .extends("Box<i32>")
                .field("label", "String")
                .build()
                .unwrap(),
        )
        .unwrap()
        .insert(
            TypeDef::structure("Holder")
                .field("pair", "Pair<String, u8>")
                .build()
                .unwrap(),
        )
        .unwrap();
    model
}

pub fn specimen(model: TypeModel) -> Specimen {
    Specimen::new(Arc::new(model))
}

pub fn ty(s: &str) -> TypeExpr {
    parse_type_expr(s).unwrap()
}

/// Number of elements of a list, set, or array value.
pub fn len_of(value: Option<&Value>) -> usize {
    value.and_then(Value::as_elements).map_or(0, <[Value]>::len)
}

/// Write a schema to a temporary file for CLI tests.
pub fn schema_file(schema: &str) -> tempfile::NamedTempFile {
    use std::io::Write;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(schema.as_bytes()).unwrap();
    file
}
