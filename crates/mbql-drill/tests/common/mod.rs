//! Sample database shared by the drill tests

#![allow(dead_code)]

use mbql_ir::{ColumnMetadata, Metadata, MetadataProvider, Query};
use serde_json::{json, Value as JsonValue};

pub const DB: i64 = 1;
pub const ORDERS: i64 = 10;
pub const PRODUCTS: i64 = 20;
pub const PEOPLE: i64 = 30;

pub const ORDERS_ID: i64 = 101;
pub const ORDERS_USER_ID: i64 = 102;
pub const ORDERS_PRODUCT_ID: i64 = 103;
pub const ORDERS_TOTAL: i64 = 104;
pub const ORDERS_CREATED_AT: i64 = 105;

fn orders_fields() -> Vec<JsonValue> {
    vec![
        json!({"id": ORDERS_ID, "name": "ID", "display_name": "ID",
               "base_type": "type/BigInteger", "semantic_type": "type/PK"}),
        json!({"id": ORDERS_USER_ID, "name": "USER_ID", "display_name": "User ID",
               "base_type": "type/Integer", "semantic_type": "type/FK", "fk_target_field_id": 301}),
        json!({"id": ORDERS_PRODUCT_ID, "name": "PRODUCT_ID", "display_name": "Product ID",
               "base_type": "type/Integer", "semantic_type": "type/FK", "fk_target_field_id": 201}),
        json!({"id": ORDERS_TOTAL, "name": "TOTAL", "display_name": "Total", "base_type": "type/Float"}),
        json!({"id": ORDERS_CREATED_AT, "name": "CREATED_AT", "display_name": "Created At",
               "base_type": "type/DateTime", "semantic_type": "type/CreationTimestamp"}),
        json!({"id": 106, "name": "QUANTITY", "display_name": "Quantity",
               "base_type": "type/Integer", "semantic_type": "type/Quantity"}),
        json!({"id": 107, "name": "DETAILS", "display_name": "Details", "base_type": "type/JSON"}),
    ]
}

fn products_table() -> JsonValue {
    json!({
        "id": PRODUCTS,
        "name": "PRODUCTS",
        "display_name": "Products",
        "fields": [
            {"id": 201, "name": "ID", "display_name": "ID",
             "base_type": "type/BigInteger", "semantic_type": "type/PK"},
            {"id": 202, "name": "TITLE", "display_name": "Title",
             "base_type": "type/Text", "semantic_type": "type/Title"},
            {"id": 203, "name": "CATEGORY", "display_name": "Category",
             "base_type": "type/Text", "semantic_type": "type/Category"},
            {"id": 204, "name": "PRICE", "display_name": "Price", "base_type": "type/Float"}
        ]
    })
}

fn people_table() -> JsonValue {
    json!({
        "id": PEOPLE,
        "name": "PEOPLE",
        "display_name": "People",
        "fields": [
            {"id": 301, "name": "ID", "display_name": "ID",
             "base_type": "type/BigInteger", "semantic_type": "type/PK"},
            {"id": 302, "name": "NAME", "display_name": "Name",
             "base_type": "type/Text", "semantic_type": "type/Name"},
            {"id": 303, "name": "LATITUDE", "display_name": "Latitude",
             "base_type": "type/Float", "semantic_type": "type/Latitude"},
            {"id": 304, "name": "BIRTH_DATE", "display_name": "Birth Date", "base_type": "type/Date"}
        ]
    })
}

fn database(tables: Vec<JsonValue>) -> Metadata {
    serde_json::from_value(json!({
        "databases": [{"id": DB, "name": "Sample Database", "tables": tables}]
    }))
    .unwrap()
}

fn orders_table(fields: Vec<JsonValue>) -> JsonValue {
    json!({"id": ORDERS, "name": "ORDERS", "display_name": "Orders", "fields": fields})
}

pub fn sample() -> Metadata {
    database(vec![orders_table(orders_fields()), products_table(), people_table()])
}

/// Orders with only an id and a total
pub fn sample_without_dates() -> Metadata {
    let fields = orders_fields()
        .into_iter()
        .filter(|field| field["id"] == json!(ORDERS_ID) || field["id"] == json!(ORDERS_TOTAL))
        .collect();
    database(vec![orders_table(fields)])
}

/// Orders whose product id is a second primary key
pub fn sample_with_two_pks() -> Metadata {
    let fields = orders_fields()
        .into_iter()
        .map(|mut field| {
            if field["id"] == json!(ORDERS_PRODUCT_ID) {
                field["semantic_type"] = json!("type/PK");
                field.as_object_mut().unwrap().remove("fk_target_field_id");
            }
            field
        })
        .collect();
    database(vec![orders_table(fields), products_table(), people_table()])
}

/// Database the user cannot see any table of
pub fn sample_not_editable() -> Metadata {
    database(vec![])
}

pub fn orders() -> Query {
    Query::table(DB, ORDERS)
}

/// Result column of `stage` by name
pub fn column(metadata: &Metadata, query: &Query, stage: usize, name: &str) -> ColumnMetadata {
    metadata
        .returned_columns(query, stage)
        .into_iter()
        .find(|column| column.name == name)
        .unwrap_or_else(|| panic!("no column {} on stage {}", name, stage))
}
