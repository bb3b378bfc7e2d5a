#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use metafield_model::form::populate_all;
use metafield_model::{FieldNode, FieldSchema, FormValue};
use serde_json::Value;

pub fn text(name: &str) -> FieldSchema {
    FieldSchema::text(name).unwrap()
}

/// `repeater` with `field1`, `field2`.
pub fn repeater() -> Arc<FieldSchema> {
    Arc::new(
        FieldSchema::repeater("repeater")
            .unwrap()
            .add_fields(vec![text("field1"), text("field2")])
            .unwrap(),
    )
}

/// `group` with `group1` (`field1`, `field2`) and `group2` (`field3`, `field4`).
pub fn group_set() -> Arc<FieldSchema> {
    Arc::new(
        FieldSchema::group_set("group")
            .unwrap()
            .add_group("group1", vec![text("field1"), text("field2")])
            .unwrap()
            .add_group("group2", vec![text("field3"), text("field4")])
            .unwrap(),
    )
}

/// Builds trees for `schemas` from a JSON form body.
pub fn submit(schemas: &[Arc<FieldSchema>], body: Value) -> Vec<FieldNode> {
    let form: BTreeMap<String, FormValue> = serde_json::from_value(body).unwrap();
    populate_all(schemas, &form)
}

pub fn row_keys(rows: &[metafield_storage::MetaRow]) -> Vec<&str> {
    rows.iter().map(|r| r.key.as_str()).collect()
}
