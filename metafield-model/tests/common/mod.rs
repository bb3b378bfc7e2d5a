#![allow(dead_code)]

use std::sync::Arc;

use metafield_model::FieldSchema;

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

/// `outer` repeater holding a `title` and an `inner` group-set.
pub fn nested() -> Arc<FieldSchema> {
    let inner = FieldSchema::group_set("inner")
        .unwrap()
        .add_group("row", vec![text("leaf")])
        .unwrap()
        .add_group("row_wide", vec![text("leaf"), text("note")])
        .unwrap();
    Arc::new(
        FieldSchema::repeater("outer")
            .unwrap()
            .add_fields(vec![text("title"), inner])
            .unwrap(),
    )
}
