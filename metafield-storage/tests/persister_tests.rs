mod common;

use std::sync::Arc;

use common::{group_set, repeater, row_keys, submit, text};
use metafield_model::FieldSchema;
use metafield_storage::{MemoryMetaStore, MetaPersister, MetaRow, MetaStore, SaveSummary};
use metafield_types::{OwnerId, StorageKey};
use pretty_assertions::assert_eq;
use serde_json::json;

const OWNER: u64 = 123;

fn persister() -> MetaPersister<MemoryMetaStore> {
    MetaPersister::new(MemoryMetaStore::new())
}

fn owner() -> OwnerId {
    OwnerId::new(OWNER)
}

fn row(key: &str, value: &str) -> MetaRow {
    MetaRow {
        owner: owner(),
        key: StorageKey::from_raw(key),
        value: value.to_string(),
    }
}

// ── Save ──────────────────────────────────────────────────────────

#[test]
fn save_scalar_field() {
    let schemas = vec![Arc::new(text("field1"))];
    let p = persister();
    p.save(owner(), &submit(&schemas, json!({ "_field1": "Lorem Ipsum" })))
        .unwrap();
    assert_eq!(p.store().dump().unwrap(), vec![row("_field1", "Lorem Ipsum")]);
}

#[test]
fn save_repeater_field() {
    let schemas = vec![repeater()];
    let p = persister();
    let body = json!({
        "_repeater": {
            "0": { "_field1": "Lorem Ipsum 1", "_field2": "Lorem Ipsum 2" }
        }
    });
    let summary = p.save(owner(), &submit(&schemas, body)).unwrap();
    assert_eq!(summary, SaveSummary { written: 2, removed: 0 });
    assert_eq!(
        p.store().dump().unwrap(),
        vec![
            row("_repeater_field1_0", "Lorem Ipsum 1"),
            row("_repeater_field2_0", "Lorem Ipsum 2"),
        ]
    );
}

#[test]
fn save_group_set_field() {
    let schemas = vec![group_set()];
    let p = persister();
    let body = json!({
        "_group": {
            "0": { "group": "_group1", "_field1": "Lorem Ipsum 1", "_field2": "Lorem Ipsum 2" },
            "1": { "group": "_group2", "_field3": "Lorem Ipsum 3", "_field4": "Lorem Ipsum 4" }
        }
    });
    p.save(owner(), &submit(&schemas, body)).unwrap();
    assert_eq!(
        p.store().dump().unwrap(),
        vec![
            row("_group_group1_field1_0", "Lorem Ipsum 1"),
            row("_group_group1_field2_0", "Lorem Ipsum 2"),
            row("_group_group2_field3_1", "Lorem Ipsum 3"),
            row("_group_group2_field4_1", "Lorem Ipsum 4"),
        ]
    );
}

#[test]
fn save_skips_empty_root_but_keeps_instance_fields() {
    let schemas = vec![Arc::new(text("field1")), repeater()];
    let p = persister();
    let body = json!({ "_repeater": { "0": { "_field1": "only one" } } });
    p.save(owner(), &submit(&schemas, body)).unwrap();
    assert_eq!(
        p.store().dump().unwrap(),
        vec![row("_repeater_field1_0", "only one"), row("_repeater_field2_0", "")]
    );
}

#[test]
fn empty_group_instance_survives_round_trip() {
    let schemas = vec![group_set()];
    let body = json!({
        "_group": {
            "0": { "group": "group1" },
            "1": { "group": "group2", "field3": "x" }
        }
    });
    let saved = submit(&schemas, body);
    let p = persister();
    let summary = p.save(owner(), &saved).unwrap();
    assert_eq!(summary, SaveSummary { written: 4, removed: 0 });

    let report = p.load(owner(), &schemas).unwrap();
    assert_eq!(report.fields, saved);
    let types: Vec<&str> = report.fields[0]
        .values()
        .iter()
        .map(|g| g.group_type().unwrap().as_str())
        .collect();
    assert_eq!(types, ["_group1", "_group2"]);
}

#[test]
fn shrinking_repeater_leaves_no_orphans() {
    let schemas = vec![repeater()];
    let p = persister();
    let two = json!({
        "_repeater": {
            "0": { "_field1": "a", "_field2": "b" },
            "1": { "_field1": "c", "_field2": "d" }
        }
    });
    p.save(owner(), &submit(&schemas, two)).unwrap();
    assert_eq!(p.store().dump().unwrap().len(), 4);

    let one = json!({ "_repeater": { "0": { "_field1": "c", "_field2": "d" } } });
    let summary = p.save(owner(), &submit(&schemas, one)).unwrap();
    assert_eq!(summary, SaveSummary { written: 2, removed: 2 });
    assert_eq!(
        p.store().dump().unwrap(),
        vec![row("_repeater_field1_0", "c"), row("_repeater_field2_0", "d")]
    );
}

#[test]
fn shrinking_group_set_leaves_no_orphans() {
    let schemas = vec![group_set()];
    let p = persister();
    let two = json!({
        "_group": {
            "0": { "group": "group1", "field1": "a" },
            "1": { "group": "group2", "field3": "b" }
        }
    });
    p.save(owner(), &submit(&schemas, two)).unwrap();

    let one = json!({ "_group": { "0": { "group": "group2", "field3": "b" } } });
    p.save(owner(), &submit(&schemas, one)).unwrap();
    assert_eq!(
        p.store().dump().unwrap(),
        vec![row("_group_group2_field3_0", "b"), row("_group_group2_field4_0", "")]
    );
}

#[test]
fn save_leaves_sibling_root_with_shared_prefix() {
    let schemas = vec![repeater(), Arc::new(text("repeater_note"))];
    let p = persister();
    p.save(
        owner(),
        &submit(&schemas, json!({ "repeater_note": "keep", "repeater": { "0": { "field1": "x" } } })),
    )
    .unwrap();

    p.save(owner(), &submit(&schemas[..1], json!({}))).unwrap();
    assert_eq!(p.store().dump().unwrap(), vec![row("_repeater_note", "keep")]);
}

#[test]
fn save_does_not_touch_other_owners() {
    let schemas = vec![Arc::new(text("field1"))];
    let p = persister();
    p.save(OwnerId::new(1), &submit(&schemas, json!({ "field1": "one" })))
        .unwrap();
    p.save(OwnerId::new(2), &submit(&schemas, json!({}))).unwrap();
    assert_eq!(p.store().dump().unwrap().len(), 1);
}

// ── Load ──────────────────────────────────────────────────────────

#[test]
fn round_trip_all_kinds() {
    let schemas = vec![Arc::new(text("field1")), repeater(), group_set()];
    let body = json!({
        "_field1": "Lorem Ipsum",
        "_repeater": {
            "0": { "_field1": "r1", "_field2": "r2" },
            "1": { "_field1": "r3", "_field2": "r4" }
        },
        "_group": {
            "0": { "group": "_group2", "_field3": "g3", "_field4": "g4" },
            "1": { "group": "_group1", "_field1": "g1", "_field2": "g2" }
        }
    });
    let saved = submit(&schemas, body);
    let p = persister();
    p.save(owner(), &saved).unwrap();

    let report = p.load(owner(), &schemas).unwrap();
    assert_eq!(report.fields, saved);
    assert!(report.unknown_keys.is_empty());
    assert!(report.conflicts.is_empty());
}

#[test]
fn load_missing_owner_is_empty() {
    let schemas = vec![Arc::new(text("field1")), repeater()];
    let report = persister().load(owner(), &schemas).unwrap();
    assert_eq!(report.fields[0].value(), None);
    assert!(report.fields[1].values().is_empty());
}

#[test]
fn load_compacts_gapped_indices() {
    let schemas = vec![repeater()];
    let p = persister();
    let store = p.store();
    store
        .upsert(owner(), &StorageKey::from_raw("_repeater_field1_7"), "late")
        .unwrap();
    store
        .upsert(owner(), &StorageKey::from_raw("_repeater_field1_2"), "early")
        .unwrap();

    let report = p.load(owner(), &schemas).unwrap();
    let groups = report.fields[0].values();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].field("field1").unwrap().value(), Some("early"));
    assert_eq!(groups[1].field("field1").unwrap().value(), Some("late"));
    assert_eq!(groups[1].field("field2").unwrap().value(), None);
}

#[test]
fn load_reports_unknown_keys() {
    let schemas = vec![repeater()];
    let p = persister();
    let store = p.store();
    store
        .upsert(owner(), &StorageKey::from_raw("_repeater_field1_0"), "ok")
        .unwrap();
    store
        .upsert(owner(), &StorageKey::from_raw("_repeater_field9_0"), "stray")
        .unwrap();
    store
        .upsert(owner(), &StorageKey::from_raw("_repeater_field1_x"), "stray")
        .unwrap();

    let report = p.load(owner(), &schemas).unwrap();
    assert_eq!(
        report.unknown_keys,
        vec![
            StorageKey::from_raw("_repeater_field1_x"),
            StorageKey::from_raw("_repeater_field9_0"),
        ]
    );
    assert_eq!(report.fields[0].values().len(), 1);
}

#[test]
fn load_first_group_type_wins() {
    let schemas = vec![group_set()];
    let p = persister();
    let store = p.store();
    store
        .upsert(owner(), &StorageKey::from_raw("_group_group1_field1_0"), "first")
        .unwrap();
    store
        .upsert(owner(), &StorageKey::from_raw("_group_group2_field3_0"), "second")
        .unwrap();

    let report = p.load(owner(), &schemas).unwrap();
    let groups = report.fields[0].values();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].group_type().unwrap().as_str(), "_group1");
    assert_eq!(
        report.conflicts,
        vec![StorageKey::from_raw("_group_group2_field3_0")]
    );
}

#[test]
fn load_report_field_lookup() {
    let schemas = vec![Arc::new(text("field1"))];
    let p = persister();
    p.save(owner(), &submit(&schemas, json!({ "field1": "v" }))).unwrap();
    let report = p.load(owner(), &schemas).unwrap();
    assert_eq!(report.field("field1").unwrap().value(), Some("v"));
    assert_eq!(report.field("_field1").unwrap().value(), Some("v"));
    assert!(report.field("missing").is_none());
}

#[test]
fn nested_round_trip() {
    let inner = FieldSchema::group_set("inner")
        .unwrap()
        .add_group("row", vec![text("leaf")])
        .unwrap();
    let outer = Arc::new(
        FieldSchema::repeater("outer")
            .unwrap()
            .add_fields(vec![text("title"), inner])
            .unwrap(),
    );
    let schemas = vec![outer];
    let body = json!({
        "outer": {
            "0": {
                "title": "first",
                "inner": { "0": { "group": "row", "leaf": "a" }, "1": { "group": "row", "leaf": "b" } }
            }
        }
    });
    let saved = submit(&schemas, body);
    let p = persister();
    p.save(owner(), &saved).unwrap();
    assert_eq!(
        row_keys(&p.store().dump().unwrap()),
        vec![
            "_outer_inner_row_leaf_0_0",
            "_outer_inner_row_leaf_0_1",
            "_outer_title_0",
        ]
    );
    assert_eq!(p.load(owner(), &schemas).unwrap().fields, saved);
}
