mod common;

use std::collections::BTreeMap;
use std::sync::Arc;

use common::{group_set, nested, repeater, text};
use metafield_model::FormValue;
use metafield_model::form::{populate, populate_all, populate_flat};
use pretty_assertions::assert_eq;
use serde_json::json;

fn form(value: serde_json::Value) -> BTreeMap<String, FormValue> {
    serde_json::from_value(value).unwrap()
}

// ── Nested submissions ────────────────────────────────────────────

#[test]
fn scalar_from_prefixed_key() {
    let schemas = vec![Arc::new(text("test_field"))];
    let fields = populate_all(&schemas, &form(json!({"_test_field": "Lorem Ipsum"})));
    assert_eq!(fields[0].value(), Some("Lorem Ipsum"));
}

#[test]
fn scalar_from_bare_key() {
    let schemas = vec![Arc::new(text("test_field"))];
    let fields = populate_all(&schemas, &form(json!({"test_field": "x"})));
    assert_eq!(fields[0].value(), Some("x"));
}

#[test]
fn missing_scalar_is_empty() {
    let schemas = vec![Arc::new(text("test_field"))];
    let fields = populate_all(&schemas, &form(json!({"other": "x"})));
    assert_eq!(fields[0].value(), None);
}

#[test]
fn map_submitted_for_scalar_is_ignored() {
    let node = populate(&Arc::new(text("a")), Some(&FormValue::Map(BTreeMap::new())));
    assert_eq!(node.value(), None);
}

#[test]
fn repeater_instances() {
    let schema = repeater();
    let submitted: FormValue = serde_json::from_value(json!({
        "0": {"_field1": "Lorem ipsum", "_field2": "Dolor sit amet"}
    }))
    .unwrap();
    let node = populate(&schema, Some(&submitted));
    assert_eq!(node.values().len(), 1);
    let group = &node.values()[0];
    assert!(group.group_type().is_none());
    assert_eq!(group.fields()[0].name().as_str(), "_field1");
    assert_eq!(group.fields()[0].value(), Some("Lorem ipsum"));
    assert_eq!(group.fields()[1].value(), Some("Dolor sit amet"));
}

#[test]
fn repeater_positions_sorted_numerically() {
    let schema = repeater();
    let submitted: FormValue = serde_json::from_value(json!({
        "10": {"_field1": "ten"},
        "2": {"_field1": "two"},
        "x": {"_field1": "skipped"}
    }))
    .unwrap();
    let node = populate(&schema, Some(&submitted));
    let firsts: Vec<_> = node.values().iter().map(|g| g.fields()[0].value()).collect();
    assert_eq!(firsts, [Some("two"), Some("ten")]);
}

#[test]
fn repeater_from_json_array() {
    let schema = repeater();
    let submitted: FormValue =
        serde_json::from_value(json!([{"field1": "a"}, {"field1": "b"}])).unwrap();
    let node = populate(&schema, Some(&submitted));
    assert_eq!(node.values().len(), 2);
    assert_eq!(node.values()[1].fields()[0].value(), Some("b"));
}

#[test]
fn group_set_keeps_only_fields_of_the_named_group() {
    let schema = group_set();
    let submitted: FormValue = serde_json::from_value(json!({
        "0": {"group": "_group1", "_field1": "lorem", "_field2": "ipsum", "_field3": "dolor", "_field4": "sit"},
        "1": {"group": "_group2", "_field1": "lorem", "_field2": "ipsum", "_field3": "dolor", "_field4": "sit"}
    }))
    .unwrap();
    let node = populate(&schema, Some(&submitted));
    assert_eq!(node.values().len(), 2);

    let first = &node.values()[0];
    assert_eq!(first.group_type().unwrap().as_str(), "_group1");
    let names: Vec<_> = first.fields().iter().map(|f| f.name().as_str()).collect();
    assert_eq!(names, ["_field1", "_field2"]);

    let second = &node.values()[1];
    assert_eq!(second.group_type().unwrap().as_str(), "_group2");
    assert_eq!(second.field("field3").unwrap().value(), Some("dolor"));
    assert_eq!(second.field("field4").unwrap().value(), Some("sit"));
}

#[test]
fn group_set_accepts_bare_group_type() {
    let schema = group_set();
    let submitted: FormValue =
        serde_json::from_value(json!({"0": {"group": "group2", "field3": "x"}})).unwrap();
    let node = populate(&schema, Some(&submitted));
    assert_eq!(node.values()[0].group_type().unwrap().as_str(), "_group2");
}

#[test]
fn group_set_skips_untyped_and_unknown_instances() {
    let schema = group_set();
    let submitted: FormValue = serde_json::from_value(json!({
        "0": {"_field1": "no type"},
        "1": {"group": "_nope", "_field1": "bad type"},
        "2": {"group": "_group1", "_field1": "kept"}
    }))
    .unwrap();
    let node = populate(&schema, Some(&submitted));
    assert_eq!(node.values().len(), 1);
    assert_eq!(node.values()[0].fields()[0].value(), Some("kept"));
}

#[test]
fn nested_complex_submission() {
    let schema = nested();
    let submitted: FormValue = serde_json::from_value(json!({
        "0": {
            "_title": "first",
            "_inner": {"0": {"group": "row", "_leaf": "a"}}
        }
    }))
    .unwrap();
    let node = populate(&schema, Some(&submitted));
    let inner = node.values()[0].field("inner").unwrap();
    assert_eq!(inner.values()[0].field("leaf").unwrap().value(), Some("a"));
}

// ── Flat submissions ──────────────────────────────────────────────

#[test]
fn flat_submission_rebuilds_all_roots() {
    let schemas = vec![Arc::new(text("field1")), repeater(), group_set()];
    let flat: BTreeMap<String, String> = [
        ("_field1", "Lorem Ipsum"),
        ("_repeater_field1_0", "Lorem ipsum"),
        ("_repeater_field2_0", "Dolor sit amet"),
        ("_group_group2_field3_1", "dolor"),
        ("_group_group1_field1_0", "lorem"),
        ("metafield_container_x_nonce", "abc"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    let submission = populate_flat(&schemas, &flat);
    assert_eq!(submission.unknown_keys.len(), 1);
    assert_eq!(submission.unknown_keys[0].as_str(), "metafield_container_x_nonce");
    assert!(submission.conflicts.is_empty());

    let fields = submission.fields;
    assert_eq!(fields[0].value(), Some("Lorem Ipsum"));
    assert_eq!(fields[1].values()[0].fields()[1].value(), Some("Dolor sit amet"));
    let groups = fields[2].values();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].group_type().unwrap().as_str(), "_group1");
    assert_eq!(groups[1].field("field3").unwrap().value(), Some("dolor"));
}

#[test]
fn flat_submission_reports_conflicting_keys() {
    let schemas = vec![group_set()];
    let flat: BTreeMap<String, String> = [
        ("_group_group1_field1_0", "kept"),
        ("_group_group2_field3_0", "dropped"),
        ("_group_group2_field4_1", "other"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    let submission = populate_flat(&schemas, &flat);
    assert!(submission.unknown_keys.is_empty());
    let conflicts: Vec<&str> = submission.conflicts.iter().map(|k| k.as_str()).collect();
    assert_eq!(conflicts, ["_group_group2_field3_0"]);
    let groups = submission.fields[0].values();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].field("field1").unwrap().value(), Some("kept"));
    assert_eq!(groups[1].field("field4").unwrap().value(), Some("other"));
}
