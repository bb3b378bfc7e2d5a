//! Property-based tests for save/load through a store.
//!
//! - load(save(T)) == T for trees with empty instances and nested fields
//! - saving T2 over T leaves exactly the rows of T2

mod common;

use std::sync::Arc;

use common::{group_set, repeater, text};
use metafield_model::{FieldNode, FieldSchema, GroupNode, GroupSchema, Storable};
use metafield_storage::{MemoryMetaStore, MetaPersister};
use metafield_types::OwnerId;
use proptest::prelude::*;
use proptest::strategy::Union;

// =============================================================================
// HELPER STRATEGIES
// =============================================================================

fn nested() -> Arc<FieldSchema> {
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

fn roots() -> Vec<Arc<FieldSchema>> {
    vec![Arc::new(text("field1")), repeater(), group_set(), nested()]
}

fn node_strategy(schema: Arc<FieldSchema>, in_instance: bool) -> BoxedStrategy<FieldNode> {
    if !schema.is_complex() {
        let pattern = if in_instance { "[a-z0-9 ]{1,6}" } else { "[a-z0-9 ]{0,6}" };
        return prop_oneof![Just(None), pattern.prop_map(Some)]
            .prop_map(move |value| FieldNode::with_value(Arc::clone(&schema), value))
            .boxed();
    }
    let groups: Vec<BoxedStrategy<GroupNode>> = schema.groups().iter().map(group_strategy).collect();
    prop::collection::vec(Union::new(groups), 0..4)
        .prop_map(move |groups| FieldNode::with_groups(Arc::clone(&schema), groups))
        .boxed()
}

fn group_strategy(group: &GroupSchema) -> BoxedStrategy<GroupNode> {
    let group_type = group.group_type().cloned();
    let mut fields: BoxedStrategy<Vec<FieldNode>> = Just(Vec::new()).boxed();
    for child in group.fields() {
        fields = (fields, node_strategy(Arc::clone(child), true))
            .prop_map(|(mut fields, node)| {
                fields.push(node);
                fields
            })
            .boxed();
    }
    fields
        .prop_map(move |fields| GroupNode::new(group_type.clone(), fields))
        .boxed()
}

fn forest_strategy() -> BoxedStrategy<Vec<FieldNode>> {
    let mut forest: BoxedStrategy<Vec<FieldNode>> = Just(Vec::new()).boxed();
    for root in roots() {
        forest = (forest, node_strategy(root, false))
            .prop_map(|(mut nodes, node)| {
                nodes.push(node);
                nodes
            })
            .boxed();
    }
    forest
}

// =============================================================================
// PERSISTER PROPERTIES
// =============================================================================

proptest! {
    #[test]
    fn load_after_save_is_identity(fields in forest_strategy()) {
        let owner = OwnerId::new(1);
        let p = MetaPersister::new(MemoryMetaStore::new());
        p.save(owner, &fields).unwrap();

        let report = p.load(owner, &roots()).unwrap();
        prop_assert!(report.unknown_keys.is_empty());
        prop_assert!(report.conflicts.is_empty());
        prop_assert_eq!(report.fields, fields);
    }

    #[test]
    fn resave_keeps_only_new_rows(first in forest_strategy(), second in forest_strategy()) {
        let owner = OwnerId::new(2);
        let p = MetaPersister::new(MemoryMetaStore::new());
        p.save(owner, &first).unwrap();
        p.save(owner, &second).unwrap();

        let mut expected: Vec<(String, String)> = second
            .iter()
            .flat_map(Storable::storage_entries)
            .map(|entry| (entry.key.into_string(), entry.value))
            .collect();
        expected.sort();
        let stored: Vec<(String, String)> = p
            .store()
            .dump()
            .unwrap()
            .into_iter()
            .map(|row| (row.key.into_string(), row.value))
            .collect();
        prop_assert_eq!(stored, expected);
        prop_assert_eq!(p.load(owner, &roots()).unwrap().fields, second);
    }
}
