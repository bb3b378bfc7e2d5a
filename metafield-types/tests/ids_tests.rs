use metafield_types::{OwnerId, RecordScope};
use std::collections::HashSet;
use std::str::FromStr;

// ── OwnerId ───────────────────────────────────────────────────────

#[test]
fn owner_id_display_is_raw_number() {
    assert_eq!(OwnerId::new(123).to_string(), "123");
}

#[test]
fn owner_id_from_str() {
    let id = OwnerId::from_str("123").unwrap();
    assert_eq!(id.get(), 123);
}

#[test]
fn owner_id_from_str_trims_whitespace() {
    assert_eq!(OwnerId::from_str(" 42 ").unwrap(), OwnerId::new(42));
}

#[test]
fn owner_id_from_str_invalid() {
    assert!(OwnerId::from_str("abc").is_err());
    assert!(OwnerId::from_str("-1").is_err());
    assert!(OwnerId::from_str("").is_err());
}

#[test]
fn owner_id_from_u64() {
    let id: OwnerId = 7u64.into();
    assert_eq!(id, OwnerId::new(7));
}

#[test]
fn owner_id_hash_and_ord() {
    let mut set = HashSet::new();
    set.insert(OwnerId::new(1));
    set.insert(OwnerId::new(1));
    set.insert(OwnerId::new(2));
    assert_eq!(set.len(), 2);
    assert!(OwnerId::new(1) < OwnerId::new(2));
}

#[test]
fn owner_id_serde_is_transparent() {
    assert_eq!(serde_json::to_string(&OwnerId::new(123)).unwrap(), "123");
    let parsed: OwnerId = serde_json::from_str("123").unwrap();
    assert_eq!(parsed, OwnerId::new(123));
}

// ── RecordScope ───────────────────────────────────────────────────

#[test]
fn scope_default_is_post() {
    assert_eq!(RecordScope::default().as_str(), "post");
}

#[test]
fn scope_new_valid() {
    let scope = RecordScope::new("page").unwrap();
    assert_eq!(scope.to_string(), "page");
}

#[test]
fn scope_rejects_empty_and_whitespace() {
    assert!(RecordScope::new("").is_err());
    assert!(RecordScope::new("my type").is_err());
}

#[test]
fn scope_deserialize_validates() {
    let scope: RecordScope = serde_json::from_str("\"page\"").unwrap();
    assert_eq!(scope.as_str(), "page");
    assert!(serde_json::from_str::<RecordScope>("\"\"").is_err());
}

#[test]
fn scope_equality() {
    assert_eq!(RecordScope::new("bar").unwrap(), RecordScope::new("bar").unwrap());
    assert_ne!(RecordScope::new("bar").unwrap(), RecordScope::new("foo").unwrap());
}
