//! Core contract tests covering scope keys, backends, and backend resolution.
use std::path::Path;

use serde_json::json;
use tempfile::tempdir;

use super::*;

#[test]
fn scope_keys_are_partitioned_by_scope_and_channel() {
    let conversation = StateScopeKey::conversation("telegram", "chat-17");
    let user = StateScopeKey::user("telegram", "chat-17");
    assert_eq!(conversation.storage_key(), "conversation/telegram/chat-17");
    assert_eq!(user.storage_key(), "user/telegram/chat-17");
    assert_ne!(conversation.storage_key(), user.storage_key());
}

#[test]
fn file_stem_is_filesystem_safe() {
    let key = StateScopeKey::conversation("web chat", "a/b:c");
    let stem = key.file_stem();
    assert!(stem
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'));
}

#[test]
fn memory_store_round_trips_and_deletes() {
    let store = MemoryStateStore::default();
    let key = StateScopeKey::conversation("console", "local");
    assert!(store.get(&key).expect("get").is_none());

    store.set(&key, &json!({"frames": []})).expect("set");
    let loaded = store.get(&key).expect("get").expect("record");
    assert_eq!(loaded, json!({"frames": []}));

    store.delete(&key).expect("delete");
    assert!(store.get(&key).expect("get").is_none());
    assert!(store.is_empty());
}

#[test]
fn file_store_round_trips_through_disk() {
    let temp = tempdir().expect("tempdir");
    let store = FileStateStore::new(temp.path());
    let key = StateScopeKey::conversation("console", "local");

    store.set(&key, &json!({"step": 2})).expect("set");
    let reopened = FileStateStore::new(temp.path());
    let loaded = reopened.get(&key).expect("get").expect("record");
    assert_eq!(loaded, json!({"step": 2}));

    store.delete(&key).expect("delete");
    assert!(store.get(&key).expect("get").is_none());
    // deleting a missing record is a no-op
    store.delete(&key).expect("delete twice");
}

#[test]
fn sqlite_store_round_trips_and_overwrites() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("state.sqlite");
    let store = SqliteStateStore::open(&path).expect("open");
    let key = StateScopeKey::conversation("console", "local");

    store.set(&key, &json!({"step": 1})).expect("set");
    store.set(&key, &json!({"step": 2})).expect("overwrite");
    let loaded = store.get(&key).expect("get").expect("record");
    assert_eq!(loaded, json!({"step": 2}));

    store.delete(&key).expect("delete");
    assert!(store.get(&key).expect("get").is_none());
}

#[test]
fn backend_resolution_prefers_sqlite_extensions() {
    let resolved = resolve_state_backend(Path::new("/tmp/mentor/state.sqlite")).expect("resolve");
    assert_eq!(resolved.backend, StateBackendKind::Sqlite);
    assert_eq!(resolved.reason_code, "state_backend_path_sqlite");

    let resolved = resolve_state_backend(Path::new("/tmp/mentor/state-dir")).expect("resolve");
    assert_eq!(resolved.backend, StateBackendKind::File);
    assert_eq!(resolved.reason_code, "state_backend_default_file");
}

#[test]
fn inbound_turn_builder_fills_contract_defaults() {
    let turn = InboundTurn::text_message("console", "local", "user-1", "hello")
        .with_turn_id("turn-1");
    assert_eq!(turn.schema_version, 1);
    assert_eq!(turn.turn_id, "turn-1");
    assert!(turn.timestamp_ms > 0);
    assert!(turn.attachments.is_empty());
}

#[test]
fn outbound_activity_builders_shape_replies() {
    let plain = OutboundActivity::message("hi");
    assert_eq!(plain.text.as_deref(), Some("hi"));
    assert!(plain.suggested_choices.is_empty());

    let prompt = OutboundActivity::with_choices("pick one", vec!["a".into(), "b".into()]);
    assert_eq!(prompt.suggested_choices.len(), 2);
}
