//! Dispatcher tests: dedup, reset, recovery, and restart persistence.
use std::sync::Arc;

use anyhow::bail;
use serde_json::{json, Value};

use mentor_core::{
    FileStateStore, InboundTurn, MemoryStateStore, StateScopeKey, StateStore,
};
use mentor_dialog::{
    DialogEngine, DialogRegistry, StepAction, StepContext, WaterfallDialog,
};
use tempfile::tempdir;

use super::*;

fn nesting_registry() -> DialogRegistry {
    let mut registry = DialogRegistry::new();
    registry.register(WaterfallDialog::new("root").step(|context: &mut StepContext| {
        if context.mark_once("prompted") {
            context.send_text("root: say something");
            return Ok(StepAction::Waiting);
        }
        if context.input_text() == Some("go deeper") {
            return Ok(StepAction::begin("mid", Value::Null));
        }
        Ok(StepAction::End(context.input.clone()))
    }));
    registry.register(WaterfallDialog::new("mid").step(|context: &mut StepContext| {
        if context.mark_once("prompted") {
            context.send_text("mid: keep going?");
            return Ok(StepAction::Waiting);
        }
        Ok(StepAction::begin("leaf", Value::Null))
    }));
    registry.register(WaterfallDialog::new("leaf").step(|context: &mut StepContext| {
        if context.mark_once("prompted") {
            context.send_text("leaf: last question");
            return Ok(StepAction::Waiting);
        }
        Ok(StepAction::End(json!("leaf done")))
    }));
    registry
}

fn dispatcher_with(store: Arc<dyn StateStore>) -> TurnDispatcher {
    let engine = DialogEngine::new(Arc::new(nesting_registry()), "root");
    TurnDispatcher::new(engine, store, RuntimeConfig::default()).expect("dispatcher")
}

fn turn(text: &str, turn_id: &str) -> InboundTurn {
    InboundTurn::text_message("console", "chat-1", "user-1", text).with_turn_id(turn_id)
}

fn stored_state(store: &Arc<dyn StateStore>) -> ConversationTurnState {
    let raw = store
        .get(&StateScopeKey::conversation("console", "chat-1"))
        .expect("get")
        .expect("state");
    serde_json::from_value(raw).expect("parse state")
}

#[test]
fn duplicate_turn_ids_are_suppressed_without_running_the_engine() {
    let store: Arc<dyn StateStore> = Arc::new(MemoryStateStore::default());
    let dispatcher = dispatcher_with(store.clone());

    let first = dispatcher.dispatch_turn(&turn("anything", "t-1")).expect("turn");
    assert_eq!(first.status, TurnReceiptStatus::Waiting);
    assert_eq!(first.activities.len(), 1);

    let replayed = dispatcher.dispatch_turn(&turn("anything", "t-1")).expect("turn");
    assert_eq!(replayed.status, TurnReceiptStatus::Duplicate);
    assert!(replayed.activities.is_empty());

    // the replay left the persisted stack untouched
    let state = stored_state(&store);
    assert_eq!(state.stack.depth(), 1);
    assert_eq!(state.processed_turn_keys, vec!["t-1"]);
}

#[test]
fn reset_command_clears_a_deep_stack_and_restarts_root_in_the_same_turn() {
    let store: Arc<dyn StateStore> = Arc::new(MemoryStateStore::default());
    let dispatcher = dispatcher_with(store.clone());

    dispatcher.dispatch_turn(&turn("anything", "t-1")).expect("turn");
    dispatcher.dispatch_turn(&turn("go deeper", "t-2")).expect("turn");
    dispatcher.dispatch_turn(&turn("sure", "t-3")).expect("turn");
    assert_eq!(stored_state(&store).stack.depth(), 3);

    let reset = dispatcher.dispatch_turn(&turn("reset", "t-4")).expect("turn");
    assert_eq!(reset.status, TurnReceiptStatus::Waiting);
    assert_eq!(
        reset.activities[0].text.as_deref(),
        Some("root: say something")
    );

    let state = stored_state(&store);
    assert_eq!(state.stack.depth(), 1, "only the restarted root remains");
    assert_eq!(state.stack.frames[0].step_index, 0);
}

#[test]
fn help_command_replies_without_touching_the_stack() {
    let store: Arc<dyn StateStore> = Arc::new(MemoryStateStore::default());
    let dispatcher = dispatcher_with(store.clone());

    dispatcher.dispatch_turn(&turn("anything", "t-1")).expect("turn");
    let before = stored_state(&store);

    let help = dispatcher.dispatch_turn(&turn("help", "t-2")).expect("turn");
    assert_eq!(help.status, TurnReceiptStatus::Waiting);
    assert!(help.activities[0]
        .text
        .as_deref()
        .expect("help text")
        .contains("homework"));

    let after = stored_state(&store);
    assert_eq!(before.stack, after.stack);
}

#[test]
fn conversation_survives_a_dispatcher_restart() {
    let temp = tempdir().expect("tempdir");
    let store_a: Arc<dyn StateStore> = Arc::new(FileStateStore::new(temp.path()));
    let dispatcher_a = dispatcher_with(store_a);

    let opening = dispatcher_a.dispatch_turn(&turn("anything", "t-1")).expect("turn");
    assert_eq!(opening.status, TurnReceiptStatus::Waiting);
    drop(dispatcher_a);

    // a fresh dispatcher over the same files resumes mid-dialog
    let store_b: Arc<dyn StateStore> = Arc::new(FileStateStore::new(temp.path()));
    let dispatcher_b = dispatcher_with(store_b);
    let resumed = dispatcher_b
        .dispatch_turn(&turn("finished", "t-2"))
        .expect("turn");
    assert_eq!(resumed.status, TurnReceiptStatus::Idle);
}

#[test]
fn malformed_persisted_state_apologizes_and_restarts() {
    let store: Arc<dyn StateStore> = Arc::new(MemoryStateStore::default());
    let scope = StateScopeKey::conversation("console", "chat-1");
    store
        .set(&scope, &json!({ "stack": "not a stack" }))
        .expect("seed garbage");

    let dispatcher = dispatcher_with(store.clone());
    let run = dispatcher.dispatch_turn(&turn("anything", "t-1")).expect("turn");

    assert_eq!(run.status, TurnReceiptStatus::Waiting);
    assert!(run.activities[0]
        .text
        .as_deref()
        .expect("apology")
        .contains("start over"));
    // the fresh root prompt follows the apology
    assert_eq!(
        run.activities[1].text.as_deref(),
        Some("root: say something")
    );
}

#[test]
fn engine_errors_reset_the_conversation_with_an_apology() {
    let mut registry = DialogRegistry::new();
    registry.register(WaterfallDialog::new("root").step(|_context: &mut StepContext| {
        bail!("directory offline")
    }));
    let engine = DialogEngine::new(Arc::new(registry), "root");
    let store: Arc<dyn StateStore> = Arc::new(MemoryStateStore::default());
    let dispatcher =
        TurnDispatcher::new(engine, store.clone(), RuntimeConfig::default()).expect("dispatcher");

    let run = dispatcher.dispatch_turn(&turn("anything", "t-1")).expect("turn");
    assert_eq!(run.status, TurnReceiptStatus::Recovered);
    assert!(run.activities[0]
        .text
        .as_deref()
        .expect("apology")
        .contains("start over"));
    assert!(stored_state(&store).stack.is_idle());
}

#[test]
fn store_write_failure_fails_the_turn() {
    struct BrokenStore;
    impl StateStore for BrokenStore {
        fn get(&self, _key: &StateScopeKey) -> anyhow::Result<Option<Value>> {
            Ok(None)
        }
        fn set(&self, _key: &StateScopeKey, _value: &Value) -> anyhow::Result<()> {
            bail!("disk full")
        }
        fn delete(&self, _key: &StateScopeKey) -> anyhow::Result<()> {
            Ok(())
        }
    }

    let dispatcher = dispatcher_with(Arc::new(BrokenStore));
    let error = dispatcher
        .dispatch_turn(&turn("anything", "t-1"))
        .expect_err("persistence failure must fail the turn");
    assert!(error.to_string().contains("failed to persist"));
}
