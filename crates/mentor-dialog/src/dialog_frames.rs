//! Persisted shape of the dialog call stack.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

const DIALOG_STACK_SCHEMA_VERSION: u32 = 1;

fn dialog_stack_schema_version() -> u32 {
    DIALOG_STACK_SCHEMA_VERSION
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// One activation record: which dialog, which step, and its private state.
///
/// Owned exclusively by the stack it belongs to; only the engine advances
/// `step_index` or writes `locals`.
pub struct DialogFrame {
    pub dialog_id: String,
    pub step_index: usize,
    #[serde(default)]
    pub options: Value,
    #[serde(default)]
    pub locals: BTreeMap<String, Value>,
}

impl DialogFrame {
    pub fn new(dialog_id: impl Into<String>, options: Value) -> Self {
        Self {
            dialog_id: dialog_id.into(),
            step_index: 0,
            options,
            locals: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// The complete ordered call chain for one conversation.
///
/// The last frame is the one awaiting the next turn's input; an empty stack
/// means the conversation is idle.
pub struct DialogStack {
    #[serde(default = "dialog_stack_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub frames: Vec<DialogFrame>,
}

impl Default for DialogStack {
    fn default() -> Self {
        Self {
            schema_version: DIALOG_STACK_SCHEMA_VERSION,
            frames: Vec::new(),
        }
    }
}

impl DialogStack {
    pub fn is_idle(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Discards every frame; the only cancellation primitive.
    pub fn clear(&mut self) {
        self.frames.clear();
    }
}
