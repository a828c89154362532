//! Process-lifetime registry mapping dialog ids to waterfall step sequences.
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;

use crate::dialog_stack::{StepAction, StepContext};

/// One waterfall step. Steps receive the frame's options/locals and the
/// resumed input, emit outbound activities, and return the next transition.
pub type StepFn = Arc<dyn Fn(&mut StepContext) -> Result<StepAction> + Send + Sync>;

#[derive(Clone)]
/// An ordered step sequence registered under a dialog id.
pub struct WaterfallDialog {
    pub id: String,
    pub steps: Vec<StepFn>,
}

impl WaterfallDialog {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            steps: Vec::new(),
        }
    }

    pub fn step(
        mut self,
        step: impl Fn(&mut StepContext) -> Result<StepAction> + Send + Sync + 'static,
    ) -> Self {
        self.steps.push(Arc::new(step));
        self
    }
}

#[derive(Default, Clone)]
/// Read-only after assembly; shared across conversations without locking.
pub struct DialogRegistry {
    dialogs: HashMap<String, WaterfallDialog>,
}

impl DialogRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, dialog: WaterfallDialog) -> &mut Self {
        self.dialogs.insert(dialog.id.clone(), dialog);
        self
    }

    pub fn get(&self, dialog_id: &str) -> Option<&WaterfallDialog> {
        self.dialogs.get(dialog_id)
    }

    pub fn contains(&self, dialog_id: &str) -> bool {
        self.dialogs.contains_key(dialog_id)
    }

    pub fn ids(&self) -> Vec<&str> {
        let mut ids = self.dialogs.keys().map(String::as_str).collect::<Vec<_>>();
        ids.sort_unstable();
        ids
    }
}
