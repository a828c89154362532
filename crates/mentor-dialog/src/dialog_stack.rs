//! The interpreter: one inbound turn in, stack transitions and replies out.
use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use mentor_core::{InboundTurn, OutboundActivity};

use crate::dialog_frames::{DialogFrame, DialogStack};
use crate::dialog_registry::DialogRegistry;

/// Same-turn dispatch cap; `advance` and `begin`/`end` chains recurse without
/// a network round trip, so a runaway dialog must fail instead of spinning.
pub const DEFAULT_STEP_BUDGET: usize = 300;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[error("{message}")]
/// Typed, user-visible domain failure; ending a turn with one unwinds the
/// whole stack deterministically.
pub struct DialogFailure {
    pub code: String,
    pub message: String,
}

impl DialogFailure {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug)]
/// Transient result of one step execution; never persisted past the turn.
pub enum StepAction {
    /// Suspend; the next turn's raw input re-enters the same step index.
    Waiting,
    /// Move to the next step of the same frame within this turn.
    Advance(Value),
    /// Push a child dialog and fall through to its first step.
    Begin { dialog_id: String, options: Value },
    /// Swap the innermost frame for a fresh one at step 0.
    Replace { dialog_id: String, options: Value },
    /// Pop this frame; the value resumes the parent at its current step.
    End(Value),
    /// Unmet precondition: clear the stack and surface the cause.
    Fail(DialogFailure),
}

impl StepAction {
    pub fn begin(dialog_id: impl Into<String>, options: Value) -> Self {
        Self::Begin {
            dialog_id: dialog_id.into(),
            options,
        }
    }

    pub fn replace(dialog_id: impl Into<String>, options: Value) -> Self {
        Self::Replace {
            dialog_id: dialog_id.into(),
            options,
        }
    }
}

#[derive(Debug, Error)]
/// Engine invariant violations; fatal to the turn and never shown verbatim.
pub enum DialogEngineError {
    #[error("unknown dialog id '{dialog_id}'")]
    UnknownDialog { dialog_id: String },
    #[error("step budget of {budget} dispatches exceeded in one turn")]
    StepBudgetExceeded { budget: usize },
    #[error("malformed dialog stack: {detail}")]
    MalformedStack { detail: String },
    #[error("step {step_index} of dialog '{dialog_id}' failed")]
    Step {
        dialog_id: String,
        step_index: usize,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Enumerates supported `TurnStatus` values.
pub enum TurnStatus {
    /// Stack is empty; the conversation finished or was unwound.
    Idle,
    /// The innermost frame suspended and awaits the next human reply.
    Waiting,
}

impl TurnStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Waiting => "waiting",
        }
    }
}

#[derive(Debug)]
/// Everything one `run_turn` produced.
pub struct TurnRun {
    pub status: TurnStatus,
    pub activities: Vec<OutboundActivity>,
    /// Set when a `Fail` unwound the stack this turn.
    pub failure: Option<DialogFailure>,
    /// Set when the outermost dialog ended and the stack reached idle.
    pub returned: Option<Value>,
}

/// Execution view handed to a step: the frame's durable state plus the
/// turn-scoped input and outbound sink. Context is always explicit — steps
/// read nothing ambient, so a restored stack resumes identically.
pub struct StepContext<'turn> {
    pub turn: &'turn InboundTurn,
    pub options: &'turn mut Value,
    pub locals: &'turn mut BTreeMap<String, Value>,
    pub input: Value,
    outbound: &'turn mut Vec<OutboundActivity>,
}

impl StepContext<'_> {
    pub fn send(&mut self, activity: OutboundActivity) {
        self.outbound.push(activity);
    }

    pub fn send_text(&mut self, text: impl Into<String>) {
        self.outbound.push(OutboundActivity::message(text));
    }

    pub fn send_choices(&mut self, text: impl Into<String>, labels: Vec<String>) {
        self.outbound
            .push(OutboundActivity::with_choices(text, labels));
    }

    /// The resumed input as text, if it was a plain string.
    pub fn input_text(&self) -> Option<&str> {
        self.input.as_str()
    }

    /// Records `name` in locals; true only on the first call for that name.
    /// This is the prompt bookkeeping that survives suspension.
    pub fn mark_once(&mut self, name: &str) -> bool {
        if self.locals.contains_key(name) {
            return false;
        }
        self.locals.insert(name.to_string(), Value::Bool(true));
        true
    }

    pub fn local(&self, name: &str) -> Option<&Value> {
        self.locals.get(name)
    }

    pub fn set_local(&mut self, name: impl Into<String>, value: Value) {
        self.locals.insert(name.into(), value);
    }

    pub fn take_local(&mut self, name: &str) -> Option<Value> {
        self.locals.remove(name)
    }
}

/// The dialog stack interpreter. Stateless across turns: the stack passed in
/// carries everything, so a fresh process resumes exactly where the previous
/// one suspended.
pub struct DialogEngine {
    registry: Arc<DialogRegistry>,
    root_dialog_id: String,
    step_budget: usize,
}

impl DialogEngine {
    pub fn new(registry: Arc<DialogRegistry>, root_dialog_id: impl Into<String>) -> Self {
        Self {
            registry,
            root_dialog_id: root_dialog_id.into(),
            step_budget: DEFAULT_STEP_BUDGET,
        }
    }

    pub fn with_step_budget(mut self, step_budget: usize) -> Self {
        self.step_budget = step_budget.max(1);
        self
    }

    pub fn root_dialog_id(&self) -> &str {
        &self.root_dialog_id
    }

    /// Runs one logical turn to completion: dispatches the innermost frame's
    /// pending step and follows same-turn transitions until a step suspends,
    /// the stack empties, or a failure unwinds it.
    pub fn run_turn(
        &self,
        stack: &mut DialogStack,
        turn: &InboundTurn,
        initial_input: Value,
    ) -> Result<TurnRun, DialogEngineError> {
        let mut activities = Vec::new();
        let mut input = initial_input;
        let mut dispatches = 0usize;

        if stack.frames.is_empty() {
            tracing::debug!(dialog_id = %self.root_dialog_id, "starting root dialog");
            stack
                .frames
                .push(DialogFrame::new(&self.root_dialog_id, Value::Null));
        }

        loop {
            let frame_index = match stack.frames.len().checked_sub(1) {
                Some(index) => index,
                None => {
                    return Ok(TurnRun {
                        status: TurnStatus::Idle,
                        activities,
                        failure: None,
                        returned: Some(input),
                    });
                }
            };

            dispatches += 1;
            if dispatches > self.step_budget {
                return Err(DialogEngineError::StepBudgetExceeded {
                    budget: self.step_budget,
                });
            }

            let dialog_id = stack.frames[frame_index].dialog_id.clone();
            let step_index = stack.frames[frame_index].step_index;
            let dialog = self.registry.get(&dialog_id).ok_or_else(|| {
                DialogEngineError::UnknownDialog {
                    dialog_id: dialog_id.clone(),
                }
            })?;

            // A waterfall that ran past its last step ends implicitly.
            if step_index >= dialog.steps.len() {
                stack.frames.pop();
                input = Value::Null;
                continue;
            }

            let step = dialog.steps[step_index].clone();
            let action = {
                let frame = &mut stack.frames[frame_index];
                let mut context = StepContext {
                    turn,
                    options: &mut frame.options,
                    locals: &mut frame.locals,
                    input: std::mem::take(&mut input),
                    outbound: &mut activities,
                };
                step(&mut context).map_err(|source| DialogEngineError::Step {
                    dialog_id: dialog_id.clone(),
                    step_index,
                    source,
                })?
            };

            match action {
                StepAction::Waiting => {
                    tracing::debug!(dialog_id = %dialog_id, step_index, "suspended for input");
                    return Ok(TurnRun {
                        status: TurnStatus::Waiting,
                        activities,
                        failure: None,
                        returned: None,
                    });
                }
                StepAction::Advance(value) => {
                    stack.frames[frame_index].step_index += 1;
                    input = value;
                }
                StepAction::Begin { dialog_id, options } => {
                    tracing::debug!(child = %dialog_id, depth = stack.depth(), "begin child dialog");
                    stack.frames.push(DialogFrame::new(dialog_id, options));
                    input = Value::Null;
                }
                StepAction::Replace { dialog_id, options } => {
                    tracing::debug!(replacement = %dialog_id, "replace innermost dialog");
                    stack.frames.pop();
                    stack.frames.push(DialogFrame::new(dialog_id, options));
                    input = Value::Null;
                }
                StepAction::End(value) => {
                    stack.frames.pop();
                    if stack.frames.is_empty() {
                        return Ok(TurnRun {
                            status: TurnStatus::Idle,
                            activities,
                            failure: None,
                            returned: Some(value),
                        });
                    }
                    // The parent's step at its current index receives the
                    // child's result, exactly like a resumed call.
                    input = value;
                }
                StepAction::Fail(failure) => {
                    tracing::warn!(
                        code = %failure.code,
                        depth = stack.depth(),
                        "dialog failure unwinds the stack"
                    );
                    stack.clear();
                    return Ok(TurnRun {
                        status: TurnStatus::Idle,
                        activities,
                        failure: Some(failure),
                        returned: None,
                    });
                }
            }
        }
    }
}
