//! Dialog stack engine: a durable, resumable call stack of waterfall dialogs.
//!
//! A conversation is a stack of frames, each bound to a registered dialog and
//! a step index. The engine executes exactly one pending step per inbound
//! turn, following same-turn `advance`/`begin`/`replace`/`end` transitions
//! until a step suspends for human input, and persists nothing itself — the
//! caller owns loading and saving the stack through the state store.

pub mod dialog_frames;
pub mod dialog_prompts;
pub mod dialog_registry;
pub mod dialog_stack;

pub use dialog_frames::{DialogFrame, DialogStack};
pub use dialog_prompts::{
    choice_prompt_dialog, match_choice_reply, Candidate, ChoicePromptOptions, ChoiceSelection,
    CHOICE_PROMPT_DIALOG_ID,
};
pub use dialog_registry::{DialogRegistry, StepFn, WaterfallDialog};
pub use dialog_stack::{
    DialogEngine, DialogEngineError, DialogFailure, StepAction, StepContext, TurnRun, TurnStatus,
    DEFAULT_STEP_BUDGET,
};
