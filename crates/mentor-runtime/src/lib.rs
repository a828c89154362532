//! Turn dispatch runtime: per-conversation serialization, duplicate-turn
//! suppression, command interception, and persist-before-acknowledge state
//! handling around the dialog stack engine.

pub mod runtime_config;
pub mod turn_dedup;
pub mod turn_dispatcher;
#[cfg(test)]
mod tests;

pub use runtime_config::{load_runtime_config, RuntimeConfig, PROCESSED_TURN_CAP_ENV, STEP_BUDGET_ENV};
pub use turn_dispatcher::{
    ConversationTurnState, TurnDispatcher, TurnReceipt, TurnReceiptStatus,
};
