//! One inbound turn end to end: lock, load, intercept, run, persist, reply.
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use mentor_commands::{CommandVocabulary, ConversationCommand};
use mentor_core::{InboundTurn, OutboundActivity, StateScopeKey, StateStore};
use mentor_dialog::{DialogEngine, DialogStack, TurnStatus};

use crate::runtime_config::RuntimeConfig;
use crate::turn_dedup::{normalize_processed_turn_keys, record_processed_turn};

const TURN_STATE_SCHEMA_VERSION: u32 = 1;
const APOLOGY_TEXT: &str =
    "Sorry, something went wrong on my side. Let's start over — what can I help you with?";

fn turn_state_schema_version() -> u32 {
    TURN_STATE_SCHEMA_VERSION
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// Everything persisted per conversation: the dialog stack plus the
/// processed-turn ledger used for duplicate suppression.
pub struct ConversationTurnState {
    #[serde(default = "turn_state_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub stack: DialogStack,
    #[serde(default)]
    pub processed_turn_keys: Vec<String>,
}

impl Default for ConversationTurnState {
    fn default() -> Self {
        Self {
            schema_version: TURN_STATE_SCHEMA_VERSION,
            stack: DialogStack::default(),
            processed_turn_keys: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Enumerates supported `TurnReceiptStatus` values.
pub enum TurnReceiptStatus {
    /// The conversation suspended and awaits the next reply.
    Waiting,
    /// The stack is empty; the conversation is idle.
    Idle,
    /// The turn id was already processed; nothing ran.
    Duplicate,
    /// An engine invariant tripped; the conversation was reset.
    Recovered,
}

impl TurnReceiptStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Idle => "idle",
            Self::Duplicate => "duplicate",
            Self::Recovered => "recovered",
        }
    }
}

#[derive(Debug)]
/// Public struct `TurnReceipt` used across Mentor components.
pub struct TurnReceipt {
    pub status: TurnReceiptStatus,
    pub activities: Vec<OutboundActivity>,
    pub failure_code: Option<String>,
}

/// Serializes turns per conversation and owns the persistence discipline:
/// state is written before any activity is handed back, so a turn whose
/// persistence failed is never considered delivered.
pub struct TurnDispatcher {
    engine: DialogEngine,
    vocabulary: CommandVocabulary,
    store: Arc<dyn StateStore>,
    config: RuntimeConfig,
    conversation_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TurnDispatcher {
    pub fn new(
        engine: DialogEngine,
        store: Arc<dyn StateStore>,
        config: RuntimeConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            engine,
            vocabulary: CommandVocabulary::builtin(),
            store,
            config,
            conversation_locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn with_vocabulary(mut self, vocabulary: CommandVocabulary) -> Self {
        self.vocabulary = vocabulary;
        self
    }

    fn lock_for(&self, scope_key: &str) -> Arc<Mutex<()>> {
        let mut locks = self
            .conversation_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks
            .entry(scope_key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn load_state(
        &self,
        scope: &StateScopeKey,
        activities: &mut Vec<OutboundActivity>,
    ) -> Result<ConversationTurnState> {
        let Some(raw) = self.store.get(scope)? else {
            return Ok(ConversationTurnState::default());
        };
        match serde_json::from_value::<ConversationTurnState>(raw) {
            Ok(mut state) => {
                state.processed_turn_keys = normalize_processed_turn_keys(
                    &state.processed_turn_keys,
                    self.config.processed_turn_cap,
                );
                Ok(state)
            }
            Err(error) => {
                tracing::warn!(
                    scope_key = %scope.storage_key(),
                    %error,
                    "malformed conversation state; resetting to idle"
                );
                activities.push(OutboundActivity::message(APOLOGY_TEXT));
                Ok(ConversationTurnState::default())
            }
        }
    }

    fn persist(&self, scope: &StateScopeKey, state: &ConversationTurnState) -> Result<()> {
        let value =
            serde_json::to_value(state).context("failed to render conversation state")?;
        self.store
            .set(scope, &value)
            .with_context(|| format!("failed to persist turn for {}", scope.storage_key()))
    }

    /// Processes one inbound turn to completion. Turns for the same
    /// conversation serialize on a per-key lock; different conversations run
    /// concurrently.
    pub fn dispatch_turn(&self, turn: &InboundTurn) -> Result<TurnReceipt> {
        let scope = StateScopeKey::conversation(&turn.channel_id, &turn.conversation_id);
        let lock = self.lock_for(&scope.storage_key());
        let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut activities = Vec::new();
        let mut state = self.load_state(&scope, &mut activities)?;

        let turn_key = turn.turn_id.trim().to_string();
        if !turn_key.is_empty()
            && state
                .processed_turn_keys
                .iter()
                .any(|key| key == &turn_key)
        {
            tracing::debug!(turn_id = %turn_key, "duplicate turn suppressed");
            return Ok(TurnReceipt {
                status: TurnReceiptStatus::Duplicate,
                activities: Vec::new(),
                failure_code: None,
            });
        }

        let mut input = if turn.text.trim().is_empty() {
            Value::Null
        } else {
            json!(turn.text)
        };

        match self.vocabulary.classify(&turn.text) {
            Some(command @ (ConversationCommand::Reset | ConversationCommand::Greeting)) => {
                tracing::debug!(
                    command = command.as_str(),
                    depth = state.stack.depth(),
                    "command cleared the stack"
                );
                state.stack.clear();
                input = Value::Null;
            }
            Some(ConversationCommand::Help) => {
                activities.push(OutboundActivity::message(self.config.help_text.clone()));
                let status = if state.stack.is_idle() {
                    TurnReceiptStatus::Idle
                } else {
                    TurnReceiptStatus::Waiting
                };
                record_processed_turn(
                    &mut state.processed_turn_keys,
                    &turn_key,
                    self.config.processed_turn_cap,
                );
                self.persist(&scope, &state)?;
                return Ok(TurnReceipt {
                    status,
                    activities,
                    failure_code: None,
                });
            }
            None => {}
        }

        let mut failure_code = None;
        let status = match self.engine.run_turn(&mut state.stack, turn, input) {
            Ok(run) => {
                activities.extend(run.activities);
                if let Some(failure) = run.failure {
                    failure_code = Some(failure.code.clone());
                    activities.push(OutboundActivity::message(failure.message));
                }
                match run.status {
                    TurnStatus::Waiting => TurnReceiptStatus::Waiting,
                    TurnStatus::Idle => TurnReceiptStatus::Idle,
                }
            }
            Err(error) => {
                tracing::error!(
                    scope_key = %scope.storage_key(),
                    %error,
                    "engine error; conversation reset to idle"
                );
                state.stack.clear();
                activities.push(OutboundActivity::message(APOLOGY_TEXT));
                TurnReceiptStatus::Recovered
            }
        };

        record_processed_turn(
            &mut state.processed_turn_keys,
            &turn_key,
            self.config.processed_turn_cap,
        );
        self.persist(&scope, &state)?;

        Ok(TurnReceipt {
            status,
            activities,
            failure_code,
        })
    }
}
