//! Inbound turn and outbound activity contract shared by transports and the engine.
use serde::{Deserialize, Serialize};

use crate::time_utils::current_unix_timestamp_ms;

const TURN_CONTRACT_SCHEMA_VERSION: u32 = 1;

fn turn_contract_schema_version() -> u32 {
    TURN_CONTRACT_SCHEMA_VERSION
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Public struct `InboundAttachment` used across Mentor components.
pub struct InboundAttachment {
    #[serde(default)]
    pub name: String,
    pub content_type: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// One human message as handed over by a channel adapter.
pub struct InboundTurn {
    #[serde(default = "turn_contract_schema_version")]
    pub schema_version: u32,
    pub channel_id: String,
    pub conversation_id: String,
    pub sender_id: String,
    #[serde(default)]
    pub turn_id: String,
    pub timestamp_ms: u64,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub attachments: Vec<InboundAttachment>,
}

impl InboundTurn {
    pub fn text_message(
        channel_id: impl Into<String>,
        conversation_id: impl Into<String>,
        sender_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            schema_version: TURN_CONTRACT_SCHEMA_VERSION,
            channel_id: channel_id.into(),
            conversation_id: conversation_id.into(),
            sender_id: sender_id.into(),
            turn_id: String::new(),
            timestamp_ms: current_unix_timestamp_ms(),
            text: text.into(),
            attachments: Vec::new(),
        }
    }

    pub fn with_turn_id(mut self, turn_id: impl Into<String>) -> Self {
        self.turn_id = turn_id.into();
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Public struct `OutboundAttachment` used across Mentor components.
pub struct OutboundAttachment {
    #[serde(default)]
    pub name: String,
    pub content_type: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
/// One reply emitted by a dialog step; delivery belongs to the channel adapter.
pub struct OutboundActivity {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub attachments: Vec<OutboundAttachment>,
    #[serde(default)]
    pub suggested_choices: Vec<String>,
}

impl OutboundActivity {
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn with_choices(text: impl Into<String>, suggested_choices: Vec<String>) -> Self {
        Self {
            text: Some(text.into()),
            attachments: Vec::new(),
            suggested_choices,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `StateScope` values.
pub enum StateScope {
    User,
    Conversation,
}

impl StateScope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Conversation => "conversation",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
/// Addresses one durable state record by scope, channel, and identity.
pub struct StateScopeKey {
    pub scope: StateScope,
    pub channel_id: String,
    pub id: String,
}

impl StateScopeKey {
    pub fn conversation(channel_id: impl Into<String>, conversation_id: impl Into<String>) -> Self {
        Self {
            scope: StateScope::Conversation,
            channel_id: channel_id.into(),
            id: conversation_id.into(),
        }
    }

    pub fn user(channel_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            scope: StateScope::User,
            channel_id: channel_id.into(),
            id: user_id.into(),
        }
    }

    /// Flat key used by every backend; segments are '/'-joined.
    pub fn storage_key(&self) -> String {
        format!("{}/{}/{}", self.scope.as_str(), self.channel_id, self.id)
    }

    /// Filesystem-safe rendition of `storage_key` for the file backend.
    pub fn file_stem(&self) -> String {
        self.storage_key()
            .chars()
            .map(|ch| {
                if ch.is_ascii_alphanumeric() || ch == '_' {
                    ch
                } else {
                    '-'
                }
            })
            .collect()
    }
}
