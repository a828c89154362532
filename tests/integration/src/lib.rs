//! Shared harness for end-to-end scenario tests.
use std::sync::Arc;

use chrono::NaiveDate;

use mentor_conversation::{
    build_conversation_registry, InMemoryTutoringDirectory, RecordingAnnouncementGateway,
    ROOT_DIALOG_ID,
};
use mentor_core::{InboundTurn, StateScopeKey, StateStore};
use mentor_dialog::DialogEngine;
use mentor_runtime::{ConversationTurnState, RuntimeConfig, TurnDispatcher, TurnReceipt};

pub const CHANNEL: &str = "console";
pub const CONVERSATION: &str = "chat-1";

pub fn parse_date(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("date literal")
}

/// Drives the full dispatcher stack for one sender over a given store.
pub struct ConsoleHarness {
    dispatcher: TurnDispatcher,
    store: Arc<dyn StateStore>,
    sender_id: String,
    sent: u64,
}

impl ConsoleHarness {
    pub fn new(
        directory: InMemoryTutoringDirectory,
        store: Arc<dyn StateStore>,
        sender_id: &str,
    ) -> Self {
        let gateway = Arc::new(RecordingAnnouncementGateway::new());
        let registry = build_conversation_registry(Arc::new(directory), gateway);
        let engine = DialogEngine::new(Arc::new(registry), ROOT_DIALOG_ID);
        let dispatcher =
            TurnDispatcher::new(engine, store.clone(), RuntimeConfig::default())
                .expect("dispatcher");
        Self {
            dispatcher,
            store,
            sender_id: sender_id.to_string(),
            sent: 0,
        }
    }

    pub fn send(&mut self, text: &str) -> TurnReceipt {
        self.sent += 1;
        self.send_with_id(text, &format!("turn-{}", self.sent))
    }

    pub fn send_with_id(&mut self, text: &str, turn_id: &str) -> TurnReceipt {
        let turn = InboundTurn::text_message(CHANNEL, CONVERSATION, &self.sender_id, text)
            .with_turn_id(turn_id);
        self.dispatcher.dispatch_turn(&turn).expect("dispatch turn")
    }

    pub fn persisted_state(&self) -> ConversationTurnState {
        let raw = self
            .store
            .get(&StateScopeKey::conversation(CHANNEL, CONVERSATION))
            .expect("state get")
            .expect("state present");
        serde_json::from_value(raw).expect("state parse")
    }
}

/// Student with one course and one homework-bearing lecture (scenario A).
pub fn single_course_directory() -> InMemoryTutoringDirectory {
    InMemoryTutoringDirectory::new()
        .with_student("stu-sam", "Sam", "5550001")
        .with_course("alg", "Algebra", Some("Final exam on 18 September."))
        .with_enrollment("stu-sam", "alg")
        .with_lecture(
            "lec-1",
            "alg",
            parse_date("2026-09-01"),
            "Quadratic equations",
            Some("Homework: problems 1-12 from chapter 4."),
        )
        .with_linked_sender(CHANNEL, "sender-sam", "stu-sam")
}

/// Student enrolled in three courses (scenario B).
pub fn three_course_directory() -> InMemoryTutoringDirectory {
    InMemoryTutoringDirectory::new()
        .with_student("stu-sam", "Sam", "5550001")
        .with_course("alg", "Algebra", Some("Algebra exam brief."))
        .with_course("geo", "Geometry", Some("Geometry exam brief."))
        .with_course("num", "Number theory", Some("Number theory exam brief."))
        .with_enrollment("stu-sam", "alg")
        .with_enrollment("stu-sam", "geo")
        .with_enrollment("stu-sam", "num")
        .with_linked_sender(CHANNEL, "sender-sam", "stu-sam")
}

pub fn texts(receipt: &TurnReceipt) -> Vec<String> {
    receipt
        .activities
        .iter()
        .filter_map(|activity| activity.text.clone())
        .collect()
}
