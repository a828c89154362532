//! End-to-end scenarios: silent resolution, prompted selection, reset,
//! dependent insertion, unmet preconditions, and restart resumption.
use std::sync::Arc;

use mentor_core::{FileStateStore, MemoryStateStore, OutboundActivity, StateStore};
use mentor_integration_tests::{
    parse_date, single_course_directory, texts, three_course_directory, ConsoleHarness, CHANNEL,
};
use mentor_conversation::InMemoryTutoringDirectory;
use mentor_runtime::TurnReceiptStatus;
use tempfile::tempdir;

fn memory_store() -> Arc<dyn StateStore> {
    Arc::new(MemoryStateStore::default())
}

#[test]
fn sole_course_and_lecture_resolve_without_a_single_prompt() {
    let mut harness = ConsoleHarness::new(single_course_directory(), memory_store(), "sender-sam");
    harness.send("");

    let run = harness.send("Homework");
    // the first reply is already the homework answer; no selection prompt
    // was emitted in between
    let replies = texts(&run);
    assert!(
        replies[0].contains("problems 1-12"),
        "expected the homework brief first, got {replies:?}"
    );
    let selection_prompts: Vec<&OutboundActivity> = run
        .activities
        .iter()
        .filter(|activity| {
            activity
                .text
                .as_deref()
                .is_some_and(|text| text.contains("Which"))
        })
        .collect();
    assert!(selection_prompts.is_empty());
}

#[test]
fn three_courses_prompt_once_and_position_two_selects_the_second() {
    let mut harness = ConsoleHarness::new(three_course_directory(), memory_store(), "sender-sam");
    harness.send("");

    let prompted = harness.send("Exams");
    assert_eq!(prompted.status, TurnReceiptStatus::Waiting);
    let prompts: Vec<&OutboundActivity> = prompted
        .activities
        .iter()
        .filter(|activity| !activity.suggested_choices.is_empty())
        .collect();
    assert_eq!(prompts.len(), 1, "exactly one selection prompt");
    assert_eq!(
        prompts[0].suggested_choices,
        vec!["Algebra", "Geometry", "Number theory"]
    );

    let answered = harness.send("2");
    assert!(
        texts(&answered)
            .iter()
            .any(|text| text.contains("Geometry exam brief")),
        "position 2 must select the second course"
    );
}

#[test]
fn reset_discards_a_deep_stack_and_restarts_the_root() {
    let mut harness = ConsoleHarness::new(three_course_directory(), memory_store(), "sender-sam");
    harness.send("");
    let mid_selection = harness.send("Exams");
    assert_eq!(mid_selection.status, TurnReceiptStatus::Waiting);
    assert!(
        harness.persisted_state().stack.depth() >= 3,
        "root + topic + preparation frames are live"
    );

    let reset = harness.send("reset");
    let state = harness.persisted_state();
    assert_eq!(state.stack.depth(), 1, "only the restarted root remains");
    assert_eq!(state.stack.frames[0].step_index, 1, "root is at its menu");
    // the fresh menu is offered on the same turn
    assert!(!reset
        .activities
        .last()
        .expect("menu")
        .suggested_choices
        .is_empty());
}

#[test]
fn guardian_dependent_question_is_inserted_before_the_course_question() {
    let directory = InMemoryTutoringDirectory::new()
        .with_guardian("gua-pat", "Pat", "5559000", &["stu-sam", "stu-ria"])
        .with_student("stu-sam", "Sam", "5550001")
        .with_student("stu-ria", "Ria", "5550002")
        .with_course("alg", "Algebra", Some("Algebra exam brief."))
        .with_course("geo", "Geometry", Some("Geometry exam brief."))
        .with_enrollment("stu-sam", "alg")
        .with_enrollment("stu-ria", "geo")
        .with_linked_sender(CHANNEL, "sender-pat", "gua-pat");
    let mut harness = ConsoleHarness::new(directory, memory_store(), "sender-pat");
    harness.send("");

    let prompted = harness.send("Exams");
    let prompt = prompted
        .activities
        .iter()
        .find(|activity| !activity.suggested_choices.is_empty())
        .expect("dependent prompt");
    assert_eq!(prompt.suggested_choices, vec!["Sam", "Ria"]);

    // choosing the dependent leaves a single enrolled course, which then
    // resolves silently
    let answered = harness.send("Ria");
    assert!(texts(&answered)
        .iter()
        .any(|text| text.contains("Geometry exam brief")));
}

#[test]
fn missing_lectures_fail_with_a_typed_code_and_discard_the_whole_preparation() {
    let directory = InMemoryTutoringDirectory::new()
        .with_student("stu-sam", "Sam", "5550001")
        .with_course("alg", "Algebra", None)
        .with_enrollment("stu-sam", "alg")
        .with_linked_sender(CHANNEL, "sender-sam", "stu-sam");
    let mut harness = ConsoleHarness::new(directory, memory_store(), "sender-sam");
    harness.send("");

    let run = harness.send("Homework");
    assert_eq!(run.failure_code.as_deref(), Some("no_candidates_lecture"));
    assert!(
        harness.persisted_state().stack.is_idle(),
        "the entire preparation stack is discarded, not just the lecture request"
    );
    assert!(texts(&run)
        .iter()
        .any(|text| text.contains("no upcoming lectures")));

    // the conversation restarts cleanly afterwards
    let next = harness.send("hello");
    assert_eq!(next.status, TurnReceiptStatus::Waiting);
}

#[test]
fn duplicate_turn_delivery_is_suppressed_end_to_end() {
    let mut harness = ConsoleHarness::new(single_course_directory(), memory_store(), "sender-sam");
    let first = harness.send_with_id("hello", "webhook-1");
    assert!(!first.activities.is_empty());

    let replayed = harness.send_with_id("hello", "webhook-1");
    assert_eq!(replayed.status, TurnReceiptStatus::Duplicate);
    assert!(replayed.activities.is_empty());
}

#[test]
fn interrupted_and_uninterrupted_runs_produce_identical_activities() {
    let script = ["", "Lecture schedule", "2"];

    let directory = || {
        InMemoryTutoringDirectory::new()
            .with_student("stu-sam", "Sam", "5550001")
            .with_course("alg", "Algebra", None)
            .with_enrollment("stu-sam", "alg")
            .with_lecture("lec-1", "alg", parse_date("2026-09-01"), "Quadratics", None)
            .with_lecture("lec-2", "alg", parse_date("2026-09-08"), "Polynomials", None)
            .with_linked_sender(CHANNEL, "sender-sam", "stu-sam")
    };

    // uninterrupted run
    let mut baseline = ConsoleHarness::new(directory(), memory_store(), "sender-sam");
    let baseline_activities: Vec<Vec<OutboundActivity>> = script
        .iter()
        .map(|text| baseline.send(text).activities)
        .collect();

    // restarted run: a brand-new harness over the same persisted files takes
    // over before every turn
    let temp = tempdir().expect("tempdir");
    let mut restarted_activities = Vec::new();
    for (index, text) in script.iter().enumerate() {
        let store: Arc<dyn StateStore> = Arc::new(FileStateStore::new(temp.path()));
        let mut harness = ConsoleHarness::new(directory(), store, "sender-sam");
        let receipt = harness.send_with_id(text, &format!("turn-{}", index + 1));
        restarted_activities.push(receipt.activities);
    }

    assert_eq!(baseline_activities, restarted_activities);
}
