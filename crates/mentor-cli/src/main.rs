//! Console runner: each stdin line becomes one inbound turn against a
//! fixture directory, printing the replies the channel adapter would send.
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use mentor_conversation::{
    build_conversation_registry, InMemoryTutoringDirectory, RecordingAnnouncementGateway,
    FIXTURE_VERIFICATION_CODE, ROOT_DIALOG_ID,
};
use mentor_core::{current_unix_timestamp_ms, open_state_store, InboundTurn, OutboundActivity};
use mentor_dialog::DialogEngine;
use mentor_runtime::{load_runtime_config, TurnDispatcher};

const CONSOLE_CHANNEL: &str = "console";

#[derive(Debug, Parser)]
#[command(
    name = "mentor-cli",
    about = "Console runner for the Mentor tutoring assistant"
)]
struct Cli {
    /// Directory (file backend) or .sqlite path for conversation state.
    #[arg(long, default_value = ".mentor-state")]
    state_path: PathBuf,
    /// Sender identity for this console session.
    #[arg(long, default_value = "console-user")]
    sender: String,
    /// Conversation id for this console session.
    #[arg(long, default_value = "console-local")]
    conversation: String,
}

fn demo_date(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("demo date")
}

fn demo_directory() -> InMemoryTutoringDirectory {
    InMemoryTutoringDirectory::new()
        .with_student("stu-sam", "Sam", "5550001")
        .with_guardian("gua-pat", "Pat", "5559000", &["stu-sam", "stu-ria"])
        .with_student("stu-ria", "Ria", "5550002")
        .with_staff("sta-lee", "Dr. Lee", "5557000", &["alg", "geo"])
        .with_course("alg", "Algebra", Some("Final exam on 18 September, rooms 2 and 3."))
        .with_course("geo", "Geometry", None)
        .with_enrollment("stu-sam", "alg")
        .with_enrollment("stu-sam", "geo")
        .with_enrollment("stu-ria", "geo")
        .with_lecture(
            "lec-1",
            "alg",
            demo_date("2026-09-01"),
            "Quadratic equations",
            Some("Homework: problems 1-12 from chapter 4."),
        )
        .with_lecture(
            "lec-2",
            "alg",
            demo_date("2026-09-08"),
            "Polynomials",
            None,
        )
        .with_lecture(
            "lec-3",
            "geo",
            demo_date("2026-09-02"),
            "Triangles",
            Some("Read chapter 2 and solve the worksheet."),
        )
}

fn print_activities(activities: &[OutboundActivity]) {
    for activity in activities {
        if let Some(text) = &activity.text {
            println!("bot> {text}");
        }
        for (index, choice) in activity.suggested_choices.iter().enumerate() {
            println!("       {}) {choice}", index + 1);
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = load_runtime_config()?;
    let store = open_state_store(&cli.state_path)?;
    let directory = Arc::new(demo_directory());
    let gateway = Arc::new(RecordingAnnouncementGateway::new());
    let registry = build_conversation_registry(directory, gateway);
    let engine = DialogEngine::new(Arc::new(registry), ROOT_DIALOG_ID)
        .with_step_budget(config.step_budget);
    let dispatcher = TurnDispatcher::new(engine, store, config)?;

    println!("mentor console — type a message, or 'quit' to exit");
    println!(
        "(demo phones: Sam 5550001, Pat 5559000, Dr. Lee 5557000; one-time code {FIXTURE_VERIFICATION_CODE})"
    );

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut sent = 0u64;
    loop {
        print!("you> ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let text = line.trim();
        if matches!(text, "quit" | "exit") {
            break;
        }

        sent += 1;
        let turn = InboundTurn::text_message(CONSOLE_CHANNEL, &cli.conversation, &cli.sender, text)
            .with_turn_id(format!("console-{}-{sent}", current_unix_timestamp_ms()));
        match dispatcher.dispatch_turn(&turn) {
            Ok(receipt) => print_activities(&receipt.activities),
            Err(error) => {
                tracing::error!(%error, "turn failed");
                eprintln!("turn failed: {error:#}");
            }
        }
    }

    Ok(())
}
