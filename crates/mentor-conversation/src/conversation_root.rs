//! Root dialog: authenticate, present the menu, dispatch, loop back.
use anyhow::{bail, Result};
use serde_json::{json, Value};

use mentor_dialog::{match_choice_reply, Candidate, StepAction, StepContext, WaterfallDialog};

use crate::conversation_announcements::ANNOUNCEMENT_DIALOG_ID;
use crate::conversation_auth::AUTH_DIALOG_ID;
use crate::conversation_profiles::{profile_from_options, UserRole};
use crate::conversation_topics::{EXAMS_DIALOG_ID, HOMEWORK_DIALOG_ID, LECTURES_DIALOG_ID};

pub const ROOT_DIALOG_ID: &str = "root";

const LOCAL_AUTH_STARTED: &str = "auth_started";
const LOCAL_MENU_PROMPTED: &str = "menu_prompted";
const LOCAL_MENU_DISPATCHED: &str = "menu_dispatched";

const MENU_RETRY_PROMPT: &str = "I didn't recognize that. Please pick one of the options below.";

fn menu_candidates(role: UserRole) -> Vec<Candidate> {
    let mut menu = vec![
        Candidate::new(HOMEWORK_DIALOG_ID, "Homework"),
        Candidate::new(EXAMS_DIALOG_ID, "Exams"),
        Candidate::new(LECTURES_DIALOG_ID, "Lecture schedule"),
    ];
    if role == UserRole::Staff {
        menu.push(Candidate::new(ANNOUNCEMENT_DIALOG_ID, "Send announcement"));
    }
    menu
}

fn menu_labels(menu: &[Candidate]) -> Vec<String> {
    menu.iter().map(|entry| entry.label.clone()).collect()
}

fn topic_dialog_id(key: &str) -> Result<&'static str> {
    match key {
        HOMEWORK_DIALOG_ID => Ok(HOMEWORK_DIALOG_ID),
        EXAMS_DIALOG_ID => Ok(EXAMS_DIALOG_ID),
        LECTURES_DIALOG_ID => Ok(LECTURES_DIALOG_ID),
        ANNOUNCEMENT_DIALOG_ID => Ok(ANNOUNCEMENT_DIALOG_ID),
        _ => bail!("menu produced an unknown topic key '{key}'"),
    }
}

/// The conversation's entry point. Ends only through a reset or a failure;
/// finished topics swap in a fresh copy of the root via `Replace`.
pub fn root_dialog() -> WaterfallDialog {
    WaterfallDialog::new(ROOT_DIALOG_ID)
        .step(|context: &mut StepContext| {
            // A replaced root arrives with the profile already in options.
            if context
                .options
                .get("profile")
                .is_some_and(|profile| !profile.is_null())
            {
                return Ok(StepAction::Advance(Value::Null));
            }
            if context.mark_once(LOCAL_AUTH_STARTED) {
                return Ok(StepAction::begin(AUTH_DIALOG_ID, Value::Null));
            }
            let profile = context.input.clone();
            if profile.is_null() {
                bail!("auth dialog ended without a profile");
            }
            *context.options = json!({ "profile": profile });
            Ok(StepAction::Advance(Value::Null))
        })
        .step(|context: &mut StepContext| {
            let profile = profile_from_options(context)?;
            let menu = menu_candidates(profile.role);

            if context.local(LOCAL_MENU_DISPATCHED).is_none() {
                if context.mark_once(LOCAL_MENU_PROMPTED) {
                    context.send_choices(
                        format!(
                            "Hi {}! What can I help you with today?",
                            profile.display_name
                        ),
                        menu_labels(&menu),
                    );
                    return Ok(StepAction::Waiting);
                }

                let reply = context.input_text().unwrap_or_default().to_string();
                let Some(selection) = match_choice_reply(&reply, &menu) else {
                    context.send_choices(MENU_RETRY_PROMPT, menu_labels(&menu));
                    return Ok(StepAction::Waiting);
                };
                context.set_local(LOCAL_MENU_DISPATCHED, json!(selection.key));
                let topic = topic_dialog_id(&selection.key)?;
                return Ok(StepAction::begin(
                    topic,
                    json!({ "profile": context.options["profile"].clone() }),
                ));
            }

            // The chosen topic finished; come back with a fresh menu.
            Ok(StepAction::replace(
                ROOT_DIALOG_ID,
                json!({ "profile": context.options["profile"].clone() }),
            ))
        })
}
