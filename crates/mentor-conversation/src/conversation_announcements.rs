//! Staff announcement dialog: gate, compose, confirm, hand off.
use std::sync::Arc;

use anyhow::Context;
use serde_json::{json, Value};

use mentor_dialog::{
    Candidate, ChoicePromptOptions, ChoiceSelection, DialogFailure, StepAction, StepContext,
    WaterfallDialog, CHOICE_PROMPT_DIALOG_ID,
};
use mentor_prepare::{parse_resolved, SelectionKind, SelectionRequest};

use crate::conversation_profiles::{
    profile_from_options, AnnouncementGateway, TutoringDirectory, UserRole,
};
use crate::conversation_topics::prepare_then_advance;

pub const ANNOUNCEMENT_DIALOG_ID: &str = "announcement";

const LOCAL_RESOLVED: &str = "resolved";
const LOCAL_TEXT_PROMPTED: &str = "text_prompted";
const LOCAL_MESSAGE: &str = "message";
const LOCAL_AUDIENCE: &str = "audience";
const LOCAL_CONFIRM_STARTED: &str = "confirm_started";

const CONFIRM_KEY_SEND: &str = "yes";
const CONFIRM_KEY_DISCARD: &str = "no";

pub fn announcement_dialog(
    directory: Arc<dyn TutoringDirectory>,
    gateway: Arc<dyn AnnouncementGateway>,
) -> WaterfallDialog {
    WaterfallDialog::new(ANNOUNCEMENT_DIALOG_ID)
        .step(|context: &mut StepContext| {
            let profile = profile_from_options(context)?;
            if profile.role != UserRole::Staff {
                return Ok(StepAction::Fail(DialogFailure::new(
                    "announcement_requires_staff_role",
                    "Only staff members can send announcements.",
                )));
            }
            prepare_then_advance(context, vec![SelectionRequest::new(SelectionKind::Course)])
        })
        .step(|context: &mut StepContext| {
            if context.local(LOCAL_RESOLVED).is_none() {
                context.set_local(LOCAL_RESOLVED, context.input.clone());
            }
            if context.mark_once(LOCAL_TEXT_PROMPTED) {
                context.send_text("What should the announcement say?");
                return Ok(StepAction::Waiting);
            }

            let message = context.input_text().unwrap_or_default().trim().to_string();
            if message.is_empty() {
                context.send_text("The announcement text can't be empty. What should it say?");
                return Ok(StepAction::Waiting);
            }
            context.set_local(LOCAL_MESSAGE, json!(message));
            Ok(StepAction::Advance(Value::Null))
        })
        .step(move |context: &mut StepContext| {
            let resolved_raw = context
                .local(LOCAL_RESOLVED)
                .cloned()
                .context("announcement lost its resolved course")?;
            let resolved = parse_resolved(&resolved_raw)?;
            let course_id = resolved
                .course_id
                .context("preparation ended without a course")?;

            if context.mark_once(LOCAL_CONFIRM_STARTED) {
                let audience = directory.announcement_audience_size(&course_id)?;
                context.set_local(LOCAL_AUDIENCE, json!(audience));
                let prompt = ChoicePromptOptions {
                    prompt: format!("Send this announcement to {audience} recipients?"),
                    retry_prompt: String::new(),
                    choices: vec![
                        Candidate::new(CONFIRM_KEY_SEND, "Send it"),
                        Candidate::new(CONFIRM_KEY_DISCARD, "Discard"),
                    ],
                };
                let value = serde_json::to_value(prompt)
                    .context("failed to render confirmation prompt")?;
                return Ok(StepAction::begin(CHOICE_PROMPT_DIALOG_ID, value));
            }

            let selection: ChoiceSelection = serde_json::from_value(context.input.clone())
                .context("confirmation ended without a selection")?;
            if selection.key == CONFIRM_KEY_SEND {
                let profile = profile_from_options(context)?;
                let message = context
                    .local(LOCAL_MESSAGE)
                    .and_then(|value| value.as_str())
                    .unwrap_or_default()
                    .to_string();
                gateway.broadcast(&profile.user_id, &course_id, &message)?;
                let audience = context
                    .local(LOCAL_AUDIENCE)
                    .and_then(|value| value.as_u64())
                    .unwrap_or(0);
                tracing::debug!(course_id = %course_id, audience, "announcement queued");
                context.send_text(format!("Announcement queued for {audience} recipients."));
            } else {
                context.send_text("Okay, I won't send it.");
            }
            Ok(StepAction::End(Value::Null))
        })
}
