//! Verification dialog: phone lookup, one-time code, bounded retries.
use std::sync::Arc;

use anyhow::Context;
use serde_json::json;

use mentor_dialog::{DialogFailure, StepAction, StepContext, WaterfallDialog};

use crate::conversation_profiles::TutoringDirectory;

pub const AUTH_DIALOG_ID: &str = "auth";

const LOCAL_PHONE_PROMPTED: &str = "phone_prompted";
const LOCAL_PHONE: &str = "phone";
const LOCAL_CODE_PROMPTED: &str = "code_prompted";
const LOCAL_CODE_ATTEMPTS: &str = "code_attempts";

const MAX_CODE_ATTEMPTS: u64 = 3;

fn normalize_phone(raw: &str) -> String {
    raw.chars()
        .filter(|ch| ch.is_ascii_digit() || *ch == '+')
        .collect()
}

/// Ends with the verified profile. Whether a code is actually sent, and what
/// makes it valid, lives entirely behind the directory.
pub fn auth_dialog(directory: Arc<dyn TutoringDirectory>) -> WaterfallDialog {
    let lookup_directory = directory.clone();
    let verify_directory = directory;

    WaterfallDialog::new(AUTH_DIALOG_ID)
        .step(move |context: &mut StepContext| {
            if let Some(profile) = lookup_directory
                .profile_for_sender(&context.turn.channel_id, &context.turn.sender_id)?
            {
                if profile.verified {
                    let value = serde_json::to_value(profile)
                        .context("failed to render verified profile")?;
                    return Ok(StepAction::End(value));
                }
            }

            if context.mark_once(LOCAL_PHONE_PROMPTED) {
                context.send_text(
                    "Before we continue I need to verify who you are. \
                     What's the phone number the organization has on file for you?",
                );
                return Ok(StepAction::Waiting);
            }

            let phone = normalize_phone(context.input_text().unwrap_or_default());
            if phone.len() < 6 {
                context.send_text("That doesn't look like a phone number. Digits only, please.");
                return Ok(StepAction::Waiting);
            }

            lookup_directory.begin_verification(
                &context.turn.channel_id,
                &context.turn.sender_id,
                &phone,
            )?;
            context.set_local(LOCAL_PHONE, json!(phone));
            context.send_text("Thanks! I've sent a one-time code to that number.");
            Ok(StepAction::Advance(serde_json::Value::Null))
        })
        .step(move |context: &mut StepContext| {
            if context.mark_once(LOCAL_CODE_PROMPTED) {
                context.send_text("Please type the code here.");
                return Ok(StepAction::Waiting);
            }

            let phone = context
                .local(LOCAL_PHONE)
                .and_then(|value| value.as_str())
                .unwrap_or_default()
                .to_string();
            let code = context.input_text().unwrap_or_default().trim().to_string();

            let verified = verify_directory.complete_verification(
                &context.turn.channel_id,
                &context.turn.sender_id,
                &phone,
                &code,
            )?;
            if let Some(profile) = verified {
                tracing::debug!(user_id = %profile.user_id, "sender verified");
                context.send_text(format!("You're verified, {}.", profile.display_name));
                let value =
                    serde_json::to_value(profile).context("failed to render verified profile")?;
                return Ok(StepAction::End(value));
            }

            let attempts = context
                .local(LOCAL_CODE_ATTEMPTS)
                .and_then(|value| value.as_u64())
                .unwrap_or(0)
                + 1;
            if attempts >= MAX_CODE_ATTEMPTS {
                return Ok(StepAction::Fail(DialogFailure::new(
                    "verification_attempts_exhausted",
                    "That code didn't match. Please start over to request a new one.",
                )));
            }
            context.set_local(LOCAL_CODE_ATTEMPTS, json!(attempts));
            context.send_text("That code didn't match. Please try again.");
            Ok(StepAction::Waiting)
        })
}
