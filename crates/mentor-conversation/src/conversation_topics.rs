//! Topic dialogs: homework, exams, lecture schedule.
//!
//! Each topic runs the preparation resolver for the selections it needs,
//! then answers from the directory and ends, dropping the user back at the
//! root menu.
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;

use mentor_dialog::{StepAction, StepContext, WaterfallDialog};
use mentor_prepare::{
    parse_resolved, PrepareOptions, ResolvedOptions, SelectionKind, SelectionRequest,
    PREPARE_DIALOG_ID,
};

use crate::conversation_profiles::{profile_from_options, TutoringDirectory, UserProfile, UserRole};

pub const HOMEWORK_DIALOG_ID: &str = "homework";
pub const EXAMS_DIALOG_ID: &str = "exams";
pub const LECTURES_DIALOG_ID: &str = "lectures";

const LOCAL_PREPARE_STARTED: &str = "prepare_started";

/// Students and staff speak for themselves; guardians pick a dependent
/// during preparation.
pub fn preparation_seed(profile: &UserProfile) -> ResolvedOptions {
    let mut seed = ResolvedOptions::for_principal(&profile.user_id);
    if matches!(profile.role, UserRole::Student | UserRole::Staff) {
        seed.affiliated_user_id = Some(profile.user_id.clone());
    }
    seed
}

/// First activation begins the preparation child; the re-activation carries
/// its resolved options forward to the fulfillment step.
pub fn prepare_then_advance(
    context: &mut StepContext,
    requests: Vec<SelectionRequest>,
) -> Result<StepAction> {
    if context.mark_once(LOCAL_PREPARE_STARTED) {
        let profile = profile_from_options(context)?;
        let options = PrepareOptions::new(requests, preparation_seed(&profile));
        let value = serde_json::to_value(options).context("failed to render prepare options")?;
        return Ok(StepAction::begin(PREPARE_DIALOG_ID, value));
    }
    Ok(StepAction::Advance(context.input.clone()))
}

pub fn homework_dialog(directory: Arc<dyn TutoringDirectory>) -> WaterfallDialog {
    WaterfallDialog::new(HOMEWORK_DIALOG_ID)
        .step(|context: &mut StepContext| {
            prepare_then_advance(
                context,
                vec![
                    SelectionRequest::new(SelectionKind::Course),
                    SelectionRequest::new(SelectionKind::Lecture),
                ],
            )
        })
        .step(move |context: &mut StepContext| {
            let resolved = parse_resolved(&context.input)?;
            let lecture_id = resolved
                .lecture_id
                .context("preparation ended without a lecture")?;
            match directory.homework_brief(&lecture_id)? {
                Some(brief) => context.send_text(brief),
                None => {
                    context.send_text("No homework has been posted for that lecture yet.");
                }
            }
            Ok(StepAction::End(Value::Null))
        })
}

pub fn exams_dialog(directory: Arc<dyn TutoringDirectory>) -> WaterfallDialog {
    WaterfallDialog::new(EXAMS_DIALOG_ID)
        .step(|context: &mut StepContext| {
            prepare_then_advance(context, vec![SelectionRequest::new(SelectionKind::Course)])
        })
        .step(move |context: &mut StepContext| {
            let resolved = parse_resolved(&context.input)?;
            let course_id = resolved
                .course_id
                .context("preparation ended without a course")?;
            match directory.exam_brief(&course_id)? {
                Some(brief) => context.send_text(brief),
                None => {
                    context.send_text("No exam is currently scheduled for that course.");
                }
            }
            Ok(StepAction::End(Value::Null))
        })
}

pub fn lectures_dialog(directory: Arc<dyn TutoringDirectory>) -> WaterfallDialog {
    WaterfallDialog::new(LECTURES_DIALOG_ID)
        .step(|context: &mut StepContext| {
            prepare_then_advance(
                context,
                vec![
                    SelectionRequest::new(SelectionKind::Course),
                    SelectionRequest::new(SelectionKind::Date),
                ],
            )
        })
        .step(move |context: &mut StepContext| {
            let resolved = parse_resolved(&context.input)?;
            let course_id = resolved
                .course_id
                .context("preparation ended without a course")?;
            let date = resolved.date.context("preparation ended without a date")?;

            let entries = directory.lectures_on(&course_id, date)?;
            if entries.is_empty() {
                context.send_text("There are no lectures on that date.");
            } else {
                let header = format!("Schedule for {}:", date.format("%A, %d %B"));
                let mut lines = vec![header];
                lines.extend(entries);
                context.send_text(lines.join("\n"));
            }
            Ok(StepAction::End(Value::Null))
        })
}
