//! Reusable choice prompt: present an ordered candidate list, map the reply
//! back by position or label against the same serialized list.
use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::dialog_registry::WaterfallDialog;
use crate::dialog_stack::{StepAction, StepContext};

pub const CHOICE_PROMPT_DIALOG_ID: &str = "choice_prompt";

const LOCAL_PROMPTED: &str = "prompted";
const DEFAULT_RETRY_PROMPT: &str =
    "Sorry, I didn't catch that. Please pick one of the options below.";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// One selectable entry; keys are unique, labels are what humans see.
pub struct Candidate {
    pub key: String,
    pub label: String,
}

impl Candidate {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Options for the choice prompt dialog. The choice list travels inside the
/// frame options, so the list presented and the list used to interpret the
/// reply are the same serialized object — never recomputed in between.
pub struct ChoicePromptOptions {
    pub prompt: String,
    #[serde(default)]
    pub retry_prompt: String,
    pub choices: Vec<Candidate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// End value of the choice prompt: the chosen candidate plus its position.
pub struct ChoiceSelection {
    pub key: String,
    pub label: String,
    pub index: usize,
}

/// Maps a reply to a candidate by 1-based index or case-insensitive label.
pub fn match_choice_reply(reply: &str, choices: &[Candidate]) -> Option<ChoiceSelection> {
    let trimmed = reply.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(position) = trimmed.parse::<usize>() {
        if (1..=choices.len()).contains(&position) {
            let candidate = &choices[position - 1];
            return Some(ChoiceSelection {
                key: candidate.key.clone(),
                label: candidate.label.clone(),
                index: position - 1,
            });
        }
    }

    choices
        .iter()
        .enumerate()
        .find(|(_, candidate)| candidate.label.eq_ignore_ascii_case(trimmed))
        .map(|(index, candidate)| ChoiceSelection {
            key: candidate.key.clone(),
            label: candidate.label.clone(),
            index,
        })
}

fn choice_labels(options: &ChoicePromptOptions) -> Vec<String> {
    options
        .choices
        .iter()
        .map(|candidate| candidate.label.clone())
        .collect()
}

/// Single-step dialog: prompt once, then re-enter with each reply until one
/// matches. Invalid replies re-prompt locally without unwinding anything.
pub fn choice_prompt_dialog() -> WaterfallDialog {
    WaterfallDialog::new(CHOICE_PROMPT_DIALOG_ID).step(|context: &mut StepContext| {
        let options: ChoicePromptOptions = serde_json::from_value(context.options.clone())
            .context("choice prompt requires {prompt, choices} options")?;

        if context.mark_once(LOCAL_PROMPTED) {
            context.send_choices(options.prompt.clone(), choice_labels(&options));
            return Ok(StepAction::Waiting);
        }

        let reply = context.input_text().unwrap_or_default().to_string();
        match match_choice_reply(&reply, &options.choices) {
            Some(selection) => {
                let value = serde_json::to_value(selection)
                    .context("failed to render choice selection")?;
                Ok(StepAction::End(value))
            }
            None => {
                let retry = if options.retry_prompt.trim().is_empty() {
                    DEFAULT_RETRY_PROMPT.to_string()
                } else {
                    options.retry_prompt.clone()
                };
                context.send_choices(retry, choice_labels(&options));
                Ok(StepAction::Waiting)
            }
        }
    })
}
