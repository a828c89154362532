//! The preparation dialog: a request queue that prompts only when it must.
use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use mentor_dialog::{
    Candidate, ChoicePromptOptions, ChoiceSelection, DialogFailure, StepAction, StepContext,
    WaterfallDialog, CHOICE_PROMPT_DIALOG_ID,
};

use crate::preparation_requests::{ResolvedOptions, SelectionKind, SelectionRequest};

pub const PREPARE_DIALOG_ID: &str = "prepare";

const LOCAL_QUEUE: &str = "queue";
const LOCAL_RESOLVED: &str = "resolved";
const LOCAL_PENDING_KIND: &str = "pending_kind";

/// Trait contract for `CandidateDirectory` behavior.
///
/// A pure read against the external data layer; results arrive already
/// business-filtered (future, non-cancelled, visible to the scope) and in
/// caller-defined display order.
pub trait CandidateDirectory: Send + Sync {
    fn find_candidates(
        &self,
        kind: SelectionKind,
        scope: &ResolvedOptions,
    ) -> Result<Vec<Candidate>>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Options for the preparation dialog.
pub struct PrepareOptions {
    pub requests: Vec<SelectionRequest>,
    #[serde(default)]
    pub seed: ResolvedOptions,
}

impl PrepareOptions {
    pub fn new(requests: Vec<SelectionRequest>, seed: ResolvedOptions) -> Self {
        Self { requests, seed }
    }
}

/// Drops candidates whose key was already seen; insertion order is display
/// order and must survive dedup.
pub fn dedup_candidates(raw: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .filter(|candidate| seen.insert(candidate.key.clone()))
        .collect()
}

fn unmet_precondition(kind: SelectionKind) -> DialogFailure {
    DialogFailure::new(
        format!("no_candidates_{}", kind.as_str()),
        kind.unmet_message(),
    )
}

fn load_progress(context: &StepContext) -> Result<(Vec<SelectionRequest>, ResolvedOptions)> {
    if let Some(raw_queue) = context.local(LOCAL_QUEUE) {
        let queue: Vec<SelectionRequest> = serde_json::from_value(raw_queue.clone())
            .context("preparation queue state is malformed")?;
        let resolved: ResolvedOptions = context
            .local(LOCAL_RESOLVED)
            .map(|raw| serde_json::from_value(raw.clone()))
            .transpose()
            .context("preparation resolved state is malformed")?
            .unwrap_or_default();
        return Ok((queue, resolved));
    }

    let options: PrepareOptions = serde_json::from_value(context.options.clone())
        .context("preparation requires {requests, seed} options")?;
    Ok((options.requests, options.seed))
}

fn store_progress(
    context: &mut StepContext,
    queue: &[SelectionRequest],
    resolved: &ResolvedOptions,
) -> Result<()> {
    context.set_local(
        LOCAL_QUEUE,
        serde_json::to_value(queue).context("failed to render preparation queue")?,
    );
    context.set_local(
        LOCAL_RESOLVED,
        serde_json::to_value(resolved).context("failed to render resolved options")?,
    );
    Ok(())
}

/// Builds the preparation dialog around a candidate directory.
///
/// A single activation function drives the whole run: it is re-entered once
/// per finished child prompt, binds the answer, then keeps consuming the
/// queue until the next genuinely ambiguous request (or the end).
pub fn preparation_dialog(directory: Arc<dyn CandidateDirectory>) -> WaterfallDialog {
    WaterfallDialog::new(PREPARE_DIALOG_ID).step(move |context: &mut StepContext| {
        let (mut queue, mut resolved) = load_progress(context)?;

        // A pending kind means the activation input is a finished choice
        // prompt; the selection is mapped by the child against the exact
        // candidate list it presented, so the key binds directly.
        if let Some(raw_kind) = context.take_local(LOCAL_PENDING_KIND) {
            let kind: SelectionKind = serde_json::from_value(raw_kind)
                .context("pending selection kind is malformed")?;
            let selection: ChoiceSelection = serde_json::from_value(context.input.clone())
                .context("preparation resumed without a choice selection")?;
            resolved.bind(kind, &selection.key)?;
            if !queue.is_empty() {
                queue.remove(0);
            }
        }

        loop {
            let Some(request) = queue.first().cloned() else {
                tracing::debug!("preparation complete");
                return Ok(StepAction::End(
                    serde_json::to_value(&resolved).context("failed to render resolved options")?,
                ));
            };

            // Whose enrollments a course query runs against depends on the
            // affiliated user, so that selection is inserted ahead when it is
            // still open; with a single dependent it binds silently below.
            if request.kind == SelectionKind::Course
                && !resolved.is_bound(SelectionKind::AffiliatedUser)
            {
                queue.insert(0, SelectionRequest::new(SelectionKind::AffiliatedUser));
                continue;
            }

            let scope = request.effective_scope(&resolved);
            let candidates = dedup_candidates(directory.find_candidates(request.kind, &scope)?);

            if candidates.is_empty() {
                return Ok(StepAction::Fail(unmet_precondition(request.kind)));
            }

            if candidates.len() == 1 {
                tracing::debug!(
                    kind = request.kind.as_str(),
                    key = %candidates[0].key,
                    "sole candidate bound without a prompt"
                );
                resolved.bind(request.kind, &candidates[0].key)?;
                queue.remove(0);
                continue;
            }

            context.set_local(
                LOCAL_PENDING_KIND,
                serde_json::to_value(request.kind).context("failed to render selection kind")?,
            );
            store_progress(context, &queue, &resolved)?;

            let prompt = ChoicePromptOptions {
                prompt: request.kind.prompt_text().to_string(),
                retry_prompt: String::new(),
                choices: candidates,
            };
            return Ok(StepAction::begin(
                CHOICE_PROMPT_DIALOG_ID,
                serde_json::to_value(prompt).context("failed to render choice prompt options")?,
            ));
        }
    })
}

/// Convenience: the end value of a preparation run, parsed back.
pub fn parse_resolved(value: &Value) -> Result<ResolvedOptions> {
    serde_json::from_value(value.clone()).context("preparation result is malformed")
}
