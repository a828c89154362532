//! Runtime configuration with environment overrides.
use std::env;

use anyhow::{bail, Context, Result};

use mentor_dialog::DEFAULT_STEP_BUDGET;

pub const STEP_BUDGET_ENV: &str = "MENTOR_STEP_BUDGET";
pub const PROCESSED_TURN_CAP_ENV: &str = "MENTOR_PROCESSED_TURN_CAP";

const DEFAULT_ROOT_DIALOG_ID: &str = "root";
const DEFAULT_PROCESSED_TURN_CAP: usize = 128;
const DEFAULT_HELP_TEXT: &str = "I can answer questions about homework, exams, and the lecture \
schedule, and staff can send announcements. Say 'reset' at any time to start over.";

#[derive(Debug, Clone)]
/// Public struct `RuntimeConfig` used across Mentor components.
pub struct RuntimeConfig {
    pub root_dialog_id: String,
    pub step_budget: usize,
    pub processed_turn_cap: usize,
    pub help_text: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            root_dialog_id: DEFAULT_ROOT_DIALOG_ID.to_string(),
            step_budget: DEFAULT_STEP_BUDGET,
            processed_turn_cap: DEFAULT_PROCESSED_TURN_CAP,
            help_text: DEFAULT_HELP_TEXT.to_string(),
        }
    }
}

impl RuntimeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.root_dialog_id.trim().is_empty() {
            bail!("root dialog id cannot be empty");
        }
        if self.step_budget == 0 {
            bail!("step budget must be greater than 0");
        }
        Ok(())
    }
}

fn parse_env_usize(name: &str) -> Result<Option<usize>> {
    let Some(raw) = env::var(name).ok().filter(|value| !value.trim().is_empty()) else {
        return Ok(None);
    };
    let value = raw
        .trim()
        .parse::<usize>()
        .with_context(|| format!("invalid {name} value '{raw}'; expected an integer"))?;
    Ok(Some(value))
}

/// Defaults with environment overrides applied and validated.
pub fn load_runtime_config() -> Result<RuntimeConfig> {
    let mut config = RuntimeConfig::default();
    if let Some(step_budget) = parse_env_usize(STEP_BUDGET_ENV)? {
        config.step_budget = step_budget;
    }
    if let Some(cap) = parse_env_usize(PROCESSED_TURN_CAP_ENV)? {
        config.processed_turn_cap = cap;
    }
    config.validate()?;
    Ok(config)
}
