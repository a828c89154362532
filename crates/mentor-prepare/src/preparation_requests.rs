//! Selection kinds, requests, and the resolved-options accumulator.
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const SELECTION_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
/// A category of ambiguity to resolve before a topic can be answered.
pub enum SelectionKind {
    AffiliatedUser,
    Course,
    Date,
    Lecture,
}

impl SelectionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AffiliatedUser => "affiliated_user",
            Self::Course => "course",
            Self::Date => "date",
            Self::Lecture => "lecture",
        }
    }

    /// Question shown when this kind needs a human decision.
    pub fn prompt_text(self) -> &'static str {
        match self {
            Self::AffiliatedUser => "Which student is this about?",
            Self::Course => "Which course?",
            Self::Date => "Which date?",
            Self::Lecture => "Which lecture?",
        }
    }

    /// User-visible cause when no candidate exists for this kind.
    pub fn unmet_message(self) -> &'static str {
        match self {
            Self::AffiliatedUser => "There is no student linked to your account yet.",
            Self::Course => "There is no course enrollment on record.",
            Self::Date => "There are no upcoming dates for this course.",
            Self::Lecture => "There are no upcoming lectures for this course.",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
/// Narrows a candidate query to an already-known course or user.
pub enum ScopeHint {
    Course(String),
    User(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// One disambiguation the resolver must perform.
pub struct SelectionRequest {
    pub kind: SelectionKind,
    #[serde(default)]
    pub scope_hint: Option<ScopeHint>,
}

impl SelectionRequest {
    pub fn new(kind: SelectionKind) -> Self {
        Self {
            kind,
            scope_hint: None,
        }
    }

    pub fn scoped(kind: SelectionKind, scope_hint: ScopeHint) -> Self {
        Self {
            kind,
            scope_hint: Some(scope_hint),
        }
    }

    /// The scope the candidate query runs under: the accumulated answers with
    /// this request's hint overlaid.
    pub fn effective_scope(&self, resolved: &ResolvedOptions) -> ResolvedOptions {
        let mut scope = resolved.clone();
        match &self.scope_hint {
            Some(ScopeHint::Course(course_id)) => scope.course_id = Some(course_id.clone()),
            Some(ScopeHint::User(user_id)) => scope.affiliated_user_id = Some(user_id.clone()),
            None => {}
        }
        scope
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
/// Accumulator threaded through one preparation run; populated monotonically
/// as each selection kind resolves.
pub struct ResolvedOptions {
    /// The authenticated sender driving the conversation.
    #[serde(default)]
    pub principal_user_id: Option<String>,
    /// The student the questions are about (the sender, or a dependent).
    #[serde(default)]
    pub affiliated_user_id: Option<String>,
    #[serde(default)]
    pub course_id: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub lecture_id: Option<String>,
}

impl ResolvedOptions {
    pub fn for_principal(principal_user_id: impl Into<String>) -> Self {
        Self {
            principal_user_id: Some(principal_user_id.into()),
            ..Self::default()
        }
    }

    pub fn is_bound(&self, kind: SelectionKind) -> bool {
        match kind {
            SelectionKind::AffiliatedUser => self.affiliated_user_id.is_some(),
            SelectionKind::Course => self.course_id.is_some(),
            SelectionKind::Date => self.date.is_some(),
            SelectionKind::Lecture => self.lecture_id.is_some(),
        }
    }

    /// Binds a selected candidate key under its kind.
    pub fn bind(&mut self, kind: SelectionKind, key: &str) -> Result<()> {
        match kind {
            SelectionKind::AffiliatedUser => self.affiliated_user_id = Some(key.to_string()),
            SelectionKind::Course => self.course_id = Some(key.to_string()),
            SelectionKind::Date => {
                let date = NaiveDate::parse_from_str(key, SELECTION_DATE_FORMAT)
                    .with_context(|| format!("invalid date candidate key '{key}'"))?;
                self.date = Some(date);
            }
            SelectionKind::Lecture => self.lecture_id = Some(key.to_string()),
        }
        Ok(())
    }
}
