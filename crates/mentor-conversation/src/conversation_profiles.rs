//! User profiles and the narrow interfaces to external collaborators.
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use mentor_dialog::StepContext;
use mentor_prepare::CandidateDirectory;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `UserRole` values.
pub enum UserRole {
    Student,
    Guardian,
    Staff,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Guardian => "guardian",
            Self::Staff => "staff",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Public struct `UserProfile` used across Mentor components.
pub struct UserProfile {
    pub user_id: String,
    pub display_name: String,
    pub role: UserRole,
    #[serde(default)]
    pub verified: bool,
}

/// Trait contract for `TutoringDirectory` behavior.
///
/// The user/lecture directory of the tutoring organization. Everything
/// behind it — one-time-code rules, enrollment queries, lecture filtering —
/// is treated as opaque business logic.
pub trait TutoringDirectory: CandidateDirectory {
    fn profile_for_sender(&self, channel_id: &str, sender_id: &str)
        -> Result<Option<UserProfile>>;
    fn begin_verification(&self, channel_id: &str, sender_id: &str, phone: &str) -> Result<()>;
    fn complete_verification(
        &self,
        channel_id: &str,
        sender_id: &str,
        phone: &str,
        code: &str,
    ) -> Result<Option<UserProfile>>;
    fn homework_brief(&self, lecture_id: &str) -> Result<Option<String>>;
    fn exam_brief(&self, course_id: &str) -> Result<Option<String>>;
    fn lectures_on(&self, course_id: &str, date: NaiveDate) -> Result<Vec<String>>;
    fn announcement_audience_size(&self, course_id: &str) -> Result<usize>;
}

/// Trait contract for `AnnouncementGateway` behavior.
///
/// Hands a confirmed announcement to the delivery pipeline; delivery itself
/// (SMS, push) is out of scope.
pub trait AnnouncementGateway: Send + Sync {
    fn broadcast(&self, author_user_id: &str, course_id: &str, message: &str) -> Result<()>;
}

/// Reads the authenticated profile the root dialog threads through options.
pub fn profile_from_options(context: &StepContext) -> Result<UserProfile> {
    let raw = context
        .options
        .get("profile")
        .cloned()
        .unwrap_or(serde_json::Value::Null);
    serde_json::from_value(raw).context("dialog options carry no authenticated profile")
}
