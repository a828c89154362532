//! In-memory directory and gateway backing tests and the console runner.
use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use chrono::NaiveDate;

use mentor_dialog::Candidate;
use mentor_prepare::{CandidateDirectory, ResolvedOptions, SelectionKind};

use crate::conversation_profiles::{AnnouncementGateway, TutoringDirectory, UserProfile, UserRole};

/// The one-time code every fixture verification expects.
pub const FIXTURE_VERIFICATION_CODE: &str = "246802";

#[derive(Debug, Clone)]
struct FixtureUser {
    profile: UserProfile,
    phone: String,
}

#[derive(Debug, Clone)]
struct FixtureCourse {
    course_id: String,
    label: String,
    exam_brief: Option<String>,
}

#[derive(Debug, Clone)]
struct FixtureLecture {
    lecture_id: String,
    course_id: String,
    date: NaiveDate,
    topic: String,
    homework: Option<String>,
}

#[derive(Default)]
/// Builder-style fixture; every query answers from plain in-memory tables.
pub struct InMemoryTutoringDirectory {
    users: Vec<FixtureUser>,
    dependents: HashMap<String, Vec<String>>,
    enrollments: HashMap<String, Vec<String>>,
    teaching: HashMap<String, Vec<String>>,
    courses: Vec<FixtureCourse>,
    lectures: Vec<FixtureLecture>,
    linked_senders: Mutex<HashMap<(String, String), String>>,
    pending_phones: Mutex<HashMap<(String, String), String>>,
}

impl InMemoryTutoringDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_user(mut self, user_id: &str, display_name: &str, role: UserRole, phone: &str) -> Self {
        self.users.push(FixtureUser {
            profile: UserProfile {
                user_id: user_id.to_string(),
                display_name: display_name.to_string(),
                role,
                verified: false,
            },
            phone: phone.to_string(),
        });
        self
    }

    pub fn with_student(self, user_id: &str, display_name: &str, phone: &str) -> Self {
        self.with_user(user_id, display_name, UserRole::Student, phone)
    }

    pub fn with_guardian(
        mut self,
        user_id: &str,
        display_name: &str,
        phone: &str,
        dependents: &[&str],
    ) -> Self {
        self.dependents.insert(
            user_id.to_string(),
            dependents.iter().map(|id| id.to_string()).collect(),
        );
        self.with_user(user_id, display_name, UserRole::Guardian, phone)
    }

    pub fn with_staff(
        mut self,
        user_id: &str,
        display_name: &str,
        phone: &str,
        courses: &[&str],
    ) -> Self {
        self.teaching.insert(
            user_id.to_string(),
            courses.iter().map(|id| id.to_string()).collect(),
        );
        self.with_user(user_id, display_name, UserRole::Staff, phone)
    }

    pub fn with_course(mut self, course_id: &str, label: &str, exam_brief: Option<&str>) -> Self {
        self.courses.push(FixtureCourse {
            course_id: course_id.to_string(),
            label: label.to_string(),
            exam_brief: exam_brief.map(str::to_string),
        });
        self
    }

    pub fn with_enrollment(mut self, student_id: &str, course_id: &str) -> Self {
        self.enrollments
            .entry(student_id.to_string())
            .or_default()
            .push(course_id.to_string());
        self
    }

    pub fn with_lecture(
        mut self,
        lecture_id: &str,
        course_id: &str,
        date: NaiveDate,
        topic: &str,
        homework: Option<&str>,
    ) -> Self {
        self.lectures.push(FixtureLecture {
            lecture_id: lecture_id.to_string(),
            course_id: course_id.to_string(),
            date,
            topic: topic.to_string(),
            homework: homework.map(str::to_string),
        });
        self
    }

    /// Pre-links a channel sender to a user, skipping verification.
    pub fn with_linked_sender(self, channel_id: &str, sender_id: &str, user_id: &str) -> Self {
        self.linked_senders
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(
                (channel_id.to_string(), sender_id.to_string()),
                user_id.to_string(),
            );
        self
    }

    fn user_by_id(&self, user_id: &str) -> Option<&FixtureUser> {
        self.users.iter().find(|user| user.profile.user_id == user_id)
    }

    fn user_by_phone(&self, phone: &str) -> Option<&FixtureUser> {
        self.users.iter().find(|user| user.phone == phone)
    }

    fn course_label(&self, course_id: &str) -> String {
        self.courses
            .iter()
            .find(|course| course.course_id == course_id)
            .map(|course| course.label.clone())
            .unwrap_or_else(|| course_id.to_string())
    }

    fn courses_for(&self, user_id: &str) -> Vec<String> {
        let role = self
            .user_by_id(user_id)
            .map(|user| user.profile.role);
        let table = match role {
            Some(UserRole::Staff) => &self.teaching,
            _ => &self.enrollments,
        };
        table.get(user_id).cloned().unwrap_or_default()
    }

    fn verified_profile(&self, user_id: &str) -> Option<UserProfile> {
        self.user_by_id(user_id).map(|user| {
            let mut profile = user.profile.clone();
            profile.verified = true;
            profile
        })
    }
}

impl CandidateDirectory for InMemoryTutoringDirectory {
    fn find_candidates(
        &self,
        kind: SelectionKind,
        scope: &ResolvedOptions,
    ) -> Result<Vec<Candidate>> {
        match kind {
            SelectionKind::AffiliatedUser => {
                let Some(principal) = scope.principal_user_id.as_deref() else {
                    return Ok(Vec::new());
                };
                let Some(user) = self.user_by_id(principal) else {
                    return Ok(Vec::new());
                };
                if user.profile.role == UserRole::Guardian {
                    let ids = self.dependents.get(principal).cloned().unwrap_or_default();
                    return Ok(ids
                        .iter()
                        .filter_map(|id| self.user_by_id(id))
                        .map(|dependent| {
                            Candidate::new(
                                dependent.profile.user_id.clone(),
                                dependent.profile.display_name.clone(),
                            )
                        })
                        .collect());
                }
                Ok(vec![Candidate::new(
                    user.profile.user_id.clone(),
                    user.profile.display_name.clone(),
                )])
            }
            SelectionKind::Course => {
                let Some(affiliated) = scope.affiliated_user_id.as_deref() else {
                    return Ok(Vec::new());
                };
                Ok(self
                    .courses_for(affiliated)
                    .into_iter()
                    .map(|course_id| {
                        let label = self.course_label(&course_id);
                        Candidate::new(course_id, label)
                    })
                    .collect())
            }
            SelectionKind::Date => {
                let Some(course_id) = scope.course_id.as_deref() else {
                    return Ok(Vec::new());
                };
                let mut dates: Vec<NaiveDate> = self
                    .lectures
                    .iter()
                    .filter(|lecture| lecture.course_id == course_id)
                    .map(|lecture| lecture.date)
                    .collect();
                dates.sort_unstable();
                dates.dedup();
                dates.reverse();
                Ok(dates
                    .into_iter()
                    .map(|date| {
                        Candidate::new(
                            date.format("%Y-%m-%d").to_string(),
                            date.format("%A, %d %B").to_string(),
                        )
                    })
                    .collect())
            }
            SelectionKind::Lecture => {
                let Some(course_id) = scope.course_id.as_deref() else {
                    return Ok(Vec::new());
                };
                let mut lectures: Vec<&FixtureLecture> = self
                    .lectures
                    .iter()
                    .filter(|lecture| lecture.course_id == course_id)
                    .filter(|lecture| scope.date.map_or(true, |date| lecture.date == date))
                    .collect();
                lectures.sort_by_key(|lecture| lecture.date);
                Ok(lectures
                    .into_iter()
                    .map(|lecture| {
                        Candidate::new(
                            lecture.lecture_id.clone(),
                            format!("{} — {}", lecture.date.format("%d %b"), lecture.topic),
                        )
                    })
                    .collect())
            }
        }
    }
}

impl TutoringDirectory for InMemoryTutoringDirectory {
    fn profile_for_sender(
        &self,
        channel_id: &str,
        sender_id: &str,
    ) -> Result<Option<UserProfile>> {
        let linked = self
            .linked_senders
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&(channel_id.to_string(), sender_id.to_string()))
            .cloned();
        Ok(linked.and_then(|user_id| self.verified_profile(&user_id)))
    }

    fn begin_verification(&self, channel_id: &str, sender_id: &str, phone: &str) -> Result<()> {
        self.pending_phones
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(
                (channel_id.to_string(), sender_id.to_string()),
                phone.to_string(),
            );
        Ok(())
    }

    fn complete_verification(
        &self,
        channel_id: &str,
        sender_id: &str,
        phone: &str,
        code: &str,
    ) -> Result<Option<UserProfile>> {
        if code != FIXTURE_VERIFICATION_CODE {
            return Ok(None);
        }
        let key = (channel_id.to_string(), sender_id.to_string());
        let pending = self
            .pending_phones
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&key)
            .cloned();
        if pending.as_deref() != Some(phone) {
            return Ok(None);
        }
        let Some(user) = self.user_by_phone(phone) else {
            return Ok(None);
        };
        let user_id = user.profile.user_id.clone();
        self.linked_senders
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key, user_id.clone());
        Ok(self.verified_profile(&user_id))
    }

    fn homework_brief(&self, lecture_id: &str) -> Result<Option<String>> {
        Ok(self
            .lectures
            .iter()
            .find(|lecture| lecture.lecture_id == lecture_id)
            .and_then(|lecture| lecture.homework.clone()))
    }

    fn exam_brief(&self, course_id: &str) -> Result<Option<String>> {
        Ok(self
            .courses
            .iter()
            .find(|course| course.course_id == course_id)
            .and_then(|course| course.exam_brief.clone()))
    }

    fn lectures_on(&self, course_id: &str, date: NaiveDate) -> Result<Vec<String>> {
        Ok(self
            .lectures
            .iter()
            .filter(|lecture| lecture.course_id == course_id && lecture.date == date)
            .map(|lecture| lecture.topic.clone())
            .collect())
    }

    fn announcement_audience_size(&self, course_id: &str) -> Result<usize> {
        Ok(self
            .enrollments
            .values()
            .filter(|courses| courses.iter().any(|id| id == course_id))
            .count())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Public struct `BroadcastRecord` used across Mentor components.
pub struct BroadcastRecord {
    pub author_user_id: String,
    pub course_id: String,
    pub message: String,
}

#[derive(Default)]
/// Captures handed-off announcements instead of delivering them.
pub struct RecordingAnnouncementGateway {
    broadcasts: Mutex<Vec<BroadcastRecord>>,
}

impl RecordingAnnouncementGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn broadcasts(&self) -> Vec<BroadcastRecord> {
        self.broadcasts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl AnnouncementGateway for RecordingAnnouncementGateway {
    fn broadcast(&self, author_user_id: &str, course_id: &str, message: &str) -> Result<()> {
        self.broadcasts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(BroadcastRecord {
            author_user_id: author_user_id.to_string(),
            course_id: course_id.to_string(),
            message: message.to_string(),
        });
        Ok(())
    }
}
