//! Conversation content for the tutoring assistant.
//!
//! Every dialog here is plain data — a waterfall step list plus free
//! functions — registered against the stack engine. The external
//! user/lecture directory and the announcement delivery pipeline stay behind
//! narrow traits.

pub mod conversation_announcements;
pub mod conversation_auth;
pub mod conversation_fixture;
pub mod conversation_profiles;
pub mod conversation_root;
pub mod conversation_topics;

use std::sync::Arc;

use mentor_dialog::{choice_prompt_dialog, DialogRegistry};
use mentor_prepare::{preparation_dialog, CandidateDirectory, ResolvedOptions, SelectionKind};

pub use conversation_announcements::{announcement_dialog, ANNOUNCEMENT_DIALOG_ID};
pub use conversation_auth::{auth_dialog, AUTH_DIALOG_ID};
pub use conversation_fixture::{
    BroadcastRecord, InMemoryTutoringDirectory, RecordingAnnouncementGateway,
    FIXTURE_VERIFICATION_CODE,
};
pub use conversation_profiles::{
    AnnouncementGateway, TutoringDirectory, UserProfile, UserRole,
};
pub use conversation_root::{root_dialog, ROOT_DIALOG_ID};
pub use conversation_topics::{
    exams_dialog, homework_dialog, lectures_dialog, EXAMS_DIALOG_ID, HOMEWORK_DIALOG_ID,
    LECTURES_DIALOG_ID,
};

/// Adapter exposing the directory's candidate queries to the resolver.
struct DirectoryCandidates(Arc<dyn TutoringDirectory>);

impl CandidateDirectory for DirectoryCandidates {
    fn find_candidates(
        &self,
        kind: SelectionKind,
        scope: &ResolvedOptions,
    ) -> anyhow::Result<Vec<mentor_dialog::Candidate>> {
        self.0.find_candidates(kind, scope)
    }
}

/// Assembles the full dialog registry for the tutoring assistant.
pub fn build_conversation_registry(
    directory: Arc<dyn TutoringDirectory>,
    gateway: Arc<dyn AnnouncementGateway>,
) -> DialogRegistry {
    let mut registry = DialogRegistry::new();
    registry.register(choice_prompt_dialog());
    registry.register(preparation_dialog(Arc::new(DirectoryCandidates(
        directory.clone(),
    ))));
    registry.register(root_dialog());
    registry.register(auth_dialog(directory.clone()));
    registry.register(homework_dialog(directory.clone()));
    registry.register(exams_dialog(directory.clone()));
    registry.register(lectures_dialog(directory.clone()));
    registry.register(announcement_dialog(directory, gateway));
    registry
}
