//! Selection/preparation resolver built on the dialog stack engine.
//!
//! Given an ordered list of selection kinds still required, the resolver
//! pushes one disambiguation prompt per genuinely ambiguous kind, silently
//! binds any kind with exactly one candidate, and folds every answer into a
//! shared options record that flows back to the caller when the preparation
//! frame unwinds.

pub mod preparation_requests;
pub mod preparation_resolver;

pub use preparation_requests::{ResolvedOptions, ScopeHint, SelectionKind, SelectionRequest};
pub use preparation_resolver::{
    dedup_candidates, parse_resolved, preparation_dialog, CandidateDirectory, PrepareOptions,
    PREPARE_DIALOG_ID,
};
