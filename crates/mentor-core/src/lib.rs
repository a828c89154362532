//! Foundational contracts shared across Mentor crates.
//!
//! Provides the inbound-turn/outbound-activity wire contract, the scoped
//! state-store interface with its memory, file, and SQLite backends, and the
//! atomic-write and time helpers those backends rely on.

pub mod atomic_io;
pub mod state_file;
pub mod state_sqlite;
pub mod state_store;
pub mod time_utils;
pub mod turn_contract;
#[cfg(test)]
mod tests;

pub use atomic_io::write_text_atomic;
pub use state_file::FileStateStore;
pub use state_sqlite::SqliteStateStore;
pub use state_store::{
    open_state_store, resolve_state_backend, MemoryStateStore, ResolvedStateBackend,
    StateBackendKind, StateStore, STATE_BACKEND_ENV,
};
pub use time_utils::{current_unix_timestamp, current_unix_timestamp_ms};
pub use turn_contract::{
    InboundAttachment, InboundTurn, OutboundActivity, OutboundAttachment, StateScope,
    StateScopeKey,
};
