//! Scoped durable state contract plus backend selection and the memory backend.
use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use serde_json::Value;

use crate::state_file::FileStateStore;
use crate::state_sqlite::SqliteStateStore;
use crate::turn_contract::StateScopeKey;

/// Environment override for backend selection: auto|memory|file|sqlite.
pub const STATE_BACKEND_ENV: &str = "MENTOR_STATE_BACKEND";

/// Trait contract for `StateStore` behavior.
///
/// Durable key-value storage partitioned by scope. Records are whole JSON
/// values read-modify-written as a unit; backends guarantee read-your-writes
/// within one turn.
pub trait StateStore: Send + Sync {
    fn get(&self, key: &StateScopeKey) -> Result<Option<Value>>;
    fn set(&self, key: &StateScopeKey, value: &Value) -> Result<()>;
    fn delete(&self, key: &StateScopeKey) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Enumerates supported `StateBackendKind` values.
pub enum StateBackendKind {
    Memory,
    File,
    Sqlite,
}

impl StateBackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::File => "file",
            Self::Sqlite => "sqlite",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Public struct `ResolvedStateBackend` used across Mentor components.
pub struct ResolvedStateBackend {
    pub backend: StateBackendKind,
    pub reason_code: String,
}

/// Resolve the state backend from the env override and path hints.
pub fn resolve_state_backend(state_path: &Path) -> Result<ResolvedStateBackend> {
    let env_value = env::var(STATE_BACKEND_ENV).ok();
    if let Some(raw) = env_value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        let normalized = raw.to_ascii_lowercase();
        match normalized.as_str() {
            "auto" => return infer_state_backend(state_path),
            "memory" => {
                return Ok(ResolvedStateBackend {
                    backend: StateBackendKind::Memory,
                    reason_code: "state_backend_env_memory".to_string(),
                });
            }
            "file" => {
                return Ok(ResolvedStateBackend {
                    backend: StateBackendKind::File,
                    reason_code: "state_backend_env_file".to_string(),
                });
            }
            "sqlite" => {
                return Ok(ResolvedStateBackend {
                    backend: StateBackendKind::Sqlite,
                    reason_code: "state_backend_env_sqlite".to_string(),
                });
            }
            _ => {
                bail!(
                    "unsupported {} value '{}' (expected auto|memory|file|sqlite)",
                    STATE_BACKEND_ENV,
                    raw
                );
            }
        }
    }

    infer_state_backend(state_path)
}

fn infer_state_backend(state_path: &Path) -> Result<ResolvedStateBackend> {
    let extension = state_path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase());
    if matches!(extension.as_deref(), Some("sqlite" | "db")) {
        return Ok(ResolvedStateBackend {
            backend: StateBackendKind::Sqlite,
            reason_code: "state_backend_path_sqlite".to_string(),
        });
    }

    Ok(ResolvedStateBackend {
        backend: StateBackendKind::File,
        reason_code: "state_backend_default_file".to_string(),
    })
}

/// Open the resolved backend at `state_path`.
pub fn open_state_store(state_path: &Path) -> Result<Arc<dyn StateStore>> {
    let resolved = resolve_state_backend(state_path)?;
    tracing::debug!(
        backend = resolved.backend.as_str(),
        reason_code = %resolved.reason_code,
        path = %state_path.display(),
        "state backend resolved"
    );
    match resolved.backend {
        StateBackendKind::Memory => Ok(Arc::new(MemoryStateStore::default())),
        StateBackendKind::File => Ok(Arc::new(FileStateStore::new(state_path))),
        StateBackendKind::Sqlite => Ok(Arc::new(SqliteStateStore::open(state_path)?)),
    }
}

#[derive(Debug, Default)]
/// In-process backend for tests and ephemeral runs.
pub struct MemoryStateStore {
    records: Mutex<HashMap<String, Value>>,
}

impl MemoryStateStore {
    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StateStore for MemoryStateStore {
    fn get(&self, key: &StateScopeKey) -> Result<Option<Value>> {
        let records = self
            .records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(records.get(&key.storage_key()).cloned())
    }

    fn set(&self, key: &StateScopeKey, value: &Value) -> Result<()> {
        let mut records = self
            .records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        records.insert(key.storage_key(), value.clone());
        Ok(())
    }

    fn delete(&self, key: &StateScopeKey) -> Result<()> {
        let mut records = self
            .records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        records.remove(&key.storage_key());
        Ok(())
    }
}
