//! JSON-file-per-scope state backend with atomic writes.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;

use crate::atomic_io::write_text_atomic;
use crate::state_store::StateStore;
use crate::turn_contract::StateScopeKey;

#[derive(Debug, Clone)]
/// Stores each scope record as `<root>/<sanitized key>.json`.
pub struct FileStateStore {
    root: PathBuf,
}

impl FileStateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn record_path(&self, key: &StateScopeKey) -> PathBuf {
        self.root.join(format!("{}.json", key.file_stem()))
    }
}

impl StateStore for FileStateStore {
    fn get(&self, key: &StateScopeKey) -> Result<Option<Value>> {
        let path = self.record_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let value = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse state record {}", path.display()))?;
        Ok(Some(value))
    }

    fn set(&self, key: &StateScopeKey, value: &Value) -> Result<()> {
        let path = self.record_path(key);
        let rendered = serde_json::to_string_pretty(value)
            .with_context(|| format!("failed to render state record {}", key.storage_key()))?;
        write_text_atomic(&path, &rendered)
    }

    fn delete(&self, key: &StateScopeKey) -> Result<()> {
        let path = self.record_path(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => {
                Err(error).with_context(|| format!("failed to delete {}", path.display()))
            }
        }
    }
}

impl FileStateStore {
    /// Root directory holding the record files.
    pub fn root(&self) -> &Path {
        &self.root
    }
}
