//! SQLite state backend keyed by flat scope key.
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use crate::state_store::StateStore;
use crate::time_utils::current_unix_timestamp_ms;
use crate::turn_contract::StateScopeKey;

const STATE_TABLE_DDL: &str = "CREATE TABLE IF NOT EXISTS mentor_state (
    scope_key TEXT PRIMARY KEY,
    payload TEXT NOT NULL,
    updated_unix_ms INTEGER NOT NULL
)";

#[derive(Debug)]
/// Public struct `SqliteStateStore` used across Mentor components.
pub struct SqliteStateStore {
    connection: Mutex<Connection>,
}

impl SqliteStateStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let connection = Connection::open(path)
            .with_context(|| format!("failed to open sqlite state db {}", path.display()))?;
        connection
            .execute(STATE_TABLE_DDL, [])
            .context("failed to create mentor_state table")?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }
}

impl StateStore for SqliteStateStore {
    fn get(&self, key: &StateScopeKey) -> Result<Option<Value>> {
        let connection = self
            .connection
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let raw: Option<String> = connection
            .query_row(
                "SELECT payload FROM mentor_state WHERE scope_key = ?1",
                params![key.storage_key()],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("failed to read state record {}", key.storage_key()))?;
        match raw {
            Some(payload) => {
                let value = serde_json::from_str(&payload).with_context(|| {
                    format!("failed to parse state record {}", key.storage_key())
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &StateScopeKey, value: &Value) -> Result<()> {
        let payload = serde_json::to_string(value)
            .with_context(|| format!("failed to render state record {}", key.storage_key()))?;
        let connection = self
            .connection
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        connection
            .execute(
                "INSERT INTO mentor_state (scope_key, payload, updated_unix_ms)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(scope_key) DO UPDATE SET
                     payload = excluded.payload,
                     updated_unix_ms = excluded.updated_unix_ms",
                params![
                    key.storage_key(),
                    payload,
                    current_unix_timestamp_ms() as i64
                ],
            )
            .with_context(|| format!("failed to write state record {}", key.storage_key()))?;
        Ok(())
    }

    fn delete(&self, key: &StateScopeKey) -> Result<()> {
        let connection = self
            .connection
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        connection
            .execute(
                "DELETE FROM mentor_state WHERE scope_key = ?1",
                params![key.storage_key()],
            )
            .with_context(|| format!("failed to delete state record {}", key.storage_key()))?;
        Ok(())
    }
}
