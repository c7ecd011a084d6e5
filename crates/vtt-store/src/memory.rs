//! In-memory storage for testing and local development.

use crate::{CasGuard, Committed, GameStateHead, GameStateStore, StoreError, Version};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;
use vtt_state::{apply_ops, Op};

struct MemoryEntry {
    state: Value,
    version: Version,
    hash: Option<String>,
    last_update: DateTime<Utc>,
}

/// In-memory [`GameStateStore`] backed by a `tokio` `RwLock`.
///
/// Conditional writes hold the write lock for the whole check-then-replace,
/// which gives the same atomicity a conditional database update would.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, MemoryEntry>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GameStateStore for MemoryStore {
    async fn load(&self, id: &str) -> Result<Option<GameStateHead>, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries.get(id).map(|e| GameStateHead {
            state: e.state.clone(),
            version: e.version,
            hash: e.hash.clone(),
            last_update: e.last_update,
        }))
    }

    async fn create(&self, id: &str, state: &Value, hash: &str) -> Result<Committed, StoreError> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(id) {
            return Err(StoreError::AlreadyExists(id.to_string()));
        }
        entries.insert(
            id.to_string(),
            MemoryEntry {
                state: state.clone(),
                version: 0,
                hash: Some(hash.to_string()),
                last_update: Utc::now(),
            },
        );
        Ok(Committed { version: 0 })
    }

    async fn replace(
        &self,
        id: &str,
        guard: &CasGuard,
        state: &Value,
        new_version: Version,
        new_hash: &str,
    ) -> Result<Committed, StoreError> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let version_ok = entry.version == guard.expected_version;
        let hash_ok = match &guard.expected_hash {
            Some(expected) => entry.hash.as_deref() == Some(expected.as_str()),
            None => true,
        };
        if !version_ok || !hash_ok {
            return Err(StoreError::CasFailed(id.to_string()));
        }

        entry.state = state.clone();
        entry.version = new_version;
        entry.hash = Some(new_hash.to_string());
        entry.last_update = Utc::now();
        Ok(Committed {
            version: entry.version,
        })
    }

    async fn apply_guarded(
        &self,
        id: &str,
        expected_version: Version,
        ops: &[Op],
    ) -> Result<Committed, StoreError> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if entry.version != expected_version {
            return Err(StoreError::CasFailed(id.to_string()));
        }

        let next = apply_ops(&entry.state, ops).map_err(|e| StoreError::InvalidUpdate {
            id: id.to_string(),
            reason: e.to_string(),
        })?;

        entry.state = next;
        entry.version += 1;
        // The document is no longer certified until a full-mode write
        // recomputes the hash.
        entry.hash = None;
        entry.last_update = Utc::now();
        Ok(Committed {
            version: entry.version,
        })
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries.remove(id);
        Ok(())
    }
}
