//! The storage contract.

use crate::{CasGuard, Committed, GameStateHead, StoreError, Version};
use async_trait::async_trait;
use serde_json::Value;
use vtt_state::Op;

/// Keyed, versioned document storage with conditional writes.
///
/// One entry per live session. The envelope (version, optional hash,
/// last-update timestamp) is created once by [`create`](Self::create),
/// advanced exactly once per successful write, and removed only by
/// [`delete`](Self::delete) when the owning session goes away.
#[async_trait]
pub trait GameStateStore: Send + Sync {
    /// Load a session document and its envelope. `None` if uninitialized.
    async fn load(&self, id: &str) -> Result<Option<GameStateHead>, StoreError>;

    /// Create the entry for a session at version 0 with a certified hash.
    ///
    /// Fails with [`StoreError::AlreadyExists`] if the id is taken, which
    /// callers treat as "somebody else initialized first" and resolve by
    /// re-reading.
    async fn create(&self, id: &str, state: &Value, hash: &str) -> Result<Committed, StoreError>;

    /// Replace the document under a compare-and-swap guard.
    ///
    /// The stored version must equal `guard.expected_version`, and when
    /// `guard.expected_hash` is `Some` the stored hash must equal it too.
    /// On success the entry holds `state`, `new_version`, `new_hash`, and a
    /// fresh timestamp. A guard miss fails with [`StoreError::CasFailed`]
    /// and is never retried here; the caller decides what the miss means.
    async fn replace(
        &self,
        id: &str,
        guard: &CasGuard,
        state: &Value,
        new_version: Version,
        new_hash: &str,
    ) -> Result<Committed, StoreError>;

    /// Apply an operation batch in place, guarded by version equality only.
    ///
    /// The fast path for high-frequency, low-risk updates: no hash is
    /// computed or checked, and the version increments in the same write.
    /// The stored hash is cleared because the document is no longer
    /// certified. A batch that fails to apply leaves the entry untouched
    /// and fails with [`StoreError::InvalidUpdate`].
    async fn apply_guarded(
        &self,
        id: &str,
        expected_version: Version,
        ops: &[Op],
    ) -> Result<Committed, StoreError>;

    /// Delete a session's entry. Removing a missing entry is a no-op.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}
