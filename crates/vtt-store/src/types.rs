//! Storage types and errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Monotonically increasing version token for optimistic concurrency.
///
/// Transported as a string on the wire, compared as an integer.
pub type Version = u64;

/// A game-state document together with its envelope, as observed at load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameStateHead {
    /// The authoritative session document.
    pub state: Value,
    /// Stored version at load time.
    pub version: Version,
    /// Content hash certifying `state`, if the document is certified.
    ///
    /// `None` after a direct-mode write: the document is then guarded by
    /// version equality only until the next full-mode write recertifies it.
    pub hash: Option<String>,
    /// When the envelope was last advanced.
    pub last_update: DateTime<Utc>,
}

/// Acknowledgement returned after a successful write.
#[derive(Debug, Clone, Copy)]
pub struct Committed {
    /// The version the write produced.
    pub version: Version,
}

/// Precondition for a conditional replace.
///
/// The write lands only if the stored version equals `expected_version` and,
/// when `expected_hash` is `Some`, the stored hash equals it too. Either one
/// having moved since load aborts the write with [`StoreError::CasFailed`].
#[derive(Debug, Clone)]
pub struct CasGuard {
    /// Version observed at load time.
    pub expected_version: Version,
    /// Hash observed at load time; `None` skips the hash comparison.
    pub expected_hash: Option<String>,
}

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No entry exists for the session.
    #[error("game state not found: {0}")]
    NotFound(String),

    /// An entry already exists (for create operations).
    #[error("game state already exists: {0}")]
    AlreadyExists(String),

    /// A conditional write found the stored envelope changed since load.
    ///
    /// Deliberately carries no detail: the caller re-reads the current
    /// envelope to tell a concurrent writer apart from corruption.
    #[error("conditional write failed for game state {0}")]
    CasFailed(String),

    /// An in-place guarded update could not apply its operation batch.
    #[error("guarded update rejected for game state {id}: {reason}")]
    InvalidUpdate {
        /// The session whose update was rejected.
        id: String,
        /// Why the batch could not be applied.
        reason: String,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Backend unreachable or transiently failing.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// True for failures worth retrying on the read path.
    #[inline]
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}
