//! Typed patch operations.
//!
//! Each operation is one atomic change addressed at a path inside the
//! session document. The serde representation matches the update-request
//! wire shape: `{"path": "...", "operation": "set", "value": ...}`. An
//! unrecognized `operation` tag fails deserialization of the whole request,
//! which is how a malformed batch is rejected before any work happens.

use crate::Path;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single patch operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "lowercase")]
pub enum Op {
    /// Assign `value` at the path, overwriting unconditionally.
    ///
    /// Missing intermediate containers are synthesized during application.
    Set {
        /// Target path.
        path: Path,
        /// Value to assign.
        value: Value,
    },

    /// Remove the value at the path.
    ///
    /// Removes the element (with shift) when the parent is an array, the key
    /// when it is an object. Removing a missing key/index is a no-op.
    Unset {
        /// Target path.
        path: Path,
    },

    /// Add a numeric delta to the value at the path.
    ///
    /// A missing or non-numeric current value counts as 0; a missing or
    /// non-numeric delta counts as 1. Negative deltas decrement.
    Inc {
        /// Target path.
        path: Path,
        /// Numeric delta.
        #[serde(default)]
        value: Value,
    },

    /// Append `value` to the array at the path.
    ///
    /// A missing or non-array slot is reset to an empty array first.
    Push {
        /// Target path.
        path: Path,
        /// Value to append.
        value: Value,
    },

    /// Remove the first element deeply equal to `value` from the array at
    /// the path. No-op when the slot is missing, not an array, or holds no
    /// matching element.
    Pull {
        /// Target path.
        path: Path,
        /// Value to match structurally.
        value: Value,
    },
}

impl Op {
    /// Create a `set` operation.
    #[inline]
    pub fn set(path: impl Into<Path>, value: impl Into<Value>) -> Self {
        Op::Set {
            path: path.into(),
            value: value.into(),
        }
    }

    /// Create an `unset` operation.
    #[inline]
    pub fn unset(path: impl Into<Path>) -> Self {
        Op::Unset { path: path.into() }
    }

    /// Create an `inc` operation.
    #[inline]
    pub fn inc(path: impl Into<Path>, value: impl Into<Value>) -> Self {
        Op::Inc {
            path: path.into(),
            value: value.into(),
        }
    }

    /// Create a `push` operation.
    #[inline]
    pub fn push(path: impl Into<Path>, value: impl Into<Value>) -> Self {
        Op::Push {
            path: path.into(),
            value: value.into(),
        }
    }

    /// Create a `pull` operation.
    #[inline]
    pub fn pull(path: impl Into<Path>, value: impl Into<Value>) -> Self {
        Op::Pull {
            path: path.into(),
            value: value.into(),
        }
    }

    /// Get the path this operation targets.
    #[inline]
    pub fn path(&self) -> &Path {
        match self {
            Op::Set { path, .. } => path,
            Op::Unset { path } => path,
            Op::Inc { path, .. } => path,
            Op::Push { path, .. } => path,
            Op::Pull { path, .. } => path,
        }
    }

    /// Get the operation name as it appears on the wire.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Op::Set { .. } => "set",
            Op::Unset { .. } => "unset",
            Op::Inc { .. } => "inc",
            Op::Push { .. } => "push",
            Op::Pull { .. } => "pull",
        }
    }
}
