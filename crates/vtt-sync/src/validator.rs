//! Post-mutation structural validation.
//!
//! Defends the document contract after a batch is applied, independent of
//! content hashing: required collections present and correctly typed,
//! optional records either absent or well-formed. Returns the first
//! violation found; no partial recovery is attempted.

use serde_json::Value;
use thiserror::Error;
use vtt_state::value_type_name;

/// A structural invariant the document failed to uphold.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvariantViolation {
    /// The document root is not an object.
    #[error("game state must be an object, found {found}")]
    NotAnObject {
        /// The actual root type.
        found: &'static str,
    },

    /// A required collection is missing or has the wrong type.
    #[error("'{field}' must be an array, found {found}")]
    NotACollection {
        /// The collection field name.
        field: &'static str,
        /// The actual type found ("missing" when absent).
        found: &'static str,
    },

    /// An optional record field holds something other than null or an object.
    #[error("'{field}' must be null or an object, found {found}")]
    NotARecord {
        /// The record field name.
        field: &'static str,
        /// The actual type found.
        found: &'static str,
    },
}

/// Required collection fields, always present as arrays.
const COLLECTIONS: [&str; 3] = ["characters", "actors", "items"];

/// Optional record fields, each absent/null or an object.
const RECORDS: [&str; 3] = ["currentEncounter", "turnManager", "pluginData"];

/// Check the structural invariants of a game-state document.
///
/// Checks, in order: the document is an object; `characters`, `actors`, and
/// `items` are arrays; `currentEncounter`, `turnManager`, and `pluginData`
/// are each absent, null, or an object. The first violation is returned with
/// a human-readable reason.
pub fn validate_game_state(doc: &Value) -> Result<(), InvariantViolation> {
    let root = match doc {
        Value::Object(map) => map,
        other => {
            return Err(InvariantViolation::NotAnObject {
                found: value_type_name(other),
            })
        }
    };

    for field in COLLECTIONS {
        match root.get(field) {
            Some(Value::Array(_)) => {}
            Some(other) => {
                return Err(InvariantViolation::NotACollection {
                    field,
                    found: value_type_name(other),
                })
            }
            None => {
                return Err(InvariantViolation::NotACollection {
                    field,
                    found: "missing",
                })
            }
        }
    }

    for field in RECORDS {
        match root.get(field) {
            None | Some(Value::Null) | Some(Value::Object(_)) => {}
            Some(other) => {
                return Err(InvariantViolation::NotARecord {
                    field,
                    found: value_type_name(other),
                })
            }
        }
    }

    Ok(())
}
