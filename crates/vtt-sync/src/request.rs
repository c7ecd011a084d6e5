//! Update request and response wire types.

use serde::{Deserialize, Serialize};
use vtt_state::Patch;

/// A client's request to advance a session document.
///
/// `version` is the version the client computed its batch against,
/// transported as a string and compared as an integer. `source` is a
/// diagnostics tag naming the submitting subsystem (rule handler, GM
/// console, plugin) and has no semantic effect.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateUpdate {
    /// The session document to update.
    pub game_state_id: String,
    /// Expected current version, as a decimal string.
    pub version: String,
    /// Ordered operation batch.
    pub operations: Patch,
    /// Diagnostics tag for the submitter.
    pub source: String,
}

/// Outcome of an update request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateUpdateResponse {
    /// Whether the batch was committed.
    pub success: bool,
    /// Version produced by a successful commit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_version: Option<String>,
    /// Hash certifying the committed document; absent in direct mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_hash: Option<String>,
    /// Failure details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<UpdateError>,
}

/// Structured failure carried by an unsuccessful response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateError {
    /// Machine-readable failure class.
    pub code: ErrorCode,
    /// Human-readable explanation.
    pub message: String,
    /// The version currently stored, for client reconciliation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_version: Option<String>,
    /// The hash currently stored, for client reconciliation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_hash: Option<String>,
}

/// Failure classes an update can end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// No document exists for the session. Fatal to this request.
    GamestateNotFound,
    /// A concurrent writer won the race. Routine; carries the fresh
    /// version/hash so the caller can rebase its batch.
    VersionConflict,
    /// Operation failure, structural violation, or detected corruption.
    /// Never retriable without caller intervention.
    ValidationError,
    /// Ambiguous storage-level failure, including unreachable storage.
    TransactionFailed,
}

impl StateUpdateResponse {
    /// A successful full-mode response.
    pub fn committed(new_version: impl ToString, new_hash: impl Into<String>) -> Self {
        Self {
            success: true,
            new_version: Some(new_version.to_string()),
            new_hash: Some(new_hash.into()),
            error: None,
        }
    }

    /// A successful direct-mode response (no hash is produced).
    pub fn committed_unhashed(new_version: impl ToString) -> Self {
        Self {
            success: true,
            new_version: Some(new_version.to_string()),
            new_hash: None,
            error: None,
        }
    }

    /// A failure without reconciliation data.
    pub fn failed(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            new_version: None,
            new_hash: None,
            error: Some(UpdateError {
                code,
                message: message.into(),
                current_version: None,
                current_hash: None,
            }),
        }
    }

    /// A failure carrying the stored version/hash for reconciliation.
    pub fn failed_with_current(
        code: ErrorCode,
        message: impl Into<String>,
        current_version: impl ToString,
        current_hash: Option<String>,
    ) -> Self {
        Self {
            success: false,
            new_version: None,
            new_hash: None,
            error: Some(UpdateError {
                code,
                message: message.into(),
                current_version: Some(current_version.to_string()),
                current_hash,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_wire_shape() {
        let raw = json!({
            "gameStateId": "session-1",
            "version": "3",
            "operations": [
                {"operation": "set", "path": "turnManager.currentIndex", "value": 2}
            ],
            "source": "turn-tracker"
        });
        let update: StateUpdate = serde_json::from_value(raw).unwrap();
        assert_eq!(update.game_state_id, "session-1");
        assert_eq!(update.version, "3");
        assert_eq!(update.operations.len(), 1);
        assert_eq!(update.source, "turn-tracker");
    }

    #[test]
    fn success_response_omits_error() {
        let encoded = serde_json::to_value(StateUpdateResponse::committed(4u64, "abc")).unwrap();
        assert_eq!(
            encoded,
            json!({"success": true, "newVersion": "4", "newHash": "abc"})
        );
    }

    #[test]
    fn error_codes_serialize_screaming() {
        let response = StateUpdateResponse::failed_with_current(
            ErrorCode::VersionConflict,
            "stale version",
            4u64,
            Some("abc".into()),
        );
        let encoded = serde_json::to_value(&response).unwrap();
        assert_eq!(encoded["error"]["code"], "VERSION_CONFLICT");
        assert_eq!(encoded["error"]["currentVersion"], "4");
        assert_eq!(encoded["error"]["currentHash"], "abc");
        assert_eq!(
            serde_json::to_value(ErrorCode::GamestateNotFound).unwrap(),
            "GAMESTATE_NOT_FOUND"
        );
    }
}
