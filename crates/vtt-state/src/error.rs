//! Error types for patch application.

use crate::Path;
use thiserror::Error;

/// Result type alias for patch operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur while applying patch operations.
#[derive(Debug, Error)]
pub enum StateError {
    /// An existing value has the wrong shape for the requested navigation.
    ///
    /// Navigation synthesizes missing containers, so this only fires when a
    /// scalar already occupies a slot where a container is required.
    #[error("type mismatch at {path}: expected {expected}, found {found}")]
    TypeMismatch {
        /// The path prefix where the mismatch occurred.
        path: Path,
        /// The expected container type.
        expected: &'static str,
        /// The actual type found.
        found: &'static str,
    },

    /// An operation addressed the document root or was otherwise malformed.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of what went wrong.
        message: String,
    },

    /// Numeric arithmetic overflowed or produced a non-finite value.
    #[error("arithmetic error at {path}: {message}")]
    Arithmetic {
        /// The path of the numeric slot.
        path: Path,
        /// Description of the failure.
        message: String,
    },

    /// One operation in a batch failed; the whole batch is discarded.
    #[error("operation {index} ({op} at {path}) failed: {source}")]
    OperationFailed {
        /// Zero-based position of the operation in the batch.
        index: usize,
        /// Wire name of the operation.
        op: &'static str,
        /// The path the operation targeted.
        path: Path,
        /// The underlying failure.
        #[source]
        source: Box<StateError>,
    },

    /// JSON serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StateError {
    /// Create a type mismatch error.
    #[inline]
    pub fn type_mismatch(path: Path, expected: &'static str, found: &'static str) -> Self {
        StateError::TypeMismatch {
            path,
            expected,
            found,
        }
    }

    /// Create an invalid operation error.
    #[inline]
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        StateError::InvalidOperation {
            message: message.into(),
        }
    }

    /// Create an arithmetic error.
    #[inline]
    pub fn arithmetic(path: Path, message: impl Into<String>) -> Self {
        StateError::Arithmetic {
            path,
            message: message.into(),
        }
    }
}

/// Get the type name of a JSON value.
#[inline]
pub fn value_type_name(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;

    #[test]
    fn display_names_operation_and_path() {
        let err = StateError::OperationFailed {
            index: 2,
            op: "inc",
            path: path!("characters", 0, "hp"),
            source: Box::new(StateError::type_mismatch(
                path!("characters"),
                "array",
                "string",
            )),
        };
        let text = err.to_string();
        assert!(text.contains("operation 2"));
        assert!(text.contains("inc"));
        assert!(text.contains("characters.0.hp"));
    }

    #[test]
    fn value_type_names() {
        use serde_json::json;

        assert_eq!(value_type_name(&json!(null)), "null");
        assert_eq!(value_type_name(&json!(true)), "boolean");
        assert_eq!(value_type_name(&json!(1)), "number");
        assert_eq!(value_type_name(&json!("s")), "string");
        assert_eq!(value_type_name(&json!([])), "array");
        assert_eq!(value_type_name(&json!({})), "object");
    }
}
