//! Path-addressed patch operations for live tabletop session documents.
//!
//! A session's game state is a single JSON document shared by every connected
//! client. Clients never replace the document wholesale; they submit ordered
//! batches of small, typed operations (`set`, `unset`, `inc`, `push`, `pull`)
//! addressed by dotted paths such as `characters.0.pluginData.hitPoints`.
//!
//! The core contract is atomic batch application:
//!
//! ```text
//! State' = apply_ops(State, [Op])
//! ```
//!
//! - the input document is never mutated; application works on a clone;
//! - operations are applied strictly in batch order;
//! - the first failing operation discards the clone and surfaces an error
//!   naming the operation, its index, and its path.
//!
//! # Quick start
//!
//! ```
//! use vtt_state::{apply_ops, Op, Path};
//! use serde_json::json;
//!
//! let doc = json!({"characters": [{"name": "Mira", "hp": 10}]});
//! let ops = vec![
//!     Op::inc(Path::parse("characters.0.hp"), json!(-3)),
//!     Op::push(Path::parse("characters.0.conditions"), json!("prone")),
//! ];
//!
//! let next = apply_ops(&doc, &ops).unwrap();
//! assert_eq!(next["characters"][0]["hp"], 7);
//! assert_eq!(next["characters"][0]["conditions"], json!(["prone"]));
//! assert_eq!(doc["characters"][0]["hp"], 10); // original untouched
//! ```

mod apply;
mod error;
mod op;
mod patch;
mod path;

pub use apply::{apply_op, apply_ops, get_at_path};
pub use error::{value_type_name, StateError, StateResult};
pub use op::Op;
pub use patch::Patch;
pub use path::{Path, Seg};

// Re-export serde_json::Value for convenience
pub use serde_json::Value;
