//! Game state synchronization engine.
//!
//! Holds the single authoritative document of a live tabletop session and
//! applies concurrent, fine-grained patch batches to it safely:
//!
//! - **atomic batches**: a batch of heterogeneous operations lands entirely
//!   or not at all (`vtt-state`);
//! - **optimistic concurrency**: every update carries the version it was
//!   computed against; whichever conditional write lands first wins, the
//!   loser gets a `VERSION_CONFLICT` with the fresh version/hash to rebase;
//! - **integrity**: a SHA-256 digest over the canonical serialization
//!   certifies the stored document, so corruption is detected before an
//!   update compounds it;
//! - **two modes**: the full read-validate-apply-verify-write cycle, and an
//!   opt-in direct mode that trades corruption detection for throughput.
//!
//! [`SyncCoordinator`] is the entry point; storage is injected as an
//! [`Arc<dyn GameStateStore>`](vtt_store::GameStateStore), never a process
//! singleton.
//!
//! ```
//! use std::sync::Arc;
//! use serde_json::json;
//! use vtt_state::Op;
//! use vtt_store::MemoryStore;
//! use vtt_sync::{NullContentSource, StateLoader, StateUpdate, SyncCoordinator};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let store = Arc::new(MemoryStore::new());
//! let loader = StateLoader::new(Arc::new(NullContentSource));
//! let engine = SyncCoordinator::new(store, loader);
//!
//! let init = engine.ensure_initialized("session-1", "campaign-1").await.unwrap();
//! let response = engine
//!     .update(StateUpdate {
//!         game_state_id: "session-1".into(),
//!         version: init.version,
//!         operations: vec![Op::push("characters", json!({"name": "Mira"}))].into(),
//!         source: "doc-example".into(),
//!     })
//!     .await;
//! assert!(response.success);
//! # }
//! ```

mod coordinator;
mod integrity;
mod loader;
mod request;
mod validator;

pub use coordinator::{InitOutcome, SyncCoordinator, SyncOptions};
pub use integrity::{generate_hash, is_valid_next_version, next_version, validate_integrity};
pub use loader::{ContentSource, InitialState, LoadError, NullContentSource, StateLoader};
pub use request::{ErrorCode, StateUpdate, StateUpdateResponse, UpdateError};
pub use validator::{validate_game_state, InvariantViolation};
