//! Versioned game-state storage contract.
//!
//! A live session's document is persisted as a keyed entry together with a
//! versioned envelope: a strictly increasing version token, an optional
//! content hash certifying the document, and the last-update timestamp.
//! Backends expose conditional writes: a replace only lands if the stored
//! version (and hash, when supplied) still match what the writer observed at
//! load time. Any store offering conditional updates (row version, ETag,
//! content-addressed key) can implement [`GameStateStore`]; no lock manager
//! is involved.
//!
//! [`MemoryStore`] is the reference adapter, used by tests and local
//! development.

mod memory;
mod traits;
mod types;

pub use memory::MemoryStore;
pub use traits::GameStateStore;
pub use types::{CasGuard, Committed, GameStateHead, StoreError, Version};
