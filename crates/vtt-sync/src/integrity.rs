//! Content hashing and version tokens.
//!
//! Corruption and lost updates are made detectable without a lock manager:
//! a SHA-256 digest over the canonical serialization certifies a document's
//! content, and a strictly increasing version token orders its writes.

use serde_json::Value;
use sha2::{Digest, Sha256};
use vtt_store::Version;

/// Domain separator so a game-state digest can never collide with a digest
/// of the same bytes produced for another purpose.
const HASH_DOMAIN: &[u8] = b"VTT_GAME_STATE_V1";

/// Compute the content hash of a document: SHA-256 over the domain-prefixed
/// canonical serialization, hex-encoded.
///
/// `serde_json` objects iterate in sorted key order (the map is backed by a
/// `BTreeMap`), so serialization is canonical: two structurally equal
/// documents always produce the same digest, regardless of how their keys
/// were inserted. Array order is significant, as it is in the document.
pub fn generate_hash(doc: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(HASH_DOMAIN);
    hasher.update(doc.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// Recompute the hash of `doc` and compare it to the stored digest.
///
/// A mismatch means the document was corrupted or partially written since it
/// was last certified; the caller must block the update rather than compound
/// the damage.
pub fn validate_integrity(doc: &Value, stored_hash: &str) -> bool {
    generate_hash(doc) == stored_hash
}

/// Produce the next version token.
///
/// Saturates at `u64::MAX`; at one update per millisecond that bound is half
/// a billion years away.
#[inline]
pub fn next_version(current: Version) -> Version {
    current.saturating_add(1)
}

/// Check that `proposed` is the exact increment of `current`.
///
/// Rejects equal, lower, and skipped versions: successful updates advance
/// the token by exactly one, never with gaps and never backward.
#[inline]
pub fn is_valid_next_version(current: Version, proposed: Version) -> bool {
    proposed == next_version(current) && proposed > current
}
