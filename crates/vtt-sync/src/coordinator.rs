//! End-to-end orchestration of session updates.
//!
//! One coordinator invocation handles one update request: fetch the current
//! document and envelope, check preconditions, apply the batch to a private
//! clone, validate the result, and write back under a compare-and-swap
//! guard. No in-process lock spans the read and write halves; concurrent
//! invocations race on the conditional write, and the loser fails fast with
//! a version conflict instead of silently merging.

use crate::integrity::{generate_hash, next_version, validate_integrity};
use crate::loader::StateLoader;
use crate::request::{ErrorCode, StateUpdate, StateUpdateResponse};
use crate::validator::validate_game_state;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use vtt_state::apply_ops;
use vtt_store::{CasGuard, GameStateHead, GameStateStore, StoreError, Version};

/// Tuning knobs for the coordinator.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// How many times the full-mode load is attempted before giving up.
    /// Only the read is retried; the conditional write never is.
    pub read_attempts: u32,
    /// Backoff step between read attempts; attempt `n` waits `n` steps.
    pub read_backoff: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            read_attempts: 3,
            read_backoff: Duration::from_millis(50),
        }
    }
}

/// Result of `ensure_initialized`: the current (or just-created) envelope.
#[derive(Debug, Clone)]
pub struct InitOutcome {
    /// Current version, as a decimal string.
    pub version: String,
    /// Current content hash, when the document is certified.
    pub hash: Option<String>,
    /// `Some(reason)` when this call created the document from the
    /// loader's minimal fallback rather than real campaign content.
    pub degraded: Option<String>,
}

/// Orchestrates update requests against a session's game state.
///
/// Storage and content loading are injected at construction; the
/// coordinator itself is stateless and can be shared freely.
pub struct SyncCoordinator {
    store: Arc<dyn GameStateStore>,
    loader: StateLoader,
    options: SyncOptions,
}

impl SyncCoordinator {
    /// Create a coordinator with default options.
    pub fn new(store: Arc<dyn GameStateStore>, loader: StateLoader) -> Self {
        Self::with_options(store, loader, SyncOptions::default())
    }

    /// Create a coordinator with explicit options.
    pub fn with_options(
        store: Arc<dyn GameStateStore>,
        loader: StateLoader,
        options: SyncOptions,
    ) -> Self {
        Self {
            store,
            loader,
            options,
        }
    }

    /// Fetch a session's document and envelope. `None` if uninitialized.
    pub async fn read(&self, game_state_id: &str) -> Result<Option<GameStateHead>, StoreError> {
        self.store.load(game_state_id).await
    }

    /// Ensure a session has a stored document, creating it on first call.
    ///
    /// Idempotent: when an envelope already exists its current version and
    /// hash are returned unchanged, without touching the content source. A
    /// concurrent-create race resolves by re-reading the winner's envelope.
    pub async fn ensure_initialized(
        &self,
        game_state_id: &str,
        campaign_id: &str,
    ) -> Result<InitOutcome, StoreError> {
        if let Some(head) = self.store.load(game_state_id).await? {
            return Ok(InitOutcome {
                version: head.version.to_string(),
                hash: head.hash,
                degraded: None,
            });
        }

        let built = self.loader.build_initial_state(campaign_id).await;
        let hash = generate_hash(&built.state);
        match self.store.create(game_state_id, &built.state, &hash).await {
            Ok(committed) => {
                debug!(
                    game_state_id,
                    campaign_id,
                    version = committed.version,
                    degraded = built.degraded.is_some(),
                    "initialized session game state"
                );
                Ok(InitOutcome {
                    version: committed.version.to_string(),
                    hash: Some(hash),
                    degraded: built.degraded,
                })
            }
            Err(StoreError::AlreadyExists(_)) => {
                // Somebody else initialized first; their document wins.
                let head = self
                    .store
                    .load(game_state_id)
                    .await?
                    .ok_or_else(|| StoreError::NotFound(game_state_id.to_string()))?;
                Ok(InitOutcome {
                    version: head.version.to_string(),
                    hash: head.hash,
                    degraded: None,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Apply an update in full mode: hash-verified and fully re-validated.
    pub async fn update(&self, request: StateUpdate) -> StateUpdateResponse {
        let started = Instant::now();

        let Some(expected) = parse_version(&request.version) else {
            return StateUpdateResponse::failed(
                ErrorCode::ValidationError,
                format!("invalid version token '{}'", request.version),
            );
        };

        let head = match self.load_with_retry(&request.game_state_id).await {
            Ok(Some(head)) => head,
            Ok(None) => {
                return StateUpdateResponse::failed(
                    ErrorCode::GamestateNotFound,
                    format!("no game state for session {}", request.game_state_id),
                )
            }
            Err(e) => {
                return StateUpdateResponse::failed(
                    ErrorCode::TransactionFailed,
                    format!("storage read failed: {e}"),
                )
            }
        };

        // Optimistic-concurrency precondition, before any mutation work.
        if head.version != expected {
            return StateUpdateResponse::failed_with_current(
                ErrorCode::VersionConflict,
                format!(
                    "expected version {expected}, stored version is {}",
                    head.version
                ),
                head.version,
                head.hash,
            );
        }

        // A certified document must still match its certificate. A mismatch
        // here is corruption, not a race: the version already matched.
        if let Some(stored_hash) = &head.hash {
            if !validate_integrity(&head.state, stored_hash) {
                warn!(
                    game_state_id = %request.game_state_id,
                    version = head.version,
                    "stored document failed integrity validation, refusing update"
                );
                return StateUpdateResponse::failed(
                    ErrorCode::ValidationError,
                    "stored game state failed integrity validation",
                );
            }
        }

        let next_state = match apply_ops(&head.state, request.operations.ops()) {
            Ok(state) => state,
            Err(e) => {
                return StateUpdateResponse::failed(ErrorCode::ValidationError, e.to_string())
            }
        };

        if let Err(violation) = validate_game_state(&next_state) {
            return StateUpdateResponse::failed(
                ErrorCode::ValidationError,
                format!("update would violate game state structure: {violation}"),
            );
        }

        let new_version = next_version(head.version);
        let new_hash = generate_hash(&next_state);
        let guard = CasGuard {
            expected_version: head.version,
            expected_hash: head.hash.clone(),
        };

        match self
            .store
            .replace(
                &request.game_state_id,
                &guard,
                &next_state,
                new_version,
                &new_hash,
            )
            .await
        {
            Ok(committed) => {
                debug!(
                    game_state_id = %request.game_state_id,
                    source = %request.source,
                    ops = request.operations.len(),
                    old_version = head.version,
                    new_version = committed.version,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "committed full-mode update"
                );
                StateUpdateResponse::committed(committed.version, new_hash)
            }
            Err(StoreError::CasFailed(_)) => {
                self.cas_failure_response(&request, head.version, head.hash.as_deref())
                    .await
            }
            Err(StoreError::NotFound(_)) => StateUpdateResponse::failed(
                ErrorCode::GamestateNotFound,
                format!("game state {} disappeared during update", request.game_state_id),
            ),
            Err(e) => StateUpdateResponse::failed(
                ErrorCode::TransactionFailed,
                format!("storage write failed: {e}"),
            ),
        }
    }

    /// Apply an update in direct mode: version-guarded only, no hash work.
    ///
    /// The operation batch is handed to the store's guarded in-place
    /// application; the version increments in the same write and the stored
    /// hash is cleared, leaving the document uncertified until the next
    /// full-mode write. Intended for high-frequency, low-risk updates.
    pub async fn update_direct(&self, request: StateUpdate) -> StateUpdateResponse {
        let started = Instant::now();

        let Some(expected) = parse_version(&request.version) else {
            return StateUpdateResponse::failed(
                ErrorCode::ValidationError,
                format!("invalid version token '{}'", request.version),
            );
        };

        match self
            .store
            .apply_guarded(
                &request.game_state_id,
                expected,
                request.operations.ops(),
            )
            .await
        {
            Ok(committed) => {
                debug!(
                    game_state_id = %request.game_state_id,
                    source = %request.source,
                    ops = request.operations.len(),
                    new_version = committed.version,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "committed direct-mode update"
                );
                StateUpdateResponse::committed_unhashed(committed.version)
            }
            Err(StoreError::CasFailed(_)) => {
                self.cas_failure_response(&request, expected, None).await
            }
            Err(StoreError::NotFound(_)) => StateUpdateResponse::failed(
                ErrorCode::GamestateNotFound,
                format!("no game state for session {}", request.game_state_id),
            ),
            Err(StoreError::InvalidUpdate { reason, .. }) => {
                StateUpdateResponse::failed(ErrorCode::ValidationError, reason)
            }
            Err(e) => StateUpdateResponse::failed(
                ErrorCode::TransactionFailed,
                format!("storage write failed: {e}"),
            ),
        }
    }

    /// Bounded, linearly backed-off load. Smooths transient read failures
    /// under load; `Ok(None)` (uninitialized) is not retried.
    async fn load_with_retry(&self, id: &str) -> Result<Option<GameStateHead>, StoreError> {
        let attempts = self.options.read_attempts.max(1);
        let mut last_err = None;
        for attempt in 1..=attempts {
            match self.store.load(id).await {
                Ok(head) => return Ok(head),
                Err(e) => {
                    warn!(
                        game_state_id = id,
                        attempt,
                        error = %e,
                        "game state read failed"
                    );
                    last_err = Some(e);
                    if attempt < attempts {
                        tokio::time::sleep(self.options.read_backoff * attempt).await;
                    }
                }
            }
        }
        // attempts >= 1, so an error is always recorded on this path.
        Err(last_err.unwrap_or_else(|| StoreError::Unavailable("no read attempts".into())))
    }

    /// A conditional write failed: re-read the envelope to tell a concurrent
    /// writer apart from corruption.
    async fn cas_failure_response(
        &self,
        request: &StateUpdate,
        observed_version: Version,
        observed_hash: Option<&str>,
    ) -> StateUpdateResponse {
        match self.store.load(&request.game_state_id).await {
            Ok(Some(fresh)) => {
                if fresh.version != observed_version {
                    StateUpdateResponse::failed_with_current(
                        ErrorCode::VersionConflict,
                        format!(
                            "version advanced to {} while this update was in flight",
                            fresh.version
                        ),
                        fresh.version,
                        fresh.hash,
                    )
                } else if fresh.hash.as_deref() != observed_hash {
                    warn!(
                        game_state_id = %request.game_state_id,
                        version = fresh.version,
                        "stored hash changed without a version change"
                    );
                    StateUpdateResponse::failed(
                        ErrorCode::ValidationError,
                        "stored hash changed without a version change; possible corruption",
                    )
                } else {
                    StateUpdateResponse::failed(
                        ErrorCode::TransactionFailed,
                        "conditional write failed but the stored envelope is unchanged",
                    )
                }
            }
            Ok(None) => StateUpdateResponse::failed(
                ErrorCode::GamestateNotFound,
                format!("game state {} disappeared during update", request.game_state_id),
            ),
            Err(e) => StateUpdateResponse::failed(
                ErrorCode::TransactionFailed,
                format!("could not re-read game state after failed write: {e}"),
            ),
        }
    }
}

fn parse_version(raw: &str) -> Option<Version> {
    raw.trim().parse::<Version>().ok()
}
