//! First-sync construction of the session document.
//!
//! The first time a session is synchronized there is no stored document yet.
//! The loader pulls the campaign's characters, actors, and items from an
//! injected content source, folds holder-owned items into the `items`
//! collection, strips embedded user/account objects down to bare ids, and
//! defaults the optional records. A loading failure never aborts first sync:
//! the loader falls back to a minimal empty-but-valid document and reports a
//! distinguishable degraded status, so a transient fault is observable
//! instead of looking like a brand-new empty campaign.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// Errors a content source can fail with.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The referenced campaign does not exist.
    #[error("campaign not found: {0}")]
    CampaignNotFound(String),

    /// The backing content service is unreachable or transiently failing.
    #[error("content source unavailable: {0}")]
    Unavailable(String),

    /// A record could not be decoded.
    #[error("malformed record: {0}")]
    Malformed(String),
}

/// Campaign content the loader consumes: the campaign record itself, the
/// documents scoped to it, and inventory lookups keyed by holder id.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Load the campaign record, or `None` if the id is unknown.
    async fn campaign(&self, campaign_id: &str) -> Result<Option<Value>, LoadError>;

    /// Characters owned by or associated with the campaign.
    async fn characters(&self, campaign_id: &str) -> Result<Vec<Value>, LoadError>;

    /// NPC actors scoped to the campaign.
    async fn actors(&self, campaign_id: &str) -> Result<Vec<Value>, LoadError>;

    /// Items scoped directly to the campaign.
    async fn items(&self, campaign_id: &str) -> Result<Vec<Value>, LoadError>;

    /// Items held in the inventory of a character or actor.
    async fn items_for_holder(&self, holder_id: &str) -> Result<Vec<Value>, LoadError>;
}

/// A content source with no content. Every session it initializes starts
/// from the minimal empty-but-valid document.
pub struct NullContentSource;

#[async_trait]
impl ContentSource for NullContentSource {
    async fn campaign(&self, _campaign_id: &str) -> Result<Option<Value>, LoadError> {
        Ok(None)
    }

    async fn characters(&self, _campaign_id: &str) -> Result<Vec<Value>, LoadError> {
        Ok(Vec::new())
    }

    async fn actors(&self, _campaign_id: &str) -> Result<Vec<Value>, LoadError> {
        Ok(Vec::new())
    }

    async fn items(&self, _campaign_id: &str) -> Result<Vec<Value>, LoadError> {
        Ok(Vec::new())
    }

    async fn items_for_holder(&self, _holder_id: &str) -> Result<Vec<Value>, LoadError> {
        Ok(Vec::new())
    }
}

/// The built initial document, plus a degraded marker when the content
/// source failed and the loader fell back to the minimal document.
#[derive(Debug, Clone)]
pub struct InitialState {
    /// A structurally valid game-state document.
    pub state: Value,
    /// `Some(reason)` when content loading failed and the document is the
    /// minimal fallback rather than the campaign's real content.
    pub degraded: Option<String>,
}

/// Builds the initial game-state document for a session.
pub struct StateLoader {
    content: Arc<dyn ContentSource>,
}

impl StateLoader {
    /// Create a loader over the given content source.
    pub fn new(content: Arc<dyn ContentSource>) -> Self {
        Self { content }
    }

    /// Build the initial document for a campaign.
    ///
    /// Never fails: a content-source error degrades to the minimal
    /// empty-but-valid document, with the reason carried in the result and
    /// logged. Idempotence across repeated initialization lives in the
    /// coordinator, which only calls this when no stored document exists.
    pub async fn build_initial_state(&self, campaign_id: &str) -> InitialState {
        match self.try_build(campaign_id).await {
            Ok(state) => InitialState {
                state,
                degraded: None,
            },
            Err(e) => {
                warn!(
                    campaign_id,
                    error = %e,
                    "content loading failed, initializing session from minimal state"
                );
                InitialState {
                    state: empty_game_state(None),
                    degraded: Some(e.to_string()),
                }
            }
        }
    }

    async fn try_build(&self, campaign_id: &str) -> Result<Value, LoadError> {
        let campaign = self.content.campaign(campaign_id).await?;
        let mut characters = self.content.characters(campaign_id).await?;
        let mut actors = self.content.actors(campaign_id).await?;
        let mut items = self.content.items(campaign_id).await?;

        // Fold inventory-owned items into the campaign items, deduplicated
        // by record id so an item scoped both ways appears once.
        let mut seen: HashSet<String> = items.iter().filter_map(record_id).collect();
        for holder in characters.iter().chain(actors.iter()) {
            let Some(holder_id) = record_id(holder) else {
                continue;
            };
            for item in self.content.items_for_holder(&holder_id).await? {
                if let Some(id) = record_id(&item) {
                    if !seen.insert(id) {
                        continue;
                    }
                }
                items.push(item);
            }
        }

        for record in characters
            .iter_mut()
            .chain(actors.iter_mut())
            .chain(items.iter_mut())
        {
            strip_user_refs(record);
        }

        let mut state = empty_game_state(campaign);
        state["characters"] = Value::Array(characters);
        state["actors"] = Value::Array(actors);
        state["items"] = Value::Array(items);
        Ok(state)
    }
}

/// The minimal structurally valid game-state document.
pub(crate) fn empty_game_state(campaign: Option<Value>) -> Value {
    json!({
        "campaign": campaign.unwrap_or(Value::Null),
        "characters": [],
        "actors": [],
        "items": [],
        "currentEncounter": null,
        "turnManager": null,
        "pluginData": {}
    })
}

/// Fields that sometimes arrive holding a whole embedded user/account
/// object; the session document only ever stores the bare identifier.
const USER_REF_FIELDS: [&str; 4] = ["createdBy", "updatedBy", "owner", "user"];

fn strip_user_refs(record: &mut Value) {
    let Value::Object(map) = record else { return };
    for field in USER_REF_FIELDS {
        if let Some(Value::Object(embedded)) = map.get(field) {
            if let Some(id) = embedded.get("id").and_then(Value::as_str) {
                let id = id.to_string();
                map.insert(field.to_string(), Value::String(id));
            }
        }
    }
}

fn record_id(record: &Value) -> Option<String> {
    record
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate_game_state;
    use pretty_assertions::assert_eq;

    /// Fixed campaign content, optionally failing on every call.
    struct FixtureSource {
        fail: bool,
    }

    #[async_trait]
    impl ContentSource for FixtureSource {
        async fn campaign(&self, campaign_id: &str) -> Result<Option<Value>, LoadError> {
            if self.fail {
                return Err(LoadError::Unavailable("connection refused".into()));
            }
            Ok(Some(json!({"id": campaign_id, "name": "Sunken Vault"})))
        }

        async fn characters(&self, _campaign_id: &str) -> Result<Vec<Value>, LoadError> {
            Ok(vec![json!({
                "id": "ch1",
                "name": "Mira",
                "createdBy": {"id": "user-9", "email": "mira@example.com"}
            })])
        }

        async fn actors(&self, _campaign_id: &str) -> Result<Vec<Value>, LoadError> {
            Ok(vec![json!({"id": "ac1", "name": "Gark"})])
        }

        async fn items(&self, _campaign_id: &str) -> Result<Vec<Value>, LoadError> {
            Ok(vec![json!({"id": "it1", "name": "Lantern"})])
        }

        async fn items_for_holder(&self, holder_id: &str) -> Result<Vec<Value>, LoadError> {
            match holder_id {
                // One item only in the inventory, one also campaign-scoped.
                "ch1" => Ok(vec![
                    json!({"id": "it2", "name": "Sword", "owner": {"id": "user-9"}}),
                    json!({"id": "it1", "name": "Lantern"}),
                ]),
                _ => Ok(Vec::new()),
            }
        }
    }

    #[tokio::test]
    async fn builds_full_document() {
        let loader = StateLoader::new(Arc::new(FixtureSource { fail: false }));
        let built = loader.build_initial_state("c1").await;

        assert_eq!(built.degraded, None);
        let state = &built.state;
        assert!(validate_game_state(state).is_ok());
        assert_eq!(state["campaign"]["name"], "Sunken Vault");
        assert_eq!(state["characters"][0]["name"], "Mira");
        assert_eq!(state["actors"][0]["name"], "Gark");
        assert_eq!(state["currentEncounter"], Value::Null);
        assert_eq!(state["pluginData"], json!({}));
    }

    #[tokio::test]
    async fn folds_inventory_items_without_duplicates() {
        let loader = StateLoader::new(Arc::new(FixtureSource { fail: false }));
        let built = loader.build_initial_state("c1").await;

        let items = built.state["items"].as_array().unwrap();
        let ids: Vec<&str> = items.iter().filter_map(|i| i["id"].as_str()).collect();
        assert_eq!(ids, vec!["it1", "it2"]);
    }

    #[tokio::test]
    async fn strips_embedded_user_objects_to_ids() {
        let loader = StateLoader::new(Arc::new(FixtureSource { fail: false }));
        let built = loader.build_initial_state("c1").await;

        assert_eq!(built.state["characters"][0]["createdBy"], "user-9");
        assert_eq!(built.state["items"][1]["owner"], "user-9");
    }

    #[tokio::test]
    async fn load_failure_degrades_to_minimal_state() {
        let loader = StateLoader::new(Arc::new(FixtureSource { fail: true }));
        let built = loader.build_initial_state("c1").await;

        let reason = built.degraded.expect("degraded marker");
        assert!(reason.contains("unavailable"));
        assert!(validate_game_state(&built.state).is_ok());
        assert_eq!(built.state["characters"], json!([]));
    }

    #[tokio::test]
    async fn null_source_yields_minimal_state_without_degradation() {
        let loader = StateLoader::new(Arc::new(NullContentSource));
        let built = loader.build_initial_state("c1").await;

        assert_eq!(built.degraded, None);
        assert!(validate_game_state(&built.state).is_ok());
    }
}
