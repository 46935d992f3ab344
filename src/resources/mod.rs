//! Managed resources: scripts, script snippets and keystore entries.
//!
//! Each resource implements [`ResourceAdapter`] over a typed state struct.
//! The provider talks to them through the JSON-level [`DynamicResource`]
//! object, which every adapter gets for free via a blanket impl.

pub mod keystore;
pub mod script;
pub mod snippet;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::client::ApiClient;
use crate::error::{ProviderError, Result};
use crate::schema::{Diagnostic, Schema};
use crate::validation;

pub use keystore::KeystoreResource;
pub use script::ScriptResource;
pub use snippet::SnippetResource;

/// Create, read, update, delete and import for one entity kind.
#[async_trait]
pub trait ResourceAdapter: Send + Sync + 'static {
    /// Typed state stored between operations.
    type State: Serialize + DeserializeOwned + Send + Sync;

    /// Resource type name, e.g. `tacticalrmm_script`.
    const TYPE_NAME: &'static str;

    /// Build the adapter around an authenticated client.
    fn new(client: ApiClient) -> Self;

    /// Schema of the resource.
    fn schema() -> Schema;

    /// Checks beyond what the schema expresses.
    fn check(config: &Value, diagnostics: &mut Vec<Diagnostic>) {
        let _ = (config, diagnostics);
    }

    /// Create the entity and return its state with server-assigned fields.
    async fn create(&self, planned: Self::State) -> Result<Self::State>;

    /// Refresh state. `None` means the entity is gone upstream.
    async fn read(&self, current: Self::State) -> Result<Option<Self::State>>;

    /// Apply the planned state in place.
    async fn update(&self, prior: Self::State, planned: Self::State) -> Result<Self::State>;

    /// Delete the entity.
    async fn delete(&self, current: Self::State) -> Result<()>;

    /// Seed state for an import; a following read fills in the rest.
    fn import(id: i64) -> Self::State;
}

/// Type-erased resource operating on JSON state.
#[async_trait]
pub trait DynamicResource: Send + Sync {
    /// Resource type name.
    fn type_name(&self) -> &'static str;
    /// Create from planned JSON state.
    async fn create(&self, planned: Value) -> Result<Value>;
    /// Refresh JSON state.
    async fn read(&self, current: Value) -> Result<Option<Value>>;
    /// Update from prior to planned JSON state.
    async fn update(&self, prior: Value, planned: Value) -> Result<Value>;
    /// Delete the entity described by the JSON state.
    async fn delete(&self, current: Value) -> Result<()>;
    /// Seed JSON state from an external identifier.
    fn import(&self, id: &str) -> Result<Value>;
}

#[async_trait]
impl<R: ResourceAdapter> DynamicResource for R {
    fn type_name(&self) -> &'static str {
        R::TYPE_NAME
    }

    async fn create(&self, planned: Value) -> Result<Value> {
        let state = ResourceAdapter::create(self, decode_state::<R>(planned)?).await?;
        Ok(serde_json::to_value(state)?)
    }

    async fn read(&self, current: Value) -> Result<Option<Value>> {
        match ResourceAdapter::read(self, decode_state::<R>(current)?).await? {
            Some(state) => Ok(Some(serde_json::to_value(state)?)),
            None => Ok(None),
        }
    }

    async fn update(&self, prior: Value, planned: Value) -> Result<Value> {
        let prior = decode_state::<R>(prior)?;
        let planned = decode_state::<R>(planned)?;
        let state = ResourceAdapter::update(self, prior, planned).await?;
        Ok(serde_json::to_value(state)?)
    }

    async fn delete(&self, current: Value) -> Result<()> {
        ResourceAdapter::delete(self, decode_state::<R>(current)?).await
    }

    fn import(&self, id: &str) -> Result<Value> {
        let id = parse_id(id)?;
        Ok(serde_json::to_value(<R as ResourceAdapter>::import(id))?)
    }
}

fn decode_state<R: ResourceAdapter>(value: Value) -> Result<R::State> {
    serde_json::from_value(value)
        .map_err(|e| ProviderError::decode(format!("{} state", R::TYPE_NAME), e))
}

/// Parse an import identifier.
pub fn parse_id(raw: &str) -> Result<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| ProviderError::InvalidId(raw.to_string()))
}

/// The id stored in state, required by every operation after create.
pub(crate) fn require_id(id: Option<i64>, type_name: &str) -> Result<i64> {
    id.ok_or_else(|| ProviderError::InvalidRequest(format!("{} state has no id", type_name)))
}

/// Static description of a resource type, usable before configuration.
#[derive(Clone, Copy)]
pub struct ResourceKind {
    /// Resource type name.
    pub type_name: &'static str,
    /// Schema constructor.
    pub schema: fn() -> Schema,
    /// Full config validation (schema plus semantic checks).
    pub validate: fn(&Value) -> Vec<Diagnostic>,
    /// Adapter constructor.
    pub build: fn(ApiClient) -> Box<dyn DynamicResource>,
}

impl ResourceKind {
    /// Describe adapter `R`.
    pub fn of<R: ResourceAdapter>() -> Self {
        Self {
            type_name: R::TYPE_NAME,
            schema: R::schema,
            validate: validate_config::<R>,
            build: build::<R>,
        }
    }
}

impl std::fmt::Debug for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceKind").field("type_name", &self.type_name).finish()
    }
}

fn validate_config<R: ResourceAdapter>(config: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = validation::validate(&R::schema(), config);
    R::check(config, &mut diagnostics);
    diagnostics
}

fn build<R: ResourceAdapter>(client: ApiClient) -> Box<dyn DynamicResource> {
    Box::new(R::new(client))
}

/// Every resource type this provider serves.
pub fn kinds() -> Vec<ResourceKind> {
    vec![
        ResourceKind::of::<ScriptResource>(),
        ResourceKind::of::<SnippetResource>(),
        ResourceKind::of::<KeystoreResource>(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("42").unwrap(), 42);
        assert_eq!(parse_id(" 7 ").unwrap(), 7);

        let err = parse_id("abc").unwrap_err();
        assert!(matches!(err, ProviderError::InvalidId(_)));
        assert_eq!(err.summary(), "Invalid ID");
        assert!(parse_id("").is_err());
    }

    #[test]
    fn test_kinds() {
        let names: Vec<_> = kinds().iter().map(|k| k.type_name).collect();
        assert_eq!(
            names,
            vec!["tacticalrmm_script", "tacticalrmm_script_snippet", "tacticalrmm_keystore"]
        );
    }

    #[test]
    fn test_kind_validation_runs_semantic_checks() {
        let kind = ResourceKind::of::<ScriptResource>();
        let diagnostics = (kind.validate)(&json!({
            "name": "x",
            "shell": "zsh",
            "script_body": "echo"
        }));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("shell"));
    }

    #[test]
    fn test_require_id() {
        assert_eq!(require_id(Some(3), "tacticalrmm_script").unwrap(), 3);
        assert!(matches!(
            require_id(None, "tacticalrmm_script"),
            Err(ProviderError::InvalidRequest(_))
        ));
    }
}
