//! Read-only data sources.
//!
//! Singular data sources look up one record by `id` or `name`; when both are
//! given, `id` wins. Names are treated as unique there, and a name shared by
//! several records is an error. Plural data sources list a collection and
//! filter it client-side, keeping the server's ordering.

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

pub use keystore::{KeystoreDataSource, KeystoresDataSource};
pub use script::{ScriptDataSource, ScriptsDataSource};
pub use snippet::{SnippetDataSource, SnippetsDataSource};

/// One read-only query against the API.
#[async_trait]
pub trait DataSourceAdapter: Send + Sync + 'static {
    /// The user's query, decoded from configuration.
    type Query: DeserializeOwned + Send;
    /// The resulting state.
    type Output: Serialize + Send;

    /// Data source type name, e.g. `tacticalrmm_scripts`.
    const TYPE_NAME: &'static str;

    /// Build the adapter around an authenticated client.
    fn new(client: ApiClient) -> Self;

    /// Schema of the data source.
    fn schema() -> Schema;

    /// Checks beyond what the schema expresses.
    fn check(config: &Value, diagnostics: &mut Vec<Diagnostic>) {
        let _ = (config, diagnostics);
    }

    /// Run the query.
    async fn read(&self, query: Self::Query) -> Result<Self::Output>;
}

/// Type-erased data source operating on JSON.
#[async_trait]
pub trait DynamicDataSource: Send + Sync {
    /// Data source type name.
    fn type_name(&self) -> &'static str;
    /// Run the query described by `config`.
    async fn read(&self, config: Value) -> Result<Value>;
}

#[async_trait]
impl<D: DataSourceAdapter> DynamicDataSource for D {
    fn type_name(&self) -> &'static str {
        D::TYPE_NAME
    }

    async fn read(&self, config: Value) -> Result<Value> {
        let config = if config.is_null() {
            Value::Object(Default::default())
        } else {
            config
        };
        let query: D::Query = serde_json::from_value(config)
            .map_err(|e| ProviderError::decode(format!("{} configuration", D::TYPE_NAME), e))?;
        let output = DataSourceAdapter::read(self, query).await?;
        Ok(serde_json::to_value(output)?)
    }
}

/// How a singular data source finds its record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Direct lookup by id.
    Id(i64),
    /// Listing scan for a unique name.
    Name(String),
}

impl Lookup {
    /// Pick the lookup key; `id` takes precedence over `name`.
    pub fn resolve(id: Option<i64>, name: Option<String>, kind: &'static str) -> Result<Self> {
        match (id, name) {
            (Some(id), _) => Ok(Self::Id(id)),
            (None, Some(name)) => Ok(Self::Name(name)),
            (None, None) => Err(ProviderError::MissingIdentifier { kind }),
        }
    }

    /// Describe the key in a not-found error.
    pub fn not_found(&self, kind: &'static str) -> ProviderError {
        let key = match self {
            Self::Id(id) => format!("ID {}", id),
            Self::Name(name) => format!("name '{}'", name),
        };
        ProviderError::NotFound { kind, key }
    }
}

/// Flag a singular config that names neither `id` nor `name`.
pub(crate) fn check_lookup_key(config: &Value, kind: &str, diagnostics: &mut Vec<Diagnostic>) {
    let set = |attr: &str| config.get(attr).map(|v| !v.is_null()).unwrap_or(false);
    if !set("id") && !set("name") {
        diagnostics.push(
            Diagnostic::error(format!("Missing {} Identifier", kind)).with_detail(format!(
                "Either 'id' or 'name' must be specified to look up a {}.",
                kind.to_lowercase()
            )),
        );
    }
}

/// Static description of a data source type, usable before configuration.
#[derive(Clone, Copy)]
pub struct DataSourceKind {
    /// Data source type name.
    pub type_name: &'static str,
    /// Schema constructor.
    pub schema: fn() -> Schema,
    /// Full config validation.
    pub validate: fn(&Value) -> Vec<Diagnostic>,
    /// Adapter constructor.
    pub build: fn(ApiClient) -> Box<dyn DynamicDataSource>,
}

impl DataSourceKind {
    /// Describe adapter `D`.
    pub fn of<D: DataSourceAdapter>() -> Self {
        Self {
            type_name: D::TYPE_NAME,
            schema: D::schema,
            validate: validate_config::<D>,
            build: build::<D>,
        }
    }
}

impl std::fmt::Debug for DataSourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSourceKind").field("type_name", &self.type_name).finish()
    }
}

fn validate_config<D: DataSourceAdapter>(config: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = validation::validate(&D::schema(), config);
    D::check(config, &mut diagnostics);
    diagnostics
}

fn build<D: DataSourceAdapter>(client: ApiClient) -> Box<dyn DynamicDataSource> {
    Box::new(D::new(client))
}

/// Every data source type this provider serves.
pub fn kinds() -> Vec<DataSourceKind> {
    vec![
        DataSourceKind::of::<ScriptDataSource>(),
        DataSourceKind::of::<ScriptsDataSource>(),
        DataSourceKind::of::<SnippetDataSource>(),
        DataSourceKind::of::<SnippetsDataSource>(),
        DataSourceKind::of::<KeystoreDataSource>(),
        DataSourceKind::of::<KeystoresDataSource>(),
    ]
}
