//! `tacticalrmm_keystore` and `tacticalrmm_keystores`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use super::{check_lookup_key, DataSourceAdapter, Lookup};
use crate::api::{self, KeystoreRecord, Record, KEYSTORE_PATH};
use crate::client::{decode_json, expect_ok, ApiClient};
use crate::error::Result;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Diagnostic, Schema};

const KIND: &str = KeystoreRecord::KIND;

async fn list_entries(client: &ApiClient) -> Result<Vec<KeystoreRecord>> {
    let response = expect_ok(client.get(KEYSTORE_PATH).await?, "list keystore entries")?;
    decode_json(response, "keystore list").await
}

/// A keystore entry as exposed by both data sources.
#[derive(Clone, PartialEq, Serialize)]
pub struct KeystoreData {
    /// Server-assigned identifier.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Secret value.
    pub value: String,
}

impl std::fmt::Debug for KeystoreData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeystoreData")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("value", &"<redacted>")
            .finish()
    }
}

impl From<KeystoreRecord> for KeystoreData {
    fn from(record: KeystoreRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            value: record.value,
        }
    }
}

/// Lookup key, or filters for the listing.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct KeystoreQuery {
    /// Exact identifier.
    pub id: Option<i64>,
    /// Exact name.
    pub name: Option<String>,
}

/// Looks up one keystore entry by id or name.
#[derive(Debug, Clone)]
pub struct KeystoreDataSource {
    client: ApiClient,
}

#[async_trait]
impl DataSourceAdapter for KeystoreDataSource {
    type Query = KeystoreQuery;
    type Output = KeystoreData;

    const TYPE_NAME: &'static str = "tacticalrmm_keystore";

    fn new(client: ApiClient) -> Self {
        Self { client }
    }

    fn schema() -> Schema {
        Schema::v0()
            .with_description("Look up a single Tactical RMM key store entry by ID or name.")
            .with_attribute(
                "id",
                Attribute::optional_computed_int64()
                    .with_description("Entry identifier. Takes precedence over name."),
            )
            .with_attribute(
                "name",
                Attribute::optional_computed_string().with_description("Entry name."),
            )
            .with_attribute(
                "value",
                Attribute::computed_string()
                    .sensitive()
                    .with_description("Entry value."),
            )
    }

    fn check(config: &Value, diagnostics: &mut Vec<Diagnostic>) {
        check_lookup_key(config, KIND, diagnostics);
    }

    #[instrument(skip(self), fields(data_source = Self::TYPE_NAME))]
    async fn read(&self, query: KeystoreQuery) -> Result<KeystoreData> {
        let lookup = Lookup::resolve(query.id, query.name, KIND)?;
        let entries = list_entries(&self.client).await?;
        let found = match &lookup {
            Lookup::Id(id) => api::find_by_id(&entries, *id),
            Lookup::Name(name) => api::find_unique_by_name(&entries, name)?,
        };
        let record = found.cloned().ok_or_else(|| lookup.not_found(KIND))?;
        debug!(id = record.id, "Keystore entry found");
        Ok(record.into())
    }
}

/// Result of the keystore listing.
#[derive(Debug, Clone, Serialize)]
pub struct KeystoresData {
    /// The filters as given.
    #[serde(flatten)]
    pub query: KeystoreQuery,
    /// Matching entries.
    pub keystores: Vec<KeystoreData>,
}

/// Lists keystore entries, optionally filtered by id or name.
#[derive(Debug, Clone)]
pub struct KeystoresDataSource {
    client: ApiClient,
}

#[async_trait]
impl DataSourceAdapter for KeystoresDataSource {
    type Query = KeystoreQuery;
    type Output = KeystoresData;

    const TYPE_NAME: &'static str = "tacticalrmm_keystores";

    fn new(client: ApiClient) -> Self {
        Self { client }
    }

    fn schema() -> Schema {
        let entry = AttributeType::object([
            ("id", AttributeType::Int64),
            ("name", AttributeType::String),
            ("value", AttributeType::String),
        ]);

        Schema::v0()
            .with_description(
                "List Tactical RMM key store entries, optionally filtered by ID or name.",
            )
            .with_attribute(
                "id",
                Attribute::optional_int64().with_description("Return only the entry with this ID."),
            )
            .with_attribute(
                "name",
                Attribute::optional_string().with_description("Filter by exact name."),
            )
            .with_attribute(
                "keystores",
                Attribute::new(AttributeType::list(entry), AttributeFlags::computed())
                    .sensitive()
                    .with_description("Matching entries, in server order."),
            )
    }

    #[instrument(skip(self), fields(data_source = Self::TYPE_NAME))]
    async fn read(&self, query: KeystoreQuery) -> Result<KeystoresData> {
        let all = list_entries(&self.client).await?;
        let entries: Vec<KeystoreRecord> = match (&query.id, &query.name) {
            (Some(id), _) => api::find_by_id(&all, *id).cloned().into_iter().collect(),
            (None, Some(name)) => all.into_iter().filter(|e| &e.name == name).collect(),
            (None, None) => all,
        };
        debug!(count = entries.len(), "Keystore entries filtered");
        Ok(KeystoresData {
            keystores: entries.into_iter().map(Into::into).collect(),
            query,
        })
    }
}
