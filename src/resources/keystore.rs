//! The `tacticalrmm_keystore` resource.
//!
//! The keystore has no per-id GET, so reads list the whole collection and
//! scan for the id. Values are sensitive and never logged.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

use super::{require_id, ResourceAdapter};
use crate::api::{self, entity_path, KeystoreRecord, KeystoreWrite, KEYSTORE_PATH};
use crate::client::{decode_json, expect_ok, expect_ok_with_body, expect_status, ApiClient};
use crate::error::{ProviderError, Result};
use crate::schema::{Attribute, Diagnostic, Schema};
use crate::validation::check_max_len;

/// Longest keystore name the server accepts.
pub const MAX_NAME_LEN: usize = 25;

/// Stored state of a keystore entry.
#[derive(Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeystoreState {
    /// Server-assigned identifier; unset until created.
    pub id: Option<i64>,
    /// Display name.
    pub name: String,
    /// Secret value.
    pub value: String,
}

impl std::fmt::Debug for KeystoreState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeystoreState")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("value", &"<redacted>")
            .finish()
    }
}

impl KeystoreState {
    fn write_body(&self) -> KeystoreWrite {
        KeystoreWrite {
            name: self.name.clone(),
            value: self.value.clone(),
        }
    }
}

/// Manages keystore entries through `/core/keystore/`.
#[derive(Debug, Clone)]
pub struct KeystoreResource {
    client: ApiClient,
}

impl KeystoreResource {
    async fn list(&self) -> Result<Vec<KeystoreRecord>> {
        let response = expect_ok(self.client.get(KEYSTORE_PATH).await?, "read keystore")?;
        decode_json(response, "keystore list").await
    }
}

#[async_trait]
impl ResourceAdapter for KeystoreResource {
    type State = KeystoreState;

    const TYPE_NAME: &'static str = "tacticalrmm_keystore";

    fn new(client: ApiClient) -> Self {
        Self { client }
    }

    fn schema() -> Schema {
        Schema::v0()
            .with_description("Manages a global key store entry in Tactical RMM.")
            .with_attribute(
                "id",
                Attribute::computed_int64().with_description("Key store entry identifier."),
            )
            .with_attribute(
                "name",
                Attribute::required_string()
                    .with_description("Name of the key store entry (max 25 characters)."),
            )
            .with_attribute(
                "value",
                Attribute::required_string()
                    .sensitive()
                    .with_description("Value of the key store entry."),
            )
    }

    fn check(config: &Value, diagnostics: &mut Vec<Diagnostic>) {
        check_max_len(config, "name", MAX_NAME_LEN, diagnostics);
    }

    #[instrument(skip(self, planned), fields(name = %planned.name))]
    async fn create(&self, planned: KeystoreState) -> Result<KeystoreState> {
        let response = self.client.post(KEYSTORE_PATH, &planned.write_body()).await?;
        expect_ok(response, "create keystore entry")?;

        let entries = self.list().await?;
        let record = api::find_unique_by_name(&entries, &planned.name)?.ok_or_else(|| {
            ProviderError::CreatedRecordMissing {
                kind: "keystore entry",
                name: planned.name.clone(),
            }
        })?;

        info!(id = record.id, "Keystore entry created");
        Ok(KeystoreState {
            id: Some(record.id),
            ..planned
        })
    }

    #[instrument(skip(self, current), fields(id = ?current.id))]
    async fn read(&self, current: KeystoreState) -> Result<Option<KeystoreState>> {
        let id = require_id(current.id, Self::TYPE_NAME)?;
        let entries = self.list().await?;
        match api::find_by_id(&entries, id) {
            Some(record) => Ok(Some(KeystoreState {
                id: Some(record.id),
                name: record.name.clone(),
                value: record.value.clone(),
            })),
            None => {
                info!(id, "Keystore entry no longer exists, removing from state");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, prior, planned), fields(id = ?prior.id))]
    async fn update(&self, prior: KeystoreState, planned: KeystoreState) -> Result<KeystoreState> {
        let id = require_id(prior.id, Self::TYPE_NAME)?;
        let response = self
            .client
            .put(&entity_path(KEYSTORE_PATH, id), &planned.write_body())
            .await?;
        expect_ok_with_body(response, &format!("update keystore entry ID {}", id)).await?;
        info!(id, "Keystore entry updated");

        // No per-id GET to re-read from; the planned values are the state.
        Ok(KeystoreState {
            id: Some(id),
            ..planned
        })
    }

    #[instrument(skip(self, current), fields(id = ?current.id))]
    async fn delete(&self, current: KeystoreState) -> Result<()> {
        let id = require_id(current.id, Self::TYPE_NAME)?;
        let response = self.client.delete(&entity_path(KEYSTORE_PATH, id)).await?;
        expect_status(
            response,
            &[StatusCode::OK, StatusCode::NO_CONTENT],
            "delete keystore entry",
        )?;
        info!(id, "Keystore entry deleted");
        Ok(())
    }

    fn import(id: i64) -> KeystoreState {
        KeystoreState {
            id: Some(id),
            ..Default::default()
        }
    }
}
