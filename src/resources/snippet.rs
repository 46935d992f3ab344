//! The `tacticalrmm_script_snippet` resource.
//!
//! Snippets are reusable blocks of code that scripts pull in by name at run
//! time. The provider only manages their content.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument};

use super::{require_id, ResourceAdapter};
use crate::api::{
    self, entity_path, SnippetRecord, SnippetWrite, DEFAULT_SNIPPET_SHELL, SHELLS, SNIPPETS_PATH,
};
use crate::client::{decode_json, expect_ok, expect_ok_with_body, expect_status, ApiClient};
use crate::error::{ProviderError, Result};
use crate::reconcile::string_on_refresh;
use crate::schema::{Attribute, Diagnostic, Schema};
use crate::validation::{check_max_len, check_one_of};

/// Longest snippet name the server accepts.
pub const MAX_NAME_LEN: usize = 40;

/// Longest snippet description the server accepts.
pub const MAX_DESC_LEN: usize = 50;

/// Stored state of a script snippet.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SnippetState {
    /// Server-assigned identifier; unset until created.
    pub id: Option<i64>,
    /// Display name.
    pub name: String,
    /// Short description.
    pub desc: Option<String>,
    /// Snippet source, substituted wherever the snippet is referenced.
    pub code: String,
    /// Interpreter; `powershell` when unset.
    pub shell: Option<String>,
}

impl SnippetState {
    fn write_body(&self) -> SnippetWrite {
        SnippetWrite {
            name: self.name.clone(),
            code: self.code.clone(),
            shell: self
                .shell
                .clone()
                .unwrap_or_else(|| DEFAULT_SNIPPET_SHELL.to_string()),
            desc: self.desc.clone(),
        }
    }

    fn refreshed(&self, record: SnippetRecord) -> Self {
        Self {
            id: Some(record.id),
            name: record.name,
            desc: string_on_refresh(self.desc.as_ref(), record.desc),
            code: record.code,
            shell: Some(record.shell),
        }
    }
}

/// Manages snippets through `/scripts/snippets/`.
#[derive(Debug, Clone)]
pub struct SnippetResource {
    client: ApiClient,
}

impl SnippetResource {
    async fn fetch(&self, id: i64) -> Result<Option<SnippetRecord>> {
        let response = self.client.get(&entity_path(SNIPPETS_PATH, id)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = expect_ok(response, "read script snippet")?;
        Ok(Some(decode_json(response, "script snippet").await?))
    }
}

#[async_trait]
impl ResourceAdapter for SnippetResource {
    type State = SnippetState;

    const TYPE_NAME: &'static str = "tacticalrmm_script_snippet";

    fn new(client: ApiClient) -> Self {
        Self { client }
    }

    fn schema() -> Schema {
        Schema::v0()
            .with_description("Manages a script snippet in Tactical RMM.")
            .with_attribute(
                "id",
                Attribute::computed_int64().with_description("Snippet identifier."),
            )
            .with_attribute(
                "name",
                Attribute::required_string().with_description("Snippet name (max 40 characters)."),
            )
            .with_attribute(
                "desc",
                Attribute::optional_string()
                    .with_description("Snippet description (max 50 characters)."),
            )
            .with_attribute(
                "code",
                Attribute::required_string().with_description("Snippet code content."),
            )
            .with_attribute(
                "shell",
                Attribute::optional_computed_string()
                    .with_description("Shell type. Defaults to powershell."),
            )
    }

    fn check(config: &Value, diagnostics: &mut Vec<Diagnostic>) {
        check_one_of(config, "shell", SHELLS, diagnostics);
        check_max_len(config, "name", MAX_NAME_LEN, diagnostics);
        check_max_len(config, "desc", MAX_DESC_LEN, diagnostics);
    }

    #[instrument(skip(self, planned), fields(name = %planned.name))]
    async fn create(&self, planned: SnippetState) -> Result<SnippetState> {
        let response = self.client.post(SNIPPETS_PATH, &planned.write_body()).await?;
        expect_ok(response, "create script snippet")?;

        let response = expect_ok(self.client.get(SNIPPETS_PATH).await?, "list script snippets")?;
        let snippets: Vec<SnippetRecord> = decode_json(response, "script snippets list").await?;
        let record = api::find_unique_by_name(&snippets, &planned.name)?
            .cloned()
            .ok_or_else(|| ProviderError::CreatedRecordMissing {
                kind: "script snippet",
                name: planned.name.clone(),
            })?;

        info!(id = record.id, "Script snippet created");
        Ok(SnippetState {
            id: Some(record.id),
            shell: Some(record.shell),
            ..planned
        })
    }

    #[instrument(skip(self, current), fields(id = ?current.id))]
    async fn read(&self, current: SnippetState) -> Result<Option<SnippetState>> {
        let id = require_id(current.id, Self::TYPE_NAME)?;
        match self.fetch(id).await? {
            Some(record) => Ok(Some(current.refreshed(record))),
            None => {
                info!(id, "Script snippet no longer exists, removing from state");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, prior, planned), fields(id = ?prior.id))]
    async fn update(&self, prior: SnippetState, planned: SnippetState) -> Result<SnippetState> {
        let id = require_id(prior.id, Self::TYPE_NAME)?;

        let response = self
            .client
            .put(&entity_path(SNIPPETS_PATH, id), &planned.write_body())
            .await?;
        expect_ok_with_body(response, "update script snippet").await?;
        debug!(id, "Script snippet updated, re-reading");

        let record = self.fetch(id).await?.ok_or_else(|| ProviderError::NotFound {
            kind: "Script Snippet",
            key: format!("ID {}", id),
        })?;
        Ok(planned.refreshed(record))
    }

    #[instrument(skip(self, current), fields(id = ?current.id))]
    async fn delete(&self, current: SnippetState) -> Result<()> {
        let id = require_id(current.id, Self::TYPE_NAME)?;
        let response = self.client.delete(&entity_path(SNIPPETS_PATH, id)).await?;
        expect_status(
            response,
            &[StatusCode::OK, StatusCode::NO_CONTENT],
            "delete script snippet",
        )?;
        info!(id, "Script snippet deleted");
        Ok(())
    }

    fn import(id: i64) -> SnippetState {
        SnippetState {
            id: Some(id),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use httpmock::prelude::*;
    use serde_json::json;

    fn resource(server: &MockServer) -> SnippetResource {
        SnippetResource::new(
            ApiClient::new(ClientConfig {
                base_url: server.base_url(),
                api_key: "key".into(),
                timeout: None,
            })
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_create_defaults_shell() {
        let server = MockServer::start();
        let post = server.mock(|when, then| {
            when.method(POST).path("/scripts/snippets/").json_body(json!({
                "name": "helper",
                "code": "Write-Output 'hi'",
                "shell": "powershell"
            }));
            then.status(200);
        });
        server.mock(|when, then| {
            when.method(GET).path("/scripts/snippets/");
            then.status(200).json_body(json!([
                {
                    "id": 5,
                    "name": "helper",
                    "desc": "",
                    "code": "Write-Output 'hi'",
                    "shell": "powershell"
                }
            ]));
        });

        let planned = SnippetState {
            name: "helper".into(),
            code: "Write-Output 'hi'".into(),
            ..Default::default()
        };
        let state = ResourceAdapter::create(&resource(&server), planned).await.unwrap();

        post.assert();
        assert_eq!(state.id, Some(5));
        assert_eq!(state.shell.as_deref(), Some("powershell"));
        assert_eq!(state.desc, None);
    }

    #[tokio::test]
    async fn test_create_ambiguous_name() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/scripts/snippets/");
            then.status(200);
        });
        server.mock(|when, then| {
            when.method(GET).path("/scripts/snippets/");
            then.status(200).json_body(json!([
                {"id": 5, "name": "helper", "desc": null, "code": "a", "shell": "cmd"},
                {"id": 6, "name": "helper", "desc": null, "code": "b", "shell": "cmd"}
            ]));
        });

        let planned = SnippetState {
            name: "helper".into(),
            code: "b".into(),
            shell: Some("cmd".into()),
            ..Default::default()
        };
        let err = ResourceAdapter::create(&resource(&server), planned)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Ambiguous { matches: 2, .. }));
    }

    #[tokio::test]
    async fn test_update_reports_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(PUT).path("/scripts/snippets/5/");
            then.status(400).body("{\"name\":[\"too long\"]}");
        });

        let prior = SnippetState {
            id: Some(5),
            name: "helper".into(),
            code: "a".into(),
            shell: Some("cmd".into()),
            ..Default::default()
        };
        let err = ResourceAdapter::update(&resource(&server), prior.clone(), prior)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unable to update script snippet, status code: 400, response: {\"name\":[\"too long\"]}"
        );
    }

    #[tokio::test]
    async fn test_read_refreshes_code() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/scripts/snippets/5/");
            then.status(200).json_body(json!(
                {"id": 5, "name": "helper", "desc": "changed", "code": "new", "shell": "python"}
            ));
        });

        let current = SnippetState {
            id: Some(5),
            name: "helper".into(),
            code: "old".into(),
            shell: Some("cmd".into()),
            ..Default::default()
        };
        let state = ResourceAdapter::read(&resource(&server), current)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state.code, "new");
        assert_eq!(state.desc.as_deref(), Some("changed"));
        assert_eq!(state.shell.as_deref(), Some("python"));
    }

    #[test]
    fn test_check_lengths() {
        let mut diagnostics = Vec::new();
        SnippetResource::check(
            &json!({
                "name": "n".repeat(41),
                "desc": "d".repeat(51),
                "code": "x",
                "shell": "cmd"
            }),
            &mut diagnostics,
        );
        assert_eq!(diagnostics.len(), 2);
    }
}
