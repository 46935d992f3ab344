//! The `tacticalrmm_script` resource.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument};

use super::{require_id, ResourceAdapter};
use crate::api::{
    self, entity_path, ScriptRecord, ScriptWrite, DEFAULT_SCRIPT_TIMEOUT, SCRIPTS_PATH,
    SCRIPT_TYPES, SHELLS, USER_DEFINED,
};
use crate::client::{decode_json, expect_ok, expect_ok_with_body, expect_status, ApiClient};
use crate::error::{ProviderError, Result};
use crate::reconcile::{list_on_create, list_on_refresh, string_on_refresh};
use crate::schema::{Attribute, Diagnostic, Schema};
use crate::validation::{check_one_of, check_positive};

/// Stored state of a script.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptState {
    /// Server-assigned identifier; unset until created.
    pub id: Option<i64>,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Interpreter the script runs under.
    pub shell: String,
    /// Script type; the server default when unset.
    pub script_type: Option<String>,
    /// Category shown in the script manager.
    pub category: Option<String>,
    /// Script source.
    pub script_body: String,
    /// Run timeout in seconds; 90 when unset.
    pub default_timeout: Option<i64>,
    /// Shown among favorites.
    pub favorite: Option<bool>,
    /// Hidden from script lists.
    pub hidden: Option<bool>,
    /// Run in the logged-on user's session instead of as SYSTEM.
    pub run_as_user: Option<bool>,
    /// Default arguments.
    pub args: Option<Vec<String>>,
    /// Environment variables, as `KEY=value` entries.
    pub env_vars: Option<Vec<String>>,
    /// Platforms the script may run on.
    pub supported_platforms: Option<Vec<String>>,
    /// Usage hint shown next to the script.
    pub syntax: Option<String>,
}

impl ScriptState {
    fn write_body(&self) -> ScriptWrite {
        ScriptWrite {
            name: self.name.clone(),
            shell: self.shell.clone(),
            script_body: self.script_body.clone(),
            script_type: None,
            description: self.description.clone(),
            category: self.category.clone(),
            default_timeout: self.default_timeout,
            favorite: self.favorite,
            hidden: self.hidden,
            run_as_user: self.run_as_user,
            syntax: self.syntax.clone(),
            args: self.args.clone(),
            env_vars: self.env_vars.clone(),
            supported_platforms: self.supported_platforms.clone(),
        }
    }

    /// Merge a fetched record over the state the user last wrote.
    fn refreshed(&self, record: ScriptRecord) -> Self {
        Self {
            id: Some(record.id),
            name: record.name,
            description: string_on_refresh(self.description.as_ref(), record.description),
            shell: record.shell,
            script_type: Some(record.script_type),
            category: string_on_refresh(self.category.as_ref(), record.category),
            script_body: record.script_body.unwrap_or_else(|| self.script_body.clone()),
            default_timeout: Some(record.default_timeout),
            favorite: Some(record.favorite),
            hidden: Some(record.hidden),
            run_as_user: Some(record.run_as_user),
            args: list_on_refresh(self.args.as_ref(), record.args),
            env_vars: list_on_refresh(self.env_vars.as_ref(), record.env_vars),
            supported_platforms: list_on_refresh(
                self.supported_platforms.as_ref(),
                record.supported_platforms,
            ),
            syntax: string_on_refresh(self.syntax.as_ref(), record.syntax),
        }
    }
}

/// Manages scripts through `/scripts/`.
#[derive(Debug, Clone)]
pub struct ScriptResource {
    client: ApiClient,
}

impl ScriptResource {
    /// `None` on 404.
    async fn fetch(&self, id: i64) -> Result<Option<ScriptRecord>> {
        let response = self.client.get(&entity_path(SCRIPTS_PATH, id)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = expect_ok(response, "read script")?;
        Ok(Some(decode_json(response, "script").await?))
    }
}

#[async_trait]
impl ResourceAdapter for ScriptResource {
    type State = ScriptState;

    const TYPE_NAME: &'static str = "tacticalrmm_script";

    fn new(client: ApiClient) -> Self {
        Self { client }
    }

    fn schema() -> Schema {
        Schema::v0()
            .with_description("Manages a script in Tactical RMM.")
            .with_attribute(
                "id",
                Attribute::computed_int64().with_description("Script identifier."),
            )
            .with_attribute(
                "name",
                Attribute::required_string().with_description("Name of the script."),
            )
            .with_attribute(
                "description",
                Attribute::optional_string().with_description("Description of the script."),
            )
            .with_attribute(
                "shell",
                Attribute::required_string().with_description(
                    "Shell type (powershell, cmd, python, shell, nushell, deno).",
                ),
            )
            .with_attribute(
                "script_type",
                Attribute::optional_computed_string()
                    .with_description("Script type (userdefined or builtin)."),
            )
            .with_attribute(
                "category",
                Attribute::optional_string().with_description("Category of the script."),
            )
            .with_attribute(
                "script_body",
                Attribute::required_string().with_description("The script content."),
            )
            .with_attribute(
                "default_timeout",
                Attribute::optional_computed_int64()
                    .with_description("Default timeout in seconds. Defaults to 90."),
            )
            .with_attribute(
                "favorite",
                Attribute::optional_computed_bool().with_description("Mark script as favorite."),
            )
            .with_attribute(
                "hidden",
                Attribute::optional_computed_bool().with_description("Hide script from lists."),
            )
            .with_attribute(
                "run_as_user",
                Attribute::optional_computed_bool()
                    .with_description("Run the script as the logged-in user."),
            )
            .with_attribute(
                "args",
                Attribute::optional_string_list().with_description("Default script arguments."),
            )
            .with_attribute(
                "env_vars",
                Attribute::optional_string_list().with_description("Environment variables."),
            )
            .with_attribute(
                "supported_platforms",
                Attribute::optional_string_list().with_description("Supported platforms."),
            )
            .with_attribute(
                "syntax",
                Attribute::optional_string().with_description("Script syntax reference."),
            )
    }

    fn check(config: &Value, diagnostics: &mut Vec<Diagnostic>) {
        check_one_of(config, "shell", SHELLS, diagnostics);
        check_one_of(config, "script_type", SCRIPT_TYPES, diagnostics);
        check_positive(config, "default_timeout", diagnostics);
    }

    #[instrument(skip(self, planned), fields(name = %planned.name))]
    async fn create(&self, planned: ScriptState) -> Result<ScriptState> {
        let mut body = planned.write_body();
        body.script_type = Some(
            planned
                .script_type
                .clone()
                .unwrap_or_else(|| USER_DEFINED.to_string()),
        );
        body.default_timeout = Some(planned.default_timeout.unwrap_or(DEFAULT_SCRIPT_TIMEOUT));

        let response = self.client.post(SCRIPTS_PATH, &body).await?;
        expect_ok(response, "create script")?;

        // The create response carries no record; find it in the listing.
        let response = expect_ok(self.client.get(SCRIPTS_PATH).await?, "list scripts")?;
        let scripts: Vec<ScriptRecord> = decode_json(response, "scripts list").await?;
        let record = api::find_unique_by_name(&scripts, &planned.name)?
            .cloned()
            .ok_or_else(|| ProviderError::CreatedRecordMissing {
                kind: "script",
                name: planned.name.clone(),
            })?;

        info!(id = record.id, "Script created");
        Ok(ScriptState {
            id: Some(record.id),
            script_type: Some(record.script_type),
            default_timeout: Some(record.default_timeout),
            favorite: Some(record.favorite),
            hidden: Some(record.hidden),
            run_as_user: Some(record.run_as_user),
            args: list_on_create(planned.args, record.args),
            env_vars: list_on_create(planned.env_vars, record.env_vars),
            supported_platforms: list_on_create(
                planned.supported_platforms,
                record.supported_platforms,
            ),
            ..planned
        })
    }

    #[instrument(skip(self, current), fields(id = ?current.id))]
    async fn read(&self, current: ScriptState) -> Result<Option<ScriptState>> {
        let id = require_id(current.id, Self::TYPE_NAME)?;
        match self.fetch(id).await? {
            Some(record) => Ok(Some(current.refreshed(record))),
            None => {
                info!(id, "Script no longer exists, removing from state");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, prior, planned), fields(id = ?prior.id))]
    async fn update(&self, prior: ScriptState, planned: ScriptState) -> Result<ScriptState> {
        let id = require_id(prior.id, Self::TYPE_NAME)?;

        let response = self
            .client
            .put(&entity_path(SCRIPTS_PATH, id), &planned.write_body())
            .await?;
        expect_ok_with_body(response, "update script").await?;
        debug!(id, "Script updated, re-reading");

        let record = self.fetch(id).await?.ok_or_else(|| ProviderError::NotFound {
            kind: "Script",
            key: format!("ID {}", id),
        })?;
        let planned = ScriptState {
            id: Some(id),
            ..planned
        };
        Ok(planned.refreshed(record))
    }

    #[instrument(skip(self, current), fields(id = ?current.id))]
    async fn delete(&self, current: ScriptState) -> Result<()> {
        let id = require_id(current.id, Self::TYPE_NAME)?;
        let response = self.client.delete(&entity_path(SCRIPTS_PATH, id)).await?;
        expect_status(response, &[StatusCode::OK, StatusCode::NO_CONTENT], "delete script")?;
        info!(id, "Script deleted");
        Ok(())
    }

    fn import(id: i64) -> ScriptState {
        ScriptState {
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

    fn resource(server: &MockServer) -> ScriptResource {
        ScriptResource::new(
            ApiClient::new(ClientConfig {
                base_url: server.base_url(),
                api_key: "key".into(),
                timeout: None,
            })
            .unwrap(),
        )
    }

    fn record(id: i64, name: &str) -> Value {
        json!({
            "id": id,
            "name": name,
            "description": "",
            "shell": "powershell",
            "script_type": "userdefined",
            "category": null,
            "default_timeout": 90,
            "favorite": false,
            "hidden": false,
            "run_as_user": false,
            "args": [],
            "env_vars": [],
            "supported_platforms": [],
            "syntax": null
        })
    }

    fn planned() -> ScriptState {
        ScriptState {
            name: "X".into(),
            shell: "powershell".into(),
            script_body: "Write-Output 1".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_applies_defaults() {
        let server = MockServer::start();
        let post = server.mock(|when, then| {
            when.method(POST).path("/scripts/").json_body(json!({
                "name": "X",
                "shell": "powershell",
                "script_body": "Write-Output 1",
                "script_type": "userdefined",
                "default_timeout": 90
            }));
            then.status(200).json_body(json!("X was added!"));
        });
        server.mock(|when, then| {
            when.method(GET).path("/scripts/");
            then.status(200)
                .json_body(json!([record(3, "other"), record(8, "X")]));
        });

        let state = ResourceAdapter::create(&resource(&server), planned()).await.unwrap();

        post.assert();
        assert_eq!(state.id, Some(8));
        assert_eq!(state.script_type.as_deref(), Some("userdefined"));
        assert_eq!(state.default_timeout, Some(90));
        assert_eq!(state.favorite, Some(false));
        assert_eq!(state.hidden, Some(false));
        assert_eq!(state.args, None);
        assert_eq!(state.script_body, "Write-Output 1");
    }

    #[tokio::test]
    async fn test_create_missing_from_listing() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/scripts/");
            then.status(200);
        });
        server.mock(|when, then| {
            when.method(GET).path("/scripts/");
            then.status(200).json_body(json!([record(3, "other")]));
        });

        let err = ResourceAdapter::create(&resource(&server), planned())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::CreatedRecordMissing { .. }));
    }

    #[tokio::test]
    async fn test_create_rejected() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/scripts/");
            then.status(400);
        });

        let err = ResourceAdapter::create(&resource(&server), planned())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Unable to create script, status code: 400");
    }

    #[tokio::test]
    async fn test_read_not_found_removes() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/scripts/8/");
            then.status(404);
        });

        let current = ScriptState {
            id: Some(8),
            ..planned()
        };
        let state = ResourceAdapter::read(&resource(&server), current).await.unwrap();
        assert!(state.is_none());
    }

    #[tokio::test]
    async fn test_read_preserves_explicit_empty_list() {
        let server = MockServer::start();
        let mut body = record(8, "X");
        body["script_body"] = json!("Write-Output 1");
        server.mock(|when, then| {
            when.method(GET).path("/scripts/8/");
            then.status(200).json_body(body);
        });

        let current = ScriptState {
            id: Some(8),
            args: Some(vec![]),
            ..planned()
        };
        let state = ResourceAdapter::read(&resource(&server), current)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state.args, Some(vec![]));
        assert_eq!(state.env_vars, None);
        assert_eq!(state.description, None);
        assert_eq!(state.category, None);
    }

    #[tokio::test]
    async fn test_update_sends_mutable_fields_only() {
        let server = MockServer::start();
        let put = server.mock(|when, then| {
            when.method(PUT).path("/scripts/8/").json_body(json!({
                "name": "Y",
                "shell": "powershell",
                "script_body": "Write-Output 1",
                "default_timeout": 90,
                "favorite": false,
                "hidden": false,
                "run_as_user": false
            }));
            then.status(200).json_body(json!("Y was edited!"));
        });
        let mut body = record(8, "Y");
        body["script_body"] = json!("Write-Output 1");
        server.mock(|when, then| {
            when.method(GET).path("/scripts/8/");
            then.status(200).json_body(body);
        });

        let prior = ScriptState {
            id: Some(8),
            script_type: Some("userdefined".into()),
            default_timeout: Some(90),
            favorite: Some(false),
            hidden: Some(false),
            run_as_user: Some(false),
            ..planned()
        };
        let next = ScriptState {
            name: "Y".into(),
            ..prior.clone()
        };
        let state = ResourceAdapter::update(&resource(&server), prior, next)
            .await
            .unwrap();

        put.assert();
        assert_eq!(state.id, Some(8));
        assert_eq!(state.name, "Y");
    }

    #[tokio::test]
    async fn test_delete_accepts_no_content() {
        let server = MockServer::start();
        let delete = server.mock(|when, then| {
            when.method(DELETE).path("/scripts/8/");
            then.status(204);
        });

        let current = ScriptState {
            id: Some(8),
            ..planned()
        };
        ResourceAdapter::delete(&resource(&server), current).await.unwrap();
        delete.assert();
    }

    #[test]
    fn test_import_seeds_id() {
        let state = <ScriptResource as ResourceAdapter>::import(12);
        assert_eq!(state.id, Some(12));
        assert!(state.name.is_empty());
    }

    #[test]
    fn test_schema() {
        let schema = ScriptResource::schema();
        assert!(schema.attribute("id").unwrap().is_computed());
        assert!(schema.attribute("script_body").unwrap().flags.required);
        assert!(schema.attribute("default_timeout").unwrap().flags.optional);
        assert!(!schema.attribute("name").unwrap().force_new);
    }
}
