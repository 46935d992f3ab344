//! `tacticalrmm_script` and `tacticalrmm_scripts`.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use super::{check_lookup_key, DataSourceAdapter, Lookup};
use crate::api::{self, entity_path, Record, ScriptRecord, SCRIPTS_PATH, SCRIPT_TYPES, SHELLS};
use crate::client::{decode_json, expect_ok, ApiClient};
use crate::error::Result;
use crate::reconcile::{list_for_data_source, string_for_data_source};
use crate::schema::{Attribute, AttributeFlags, AttributeType, Diagnostic, Schema};
use crate::validation::check_one_of;

const KIND: &str = ScriptRecord::KIND;

async fn list_scripts(client: &ApiClient) -> Result<Vec<ScriptRecord>> {
    let response = expect_ok(client.get(SCRIPTS_PATH).await?, "list scripts")?;
    decode_json(response, "scripts list").await
}

/// `None` on 404.
async fn get_script(client: &ApiClient, id: i64) -> Result<Option<ScriptRecord>> {
    let response = client.get(&entity_path(SCRIPTS_PATH, id)).await?;
    if response.status() == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    let response = expect_ok(response, "read script")?;
    Ok(Some(decode_json(response, "script").await?))
}

/// Lookup key for a single script.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScriptQuery {
    /// Exact identifier.
    pub id: Option<i64>,
    /// Exact name.
    pub name: Option<String>,
}

/// A script as exposed by the singular data source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScriptData {
    /// Server-assigned identifier.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Interpreter the script runs under.
    pub shell: String,
    /// `userdefined` or `builtin`.
    pub script_type: String,
    /// Category shown in the script manager.
    pub category: Option<String>,
    /// Backing file name, set for community scripts.
    pub filename: Option<String>,
    /// Script source.
    pub script_body: Option<String>,
    /// Hash of the script body as computed by the server.
    pub script_hash: Option<String>,
    /// Run timeout in seconds.
    pub default_timeout: i64,
    /// Shown among favorites.
    pub favorite: bool,
    /// Hidden from script lists.
    pub hidden: bool,
    /// Run in the logged-on user's session instead of as SYSTEM.
    pub run_as_user: bool,
    /// Default arguments.
    pub args: Option<Vec<String>>,
    /// Environment variables, as `KEY=value` entries.
    pub env_vars: Option<Vec<String>>,
    /// Platforms the script may run on.
    pub supported_platforms: Option<Vec<String>>,
    /// Usage hint shown next to the script.
    pub syntax: Option<String>,
}

impl From<ScriptRecord> for ScriptData {
    fn from(record: ScriptRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            description: string_for_data_source(record.description),
            shell: record.shell,
            script_type: record.script_type,
            category: string_for_data_source(record.category),
            filename: string_for_data_source(record.filename),
            script_body: record.script_body,
            script_hash: string_for_data_source(record.script_hash),
            default_timeout: record.default_timeout,
            favorite: record.favorite,
            hidden: record.hidden,
            run_as_user: record.run_as_user,
            args: list_for_data_source(record.args),
            env_vars: list_for_data_source(record.env_vars),
            supported_platforms: list_for_data_source(record.supported_platforms),
            syntax: string_for_data_source(record.syntax),
        }
    }
}

/// Looks up one script by id or name.
#[derive(Debug, Clone)]
pub struct ScriptDataSource {
    client: ApiClient,
}

#[async_trait]
impl DataSourceAdapter for ScriptDataSource {
    type Query = ScriptQuery;
    type Output = ScriptData;

    const TYPE_NAME: &'static str = "tacticalrmm_script";

    fn new(client: ApiClient) -> Self {
        Self { client }
    }

    fn schema() -> Schema {
        Schema::v0()
            .with_description("Look up a single Tactical RMM script by ID or name.")
            .with_attribute(
                "id",
                Attribute::optional_computed_int64()
                    .with_description("Script identifier. Takes precedence over name."),
            )
            .with_attribute(
                "name",
                Attribute::optional_computed_string().with_description("Script name."),
            )
            .with_attribute("description", Attribute::computed_string())
            .with_attribute("shell", Attribute::computed_string())
            .with_attribute("script_type", Attribute::computed_string())
            .with_attribute("category", Attribute::computed_string())
            .with_attribute("filename", Attribute::computed_string())
            .with_attribute("script_body", Attribute::computed_string())
            .with_attribute("script_hash", Attribute::computed_string())
            .with_attribute("default_timeout", Attribute::computed_int64())
            .with_attribute("favorite", Attribute::computed_bool())
            .with_attribute("hidden", Attribute::computed_bool())
            .with_attribute("run_as_user", Attribute::computed_bool())
            .with_attribute("args", Attribute::computed_string_list())
            .with_attribute("env_vars", Attribute::computed_string_list())
            .with_attribute("supported_platforms", Attribute::computed_string_list())
            .with_attribute("syntax", Attribute::computed_string())
    }

    fn check(config: &Value, diagnostics: &mut Vec<Diagnostic>) {
        check_lookup_key(config, KIND, diagnostics);
    }

    #[instrument(skip(self), fields(data_source = Self::TYPE_NAME))]
    async fn read(&self, query: ScriptQuery) -> Result<ScriptData> {
        let lookup = Lookup::resolve(query.id, query.name, KIND)?;
        let id = match &lookup {
            Lookup::Id(id) => *id,
            Lookup::Name(name) => {
                let scripts = list_scripts(&self.client).await?;
                api::find_unique_by_name(&scripts, name)?
                    .map(|s| s.id)
                    .ok_or_else(|| lookup.not_found(KIND))?
            }
        };

        // The listing omits the body, so name matches are re-read by id too.
        let record = get_script(&self.client, id)
            .await?
            .ok_or_else(|| lookup.not_found(KIND))?;
        debug!(id = record.id, "Script found");
        Ok(record.into())
    }
}

/// Filters for the script listing.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ScriptsQuery {
    /// Exact identifier.
    pub id: Option<i64>,
    /// Exact name.
    pub name: Option<String>,
    /// Keep scripts of this type.
    pub script_type: Option<String>,
    /// Keep scripts for this shell.
    pub shell: Option<String>,
    /// Keep scripts in this category.
    pub category: Option<String>,
    /// Keep scripts with this hidden flag.
    pub hidden: Option<bool>,
    /// Keep scripts with this favorite flag.
    pub favorite: Option<bool>,
    /// Keep scripts supporting this platform.
    pub platform: Option<String>,
}

impl ScriptsQuery {
    fn matches(&self, script: &ScriptRecord) -> bool {
        fn eq<T: PartialEq>(filter: &Option<T>, value: &T) -> bool {
            filter.as_ref().map_or(true, |f| f == value)
        }

        eq(&self.name, &script.name)
            && eq(&self.script_type, &script.script_type)
            && eq(&self.shell, &script.shell)
            && self
                .category
                .as_ref()
                .map_or(true, |c| script.category.as_ref() == Some(c))
            && eq(&self.hidden, &script.hidden)
            && eq(&self.favorite, &script.favorite)
            && self.platform.as_ref().map_or(true, |p| {
                script
                    .supported_platforms
                    .as_ref()
                    .is_some_and(|platforms| platforms.contains(p))
            })
    }

    /// Apply the filters. An `id` filter short-circuits all others.
    pub fn apply(&self, scripts: Vec<ScriptRecord>) -> Vec<ScriptRecord> {
        match self.id {
            Some(id) => scripts.into_iter().find(|s| s.id == id).into_iter().collect(),
            None => scripts.into_iter().filter(|s| self.matches(s)).collect(),
        }
    }
}

/// A script as exposed in the listing; the list endpoint has no body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScriptSummary {
    /// Server-assigned identifier.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Interpreter the script runs under.
    pub shell: String,
    /// `userdefined` or `builtin`.
    pub script_type: String,
    /// Category shown in the script manager.
    pub category: Option<String>,
    /// Backing file name, set for community scripts.
    pub filename: Option<String>,
    /// Run timeout in seconds.
    pub default_timeout: i64,
    /// Shown among favorites.
    pub favorite: bool,
    /// Hidden from script lists.
    pub hidden: bool,
    /// Run in the logged-on user's session instead of as SYSTEM.
    pub run_as_user: bool,
    /// Default arguments.
    pub args: Option<Vec<String>>,
    /// Environment variables, as `KEY=value` entries.
    pub env_vars: Option<Vec<String>>,
    /// Platforms the script may run on.
    pub supported_platforms: Option<Vec<String>>,
    /// Usage hint shown next to the script.
    pub syntax: Option<String>,
}

impl From<ScriptRecord> for ScriptSummary {
    fn from(record: ScriptRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            description: string_for_data_source(record.description),
            shell: record.shell,
            script_type: record.script_type,
            category: string_for_data_source(record.category),
            filename: string_for_data_source(record.filename),
            default_timeout: record.default_timeout,
            favorite: record.favorite,
            hidden: record.hidden,
            run_as_user: record.run_as_user,
            args: list_for_data_source(record.args),
            env_vars: list_for_data_source(record.env_vars),
            supported_platforms: list_for_data_source(record.supported_platforms),
            syntax: string_for_data_source(record.syntax),
        }
    }
}

/// Result of the script listing: the filters echoed back plus the matches.
#[derive(Debug, Clone, Serialize)]
pub struct ScriptsData {
    /// The filters as given.
    #[serde(flatten)]
    pub query: ScriptsQuery,
    /// Matching scripts.
    pub scripts: Vec<ScriptSummary>,
}

/// Lists scripts, optionally filtered.
#[derive(Debug, Clone)]
pub struct ScriptsDataSource {
    client: ApiClient,
}

#[async_trait]
impl DataSourceAdapter for ScriptsDataSource {
    type Query = ScriptsQuery;
    type Output = ScriptsData;

    const TYPE_NAME: &'static str = "tacticalrmm_scripts";

    fn new(client: ApiClient) -> Self {
        Self { client }
    }

    fn schema() -> Schema {
        let summary = AttributeType::object([
            ("id", AttributeType::Int64),
            ("name", AttributeType::String),
            ("description", AttributeType::String),
            ("shell", AttributeType::String),
            ("script_type", AttributeType::String),
            ("category", AttributeType::String),
            ("filename", AttributeType::String),
            ("default_timeout", AttributeType::Int64),
            ("favorite", AttributeType::Bool),
            ("hidden", AttributeType::Bool),
            ("run_as_user", AttributeType::Bool),
            ("args", AttributeType::string_list()),
            ("env_vars", AttributeType::string_list()),
            ("supported_platforms", AttributeType::string_list()),
            ("syntax", AttributeType::String),
        ]);

        Schema::v0()
            .with_description(
                "List Tactical RMM scripts, optionally filtered. The list endpoint does not \
                 return script_body.",
            )
            .with_attribute(
                "id",
                Attribute::optional_int64()
                    .with_description(
                        "Return only the script with this ID; other filters are ignored.",
                    ),
            )
            .with_attribute(
                "name",
                Attribute::optional_string().with_description("Filter by exact name."),
            )
            .with_attribute(
                "script_type",
                Attribute::optional_string()
                    .with_description("Filter by type (userdefined or builtin)."),
            )
            .with_attribute(
                "shell",
                Attribute::optional_string().with_description("Filter by shell."),
            )
            .with_attribute(
                "category",
                Attribute::optional_string().with_description("Filter by category."),
            )
            .with_attribute(
                "hidden",
                Attribute::optional_bool().with_description("Filter by hidden status."),
            )
            .with_attribute(
                "favorite",
                Attribute::optional_bool().with_description("Filter by favorite status."),
            )
            .with_attribute(
                "platform",
                Attribute::optional_string()
                    .with_description("Return scripts whose supported platforms include this one."),
            )
            .with_attribute(
                "scripts",
                Attribute::new(AttributeType::list(summary), AttributeFlags::computed())
                    .with_description("Matching scripts, in server order."),
            )
    }

    fn check(config: &Value, diagnostics: &mut Vec<Diagnostic>) {
        check_one_of(config, "shell", SHELLS, diagnostics);
        check_one_of(config, "script_type", SCRIPT_TYPES, diagnostics);
    }

    #[instrument(skip(self), fields(data_source = Self::TYPE_NAME))]
    async fn read(&self, query: ScriptsQuery) -> Result<ScriptsData> {
        let scripts = query.apply(list_scripts(&self.client).await?);
        debug!(count = scripts.len(), "Scripts filtered");
        Ok(ScriptsData {
            scripts: scripts.into_iter().map(Into::into).collect(),
            query,
        })
    }
}
