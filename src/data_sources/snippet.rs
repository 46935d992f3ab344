//! `tacticalrmm_script_snippet` and `tacticalrmm_script_snippets`.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use super::{check_lookup_key, DataSourceAdapter, Lookup};
use crate::api::{self, entity_path, Record, SnippetRecord, SNIPPETS_PATH};
use crate::client::{decode_json, expect_ok, ApiClient};
use crate::error::Result;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Diagnostic, Schema};

const KIND: &str = SnippetRecord::KIND;

async fn list_snippets(client: &ApiClient) -> Result<Vec<SnippetRecord>> {
    let response = expect_ok(client.get(SNIPPETS_PATH).await?, "list script snippets")?;
    decode_json(response, "script snippets list").await
}

/// A snippet as exposed by both data sources.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnippetData {
    /// Server-assigned identifier.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Short description.
    pub desc: Option<String>,
    /// Snippet source, substituted wherever the snippet is referenced.
    pub code: String,
    /// Interpreter the script runs under.
    pub shell: String,
}

impl From<SnippetRecord> for SnippetData {
    fn from(record: SnippetRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            desc: record.desc,
            code: record.code,
            shell: record.shell,
        }
    }
}

/// Lookup key, or filters for the listing.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SnippetQuery {
    /// Exact identifier.
    pub id: Option<i64>,
    /// Exact name.
    pub name: Option<String>,
}

/// Looks up one snippet by id or name.
#[derive(Debug, Clone)]
pub struct SnippetDataSource {
    client: ApiClient,
}

#[async_trait]
impl DataSourceAdapter for SnippetDataSource {
    type Query = SnippetQuery;
    type Output = SnippetData;

    const TYPE_NAME: &'static str = "tacticalrmm_script_snippet";

    fn new(client: ApiClient) -> Self {
        Self { client }
    }

    fn schema() -> Schema {
        Schema::v0()
            .with_description("Look up a single Tactical RMM script snippet by ID or name.")
            .with_attribute(
                "id",
                Attribute::optional_computed_int64()
                    .with_description("Snippet identifier. Takes precedence over name."),
            )
            .with_attribute(
                "name",
                Attribute::optional_computed_string().with_description("Snippet name."),
            )
            .with_attribute("desc", Attribute::computed_string())
            .with_attribute("code", Attribute::computed_string())
            .with_attribute("shell", Attribute::computed_string())
    }

    fn check(config: &Value, diagnostics: &mut Vec<Diagnostic>) {
        check_lookup_key(config, KIND, diagnostics);
    }

    #[instrument(skip(self), fields(data_source = Self::TYPE_NAME))]
    async fn read(&self, query: SnippetQuery) -> Result<SnippetData> {
        let lookup = Lookup::resolve(query.id, query.name, KIND)?;
        let record = match &lookup {
            Lookup::Id(id) => {
                let response = self.client.get(&entity_path(SNIPPETS_PATH, *id)).await?;
                if response.status() == StatusCode::NOT_FOUND {
                    return Err(lookup.not_found(KIND));
                }
                let response = expect_ok(response, "read script snippet")?;
                decode_json::<SnippetRecord>(response, "script snippet").await?
            }
            Lookup::Name(name) => {
                let snippets = list_snippets(&self.client).await?;
                api::find_unique_by_name(&snippets, name)?
                    .cloned()
                    .ok_or_else(|| lookup.not_found(KIND))?
            }
        };
        debug!(id = record.id, "Script snippet found");
        Ok(record.into())
    }
}

/// Result of the snippet listing.
#[derive(Debug, Clone, Serialize)]
pub struct SnippetsData {
    /// The filters as given.
    #[serde(flatten)]
    pub query: SnippetQuery,
    /// Matching snippets.
    pub snippets: Vec<SnippetData>,
}

/// Lists snippets, optionally filtered by id or name.
#[derive(Debug, Clone)]
pub struct SnippetsDataSource {
    client: ApiClient,
}

#[async_trait]
impl DataSourceAdapter for SnippetsDataSource {
    type Query = SnippetQuery;
    type Output = SnippetsData;

    const TYPE_NAME: &'static str = "tacticalrmm_script_snippets";

    fn new(client: ApiClient) -> Self {
        Self { client }
    }

    fn schema() -> Schema {
        let snippet = AttributeType::object([
            ("id", AttributeType::Int64),
            ("name", AttributeType::String),
            ("desc", AttributeType::String),
            ("code", AttributeType::String),
            ("shell", AttributeType::String),
        ]);

        Schema::v0()
            .with_description(
                "List Tactical RMM script snippets, optionally filtered by ID or name.",
            )
            .with_attribute(
                "id",
                Attribute::optional_int64()
                    .with_description("Return only the snippet with this ID."),
            )
            .with_attribute(
                "name",
                Attribute::optional_string().with_description("Filter by exact name."),
            )
            .with_attribute(
                "snippets",
                Attribute::new(AttributeType::list(snippet), AttributeFlags::computed())
                    .with_description("Matching snippets, in server order."),
            )
    }

    #[instrument(skip(self), fields(data_source = Self::TYPE_NAME))]
    async fn read(&self, query: SnippetQuery) -> Result<SnippetsData> {
        let all = list_snippets(&self.client).await?;
        let snippets: Vec<SnippetRecord> = match (&query.id, &query.name) {
            (Some(id), _) => api::find_by_id(&all, *id).cloned().into_iter().collect(),
            (None, Some(name)) => all.into_iter().filter(|s| &s.name == name).collect(),
            (None, None) => all,
        };
        debug!(count = snippets.len(), "Script snippets filtered");
        Ok(SnippetsData {
            snippets: snippets.into_iter().map(Into::into).collect(),
            query,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::error::ProviderError;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client(server: &MockServer) -> ApiClient {
        ApiClient::new(ClientConfig {
            base_url: server.base_url(),
            api_key: "key".into(),
            timeout: None,
        })
        .unwrap()
    }

    fn mock_listing(server: &MockServer) {
        server.mock(|when, then| {
            when.method(GET).path("/scripts/snippets/");
            then.status(200).json_body(json!([
                {"id": 1, "name": "a", "desc": null, "code": "1", "shell": "cmd"},
                {"id": 2, "name": "b", "desc": "x", "code": "2", "shell": "powershell"},
                {"id": 3, "name": "b", "desc": "y", "code": "3", "shell": "python"}
            ]));
        });
    }

    #[tokio::test]
    async fn test_listing_filters() {
        let server = MockServer::start();
        mock_listing(&server);
        let source = SnippetsDataSource::new(client(&server));

        let all = source.read(SnippetQuery::default()).await.unwrap();
        assert_eq!(all.snippets.len(), 3);

        let by_name = source
            .read(SnippetQuery {
                id: None,
                name: Some("b".into()),
            })
            .await
            .unwrap();
        assert_eq!(by_name.snippets.iter().map(|s| s.id).collect::<Vec<_>>(), vec![2, 3]);

        let by_id = source
            .read(SnippetQuery {
                id: Some(3),
                name: Some("a".into()),
            })
            .await
            .unwrap();
        assert_eq!(by_id.snippets.len(), 1);
        assert_eq!(by_id.snippets[0].code, "3");
    }

    #[tokio::test]
    async fn test_singular_name_must_be_unique() {
        let server = MockServer::start();
        mock_listing(&server);
        let source = SnippetDataSource::new(client(&server));

        let found = source
            .read(SnippetQuery {
                id: None,
                name: Some("a".into()),
            })
            .await
            .unwrap();
        assert_eq!(found.id, 1);

        let err = source
            .read(SnippetQuery {
                id: None,
                name: Some("b".into()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Ambiguous { matches: 2, .. }));
        assert_eq!(err.summary(), "Ambiguous Script Snippet Name");
    }

    #[tokio::test]
    async fn test_singular_by_id() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/scripts/snippets/2/");
            then.status(200).json_body(
                json!({"id": 2, "name": "b", "desc": "x", "code": "2", "shell": "powershell"}),
            );
        });

        let found = SnippetDataSource::new(client(&server))
            .read(SnippetQuery {
                id: Some(2),
                name: Some("ignored".into()),
            })
            .await
            .unwrap();
        assert_eq!(found.name, "b");
    }
}
