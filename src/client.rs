//! Transport client for the Tactical RMM REST API.
//!
//! The client attaches the `X-API-KEY` and `Content-Type: application/json`
//! headers to every request and hands the raw response back. It does not
//! retry or classify failures; callers decide which statuses they accept.

use std::sync::Arc;

use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::config::ClientConfig;
use crate::error::{ProviderError, Result};

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "X-API-KEY";

/// Authenticated HTTP client shared by every adapter.
///
/// Cloning is cheap; clones share the connection pool and configuration.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    config: Arc<ClientConfig>,
}

impl ApiClient {
    /// Build a client from resolved configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            config: Arc::new(config),
        })
    }

    /// The configuration this client was built from.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Absolute URL for an API path such as `/scripts/`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    /// Send a request, returning the response whatever its status.
    #[instrument(skip(self, body), fields(method = %method, path = %path))]
    pub async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Response> {
        let mut request = self
            .http
            .request(method, self.url(path))
            .header(API_KEY_HEADER, &self.config.api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/json");

        if let Some(body) = body {
            request = request.body(serde_json::to_vec(body)?);
        }

        let response = request.send().await?;
        debug!(status = response.status().as_u16(), "API response received");
        Ok(response)
    }

    /// `GET path`.
    pub async fn get(&self, path: &str) -> Result<Response> {
        self.send::<()>(Method::GET, path, None).await
    }

    /// `POST path` with a JSON body.
    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response> {
        self.send(Method::POST, path, Some(body)).await
    }

    /// `PUT path` with a JSON body.
    pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response> {
        self.send(Method::PUT, path, Some(body)).await
    }

    /// `DELETE path`.
    pub async fn delete(&self, path: &str) -> Result<Response> {
        self.send::<()>(Method::DELETE, path, None).await
    }
}

/// Fail with [`ProviderError::Api`] unless the status is 200 OK.
pub fn expect_ok(response: Response, operation: &str) -> Result<Response> {
    expect_status(response, &[StatusCode::OK], operation)
}

/// Fail with [`ProviderError::Api`] unless the status is one of `accepted`.
pub fn expect_status(
    response: Response,
    accepted: &[StatusCode],
    operation: &str,
) -> Result<Response> {
    if accepted.contains(&response.status()) {
        Ok(response)
    } else {
        Err(ProviderError::api(operation, response.status().as_u16()))
    }
}

/// Like [`expect_ok`], but captures the response body into the error.
pub async fn expect_ok_with_body(response: Response, operation: &str) -> Result<Response> {
    let status = response.status();
    if status == StatusCode::OK {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::api_with_body(operation, status.as_u16(), body))
}

/// Decode a JSON response body into `T`, failing on any shape mismatch.
pub async fn decode_json<T: DeserializeOwned>(response: Response, context: &str) -> Result<T> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ProviderError::decode(context, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::time::Duration;

    fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(ClientConfig {
            base_url: server.base_url(),
            api_key: "test-key".into(),
            timeout: Some(Duration::from_secs(5)),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_headers_attached_to_every_request() {
        let server = MockServer::start();
        let get = server.mock(|when, then| {
            when.method(GET)
                .path("/scripts/")
                .header("X-API-KEY", "test-key")
                .header("Content-Type", "application/json");
            then.status(200).json_body(json!([]));
        });
        let delete = server.mock(|when, then| {
            when.method(DELETE)
                .path("/scripts/4/")
                .header("X-API-KEY", "test-key")
                .header("Content-Type", "application/json");
            then.status(204);
        });

        let client = client_for(&server);
        assert_eq!(client.get("/scripts/").await.unwrap().status(), 200);
        assert_eq!(client.delete("/scripts/4/").await.unwrap().status(), 204);

        get.assert();
        delete.assert();
    }

    #[tokio::test]
    async fn test_json_body_is_sent() {
        let server = MockServer::start();
        let post = server.mock(|when, then| {
            when.method(POST)
                .path("/core/keystore/")
                .json_body(json!({"name": "k", "value": "v"}));
            then.status(200).body("ok");
        });

        let client = client_for(&server);
        let response = client
            .post("/core/keystore/", &json!({"name": "k", "value": "v"}))
            .await
            .unwrap();
        assert!(expect_ok(response, "create keystore entry").is_ok());
        post.assert();
    }

    #[tokio::test]
    async fn test_status_helpers() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(PUT).path("/scripts/1/");
            then.status(400).body("{\"shell\":[\"invalid\"]}");
        });
        server.mock(|when, then| {
            when.method(GET).path("/scripts/1/");
            then.status(500);
        });

        let client = client_for(&server);

        let response = client.put("/scripts/1/", &json!({})).await.unwrap();
        let err = expect_ok_with_body(response, "update script").await.unwrap_err();
        match err {
            ProviderError::Api { status, body, .. } => {
                assert_eq!(status, 400);
                assert_eq!(body.as_deref(), Some("{\"shell\":[\"invalid\"]}"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let response = client.get("/scripts/1/").await.unwrap();
        let err = expect_ok(response, "read script").unwrap_err();
        assert_eq!(err.to_string(), "Unable to read script, status code: 500");
    }

    #[tokio::test]
    async fn test_decode_json_fails_fast() {
        #[derive(Debug, serde::Deserialize)]
        struct Entry {
            #[allow(dead_code)]
            id: i64,
        }

        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/core/keystore/");
            then.status(200).json_body(json!([{"id": "seven"}]));
        });

        let client = client_for(&server);
        let response = client.get("/core/keystore/").await.unwrap();
        let err = decode_json::<Vec<Entry>>(response, "keystore entries")
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Decode { .. }));
        assert!(err.to_string().starts_with("Unable to parse keystore entries"));
    }

    #[tokio::test]
    async fn test_transport_error_surfaces() {
        let client = ApiClient::new(ClientConfig {
            base_url: "http://127.0.0.1:1".into(),
            api_key: "k".into(),
            timeout: Some(Duration::from_secs(2)),
        })
        .unwrap();
        let err = client.get("/scripts/").await.unwrap_err();
        assert!(matches!(err, ProviderError::Transport(_)));
    }

    #[test]
    fn test_url_join() {
        let client = ApiClient::new(ClientConfig {
            base_url: "https://rmm.example.com".into(),
            api_key: "k".into(),
            timeout: None,
        })
        .unwrap();
        assert_eq!(client.url("/scripts/3/"), "https://rmm.example.com/scripts/3/");
    }
}
