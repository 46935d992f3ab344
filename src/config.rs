//! Provider configuration.
//!
//! Each setting resolves in order: explicit provider configuration, then the
//! matching environment variable, then the built-in default. The result is an
//! immutable [`ClientConfig`] handed to every adapter at configure time.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ProviderError, Result};
use crate::schema::{Attribute, Schema};

/// Endpoint used when neither configuration nor environment provides one.
pub const DEFAULT_ENDPOINT: &str = "https://api.tactical-rmm.com";

/// Environment variable consulted for the API endpoint.
pub const ENV_ENDPOINT: &str = "TRMM_ENDPOINT";

/// Environment variable consulted for the API key.
pub const ENV_API_KEY: &str = "TRMM_API_KEY";

/// Environment variable consulted for the request timeout in seconds.
pub const ENV_REQUEST_TIMEOUT: &str = "TRMM_REQUEST_TIMEOUT";

/// Raw provider block as written by the user. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the Tactical RMM API.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// API key sent as `X-API-KEY`.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Upper bound for each HTTP request, in seconds.
    #[serde(default)]
    pub request_timeout: Option<i64>,
}

/// Resolved, immutable settings for the transport client.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL without a trailing slash.
    pub base_url: String,
    /// API key attached to every request.
    pub api_key: String,
    /// Optional per-request timeout.
    pub timeout: Option<Duration>,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ProviderConfig {
    /// Decode the provider block from its JSON form. `null` means "nothing set".
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value).map_err(|e| {
            ProviderError::Validation(format!("invalid provider configuration: {}", e))
        })
    }

    /// Resolve against the process environment.
    pub fn resolve(self) -> Result<ClientConfig> {
        self.resolve_with(|key| std::env::var(key).ok())
    }

    /// Resolve using `lookup` for environment values.
    pub fn resolve_with<F>(self, lookup: F) -> Result<ClientConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = non_empty(self.endpoint)
            .or_else(|| non_empty(lookup(ENV_ENDPOINT)))
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        let api_key = non_empty(self.api_key)
            .or_else(|| non_empty(lookup(ENV_API_KEY)))
            .ok_or_else(|| {
                ProviderError::Configuration(format!(
                    "The provider cannot create the Tactical RMM API client as there is a missing \
                     or empty value for the API key. Set the api_key value in the configuration or \
                     use the {} environment variable. If either is already set, ensure the value \
                     is not empty.",
                    ENV_API_KEY
                ))
            })?;

        let timeout_secs = match self.request_timeout {
            Some(secs) => Some(secs),
            None => match non_empty(lookup(ENV_REQUEST_TIMEOUT)) {
                Some(raw) => Some(raw.trim().parse::<i64>().map_err(|_| {
                    ProviderError::Validation(format!(
                        "{} must be an integer number of seconds, got '{}'",
                        ENV_REQUEST_TIMEOUT, raw
                    ))
                })?),
                None => None,
            },
        };

        let timeout = match timeout_secs {
            Some(secs) if secs <= 0 => {
                return Err(ProviderError::Validation(format!(
                    "request_timeout must be positive, got {}",
                    secs
                )))
            }
            Some(secs) => Some(Duration::from_secs(secs as u64)),
            None => None,
        };

        Ok(ClientConfig {
            base_url: endpoint.trim_end_matches('/').to_string(),
            api_key,
            timeout,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Schema of the provider block.
pub fn provider_schema() -> Schema {
    Schema::v0()
        .with_description("The Tactical RMM provider allows you to manage Tactical RMM resources.")
        .with_attribute(
            "endpoint",
            Attribute::optional_string().with_description(format!(
                "The Tactical RMM API endpoint. Can also be set via the {} environment variable.",
                ENV_ENDPOINT
            )),
        )
        .with_attribute(
            "api_key",
            Attribute::optional_string()
                .sensitive()
                .with_description(format!(
                    "The Tactical RMM API key. Can also be set via the {} environment variable.",
                    ENV_API_KEY
                )),
        )
        .with_attribute(
            "request_timeout",
            Attribute::optional_int64().with_description(format!(
                "Timeout in seconds applied to each API request. Can also be set via the {} \
                 environment variable.",
                ENV_REQUEST_TIMEOUT
            )),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_explicit_values_win() {
        let config = ProviderConfig {
            endpoint: Some("https://rmm.example.com/api/".into()),
            api_key: Some("explicit".into()),
            request_timeout: Some(30),
        };
        let resolved = config
            .resolve_with(env(&[(ENV_API_KEY, "from-env"), (ENV_ENDPOINT, "https://env")]))
            .unwrap();

        assert_eq!(resolved.base_url, "https://rmm.example.com/api");
        assert_eq!(resolved.api_key, "explicit");
        assert_eq!(resolved.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_environment_fallback() {
        let resolved = ProviderConfig::default()
            .resolve_with(env(&[
                (ENV_API_KEY, "from-env"),
                (ENV_ENDPOINT, "https://env.example.com"),
                (ENV_REQUEST_TIMEOUT, "15"),
            ]))
            .unwrap();

        assert_eq!(resolved.base_url, "https://env.example.com");
        assert_eq!(resolved.api_key, "from-env");
        assert_eq!(resolved.timeout, Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_default_endpoint() {
        let config = ProviderConfig {
            api_key: Some("key".into()),
            endpoint: Some("   ".into()),
            ..Default::default()
        };
        let resolved = config.resolve_with(env(&[])).unwrap();
        assert_eq!(resolved.base_url, DEFAULT_ENDPOINT);
        assert_eq!(resolved.timeout, None);
    }

    #[test]
    fn test_missing_api_key_is_fatal() {
        let err = ProviderConfig::default()
            .resolve_with(env(&[(ENV_ENDPOINT, "https://env")]))
            .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
        assert_eq!(err.summary(), "Missing API Key");

        let config = ProviderConfig {
            api_key: Some(String::new()),
            ..Default::default()
        };
        assert!(config.resolve_with(env(&[])).is_err());
    }

    #[test]
    fn test_invalid_timeout() {
        let config = ProviderConfig {
            api_key: Some("key".into()),
            request_timeout: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            config.resolve_with(env(&[])),
            Err(ProviderError::Validation(_))
        ));

        let result = ProviderConfig {
            api_key: Some("key".into()),
            ..Default::default()
        }
        .resolve_with(env(&[(ENV_REQUEST_TIMEOUT, "soon")]));
        assert!(matches!(result, Err(ProviderError::Validation(_))));
    }

    #[test]
    fn test_from_value() {
        let config = ProviderConfig::from_value(json!({
            "endpoint": "https://x",
            "api_key": null
        }))
        .unwrap();
        assert_eq!(config.endpoint.as_deref(), Some("https://x"));
        assert_eq!(config.api_key, None);

        assert_eq!(
            ProviderConfig::from_value(serde_json::Value::Null).unwrap(),
            ProviderConfig::default()
        );
        assert!(ProviderConfig::from_value(json!({"request_timeout": "ten"})).is_err());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let resolved = ProviderConfig {
            api_key: Some("super-secret".into()),
            ..Default::default()
        }
        .resolve_with(env(&[]))
        .unwrap();
        let rendered = format!("{:?}", resolved);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
