//! Error types for the Tactical RMM provider.
//!
//! Every failure an adapter can hit maps onto one [`ProviderError`] variant.
//! The server turns errors into diagnostics: [`ProviderError::summary`] is the
//! short title and the `Display` output is the descriptive message.

use thiserror::Error;

/// Errors that can occur while serving provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider configuration is unusable (e.g. missing API key).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An operation arrived before `Configure` succeeded.
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    /// The HTTP call itself failed (DNS, TLS, connection refused, timeout).
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a status the caller does not accept.
    #[error("Unable to {operation}, status code: {status}{}", format_body(.body))]
    Api {
        /// What the adapter was trying to do, e.g. "create script".
        operation: String,
        /// The HTTP status code returned.
        status: u16,
        /// Response body text, when it was captured.
        body: Option<String>,
    },

    /// An API response did not match the expected record shape.
    #[error("Unable to parse {context}: {source}")]
    Decode {
        /// What was being decoded, e.g. "scripts list".
        context: String,
        /// The underlying decode failure.
        #[source]
        source: serde_json::Error,
    },

    /// Encoding or decoding of provider state failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A data source lookup matched nothing.
    #[error("{kind} with {key} not found")]
    NotFound {
        /// Entity kind, e.g. "Script".
        kind: &'static str,
        /// The lookup key, e.g. "ID 7" or "name 'backup'".
        key: String,
    },

    /// The listing issued after a create did not contain the new record.
    #[error("Unable to find created {kind} '{name}' in the subsequent listing")]
    CreatedRecordMissing {
        /// Entity kind, e.g. "script snippet".
        kind: &'static str,
        /// The name that was searched for.
        name: String,
    },

    /// A lookup that assumes unique names found several records.
    #[error("{kind} name '{name}' is ambiguous: {matches} records share it")]
    Ambiguous {
        /// Entity kind, e.g. "Script".
        kind: &'static str,
        /// The duplicated name.
        name: String,
        /// How many records matched.
        matches: usize,
    },

    /// A singular lookup named neither an id nor a name.
    #[error("Either 'id' or 'name' must be specified to look up a {}.", .kind.to_lowercase())]
    MissingIdentifier {
        /// Entity kind, e.g. "Script".
        kind: &'static str,
    },

    /// An identifier supplied for import is not an integer.
    #[error("Expected a numeric ID, got '{0}'")]
    InvalidId(String),

    /// The request itself is malformed (e.g. a lookup with no key).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration failed schema or semantic validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The requested resource or data source type is not served here.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),
}

fn format_body(body: &Option<String>) -> String {
    match body {
        Some(text) if !text.is_empty() => format!(", response: {}", text),
        _ => String::new(),
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ProviderError>;

impl ProviderError {
    /// Build an [`ProviderError::Api`] without a captured body.
    pub fn api(operation: impl Into<String>, status: u16) -> Self {
        Self::Api {
            operation: operation.into(),
            status,
            body: None,
        }
    }

    /// Build an [`ProviderError::Api`] carrying the response body text.
    pub fn api_with_body(operation: impl Into<String>, status: u16, body: String) -> Self {
        Self::Api {
            operation: operation.into(),
            status,
            body: Some(body),
        }
    }

    /// Build a [`ProviderError::Decode`] for the given context.
    pub fn decode(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            context: context.into(),
            source,
        }
    }

    /// Short diagnostic title for this error.
    pub fn summary(&self) -> String {
        match self {
            Self::Configuration(_) => "Missing API Key".to_string(),
            Self::NotConfigured(_) => "Unconfigured Provider".to_string(),
            Self::Transport(_) | Self::Api { .. } | Self::Decode { .. } => {
                "Client Error".to_string()
            }
            Self::CreatedRecordMissing { .. } => "Client Error".to_string(),
            Self::Serialization(_) => "State Error".to_string(),
            Self::NotFound { kind, .. } => format!("{} Not Found", kind),
            Self::Ambiguous { kind, .. } => format!("Ambiguous {} Name", kind),
            Self::MissingIdentifier { kind } => format!("Missing {} Identifier", kind),
            Self::InvalidId(_) => "Invalid ID".to_string(),
            Self::InvalidRequest(_) => "Invalid Request".to_string(),
            Self::Validation(_) => "Invalid Configuration".to_string(),
            Self::UnknownResource(_) => "Unknown Type".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = ProviderError::api("read script", 500);
        assert_eq!(
            format!("{}", err),
            "Unable to read script, status code: 500"
        );

        let err =
            ProviderError::api_with_body("update script", 400, "{\"name\":[\"taken\"]}".into());
        assert_eq!(
            format!("{}", err),
            "Unable to update script, status code: 400, response: {\"name\":[\"taken\"]}"
        );

        let err = ProviderError::api_with_body("update script", 400, String::new());
        assert_eq!(
            format!("{}", err),
            "Unable to update script, status code: 400"
        );
    }

    #[test]
    fn test_lookup_error_display() {
        let err = ProviderError::NotFound {
            kind: "Script",
            key: "name 'backup'".into(),
        };
        assert_eq!(format!("{}", err), "Script with name 'backup' not found");
        assert_eq!(err.summary(), "Script Not Found");

        let err = ProviderError::Ambiguous {
            kind: "Script",
            name: "dup".into(),
            matches: 2,
        };
        assert_eq!(
            format!("{}", err),
            "Script name 'dup' is ambiguous: 2 records share it"
        );

        let err = ProviderError::CreatedRecordMissing {
            kind: "keystore entry",
            name: "k".into(),
        };
        assert_eq!(
            format!("{}", err),
            "Unable to find created keystore entry 'k' in the subsequent listing"
        );
        assert_eq!(err.summary(), "Client Error");
    }

    #[test]
    fn test_summaries() {
        assert_eq!(
            ProviderError::Configuration("no key".into()).summary(),
            "Missing API Key"
        );
        assert_eq!(ProviderError::api("list scripts", 502).summary(), "Client Error");
        assert_eq!(
            ProviderError::InvalidRequest("bad id".into()).summary(),
            "Invalid Request"
        );
        let err = ProviderError::InvalidId("abc".into());
        assert_eq!(err.summary(), "Invalid ID");
        assert_eq!(err.to_string(), "Expected a numeric ID, got 'abc'");

        let err = ProviderError::MissingIdentifier { kind: "Script" };
        assert_eq!(err.summary(), "Missing Script Identifier");
        assert_eq!(
            err.to_string(),
            "Either 'id' or 'name' must be specified to look up a script."
        );
    }
}
