//! Wire records for the Tactical RMM REST API.
//!
//! Responses decode into these types strictly: a missing required field or a
//! mistyped value is a decode error, never a silently defaulted zero value.
//! Request bodies omit unset optional fields entirely.

use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, Result};

/// Shells a script or snippet may run under.
pub const SHELLS: &[&str] = &["powershell", "cmd", "python", "shell", "nushell", "deno"];

/// Script types the server distinguishes.
pub const SCRIPT_TYPES: &[&str] = &["userdefined", "builtin"];

/// Script type sent on create; the server owns the field afterwards.
pub const USER_DEFINED: &str = "userdefined";

/// Timeout sent on create when none is configured, in seconds.
pub const DEFAULT_SCRIPT_TIMEOUT: i64 = 90;

/// Shell assumed for snippets that do not set one.
pub const DEFAULT_SNIPPET_SHELL: &str = "powershell";

/// Collection endpoint for scripts.
pub const SCRIPTS_PATH: &str = "/scripts/";

/// Collection endpoint for script snippets.
pub const SNIPPETS_PATH: &str = "/scripts/snippets/";

/// Collection endpoint for keystore entries. There is no per-id GET.
pub const KEYSTORE_PATH: &str = "/core/keystore/";

/// Entity endpoint under a collection, e.g. `/scripts/7/`.
pub fn entity_path(collection: &str, id: i64) -> String {
    format!("{}{}/", collection, id)
}

/// Common view over the records the API lists.
pub trait Record {
    /// Human-readable entity kind used in error titles, e.g. "Script".
    const KIND: &'static str;

    /// Server-assigned identifier.
    fn id(&self) -> i64;

    /// Record name.
    fn name(&self) -> &str;
}

/// Find a record by id in a listing.
pub fn find_by_id<T: Record>(records: &[T], id: i64) -> Option<&T> {
    records.iter().find(|r| r.id() == id)
}

/// Find the single record named `name` in a listing.
///
/// Returns `Ok(None)` when nothing matches and [`ProviderError::Ambiguous`]
/// when several records share the name.
pub fn find_unique_by_name<'a, T: Record>(records: &'a [T], name: &str) -> Result<Option<&'a T>> {
    let mut matches = records.iter().filter(|r| r.name() == name);
    let first = matches.next();
    let rest = matches.count();
    if rest > 0 {
        return Err(ProviderError::Ambiguous {
            kind: T::KIND,
            name: name.to_string(),
            matches: rest + 1,
        });
    }
    Ok(first)
}

/// A script as returned by `GET /scripts/` and `GET /scripts/{id}/`.
///
/// The list endpoint leaves out `script_body` and `script_hash`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScriptRecord {
    /// Server-assigned identifier.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Interpreter the script runs under.
    pub shell: String,
    /// `userdefined` or `builtin`.
    pub script_type: String,
    /// Run timeout in seconds.
    pub default_timeout: i64,
    /// Shown among favorites.
    pub favorite: bool,
    /// Hidden from script lists.
    pub hidden: bool,
    /// Run in the logged-on user's session instead of as SYSTEM.
    pub run_as_user: bool,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Category shown in the script manager.
    #[serde(default)]
    pub category: Option<String>,
    /// Backing file name, set for community scripts.
    #[serde(default)]
    pub filename: Option<String>,
    /// Script source.
    #[serde(default)]
    pub script_body: Option<String>,
    /// Hash of the script body as computed by the server.
    #[serde(default)]
    pub script_hash: Option<String>,
    /// Usage hint shown next to the script.
    #[serde(default)]
    pub syntax: Option<String>,
    /// Default arguments.
    #[serde(default)]
    pub args: Option<Vec<String>>,
    /// Environment variables, as `KEY=value` entries.
    #[serde(default)]
    pub env_vars: Option<Vec<String>>,
    /// Platforms the script may run on.
    #[serde(default)]
    pub supported_platforms: Option<Vec<String>>,
}

impl Record for ScriptRecord {
    const KIND: &'static str = "Script";

    fn id(&self) -> i64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Body for `POST /scripts/` and `PUT /scripts/{id}/`.
///
/// `script_type` is only ever sent on create.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ScriptWrite {
    /// Display name.
    pub name: String,
    /// Interpreter the script runs under.
    pub shell: String,
    /// Script source.
    pub script_body: String,
    /// Sent on create only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_type: Option<String>,
    /// Free-form description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Category shown in the script manager.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Run timeout in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_timeout: Option<i64>,
    /// Shown among favorites.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorite: Option<bool>,
    /// Hidden from script lists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    /// Run in the logged-on user's session instead of as SYSTEM.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_as_user: Option<bool>,
    /// Usage hint shown next to the script.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub syntax: Option<String>,
    /// Default arguments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    /// Environment variables, as `KEY=value` entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env_vars: Option<Vec<String>>,
    /// Platforms the script may run on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported_platforms: Option<Vec<String>>,
}

/// A script snippet as returned by the snippets endpoints.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SnippetRecord {
    /// Server-assigned identifier.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Snippet source, substituted wherever the snippet is referenced.
    pub code: String,
    /// Interpreter the script runs under.
    pub shell: String,
    /// Short description.
    #[serde(default)]
    pub desc: Option<String>,
}

impl Record for SnippetRecord {
    const KIND: &'static str = "Script Snippet";

    fn id(&self) -> i64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Body for snippet create and update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnippetWrite {
    /// Display name.
    pub name: String,
    /// Snippet source, substituted wherever the snippet is referenced.
    pub code: String,
    /// Interpreter the script runs under.
    pub shell: String,
    /// Short description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
}

/// A keystore entry as returned by `GET /core/keystore/`.
#[derive(Clone, PartialEq, Deserialize)]
pub struct KeystoreRecord {
    /// Server-assigned identifier.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Secret value.
    pub value: String,
}

impl std::fmt::Debug for KeystoreRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeystoreRecord")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("value", &"<redacted>")
            .finish()
    }
}

impl Record for KeystoreRecord {
    const KIND: &'static str = "KeyStore Entry";

    fn id(&self) -> i64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Body for keystore create and update.
#[derive(Clone, PartialEq, Serialize)]
pub struct KeystoreWrite {
    /// Display name.
    pub name: String,
    /// Secret value.
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keystore(id: i64, name: &str) -> KeystoreRecord {
        KeystoreRecord {
            id,
            name: name.to_string(),
            value: "v".to_string(),
        }
    }

    #[test]
    fn test_script_record_from_listing() {
        let record: ScriptRecord = serde_json::from_value(json!({
            "id": 4,
            "name": "Clear temp",
            "shell": "powershell",
            "script_type": "userdefined",
            "default_timeout": 90,
            "favorite": false,
            "hidden": false,
            "run_as_user": false,
            "category": null,
            "filename": null,
            "args": [],
            "supported_platforms": ["windows"]
        }))
        .unwrap();

        assert_eq!(record.id, 4);
        assert!(record.script_body.is_none());
        assert!(record.category.is_none());
        assert_eq!(record.args, Some(vec![]));
        assert!(record.env_vars.is_none());
    }

    #[test]
    fn test_script_record_rejects_mistyped_fields() {
        let err = serde_json::from_value::<ScriptRecord>(json!({
            "id": "4",
            "name": "x",
            "shell": "cmd",
            "script_type": "userdefined",
            "default_timeout": 90,
            "favorite": false,
            "hidden": false,
            "run_as_user": false
        }));
        assert!(err.is_err());

        let err = serde_json::from_value::<ScriptRecord>(json!({
            "id": 4,
            "name": "x",
            "shell": "cmd"
        }));
        assert!(err.is_err());
    }

    #[test]
    fn test_script_write_omits_unset_fields() {
        let body = ScriptWrite {
            name: "X".into(),
            shell: "powershell".into(),
            script_body: "Write-Output 1".into(),
            default_timeout: Some(DEFAULT_SCRIPT_TIMEOUT),
            args: Some(vec![]),
            ..Default::default()
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "X",
                "shell": "powershell",
                "script_body": "Write-Output 1",
                "default_timeout": 90,
                "args": []
            })
        );
    }

    #[test]
    fn test_snippet_write_uses_desc() {
        let body = SnippetWrite {
            name: "helper".into(),
            code: "echo 1".into(),
            shell: DEFAULT_SNIPPET_SHELL.into(),
            desc: Some("a helper".into()),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["desc"], "a helper");
        assert!(value.get("description").is_none());
    }

    #[test]
    fn test_keystore_debug_redacts_value() {
        let rendered = format!("{:?}", keystore(1, "k"));
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("\"v\""));
    }

    #[test]
    fn test_find_by_id_and_name() {
        let records = vec![keystore(1, "a"), keystore(2, "b"), keystore(3, "b")];

        assert_eq!(find_by_id(&records, 2).map(|r| r.name.as_str()), Some("b"));
        assert!(find_by_id(&records, 9).is_none());

        assert_eq!(find_unique_by_name(&records, "a").unwrap().map(|r| r.id), Some(1));
        assert!(find_unique_by_name(&records, "c").unwrap().is_none());

        let err = find_unique_by_name(&records, "b").unwrap_err();
        match err {
            ProviderError::Ambiguous { kind, matches, .. } => {
                assert_eq!(kind, "KeyStore Entry");
                assert_eq!(matches, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_entity_path() {
        assert_eq!(entity_path(SCRIPTS_PATH, 7), "/scripts/7/");
        assert_eq!(entity_path(KEYSTORE_PATH, 2), "/core/keystore/2/");
    }
}
