//! Plan, import and metadata types exchanged with the orchestrator.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Placeholder shown instead of sensitive values in plan changes.
pub const SENSITIVE_PLACEHOLDER: &str = "(sensitive value)";

/// A change to a single attribute in a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeChange {
    /// Attribute name.
    pub path: String,
    /// Value before the change (`None` if being added).
    pub before: Option<Value>,
    /// Value after the change (`None` if being removed).
    pub after: Option<Value>,
}

impl AttributeChange {
    /// An attribute being set for the first time.
    pub fn added(path: impl Into<String>, value: Value) -> Self {
        Self {
            path: path.into(),
            before: None,
            after: Some(value),
        }
    }

    /// An attribute being cleared.
    pub fn removed(path: impl Into<String>, value: Value) -> Self {
        Self {
            path: path.into(),
            before: Some(value),
            after: None,
        }
    }

    /// An attribute changing value.
    pub fn modified(path: impl Into<String>, before: Value, after: Value) -> Self {
        Self {
            path: path.into(),
            before: Some(before),
            after: Some(after),
        }
    }

    /// Replace both sides with a placeholder, keeping their presence.
    pub fn redacted(self) -> Self {
        let mask = |v: Option<Value>| v.map(|_| Value::String(SENSITIVE_PLACEHOLDER.to_string()));
        Self {
            path: self.path,
            before: mask(self.before),
            after: mask(self.after),
        }
    }
}

impl From<crate::generated::AttributeChange> for AttributeChange {
    fn from(proto: crate::generated::AttributeChange) -> Self {
        Self {
            path: proto.path,
            before: if proto.before.is_empty() {
                None
            } else {
                serde_json::from_slice(&proto.before).ok()
            },
            after: if proto.after.is_empty() {
                None
            } else {
                serde_json::from_slice(&proto.after).ok()
            },
        }
    }
}

impl From<AttributeChange> for crate::generated::AttributeChange {
    fn from(change: AttributeChange) -> Self {
        Self {
            path: change.path,
            before: change
                .before
                .map(|v| serde_json::to_vec(&v).unwrap_or_default())
                .unwrap_or_default(),
            after: change
                .after
                .map(|v| serde_json::to_vec(&v).unwrap_or_default())
                .unwrap_or_default(),
        }
    }
}

/// The result of a plan operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    /// The state expected after apply; `null` for a destroy.
    pub planned_state: Value,
    /// Attribute-level changes.
    pub changes: Vec<AttributeChange>,
    /// Whether the resource must be destroyed and recreated.
    pub requires_replace: bool,
}

impl PlanResult {
    /// A plan with no changes.
    pub fn no_change(state: Value) -> Self {
        Self {
            planned_state: state,
            changes: Vec::new(),
            requires_replace: false,
        }
    }

    /// A plan with changes.
    pub fn with_changes(
        planned_state: Value,
        changes: Vec<AttributeChange>,
        requires_replace: bool,
    ) -> Self {
        Self {
            planned_state,
            changes,
            requires_replace,
        }
    }
}

/// A resource produced by an import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedResource {
    /// The resource type.
    pub resource_type: String,
    /// Seed state; a following Read fills in the rest.
    pub state: Value,
}

impl ImportedResource {
    /// Create a new imported resource.
    pub fn new(resource_type: impl Into<String>, state: Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            state,
        }
    }
}

/// Provider metadata returned by GetMetadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderMetadata {
    /// Resource type names.
    pub resources: Vec<String>,
    /// Data source type names.
    pub data_sources: Vec<String>,
    /// Server capabilities.
    pub capabilities: ServerCapabilities,
}

/// Server capability flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ServerCapabilities {
    /// Whether the provider plans destroy operations itself.
    pub plan_destroy: bool,
}

/// The protocol version announced in the handshake.
pub const PROTOCOL_VERSION: u32 = 1;

/// The handshake prefix printed on stdout at startup.
pub const HANDSHAKE_PREFIX: &str = "TACTICALRMM_PROVIDER";

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attribute_change_constructors() {
        let added = AttributeChange::added("name", json!("backup"));
        assert!(added.before.is_none());
        assert_eq!(added.after, Some(json!("backup")));

        let removed = AttributeChange::removed("category", json!("Maintenance"));
        assert_eq!(removed.before, Some(json!("Maintenance")));
        assert!(removed.after.is_none());
    }

    #[test]
    fn test_redacted_change() {
        let change = AttributeChange::modified("value", json!("old-secret"), json!("new-secret"))
            .redacted();
        assert_eq!(change.before, Some(json!(SENSITIVE_PLACEHOLDER)));
        assert_eq!(change.after, Some(json!(SENSITIVE_PLACEHOLDER)));

        let change = AttributeChange::added("value", json!("secret")).redacted();
        assert!(change.before.is_none());
        assert_eq!(change.after, Some(json!(SENSITIVE_PLACEHOLDER)));
    }

    #[test]
    fn test_attribute_change_conversion() {
        let change = AttributeChange::modified("default_timeout", json!(90), json!(120));

        let proto: crate::generated::AttributeChange = change.clone().into();
        assert_eq!(proto.path, "default_timeout");

        let back: AttributeChange = proto.into();
        assert_eq!(back, change);

        let proto: crate::generated::AttributeChange =
            AttributeChange::added("name", json!("x")).into();
        assert!(proto.before.is_empty());
    }

    #[test]
    fn test_plan_result() {
        let plan = PlanResult::no_change(json!({"id": 3}));
        assert!(plan.changes.is_empty());
        assert!(!plan.requires_replace);
    }

    #[test]
    fn test_imported_resource() {
        let imported = ImportedResource::new("tacticalrmm_script", json!({"id": 12}));
        assert_eq!(imported.resource_type, "tacticalrmm_script");
        assert_eq!(imported.state["id"], 12);
    }
}
