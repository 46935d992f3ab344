//! Validate JSON configuration against a [`Schema`].
//!
//! ```
//! use tacticalrmm_provider::schema::{Attribute, Schema};
//! use tacticalrmm_provider::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("name", Attribute::required_string())
//!     .with_attribute("default_timeout", Attribute::optional_int64());
//!
//! assert!(validate(&schema, &json!({"name": "backup"})).is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"name": "backup", "default_timeout": "90"}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute.as_deref(), Some("default_timeout"));
//! ```

use crate::schema::{Attribute, AttributeType, Diagnostic, Schema};
use serde_json::Value;
use std::collections::BTreeMap;

/// Validate a JSON object against a schema.
///
/// - Required attributes must be present and non-null.
/// - Computed-only attributes are skipped.
/// - Present values must match the declared type, element-wise for lists.
/// - Attributes the schema does not declare are reported.
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let obj = match value {
        Value::Object(map) => map,
        Value::Null => {
            // An absent block validates like an empty one.
            for (name, attr) in &schema.attributes {
                validate_attribute(attr, None, name, &mut diagnostics);
            }
            return diagnostics;
        }
        other => {
            diagnostics.push(
                Diagnostic::error("Expected object")
                    .with_detail(format!("Got {}", value_type_name(other))),
            );
            return diagnostics;
        }
    };

    for (name, attr) in &schema.attributes {
        validate_attribute(attr, obj.get(name), name, &mut diagnostics);
    }

    for name in obj.keys() {
        if !schema.attributes.contains_key(name) {
            diagnostics.push(
                Diagnostic::error(format!("Unsupported attribute '{}'", name))
                    .with_detail("An attribute with this name is not expected here")
                    .with_attribute(name.as_str()),
            );
        }
    }

    diagnostics
}

/// Like [`validate`], but as a `Result`.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Check a string attribute against an allowed set of values.
///
/// Absent and null values pass; type errors are left to [`validate`].
pub fn check_one_of(
    value: &Value,
    attribute: &str,
    allowed: &[&str],
    diagnostics: &mut Vec<Diagnostic>,
) {
    if let Some(s) = value.get(attribute).and_then(Value::as_str) {
        if !allowed.contains(&s) {
            diagnostics.push(
                Diagnostic::error(format!("Invalid value for attribute '{}'", attribute))
                    .with_detail(format!(
                        "Expected one of {}, got '{}'",
                        allowed.join(", "),
                        s
                    ))
                    .with_attribute(attribute),
            );
        }
    }
}

/// Check a string attribute's length in characters.
pub fn check_max_len(
    value: &Value,
    attribute: &str,
    max: usize,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if let Some(s) = value.get(attribute).and_then(Value::as_str) {
        let len = s.chars().count();
        if len > max {
            diagnostics.push(
                Diagnostic::error(format!("Attribute '{}' is too long", attribute))
                    .with_detail(format!("At most {} characters allowed, got {}", max, len))
                    .with_attribute(attribute),
            );
        }
    }
}

/// Check an int64 attribute is strictly positive.
pub fn check_positive(value: &Value, attribute: &str, diagnostics: &mut Vec<Diagnostic>) {
    if let Some(n) = value.get(attribute).and_then(Value::as_i64) {
        if n <= 0 {
            diagnostics.push(
                Diagnostic::error(format!("Invalid value for attribute '{}'", attribute))
                    .with_detail(format!("Must be greater than zero, got {}", n))
                    .with_attribute(attribute),
            );
        }
    }
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if attr.flags.computed && !attr.flags.optional && !attr.flags.required {
        return;
    }

    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        }
        Some(v) => validate_type(&attr.attr_type, v, path, diagnostics),
    }
}

fn validate_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match attr_type {
        AttributeType::String => {
            if !value.is_string() {
                diagnostics.push(type_error(path, "string", value));
            }
        }
        AttributeType::Int64 => {
            if value.as_i64().is_none() {
                diagnostics.push(type_error(path, "int64", value));
            }
        }
        AttributeType::Bool => {
            if !value.is_boolean() {
                diagnostics.push(type_error(path, "bool", value));
            }
        }
        AttributeType::List(element_type) => match value.as_array() {
            Some(items) => {
                for (i, item) in items.iter().enumerate() {
                    validate_type(element_type, item, &format!("{}.{}", path, i), diagnostics);
                }
            }
            None => diagnostics.push(type_error(path, "list", value)),
        },
        AttributeType::Object(attrs) => match value.as_object() {
            Some(obj) => validate_object(attrs, obj, path, diagnostics),
            None => diagnostics.push(type_error(path, "object", value)),
        },
    }
}

fn validate_object(
    attrs: &BTreeMap<String, AttributeType>,
    obj: &serde_json::Map<String, Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for (name, attr_type) in attrs {
        if let Some(value) = obj.get(name).filter(|v| !v.is_null()) {
            validate_type(attr_type, value, &format!("{}.{}", path, name), diagnostics);
        }
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for attribute '{}'", path))
        .with_detail(format!("Expected {}, got {}", expected, value_type_name(got)))
        .with_attribute(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, Schema};
    use serde_json::json;

    fn script_like() -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_int64())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("favorite", Attribute::optional_computed_bool())
            .with_attribute("args", Attribute::optional_string_list())
    }

    #[test]
    fn test_required_attribute() {
        let schema = script_like();

        assert!(validate(&schema, &json!({"name": "x"})).is_empty());

        let diagnostics = validate(&schema, &json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("name"));

        let diagnostics = validate(&schema, &json!({"name": null}));
        assert_eq!(diagnostics.len(), 1);

        let diagnostics = validate(&schema, &Value::Null);
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_types() {
        let schema = script_like();

        let diagnostics = validate(&schema, &json!({"name": 3, "favorite": "yes"}));
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics.iter().all(|d| d.summary.contains("Invalid type")));

        let diagnostics = validate(&schema, &json!({"name": "x", "args": ["-v", 2]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("args.1"));

        let diagnostics = validate(&schema, &json!({"name": "x", "args": "-v"}));
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_computed_only_is_skipped() {
        let schema = script_like();
        assert!(validate(&schema, &json!({"name": "x", "id": "whatever"})).is_empty());
    }

    #[test]
    fn test_unknown_attribute() {
        let diagnostics = validate(&script_like(), &json!({"name": "x", "body": "y"}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Unsupported attribute 'body'"));
    }

    #[test]
    fn test_not_an_object() {
        let diagnostics = validate(&script_like(), &json!([1, 2]));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Expected object");
        assert!(validate_result(&script_like(), &json!("x")).is_err());
    }

    #[test]
    fn test_semantic_checks() {
        let config = json!({"shell": "bash", "name": "abcdef", "default_timeout": 0});
        let mut diagnostics = Vec::new();

        check_one_of(&config, "shell", &["powershell", "cmd"], &mut diagnostics);
        check_max_len(&config, "name", 5, &mut diagnostics);
        check_positive(&config, "default_timeout", &mut diagnostics);
        assert_eq!(diagnostics.len(), 3);

        let mut diagnostics = Vec::new();
        check_one_of(&json!({}), "shell", &["cmd"], &mut diagnostics);
        check_max_len(&json!({"name": "ok"}), "name", 5, &mut diagnostics);
        check_positive(&json!({"default_timeout": 90}), "default_timeout", &mut diagnostics);
        assert!(diagnostics.is_empty());
    }
}
