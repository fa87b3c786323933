//! Conversion of raw form values into the CRM wire representation, and
//! routing of remote field names onto wire keys.

use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::HashMap;

use super::FieldKind;

/// Normalized remote field name -> reserved wire key.
static RESERVED_FIELDS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("email", "email"),
        ("first_name", "first_name"),
        ("firstname", "first_name"),
        ("last_name", "last_name"),
        ("lastname", "last_name"),
        ("phone", "phone"),
        ("customer_acct_name", "customer_acct_name"),
        ("acct_name", "customer_acct_name"),
    ])
});

/// Convert one raw form value for the given field kind. Pure.
pub fn transform(raw: &Value, kind: &FieldKind) -> Value {
    match kind {
        FieldKind::TextInput => match raw {
            Value::Array(_) => first_value(raw),
            _ => raw.clone(),
        },
        // Non-text kinds are not interpreted yet.
        FieldKind::Other(_) => raw.clone(),
    }
}

/// The `value` sub-field of the first element of a multi-value container,
/// or `Null` when there is none.
pub fn first_value(raw: &Value) -> Value {
    raw.get(0)
        .and_then(|first| first.get("value"))
        .cloned()
        .unwrap_or(Value::Null)
}

/// The reserved wire key for a remote field name, if it is one.
pub fn reserved_key(remote_field: &str) -> Option<&'static str> {
    RESERVED_FIELDS
        .get(remote_field.trim().to_lowercase().as_str())
        .copied()
}

/// Legacy custom-field key: `field[%KEY%,0]`.
pub fn custom_field_key(remote_field: &str) -> String {
    format!("field[%{}%,0]", remote_field)
}

/// Wire key for a remote field: a reserved key or the custom-field template.
pub fn wire_key(remote_field: &str) -> String {
    match reserved_key(remote_field) {
        Some(key) => key.to_string(),
        None => custom_field_key(remote_field),
    }
}

/// Render a wire value as a form-encoded scalar.
pub fn wire_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => String::new(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[path = "transform_tests.rs"]
mod tests;
