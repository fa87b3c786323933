pub mod registration;
pub mod resolver;
pub mod transform;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

/// Outbound intent of a mapping. The wire name doubles as the legacy
/// `api_action`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncType {
    #[default]
    ContactSync,
    ContactAdd,
}

impl SyncType {
    pub fn action(&self) -> &'static str {
        match self {
            SyncType::ContactSync => "contact_sync",
            SyncType::ContactAdd => "contact_add",
        }
    }

    pub fn from_action(action: &str) -> Option<Self> {
        match action {
            "contact_sync" => Some(SyncType::ContactSync),
            "contact_add" => Some(SyncType::ContactAdd),
            _ => None,
        }
    }
}

impl std::fmt::Display for SyncType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.action())
    }
}

/// Declared kind of a remote field. Only `Text Input` has dedicated handling;
/// every other kind is carried verbatim so it survives a load/save cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldKind {
    #[default]
    TextInput,
    Other(String),
}

pub const TEXT_INPUT: &str = "Text Input";

impl From<String> for FieldKind {
    fn from(kind: String) -> Self {
        if kind == TEXT_INPUT {
            FieldKind::TextInput
        } else {
            FieldKind::Other(kind)
        }
    }
}

impl From<FieldKind> for String {
    fn from(kind: FieldKind) -> Self {
        match kind {
            FieldKind::TextInput => TEXT_INPUT.to_string(),
            FieldKind::Other(other) => other,
        }
    }
}

/// Where one local form field lands on the CRM contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldTarget {
    #[serde(alias = "ac_field")]
    pub field: String,
    #[serde(default, alias = "ac_type", deserialize_with = "kind_or_default")]
    pub kind: FieldKind,
}

/// `null` reads as the default kind.
fn kind_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<FieldKind, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?
        .map(FieldKind::from)
        .unwrap_or_default())
}

impl FieldTarget {
    pub fn text(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind: FieldKind::TextInput,
        }
    }
}

/// Local field key -> remote target, in declaration order.
pub type FieldMap = IndexMap<String, FieldTarget>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingDefinition {
    pub form_id: i64,
    pub list_id: String,
    pub sync_type: SyncType,
    pub field_map: FieldMap,
}

impl MappingDefinition {
    /// The JSON document persisted through the mapping store.
    pub fn to_document(&self) -> serde_json::Value {
        serde_json::json!({
            "list_id": self.list_id,
            "type": self.sync_type,
            "mapping": self.field_map,
        })
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
