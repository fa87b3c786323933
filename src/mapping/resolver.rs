use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use super::{FieldMap, FieldTarget, MappingDefinition, SyncType};
use crate::error::{Result, SyncError};
use crate::integrations::id_string;
use crate::storage::{FormRegistry, MappingStore};

/// Stored document shape. Unknown keys are ignored.
#[derive(Debug, Deserialize)]
struct MappingDocument {
    #[serde(default)]
    list_id: Value,
    #[serde(default, rename = "type")]
    sync_type: Option<SyncType>,
    #[serde(default)]
    mapping: Option<IndexMap<String, Value>>,
}

/// Looks up and validates the mapping attached to a host form.
#[derive(Clone)]
pub struct MappingResolver {
    forms: Arc<dyn FormRegistry>,
    mappings: Arc<dyn MappingStore>,
}

impl MappingResolver {
    pub fn new(forms: Arc<dyn FormRegistry>, mappings: Arc<dyn MappingStore>) -> Self {
        Self { forms, mappings }
    }

    pub fn resolve(&self, form_key: &str) -> Result<MappingDefinition> {
        let form_id = self.form_id(form_key)?;

        let documents = self.mappings.mapping_documents(form_id)?;
        let document = documents.first().ok_or_else(|| {
            SyncError::NotFound(format!("no mapping stored for form {} ({})", form_key, form_id))
        })?;

        parse_document(form_id, document)
    }

    /// Store a mapping for a registered form, replacing any previous one.
    pub fn save(
        &self,
        form_key: &str,
        list_id: &str,
        sync_type: SyncType,
        field_map: FieldMap,
    ) -> Result<bool> {
        if list_id.trim().is_empty() {
            return Err(SyncError::Validation("list id is required".to_string()));
        }
        let form_id = self.form_id(form_key)?;
        let definition = MappingDefinition {
            form_id,
            list_id: list_id.trim().to_string(),
            sync_type,
            field_map,
        };
        let document = serde_json::to_string_pretty(&definition.to_document())?;
        self.mappings.save_mapping(form_id, &document)
    }

    fn form_id(&self, form_key: &str) -> Result<i64> {
        self.forms
            .form_id(form_key)?
            .ok_or_else(|| SyncError::NotFound(format!("form {} is not registered", form_key)))
    }
}

pub fn parse_document(form_id: i64, raw: &str) -> Result<MappingDefinition> {
    let document: MappingDocument = serde_json::from_str(raw)
        .map_err(|e| SyncError::InvalidMapping(format!("form {}: {}", form_id, e)))?;

    let list_id = id_string(&document.list_id).ok_or_else(|| {
        SyncError::InvalidMapping(format!("form {}: mapping has no list_id", form_id))
    })?;

    Ok(MappingDefinition {
        form_id,
        list_id,
        sync_type: document.sync_type.unwrap_or_default(),
        field_map: document
            .mapping
            .map(|entries| field_map(form_id, entries))
            .unwrap_or_default(),
    })
}

/// Entries are converted one by one; an unusable entry is dropped without
/// taking the rest of the mapping down with it.
fn field_map(form_id: i64, entries: IndexMap<String, Value>) -> FieldMap {
    let mut field_map = FieldMap::with_capacity(entries.len());
    for (local, entry) in entries {
        match serde_json::from_value::<FieldTarget>(entry) {
            Ok(target) if !target.field.trim().is_empty() => {
                field_map.insert(local, target);
            }
            Ok(_) => log::warn!("form {}: field {} has no remote field, skipped", form_id, local),
            Err(e) => log::warn!("form {}: field {} skipped: {}", form_id, local, e),
        }
    }
    field_map
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
