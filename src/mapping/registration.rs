//! Two-step construction of the registration mapping used by contact export:
//! the operator first picks which user fields may be sent, then assigns CRM
//! fields to them. The picked fields travel between the steps in an explicit
//! [`FieldSelection`] value.

use chrono::{Local, NaiveDateTime};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

/// Remote CRM field key -> local user field machine name.
pub type RegistrationMap = IndexMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationMapping {
    pub id: i64,
    pub name: String,
    pub list_id: String,
    pub map: RegistrationMap,
    pub active: bool,
}

/// Account bookkeeping fields that are never offered for export.
pub const SYSTEM_FIELDS: &[&str] = &[
    "init",
    "login",
    "changed",
    "status",
    "timezone",
    "pass",
    "preferred_admin_langcode",
    "preferred_langcode",
    "langcode",
    "uuid",
    "roles",
    "access",
    "default_langcode",
    "user_picture",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserField {
    pub machine_name: String,
    pub label: String,
}

pub fn is_system_field(machine_name: &str) -> bool {
    SYSTEM_FIELDS.contains(&machine_name)
}

/// Fields an operator may pick from.
pub fn selectable_fields(available: &[UserField]) -> Vec<&UserField> {
    available
        .iter()
        .filter(|field| !is_system_field(&field.machine_name))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSelection {
    list_id: String,
    fields: Vec<UserField>,
}

impl FieldSelection {
    pub fn new(list_id: &str, available: &[UserField], checked: &[&str]) -> Result<Self> {
        if list_id.trim().is_empty() {
            return Err(SyncError::Validation("list id can not be empty".to_string()));
        }

        let fields = selectable_fields(available)
            .into_iter()
            .filter(|field| checked.contains(&field.machine_name.as_str()))
            .cloned()
            .collect();

        Ok(Self {
            list_id: list_id.trim().to_string(),
            fields,
        })
    }

    pub fn list_id(&self) -> &str {
        &self.list_id
    }

    pub fn fields(&self) -> &[UserField] {
        &self.fields
    }

    pub fn contains(&self, machine_name: &str) -> bool {
        self.fields.iter().any(|f| f.machine_name == machine_name)
    }

    /// Machine name -> label, for populating the assignment step.
    pub fn options(&self) -> IndexMap<String, String> {
        self.fields
            .iter()
            .map(|f| (f.machine_name.clone(), f.label.clone()))
            .collect()
    }

    pub fn build_mapping(&self, assignments: &RegistrationMap) -> RegistrationMapping {
        self.build_mapping_at(assignments, Local::now().naive_local())
    }

    /// Assignments naming a field outside the selection are dropped.
    pub fn build_mapping_at(
        &self,
        assignments: &RegistrationMap,
        created: NaiveDateTime,
    ) -> RegistrationMapping {
        let map = assignments
            .iter()
            .filter(|(remote, local)| !remote.is_empty() && self.contains(local))
            .map(|(remote, local)| (remote.clone(), local.clone()))
            .collect();

        RegistrationMapping {
            id: 0,
            name: format!("Created - {}", created.format("%m %d, %Y %I:%M")),
            list_id: self.list_id.clone(),
            map,
            active: false,
        }
    }
}

#[cfg(test)]
#[path = "registration_tests.rs"]
mod tests;
