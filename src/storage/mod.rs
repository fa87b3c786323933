//! Persistence contracts the engine reads and writes through, plus the
//! SQLite implementation used by the bridge.

pub mod sqlite;

pub use sqlite::Storage;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};
use crate::mapping::registration::RegistrationMapping;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub id: i64,
    pub url: String,
    pub api_key: String,
}

impl Credentials {
    /// Both halves must be present before any network call.
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(SyncError::Validation("API URL is empty".to_string()));
        }
        if self.api_key.trim().is_empty() {
            return Err(SyncError::Validation("API key is empty".to_string()));
        }
        Ok(())
    }

    /// Account URL without trailing slashes or whitespace.
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches(['/', ' '])
    }
}

pub trait CredentialStore: Send + Sync {
    fn credentials(&self) -> Result<Vec<Credentials>>;

    /// Insert when nothing is stored yet, else update the single row.
    fn save_credentials(&self, url: &str, api_key: &str) -> Result<bool>;
}

/// First stored credential set, validated.
pub fn active_credentials(store: &dyn CredentialStore) -> Result<Credentials> {
    let credentials = store
        .credentials()?
        .into_iter()
        .next()
        .ok_or_else(|| SyncError::NotFound("no API credentials stored".to_string()))?;
    credentials.validate()?;
    Ok(credentials)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredForm {
    pub id: i64,
    pub form_key: String,
    pub label: String,
}

/// Host forms that may carry a mapping.
pub trait FormRegistry: Send + Sync {
    fn register_form(&self, form_key: &str, label: &str) -> Result<bool>;
    fn form_id(&self, form_key: &str) -> Result<Option<i64>>;
    fn forms(&self) -> Result<Vec<RegisteredForm>>;
}

/// Raw mapping documents keyed by form id. Parsing is the resolver's job.
pub trait MappingStore: Send + Sync {
    fn mapping_documents(&self, form_id: i64) -> Result<Vec<String>>;

    /// Update the row for `form_id` when it exists, else insert.
    fn save_mapping(&self, form_id: i64, document: &str) -> Result<bool>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultListRow {
    pub id: i64,
    pub list_id: String,
    pub enabled: bool,
}

pub trait DefaultListStore: Send + Sync {
    fn default_list_rows(&self) -> Result<Vec<DefaultListRow>>;
    /// Disable every row and enable the one for `list_id`, inserting it when
    /// missing. Runs as a single transaction.
    fn enable_exclusive(&self, list_id: &str) -> Result<bool>;
    /// Disable every row; returns how many were enabled.
    fn clear_defaults(&self) -> Result<usize>;
}

pub trait RegistrationStore: Send + Sync {
    /// Persist a new mapping; the first one stored becomes active.
    fn save_registration_mapping(&self, mapping: &RegistrationMapping)
        -> Result<RegistrationMapping>;
    fn registration_mappings(&self) -> Result<Vec<RegistrationMapping>>;
    fn active_registration_mapping(&self) -> Result<Option<RegistrationMapping>>;

    /// Activating clears every other row first.
    fn set_registration_active(&self, id: i64, active: bool) -> Result<bool>;
}
