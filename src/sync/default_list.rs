//! The single list new contacts are enrolled into.

use std::str::FromStr;
use std::sync::Arc;

use super::operations::{BulkOperations, SUBSCRIBED};
use crate::error::{Result, SyncError};
use crate::integrations::same_id;
use crate::storage::DefaultListStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultAction {
    Enable,
    Disable,
}

impl FromStr for DefaultAction {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "enable" => Ok(DefaultAction::Enable),
            "disable" => Ok(DefaultAction::Disable),
            other => Err(SyncError::Validation(format!(
                "unknown default-list action '{}'",
                other
            ))),
        }
    }
}

#[derive(Clone)]
pub struct DefaultListPolicy {
    store: Arc<dyn DefaultListStore>,
}

impl DefaultListPolicy {
    pub fn new(store: Arc<dyn DefaultListStore>) -> Self {
        Self { store }
    }

    /// At most one list stays enabled. Enabling a list without a row inserts
    /// one; disabling clears every row and reports whether the list had a
    /// row at all.
    pub fn set_default(&self, list_id: &str, action: DefaultAction) -> Result<bool> {
        let list_id = list_id.trim();
        if list_id.is_empty() {
            return Err(SyncError::Validation("list id is required".to_string()));
        }

        match action {
            DefaultAction::Enable => {
                let enabled = self.store.enable_exclusive(list_id)?;
                log::info!("default list is now {}", list_id);
                Ok(enabled)
            }
            DefaultAction::Disable => {
                let known = self
                    .store
                    .default_list_rows()?
                    .iter()
                    .any(|row| same_id(&row.list_id, list_id));
                let cleared = self.store.clear_defaults()?;
                log::info!("default list {} disabled ({} rows cleared)", list_id, cleared);
                Ok(known)
            }
        }
    }

    pub fn get_default(&self) -> Result<Option<String>> {
        Ok(self
            .store
            .default_list_rows()?
            .into_iter()
            .find(|row| row.enabled)
            .map(|row| row.list_id))
    }

    pub fn is_default(&self, list_id: &str) -> Result<bool> {
        Ok(self
            .get_default()?
            .map_or(false, |default| same_id(&default, list_id)))
    }

    /// Enrol a freshly created contact into the default list. Skipped when
    /// no default is set or the store cannot be read.
    pub async fn assign_list_to_contact(&self, ops: &BulkOperations, contact_id: &str) -> bool {
        let list_id = match self.get_default() {
            Ok(Some(list_id)) => list_id,
            Ok(None) => {
                log::info!("no default list; contact {} not enrolled", contact_id);
                return false;
            }
            Err(e) => {
                log::error!("reading default list failed: {}", e);
                return false;
            }
        };

        ops.assign_list(&[contact_id], &list_id, SUBSCRIBED)
            .await
            .any_succeeded()
    }
}

#[cfg(test)]
#[path = "default_list_tests.rs"]
mod tests;
