//! Push host user records to the CRM through the active registration mapping.

use serde_json::{json, Map, Value};
use std::sync::Arc;

use super::default_list::DefaultListPolicy;
use super::operations::BulkOperations;
use crate::error::{Result, SyncError};
use crate::integrations::campaign::CampaignApi;
use crate::integrations::is_blank;
use crate::mapping::registration::RegistrationMapping;
use crate::mapping::transform::transform;
use crate::mapping::FieldKind;
use crate::storage::RegistrationStore;
use crate::sync::bulk::is_numeric_id;

/// A local user: field machine name -> raw field value.
pub type UserRecord = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutcome {
    pub contact_id: Option<String>,
    /// Whether the contact landed in the default list.
    pub enrolled: bool,
    pub accepted: bool,
}

/// Contact body for `contact/sync`. Numeric remote keys are custom fields
/// and go to `fieldValues`; the rest are standard contact properties.
pub fn build_contact(mapping: &RegistrationMapping, user: &UserRecord) -> Map<String, Value> {
    let mut contact = Map::new();
    let mut custom = Vec::new();

    for (remote, local) in &mapping.map {
        let value = user
            .get(local)
            .map(|raw| transform(raw, &FieldKind::TextInput))
            .unwrap_or(Value::Null);
        if is_numeric_id(remote) {
            let value = if value.is_null() { Value::from("") } else { value };
            custom.push(json!({ "field": remote, "value": value }));
        } else {
            contact.insert(remote.clone(), value);
        }
    }

    contact.insert("fieldValues".to_string(), Value::Array(custom));
    contact
}

pub struct ContactExporter {
    registrations: Arc<dyn RegistrationStore>,
    campaign: CampaignApi,
    ops: BulkOperations,
    defaults: DefaultListPolicy,
}

impl ContactExporter {
    pub fn new(
        registrations: Arc<dyn RegistrationStore>,
        campaign: CampaignApi,
        ops: BulkOperations,
        defaults: DefaultListPolicy,
    ) -> Self {
        Self {
            registrations,
            campaign,
            ops,
            defaults,
        }
    }

    pub fn active_mapping(&self) -> Result<RegistrationMapping> {
        self.registrations
            .active_registration_mapping()?
            .ok_or_else(|| SyncError::NotFound("no active registration mapping".to_string()))
    }

    pub async fn export(&self, user: &UserRecord) -> Result<ExportOutcome> {
        let mapping = self.active_mapping()?;
        self.export_with(&mapping, user).await
    }

    pub async fn export_with(
        &self,
        mapping: &RegistrationMapping,
        user: &UserRecord,
    ) -> Result<ExportOutcome> {
        let contact = build_contact(mapping, user);
        let reply = self.campaign.sync_contact(contact).await?;

        let Some(contact_id) = reply.contact_id else {
            let accepted = !is_blank(&reply.body);
            if !accepted {
                log::warn!("contact sync returned an empty reply");
            }
            return Ok(ExportOutcome {
                contact_id: None,
                enrolled: false,
                accepted,
            });
        };

        let enrolled = self
            .defaults
            .assign_list_to_contact(&self.ops, &contact_id)
            .await;
        log::info!("exported contact {} (enrolled: {})", contact_id, enrolled);
        Ok(ExportOutcome {
            contact_id: Some(contact_id),
            enrolled,
            accepted: true,
        })
    }
}

#[cfg(test)]
#[path = "export_tests.rs"]
mod tests;
