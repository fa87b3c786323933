use serde_json::{json, Map, Value};
use std::sync::Arc;

use super::bulk::{apply_to_each, require_ids, BulkResult};
use crate::error::{Result, SyncError};
use crate::integrations::{id_string, is_blank, same_id, RestTransport};

/// Fields a deal template must carry before any deal is created.
pub const REQUIRED_DEAL_FIELDS: [&str; 9] = [
    "status",
    "title",
    "description",
    "value",
    "currency",
    "group",
    "stage",
    "owner",
    "percent",
];

/// Fields a new list must carry; `group` drives list permissions instead of
/// being sent with the list.
pub const REQUIRED_LIST_FIELDS: [&str; 5] =
    ["name", "stringid", "sender_url", "sender_reminder", "group"];

pub type DealTemplate = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DealMode {
    /// One independent deal per contact.
    PerContact,
    /// One deal for the first contact, the rest attached to it.
    Shared,
}

impl DealMode {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(DealMode::PerContact),
            2 => Some(DealMode::Shared),
            _ => None,
        }
    }
}

/// Subscription status sent with a contact-list association.
pub const SUBSCRIBED: i64 = 1;
pub const UNSUBSCRIBED: i64 = 2;

/// Multi-contact actions against the v3 API, each reduced with the
/// at-least-one-succeeded policy.
#[derive(Clone)]
pub struct BulkOperations {
    transport: Arc<dyn RestTransport>,
}

impl BulkOperations {
    pub fn new(transport: Arc<dyn RestTransport>) -> Self {
        Self { transport }
    }

    pub async fn assign_list<S: AsRef<str>>(
        &self,
        contacts: &[S],
        list_id: &str,
        status: i64,
    ) -> BulkResult {
        let result = apply_to_each(contacts, |contact| {
            self.assign_one(contact, list_id, status)
        })
        .await;
        result.log_summary(&format!("assign list {}", list_id));
        result
    }

    async fn assign_one(&self, contact: String, list_id: &str, status: i64) -> bool {
        let body = json!({
            "contactList": {
                "sourceid": 0,
                "list": list_id,
                "contact": contact,
                "status": status,
            }
        });
        match self.transport.post("contactLists", &body).await {
            Ok(reply) => reply
                .get("contactList")
                .and_then(|association| association.get("list"))
                .and_then(id_string)
                .map(|echoed| same_id(&echoed, list_id))
                .unwrap_or(false),
            Err(e) => {
                log::error!("assign contact {} to list {} failed: {}", contact, list_id, e);
                false
            }
        }
    }

    pub async fn create_deal<S: AsRef<str>>(
        &self,
        contacts: &[S],
        template: &DealTemplate,
        mode: DealMode,
    ) -> Result<BulkResult> {
        if let Some(missing) = REQUIRED_DEAL_FIELDS
            .iter()
            .find(|field| template.get(**field).map_or(true, Value::is_null))
        {
            return Err(SyncError::Validation(format!(
                "deal template is missing '{}'",
                missing
            )));
        }
        let contacts = require_ids(contacts, "contact")?;

        let result = match mode {
            DealMode::PerContact => {
                apply_to_each(&contacts, |contact| self.post_deal(template, contact))
                    .await
            }
            DealMode::Shared => self.create_shared_deal(template, &contacts).await,
        };
        result.log_summary("create deal");
        Ok(result)
    }

    async fn post_deal(&self, template: &DealTemplate, contact: String) -> bool {
        match self.send_deal(template, &contact).await {
            Some(reply) => reply.get("deal").map(|deal| !is_blank(deal)).unwrap_or(false),
            None => false,
        }
    }

    async fn send_deal(&self, template: &DealTemplate, contact: &str) -> Option<Value> {
        let mut deal = template.clone();
        deal.insert("contact".to_string(), Value::from(contact));
        match self.transport.post("deals", &json!({ "deal": deal })).await {
            Ok(reply) => Some(reply),
            Err(e) => {
                log::error!("create deal for contact {} failed: {}", contact, e);
                None
            }
        }
    }

    /// Only the attachment outcomes decide the result; the primary deal's
    /// echoed id falls back to 0 when it cannot be read.
    async fn create_shared_deal(&self, template: &DealTemplate, contacts: &[String]) -> BulkResult {
        let Some((primary, rest)) = contacts.split_first() else {
            return BulkResult::default();
        };
        let Some(reply) = self.send_deal(template, primary).await else {
            return BulkResult::default();
        };

        let deal_id = reply
            .get("deal")
            .and_then(|deal| deal.get("id"))
            .and_then(id_string)
            .and_then(|id| id.parse::<i64>().ok())
            .unwrap_or(0);
        log::info!("created deal {} for contact {}", deal_id, primary);

        self.attach_contacts(rest, deal_id).await
    }

    /// Attach further contacts to an existing deal.
    pub async fn attach_contacts<S: AsRef<str>>(&self, contacts: &[S], deal_id: i64) -> BulkResult {
        apply_to_each(contacts, |contact| self.attach_one(contact, deal_id)).await
    }

    async fn attach_one(&self, contact: String, deal_id: i64) -> bool {
        let body = json!({
            "contactDeal": {
                "deal": deal_id,
                "contact": contact,
            }
        });
        match self.transport.post("contactDeals", &body).await {
            Ok(reply) => reply
                .get("contactDeal")
                .and_then(|association| association.get("id"))
                .and_then(id_string)
                .and_then(|id| id.parse::<i64>().ok())
                .map(|id| id != 0)
                .unwrap_or(false),
            Err(e) => {
                log::error!("attach contact {} to deal {} failed: {}", contact, deal_id, e);
                false
            }
        }
    }

    pub async fn delete_contacts<S: AsRef<str>>(&self, ids: &[S]) -> BulkResult {
        let result = apply_to_each(ids, |id| self.delete_one("contacts", id)).await;
        result.log_summary("delete contacts");
        result
    }

    pub async fn delete_lists<S: AsRef<str>>(&self, ids: &[S]) -> BulkResult {
        let result = apply_to_each(ids, |id| self.delete_one("lists", id)).await;
        result.log_summary("delete lists");
        result
    }

    /// A delete succeeds when the decoded reply is empty.
    async fn delete_one(&self, resource: &str, id: String) -> bool {
        let path = format!("{}/{}", resource, id);
        match self.transport.delete(&path).await {
            Ok(reply) => is_blank(&reply),
            Err(e) => {
                log::error!("DELETE {} failed: {}", path, e);
                false
            }
        }
    }

    /// Create a list, then grant each group access to it.
    pub async fn create_list(&self, mut list: Map<String, Value>) -> Result<BulkResult> {
        if let Some(missing) = REQUIRED_LIST_FIELDS
            .iter()
            .find(|field| list.get(**field).map_or(true, Value::is_null))
        {
            return Err(SyncError::Validation(format!("list is missing '{}'", missing)));
        }

        let groups: Vec<String> = match list.remove("group") {
            Some(Value::Array(items)) => items.iter().filter_map(id_string).collect(),
            Some(other) => id_string(&other).into_iter().collect(),
            None => Vec::new(),
        };

        let reply = match self.transport.post("lists", &json!({ "list": list })).await {
            Ok(body) => body,
            Err(e) => {
                log::error!("create list failed: {}", e);
                return Ok(BulkResult::default());
            }
        };
        let list_id = reply
            .get("list")
            .and_then(|created| created.get("id"))
            .and_then(id_string)
            .and_then(|id| id.parse::<i64>().ok());

        match list_id {
            Some(list_id) => Ok(self.create_group_permissions(list_id, &groups).await),
            None => Ok(BulkResult::default()),
        }
    }

    pub async fn create_group_permissions<S: AsRef<str>>(
        &self,
        list_id: i64,
        groups: &[S],
    ) -> BulkResult {
        let result = apply_to_each(groups, |group| self.grant_one(list_id, group)).await;
        result.log_summary(&format!("list {} permissions", list_id));
        result
    }

    async fn grant_one(&self, list_id: i64, group: String) -> bool {
        let group_id: i64 = match group.parse::<f64>() {
            Ok(n) => n as i64,
            Err(_) => return false,
        };
        let body = json!({
            "listGroup": {
                "groupid": group_id,
                "listid": list_id,
            }
        });
        match self.transport.post("listGroups", &body).await {
            Ok(reply) => reply
                .get("listGroup")
                .and_then(|grant| grant.get("id"))
                .map(|id| !is_blank(id))
                .unwrap_or(false),
            Err(e) => {
                log::error!("grant group {} on list {} failed: {}", group, list_id, e);
                false
            }
        }
    }
}

#[cfg(test)]
#[path = "operations_tests.rs"]
mod tests;
