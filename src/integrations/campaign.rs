//! Typed access to the v3 resources. Reads never fail hard: a transport
//! failure or a missing field yields an empty result and a log line.

use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use super::{collection, id_string, is_blank, ContactSyncReply, RestTransport};
use crate::error::{Result, SyncError};
use crate::sync::bulk::numeric_ids;

/// Card layout applied to every new pipeline stage.
const STAGE_CARD_DEFAULTS: [(&str, &str); 6] = [
    ("dealOrder", "next-action DESC"),
    ("cardRegion1", "title"),
    ("cardRegion2", "next-action"),
    ("cardRegion3", "show-avatar"),
    ("cardRegion4", "contact-fullname-orgname"),
    ("cardRegion5", "value"),
];
const STAGE_COLOR: &str = "3f3f3f";
const STAGE_WIDTH: i64 = 280;

#[derive(Clone)]
pub struct CampaignApi {
    transport: Arc<dyn RestTransport>,
}

impl CampaignApi {
    pub fn new(transport: Arc<dyn RestTransport>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<dyn RestTransport> {
        &self.transport
    }

    async fn fetch(&self, path: &str) -> Option<Value> {
        match self.transport.get(path).await {
            Ok(body) => Some(body),
            Err(e) => {
                log::error!("GET {} failed: {}", path, e);
                None
            }
        }
    }

    async fn fetch_collection(&self, path: &str, field: &str) -> Vec<Value> {
        self.fetch(path)
            .await
            .map(|body| collection(&body, field))
            .unwrap_or_default()
    }

    async fn fetch_resource(&self, path: &str, field: &str) -> Option<Value> {
        self.fetch(path)
            .await
            .and_then(|body| body.get(field).cloned())
            .filter(|resource| !resource.is_null())
    }

    pub async fn lists(&self) -> Vec<Value> {
        self.fetch_collection("lists", "lists").await
    }

    pub async fn list(&self, id: &str) -> Option<Value> {
        self.fetch_resource(&format!("lists/{}", id), "list").await
    }

    /// One request per numeric id; ids that resolve to nothing are skipped.
    pub async fn lists_by_ids(&self, ids: &[String]) -> Vec<Value> {
        let mut lists = Vec::new();
        for id in numeric_ids(ids) {
            if let Some(list) = self.list(&id).await {
                lists.push(list);
            }
        }
        lists
    }

    pub async fn contacts(&self, query: Option<&str>) -> Vec<Value> {
        let path = match query {
            Some(q) if !q.is_empty() => format!("contacts?{}", q),
            _ => "contacts".to_string(),
        };
        self.fetch_collection(&path, "contacts").await
    }

    pub async fn contacts_by_ids(&self, ids: &[String]) -> Vec<Value> {
        let ids = numeric_ids(ids);
        let query = match ids.as_slice() {
            [] => return Vec::new(),
            [only] => format!("ids={}", only),
            many => many
                .iter()
                .map(|id| format!("ids[]={}", id))
                .collect::<Vec<_>>()
                .join("&"),
        };
        self.contacts(Some(&query)).await
    }

    /// Subscribed contacts per list, keyed by list id.
    pub async fn contacts_by_lists(&self, list_ids: &[String]) -> IndexMap<String, Vec<Value>> {
        let mut by_list = IndexMap::new();
        for id in numeric_ids(list_ids) {
            let contacts = self
                .fetch_collection(&format!("contacts?listid={}&status=1", id), "contacts")
                .await;
            by_list.insert(id, contacts);
        }
        by_list
    }

    pub async fn custom_fields(&self) -> Vec<Value> {
        self.fetch_collection("fields?limit=100", "fields").await
    }

    pub async fn users(&self) -> Vec<Value> {
        self.fetch_collection("users", "users").await
    }

    pub async fn user(&self, id: &str) -> Option<Value> {
        self.fetch_resource(&format!("users/{}", id), "user").await
    }

    pub async fn pipelines(&self) -> Vec<Value> {
        self.fetch_collection(
            "dealGroups?orders[title]=ASC&orders[popular]=ASC",
            "dealGroups",
        )
        .await
    }

    pub async fn pipeline(&self, id: &str) -> Option<Value> {
        self.fetch_resource(&format!("dealGroups/{}", id), "dealGroup")
            .await
    }

    pub async fn stages(&self) -> Vec<Value> {
        self.fetch_collection("dealStages", "dealStages").await
    }

    pub async fn campaigns(&self) -> Vec<Value> {
        self.fetch_collection("campaigns?orders[sdate]=ASC", "campaigns")
            .await
    }

    pub async fn groups(&self) -> Vec<Value> {
        self.fetch_collection("groups", "groups").await
    }

    /// POST `{wrapper: fields}` and report whether the echo carries an id.
    async fn create(&self, path: &str, wrapper: &str, fields: Value) -> bool {
        match self.transport.post(path, &json!({ wrapper: fields })).await {
            Ok(body) => {
                let id = body.get(wrapper).and_then(|r| r.get("id"));
                let created = id.map(|id| !is_blank(id)).unwrap_or(false);
                if !created {
                    log::warn!("POST {} returned no {} id", path, wrapper);
                }
                created
            }
            Err(e) => {
                log::error!("POST {} failed: {}", path, e);
                false
            }
        }
    }

    pub async fn create_pipeline(&self, pipeline: Map<String, Value>) -> bool {
        self.create("dealGroups", "dealGroup", Value::Object(pipeline))
            .await
    }

    pub async fn create_stage(&self, title: &str, group: &str) -> Result<bool> {
        if title.trim().is_empty() || group.trim().is_empty() {
            return Err(SyncError::Validation(
                "stage title and pipeline group are required".to_string(),
            ));
        }

        let mut stage = Map::new();
        stage.insert("order".to_string(), Value::Null);
        for (key, value) in STAGE_CARD_DEFAULTS {
            stage.insert(key.to_string(), Value::from(value));
        }
        stage.insert("color".to_string(), Value::from(STAGE_COLOR));
        stage.insert("width".to_string(), Value::from(STAGE_WIDTH));
        stage.insert("group".to_string(), Value::from(group));
        stage.insert("title".to_string(), Value::from(title));

        Ok(self.create("dealStages", "dealStage", Value::Object(stage)).await)
    }

    /// Create or update a contact from its field values.
    pub async fn sync_contact(&self, contact: Map<String, Value>) -> Result<ContactSyncReply> {
        if contact.is_empty() {
            return Err(SyncError::Validation("contact has no fields".to_string()));
        }
        let body = self
            .transport
            .post("contact/sync", &json!({ "contact": contact }))
            .await?;
        let contact_id = body
            .get("contact")
            .and_then(|c| c.get("id"))
            .and_then(id_string);
        Ok(ContactSyncReply { contact_id, body })
    }
}

#[cfg(test)]
#[path = "campaign_tests.rs"]
mod tests;
