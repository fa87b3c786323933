//! Form submission -> legacy contact sync.

use serde_json::{Map, Value};
use std::sync::Arc;

use crate::error::SyncError;
use crate::integrations::{SyncPayload, SyncProtocol};
use crate::mapping::resolver::MappingResolver;
use crate::mapping::transform::{transform, wire_key};
use crate::mapping::{MappingDefinition, SyncType};

/// What became of one submission. Callers are free to ignore it.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Nothing was sent.
    Skipped(String),
    Delivered { message: String },
    /// The CRM answered without a result message, or with something that
    /// could not be decoded.
    Rejected,
    TransportFailed,
}

impl DispatchOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DispatchOutcome::Delivered { .. })
    }
}

/// Assemble the wire payload for one submission. Fields the form did not
/// submit are sent as empty strings; the list subscription parameters are
/// always appended last.
pub fn build_payload(mapping: &MappingDefinition, values: &Map<String, Value>) -> SyncPayload {
    let mut payload = SyncPayload::new();

    for (local_key, target) in &mapping.field_map {
        let raw = values
            .get(local_key)
            .cloned()
            .unwrap_or_else(|| Value::String(String::new()));
        payload.insert(wire_key(&target.field), transform(&raw, &target.kind));
    }
    if payload.is_empty() {
        log::error!("mapping for form {} produced no fields", mapping.form_id);
    }

    let list_id = &mapping.list_id;
    payload.insert(format!("status[{}]", list_id), Value::from(1));
    payload.insert(format!("p[{}]", list_id), Value::from(list_id.as_str()));
    payload
}

#[derive(Clone)]
pub struct SyncDispatcher {
    resolver: MappingResolver,
    legacy: Arc<dyn SyncProtocol>,
}

impl SyncDispatcher {
    pub fn new(resolver: MappingResolver, legacy: Arc<dyn SyncProtocol>) -> Self {
        Self { resolver, legacy }
    }

    /// Both sync types currently travel over the legacy protocol; the type
    /// only selects the remote action.
    pub fn adapter_for(&self, sync_type: SyncType) -> &Arc<dyn SyncProtocol> {
        match sync_type {
            SyncType::ContactSync | SyncType::ContactAdd => &self.legacy,
        }
    }

    /// Send one form submission. Never fails; every problem is logged and
    /// reported through the outcome.
    pub async fn dispatch(&self, form_key: &str, values: &Map<String, Value>) -> DispatchOutcome {
        let mapping = match self.resolver.resolve(form_key) {
            Ok(mapping) => mapping,
            Err(e) => {
                log::error!("sync of form {} skipped: {}", form_key, e);
                return DispatchOutcome::Skipped(e.to_string());
            }
        };

        let payload = build_payload(&mapping, values);
        let adapter = self.adapter_for(mapping.sync_type);
        log::debug!(
            "form {} -> {} via {} ({} fields)",
            form_key,
            mapping.sync_type,
            adapter.name(),
            payload.len()
        );

        match adapter.send(&payload, mapping.sync_type.action()).await {
            Ok(reply) => match reply.result_message {
                Some(message) => DispatchOutcome::Delivered { message },
                None => {
                    log::error!("form {}: reply carried no result message", form_key);
                    DispatchOutcome::Rejected
                }
            },
            Err(SyncError::Serialization(e)) => {
                log::error!("form {}: malformed reply: {}", form_key, e);
                DispatchOutcome::Rejected
            }
            Err(e) => {
                log::error!("form {}: sync failed: {}", form_key, e);
                DispatchOutcome::TransportFailed
            }
        }
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
