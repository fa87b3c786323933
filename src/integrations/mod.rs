pub mod campaign;
pub mod legacy;
pub mod rest;

use async_trait::async_trait;
use indexmap::IndexMap;
use reqwest::{redirect, Client};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::BridgeConfig;
use crate::error::{Result, SyncError};
use crate::mapping::transform::wire_text;

/// Ordered wire-field name -> value, built fresh for each submission.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncPayload {
    fields: IndexMap<String, Value>,
}

impl SyncPayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later writes to the same key replace the earlier value in place.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn form_pairs(&self) -> Vec<(String, String)> {
        self.fields
            .iter()
            .map(|(key, value)| (key.clone(), wire_text(value)))
            .collect()
    }
}

/// Decoded reply of the legacy endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyResponse {
    #[serde(default)]
    pub result_code: Option<Value>,
    #[serde(default)]
    pub result_message: Option<String>,
}

impl LegacyResponse {
    pub fn parse(body: &str) -> Result<Self> {
        if body.trim().is_empty() {
            return Err(SyncError::Transport("empty response".to_string()));
        }
        Ok(serde_json::from_str(body)?)
    }

    pub fn is_success(&self) -> bool {
        self.result_message.is_some()
    }
}

/// Outbound protocol used by the form-sync dispatcher.
#[async_trait]
pub trait SyncProtocol: Send + Sync {
    async fn send(&self, payload: &SyncPayload, action: &str) -> Result<LegacyResponse>;

    fn name(&self) -> &'static str;
}

/// JSON resource protocol (`/api/3/...`).
#[async_trait]
pub trait RestTransport: Send + Sync {
    async fn get(&self, path: &str) -> Result<Value>;
    async fn post(&self, path: &str, body: &Value) -> Result<Value>;
    async fn delete(&self, path: &str) -> Result<Value>;
}

pub fn http_client(config: &BridgeConfig) -> Result<Client> {
    Client::builder()
        .timeout(config.request_timeout())
        .http1_only()
        .redirect(redirect::Policy::limited(config.max_redirects))
        .build()
        .map_err(SyncError::from)
}

/// Identifier rendered as a string: non-empty strings (trimmed) and numbers.
pub fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Compare two identifiers numerically when both parse, else as strings.
pub fn same_id(a: &str, b: &str) -> bool {
    match (a.trim().parse::<i64>(), b.trim().parse::<i64>()) {
        (Ok(x), Ok(y)) => x == y,
        _ => a.trim() == b.trim(),
    }
}

/// Emptiness as the CRM's echoes use it: null, false, zero, "", "0", and
/// empty arrays or objects.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty() || s == "0",
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
    }
}

/// Named top-level collection of a response, empty when absent.
pub fn collection(body: &Value, field: &str) -> Vec<Value> {
    body.get(field)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

/// Reply of `contact/sync`.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactSyncReply {
    pub contact_id: Option<String>,
    pub body: Value,
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
