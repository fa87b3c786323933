use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;

use super::RestTransport;
use crate::error::{Result, SyncError};
use crate::storage::Credentials;

/// JSON resource API under `{base}/api/3/`.
pub struct RestV3Api {
    client: Client,
    credentials: Credentials,
}

impl RestV3Api {
    pub fn new(client: Client, credentials: Credentials) -> Result<Self> {
        credentials.validate()?;
        Ok(Self {
            client,
            credentials,
        })
    }

    pub fn resource_url(&self, path: &str) -> String {
        format!(
            "{}/api/3/{}",
            self.credentials.base_url(),
            path.trim_start_matches('/')
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Api-Token", self.credentials.api_key.as_str())
            .header(ACCEPT, "application/json")
    }

    async fn execute(&self, method: &str, path: &str, request: RequestBuilder) -> Result<Value> {
        let response = request.send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SyncError::Transport(format!(
                "{} {} failed ({}): {}",
                method, path, status, body
            )));
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl RestTransport for RestV3Api {
    async fn get(&self, path: &str) -> Result<Value> {
        let request = self.authorized(self.client.get(self.resource_url(path)));
        self.execute("GET", path, request).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let request = self
            .authorized(self.client.post(self.resource_url(path)))
            .header(CONTENT_TYPE, "application/json")
            .json(body);
        self.execute("POST", path, request).await
    }

    async fn delete(&self, path: &str) -> Result<Value> {
        let request = self.authorized(self.client.delete(self.resource_url(path)));
        self.execute("DELETE", path, request).await
    }
}

#[cfg(test)]
#[path = "rest_tests.rs"]
mod tests;
