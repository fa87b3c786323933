use async_trait::async_trait;
use reqwest::{Client, Url};

use super::{LegacyResponse, SyncPayload, SyncProtocol};
use crate::error::{Result, SyncError};
use crate::storage::Credentials;

/// Query-parameter API: `POST {base}/admin/api.php?api_action=..&api_output=json`
/// with a form-encoded body.
pub struct LegacyQueryApi {
    client: Client,
    credentials: Credentials,
}

impl LegacyQueryApi {
    pub fn new(client: Client, credentials: Credentials) -> Result<Self> {
        credentials.validate()?;
        Ok(Self {
            client,
            credentials,
        })
    }

    pub fn endpoint(&self, action: &str) -> Result<Url> {
        let base = format!("{}/admin/api.php", self.credentials.base_url());
        Url::parse_with_params(&base, &[("api_action", action), ("api_output", "json")])
            .map_err(|e| SyncError::Validation(format!("bad API URL {}: {}", base, e)))
    }
}

#[async_trait]
impl SyncProtocol for LegacyQueryApi {
    async fn send(&self, payload: &SyncPayload, action: &str) -> Result<LegacyResponse> {
        let url = self.endpoint(action)?;

        let response = self
            .client
            .post(url)
            .header("API-TOKEN", self.credentials.api_key.as_str())
            .form(&payload.form_pairs())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SyncError::Transport(format!(
                "legacy API error ({}): {}",
                status, body
            )));
        }

        let reply = LegacyResponse::parse(&body)?;
        match reply.result_message.as_deref() {
            Some(message) => log::info!("{} -> {}", action, message),
            None => log::warn!("{} -> reply without result message", action),
        }
        Ok(reply)
    }

    fn name(&self) -> &'static str {
        "legacy"
    }
}

#[cfg(test)]
#[path = "legacy_tests.rs"]
mod tests;
