pub mod config;
pub mod error;
pub mod integrations;
pub mod mapping;
pub mod storage;
pub mod sync;

#[cfg(test)]
mod test_support;

use reqwest::Client;
use serde_json::{Map, Value};
use std::sync::Arc;

use config::BridgeConfig;
use error::{Result, SyncError};
use integrations::campaign::CampaignApi;
use integrations::legacy::LegacyQueryApi;
use integrations::rest::RestV3Api;
use integrations::{http_client, RestTransport};
use mapping::resolver::MappingResolver;
use storage::{active_credentials, Credentials, Storage};
use sync::default_list::DefaultListPolicy;
use sync::dispatcher::{DispatchOutcome, SyncDispatcher};
use sync::export::ContactExporter;
use sync::operations::BulkOperations;

/// Bootstrapped application state: configuration, the SQLite store and one
/// shared HTTP client. Adapters are built per call from the current
/// credentials, so key changes take effect without a restart.
pub struct Bridge {
    config: BridgeConfig,
    storage: Arc<Storage>,
    client: Client,
}

impl Bridge {
    pub fn open(config: BridgeConfig) -> Result<Self> {
        if let Some(parent) = config.database_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    SyncError::Config(format!("create {}: {}", parent.display(), e))
                })?;
            }
        }
        let storage = Storage::open(&config.database_path)?;
        log::info!("Opened store at {}", config.database_path.display());
        Self::with_storage(config, Arc::new(storage))
    }

    pub fn with_storage(config: BridgeConfig, storage: Arc<Storage>) -> Result<Self> {
        let client = http_client(&config)?;
        Ok(Self {
            config,
            storage,
            client,
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<Storage> {
        &self.storage
    }

    /// Configured credentials win over the stored row.
    pub fn credentials(&self) -> Result<Credentials> {
        if let Some((url, api_key)) = self.config.pinned_credentials() {
            let pinned = Credentials {
                id: 0,
                url: url.to_string(),
                api_key: api_key.to_string(),
            };
            pinned.validate()?;
            return Ok(pinned);
        }
        active_credentials(self.storage.as_ref())
    }

    pub fn resolver(&self) -> MappingResolver {
        MappingResolver::new(self.storage.clone(), self.storage.clone())
    }

    pub fn default_lists(&self) -> DefaultListPolicy {
        DefaultListPolicy::new(self.storage.clone())
    }

    pub fn rest(&self) -> Result<Arc<dyn RestTransport>> {
        let api = RestV3Api::new(self.client.clone(), self.credentials()?)?;
        Ok(Arc::new(api))
    }

    pub fn campaign(&self) -> Result<CampaignApi> {
        Ok(CampaignApi::new(self.rest()?))
    }

    pub fn bulk(&self) -> Result<BulkOperations> {
        Ok(BulkOperations::new(self.rest()?))
    }

    pub fn dispatcher(&self) -> Result<SyncDispatcher> {
        let legacy = LegacyQueryApi::new(self.client.clone(), self.credentials()?)?;
        Ok(SyncDispatcher::new(self.resolver(), Arc::new(legacy)))
    }

    pub fn exporter(&self) -> Result<ContactExporter> {
        let rest = self.rest()?;
        Ok(ContactExporter::new(
            self.storage.clone(),
            CampaignApi::new(rest.clone()),
            BulkOperations::new(rest),
            self.default_lists(),
        ))
    }

    /// Forward one form submission. Missing credentials skip the sync like
    /// any other unusable precondition.
    pub async fn sync_form(&self, form_key: &str, values: &Map<String, Value>) -> DispatchOutcome {
        match self.dispatcher() {
            Ok(dispatcher) => dispatcher.dispatch(form_key, values).await,
            Err(e) => {
                log::error!("sync of form {} skipped: {}", form_key, e);
                DispatchOutcome::Skipped(e.to_string())
            }
        }
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
