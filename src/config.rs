use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, SyncError};

const CONFIG_FILE_NAME: &str = "config.json";
const DB_FILE_NAME: &str = "campaign-bridge.db";

pub const API_URL_ENV: &str = "CAMPAIGN_BRIDGE_API_URL";
pub const API_KEY_ENV: &str = "CAMPAIGN_BRIDGE_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub database_path: PathBuf,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Credentials taking precedence over the stored ones when both are set.
    #[serde(default)]
    pub api_url: String,
    #[serde(default)]
    pub api_key: String,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_redirects() -> usize {
    10
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DB_FILE_NAME),
            request_timeout_secs: default_timeout_secs(),
            max_redirects: default_max_redirects(),
            api_url: String::new(),
            api_key: String::new(),
        }
    }
}

impl BridgeConfig {
    /// Default application data directory (`<config dir>/campaign-bridge`).
    pub fn default_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("campaign-bridge"))
            .ok_or_else(|| SyncError::Config("could not resolve a config directory".to_string()))
    }

    pub fn load(app_data: &Path) -> Self {
        let config_path = app_data.join(CONFIG_FILE_NAME);
        let mut config = if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                    log::warn!("Ignoring unreadable {}: {}", config_path.display(), e);
                    Self::for_dir(app_data)
                }),
                Err(_) => Self::for_dir(app_data),
            }
        } else {
            let c = Self::for_dir(app_data);
            if let Err(e) = c.save(app_data) {
                log::warn!("Could not write default config: {}", e);
            }
            c
        };

        config.normalize();
        config.apply_env_overrides();
        config
    }

    /// Per-request timeout. Zero would fail every call, so it reads as the
    /// default.
    pub fn request_timeout(&self) -> Duration {
        match self.request_timeout_secs {
            0 => Duration::from_secs(default_timeout_secs()),
            secs => Duration::from_secs(secs),
        }
    }

    pub fn save(&self, app_data: &Path) -> Result<()> {
        std::fs::create_dir_all(app_data)
            .map_err(|e| SyncError::Config(format!("create {}: {}", app_data.display(), e)))?;
        let config_path = app_data.join(CONFIG_FILE_NAME);
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)
            .map_err(|e| SyncError::Config(format!("write {}: {}", config_path.display(), e)))
    }

    /// Credentials pinned by configuration, if both halves are present.
    pub fn pinned_credentials(&self) -> Option<(&str, &str)> {
        if self.api_url.is_empty() || self.api_key.is_empty() {
            None
        } else {
            Some((self.api_url.as_str(), self.api_key.as_str()))
        }
    }

    fn for_dir(app_data: &Path) -> Self {
        Self {
            database_path: app_data.join(DB_FILE_NAME),
            ..Self::default()
        }
    }

    fn normalize(&mut self) {
        if self.request_timeout_secs == 0 {
            log::warn!(
                "request_timeout_secs must be positive, using {}",
                default_timeout_secs()
            );
            self.request_timeout_secs = default_timeout_secs();
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.is_empty() {
                self.api_url = url;
            }
        }
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.is_empty() {
                self.api_key = key;
            }
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
