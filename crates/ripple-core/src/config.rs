//! Application configuration management.
//!
//! Configuration is stored at `~/.config/ripple/config.json`; session state
//! lives under the platform data directory. Everything has a sensible
//! default, so a missing config file just means "talk to the production
//! API".

use std::path::PathBuf;

use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Application name used for config/data directory paths
const APP_NAME: &str = "ripple";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Session store file name
const SESSION_FILE: &str = "session.json";

/// Production API. Override with `api_base_url` for staging or local runs.
const DEFAULT_API_BASE_URL: &str = "https://api.ripple.social/";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub last_username: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// The API base URL to talk to. Must parse; a trailing slash matters
    /// for endpoint joining, so one is appended if missing.
    pub fn base_url(&self) -> Result<Url> {
        let mut raw = self
            .api_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        if !raw.ends_with('/') {
            raw.push('/');
        }
        Url::parse(&raw).with_context(|| format!("Invalid API base URL: {}", raw))
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn session_store_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME).join(SESSION_FILE))
    }
}
