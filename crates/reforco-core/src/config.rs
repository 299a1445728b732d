//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which holds the backing-store project URL and API key, the cache age
//! limit and the retry policy settings.
//!
//! Configuration is stored at `~/.config/reforco/config.json`. The
//! `REFORCO_BACKEND_URL` and `REFORCO_ANON_KEY` environment variables take
//! precedence over the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::{BackendClient, RetryPolicy};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "reforco";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const ENV_BACKEND_URL: &str = "REFORCO_BACKEND_URL";

pub const ENV_ANON_KEY: &str = "REFORCO_ANON_KEY";

/// Cached data older than this is not served, even offline.
const DEFAULT_CACHE_MAX_AGE_MINUTES: u64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend_url: Option<String>,
    pub anon_key: Option<String>,
    pub cache_max_age_minutes: u64,
    pub retry_max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            backend_url: None,
            anon_key: None,
            cache_max_age_minutes: DEFAULT_CACHE_MAX_AGE_MINUTES,
            retry_max_attempts: policy.max_attempts,
            retry_base_delay_ms: policy.base_delay.as_millis() as u64,
            request_timeout_secs: policy.timeout.as_secs(),
        }
    }
}

impl Config {
    /// Load from the user config file, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Replace URL and key with non-empty values from `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(url) = non_empty(ENV_BACKEND_URL) {
            self.backend_url = Some(url);
        }
        if let Some(key) = non_empty(ENV_ANON_KEY) {
            self.anon_key = Some(key);
        }
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_max_attempts,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    /// Build the backing-store client described by this configuration.
    pub fn backend_client(&self) -> Result<BackendClient> {
        let url = self.backend_url.as_deref().unwrap_or_default();
        let key = self.anon_key.as_deref().unwrap_or_default();
        BackendClient::new(url, key, self.retry_policy()).with_context(|| {
            format!(
                "Backing store is not configured; set {} and {} or edit the config file",
                ENV_BACKEND_URL, ENV_ANON_KEY
            )
        })
    }
}
