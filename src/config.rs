//! Provider configuration
//!
//! Loaded from `~/.config/flowsync/config.toml` (or `--config`). Every field
//! is optional; a missing file means defaults, and the API token falls back
//! to `WEBFLOW_API_TOKEN`.
//!
//! ```toml
//! api_token = "..."
//! base_url = "https://api.webflow.com"
//! timeout_secs = 30
//! max_retries = 3
//! base_delay_ms = 1000
//! max_delay_secs = 30
//! ```

use anyhow::{Context, Result};
use flowkit::{ClientConfig, RetryConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::paths;

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    /// Webflow API token
    pub api_token: Option<String>,
    /// API origin override
    pub base_url: Option<String>,
    /// Overall per-call timeout
    pub timeout_secs: Option<u64>,
    /// Retries after the first attempt
    pub max_retries: Option<u32>,
    /// Backoff base delay
    pub base_delay_ms: Option<u64>,
    /// Backoff ceiling
    pub max_delay_secs: Option<u64>,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field(
                "api_token",
                &self.api_token.as_deref().map(flowkit::auth::redact),
            )
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("base_delay_ms", &self.base_delay_ms)
            .field("max_delay_secs", &self.max_delay_secs)
            .finish()
    }
}

impl ProviderConfig {
    /// Load the config file; `None` uses the default location
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => paths::expand(&p.to_string_lossy()),
            None => paths::config_file()?,
        };
        Self::load_from(&path)
    }

    /// Load a specific file, returning defaults when it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::debug!("Loaded config from {}: {:?}", path.display(), config);
        Ok(config)
    }

    /// Retry policy, filling unset fields from the defaults
    pub fn retry(&self) -> RetryConfig {
        let defaults = RetryConfig::default();
        RetryConfig::new(
            self.max_retries.unwrap_or(defaults.max_retries),
            self.base_delay_ms
                .map_or(defaults.base_delay, Duration::from_millis),
            self.max_delay_secs
                .map_or(defaults.max_delay, Duration::from_secs),
        )
    }

    /// Resolve the token and build the client configuration
    pub fn to_client_config(&self, version: &str) -> Result<ClientConfig> {
        let token = flowkit::auth::resolve_token(self.api_token.as_deref())?;
        let mut config = ClientConfig::new(token, version).with_retry(self.retry());
        if let Some(base_url) = &self.base_url {
            config = config.with_base_url(base_url.as_str());
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }
}

/// Where the config would be read from, for display
pub fn location(path: Option<&Path>) -> Result<PathBuf> {
    match path {
        Some(p) => Ok(paths::expand(&p.to_string_lossy())),
        None => paths::config_file(),
    }
}
