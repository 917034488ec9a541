//! Dashboard configuration
//!
//! Loaded from YAML, then overridden from the command line. Validation runs
//! once, when the channel configuration is derived.

use crate::channel::{channel_url, ChannelConfig, DEFAULT_CHANNEL_SUFFIX};
use crate::error::{Result, SwarmViewError};
use crate::view::ViewConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Default dashboard origin
pub const DEFAULT_ORIGIN: &str = "http://localhost:8080/";

/// Config file name below the per-user config directory
pub const CONFIG_FILE: &str = "config.yaml";

/// Log file name below the per-user data directory
pub const LOG_FILE: &str = "swarmview.log";

/// Where logs go: the explicit path if given, else the per-user data
/// directory. `None` if the platform has no data directory.
pub fn log_path(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => dirs::data_dir().map(|dir| dir.join("swarmview").join(LOG_FILE)),
    }
}

/// Reconnect backoff settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
        }
    }
}

/// Dashboard configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Origin and path the dashboard is served from
    pub origin: String,
    /// Path suffix of the push channel below `origin`
    pub channel_suffix: String,
    /// Explicit channel URL; bypasses derivation from `origin`
    pub url: Option<String>,
    pub reconnect: ReconnectConfig,
    /// Initial filter and sort settings
    pub view: ViewConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            channel_suffix: DEFAULT_CHANNEL_SUFFIX.to_string(),
            url: None,
            reconnect: ReconnectConfig::default(),
            view: ViewConfig::default(),
        }
    }
}

impl DashboardConfig {
    /// Per-user config file location, if the platform has a config directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("swarmview").join(CONFIG_FILE))
    }

    /// Parse a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SwarmViewError::InvalidConfig(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::parse_str(&content)
    }

    /// Parse config from a YAML string
    pub fn parse_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load `path` if given, otherwise the per-user file if present,
    /// otherwise defaults. An explicit path must exist.
    pub fn discover(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        match Self::default_path() {
            Some(path) if path.is_file() => {
                debug!(path = %path.display(), "Loading config");
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Check ranges and the origin scheme
    pub fn validate(&self) -> Result<()> {
        if self.reconnect.base_delay_ms == 0 {
            return Err(SwarmViewError::InvalidConfig(
                "reconnect.base_delay_ms must be greater than zero".to_string(),
            ));
        }
        if self.reconnect.max_delay_ms < self.reconnect.base_delay_ms {
            return Err(SwarmViewError::InvalidConfig(format!(
                "reconnect.max_delay_ms ({}) is below reconnect.base_delay_ms ({})",
                self.reconnect.max_delay_ms, self.reconnect.base_delay_ms
            )));
        }
        self.channel_url().map(|_| ())
    }

    /// The push channel URL: `url` if set, else derived from `origin`
    pub fn channel_url(&self) -> Result<Url> {
        match &self.url {
            Some(url) => {
                let url = Url::parse(url)?;
                match url.scheme() {
                    "ws" | "wss" => Ok(url),
                    other => Err(SwarmViewError::InvalidUrl(format!(
                        "channel URL must use ws or wss, got {}",
                        other
                    ))),
                }
            }
            None => channel_url(&self.origin, &self.channel_suffix),
        }
    }

    /// Validated settings for the channel client
    pub fn channel_config(&self) -> Result<ChannelConfig> {
        self.validate()?;
        Ok(ChannelConfig {
            url: self.channel_url()?,
            base_delay: Duration::from_millis(self.reconnect.base_delay_ms),
            max_delay: Duration::from_millis(self.reconnect.max_delay_ms),
        })
    }
}
