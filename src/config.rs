use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Host-side settings. Every field has a default, so a missing or partial
/// config file is fine. The interval fields exist so hosts and tests can
/// compress time; the shipped defaults are the product cadence.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    /// Explicit path to the costa binary, bypassing resolution.
    #[serde(default)]
    pub binary: Option<PathBuf>,
    /// Wall-clock limit for a single CLI invocation.
    #[serde(default = "default_invoke_timeout_secs")]
    pub invoke_timeout_secs: u64,
    /// Usage polling cadence.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Delay before a reconnection attempt after a failed poll.
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,
    /// Cadence of the login completion watch.
    #[serde(default = "default_login_poll_interval_secs")]
    pub login_poll_interval_secs: u64,
}

fn default_invoke_timeout_secs() -> u64 {
    15
}

fn default_poll_interval_secs() -> u64 {
    3
}

fn default_reconnect_delay_secs() -> u64 {
    5
}

fn default_login_poll_interval_secs() -> u64 {
    3
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            binary: None,
            invoke_timeout_secs: default_invoke_timeout_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
            login_poll_interval_secs: default_login_poll_interval_secs(),
        }
    }
}

impl Settings {
    /// Loads `~/.costa-bridge/config.yaml`, or defaults when absent.
    pub fn load_default() -> Result<Self> {
        match default_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file as YAML: {}", path.display()))
    }

    pub fn invoke_timeout(&self) -> Duration {
        Duration::from_secs(self.invoke_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    pub fn login_poll_interval(&self) -> Duration {
        Duration::from_secs(self.login_poll_interval_secs)
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".costa-bridge").join("config.yaml"))
}
