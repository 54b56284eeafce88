//! Configuration file for the fileshare CLI.
//!
//! CLI flags always take precedence over values loaded here; this struct is
//! the layer both feed into before becoming a [`fileshare_core::NodeConfig`].

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// On-disk configuration, loaded from an optional TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the local catalog database.
    #[serde(default = "default_catalog_path")]
    pub catalog_path: String,
    /// Port the RPC service binds to / is reached at.
    #[serde(default = "default_rpc_port")]
    pub rpc_port: u16,
    /// Port discovery broadcasts use.
    #[serde(default = "default_discovery_port")]
    pub discovery_port: u16,
    /// How often the transfer loop rebuilds fragment availability, in seconds.
    #[serde(default = "default_scheduler_refresh_secs")]
    pub scheduler_refresh_secs: u64,
    /// How often the background discovery task refreshes, in seconds.
    #[serde(default = "default_discovery_refresh_secs")]
    pub discovery_refresh_secs: u64,
}

fn default_catalog_path() -> String {
    "fileshare.db".to_string()
}

fn default_rpc_port() -> u16 {
    fileshare_core::NodeConfig::default().rpc_port
}

fn default_discovery_port() -> u16 {
    fileshare_discovery::DEFAULT_DISCOVERY_PORT
}

fn default_scheduler_refresh_secs() -> u64 {
    5
}

fn default_discovery_refresh_secs() -> u64 {
    3
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog_path: default_catalog_path(),
            rpc_port: default_rpc_port(),
            discovery_port: default_discovery_port(),
            scheduler_refresh_secs: default_scheduler_refresh_secs(),
            discovery_refresh_secs: default_discovery_refresh_secs(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
        Ok(())
    }

    /// The default config file location, `$XDG_CONFIG_HOME/fileshare/config.toml`.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("fileshare/config.toml")
    }

    /// Load from the default path, writing a default file there if absent.
    pub fn load_or_default() -> anyhow::Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            let config = Self::default();
            config.save(&path)?;
            Ok(config)
        }
    }

    /// Turn this file-level config into the engine's runtime config, letting
    /// CLI-supplied overrides win.
    #[must_use]
    pub fn to_node_config(&self, verbose: bool) -> fileshare_core::NodeConfig {
        fileshare_core::NodeConfig {
            catalog_path: self.catalog_path.clone(),
            rpc_port: self.rpc_port,
            discovery_port: self.discovery_port,
            scheduler_refresh_period: Duration::from_secs(self.scheduler_refresh_secs),
            discovery_refresh_interval: Duration::from_secs(self.discovery_refresh_secs),
            verbose,
        }
    }
}
