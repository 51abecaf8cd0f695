//! Node configuration: where registry state lives, how to log, and the
//! chain and account registry settings.

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use didreg_registry::RegistryConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "DIDREG";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub data_dir: PathBuf,
    pub log_level: String,
    /// `pretty` or `compact`
    pub log_format: String,
    pub chain: Option<RegistryConfig>,
    pub account: Option<RegistryConfig>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/didreg"),
            log_level: "info".to_string(),
            log_format: "compact".to_string(),
            chain: None,
            account: None,
        }
    }
}

impl NodeConfig {
    /// Layers the optional config file under `DIDREG_*` environment
    /// variables. Nested keys use a double underscore, e.g.
    /// `DIDREG_CHAIN__MODE=internal`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        );
        let config = builder.build().context("failed to build configuration")?;
        config
            .try_deserialize()
            .context("failed to deserialize configuration")
    }

    pub fn chain_registry(&self) -> RegistryConfig {
        self.chain
            .clone()
            .unwrap_or_else(|| RegistryConfig::default().with_name("chain"))
    }

    pub fn account_registry(&self) -> RegistryConfig {
        self.account
            .clone()
            .unwrap_or_else(|| RegistryConfig::default().with_name("account"))
    }
}
