//! Run configuration, persisted as TOML.

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{IdentitySource, artifacts::ArtifactStore, rpc::JsonRpcNetwork};

/// The default name for the configuration file.
pub const CONFIG_FILENAME: &str = "Biowallet.toml";

/// Default JSON-RPC endpoint (local Hardhat or Anvil node).
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545/";
/// Default Hardhat artifacts directory.
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";
/// Default directory receiving the deployment manifest.
pub const DEFAULT_OUTDATA_DIR: &str = "deployments";
/// Default upper bound on the wait for a single transaction to be mined.
pub const DEFAULT_CONFIRMATION_TIMEOUT_SECS: u64 = 120;
/// Default interval between receipt polls.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

fn default_rpc_url() -> Url {
    Url::parse(DEFAULT_RPC_URL).expect("Default RPC URL should always parse")
}

/// Everything a deployment run needs besides the plan itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployConfig {
    /// JSON-RPC endpoint of the node that signs and mines the transactions.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: Url,
    /// Expected chain id. The run aborts before any transaction if the node disagrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    /// Directory of compiled contract artifacts.
    #[serde(default = "default_artifacts")]
    pub artifacts: PathBuf,
    /// Directory where the deployment manifest is written.
    #[serde(default = "default_outdata")]
    pub outdata: PathBuf,
    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Where the deployer account comes from.
    #[serde(default)]
    pub identity: IdentitySource,
}

fn default_artifacts() -> PathBuf {
    PathBuf::from(DEFAULT_ARTIFACTS_DIR)
}

fn default_outdata() -> PathBuf {
    PathBuf::from(DEFAULT_OUTDATA_DIR)
}

fn default_confirmation_timeout_secs() -> u64 {
    DEFAULT_CONFIRMATION_TIMEOUT_SECS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            chain_id: None,
            artifacts: default_artifacts(),
            outdata: default_outdata(),
            confirmation_timeout_secs: DEFAULT_CONFIRMATION_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            identity: IdentitySource::default(),
        }
    }
}

impl DeployConfig {
    /// Save the configuration to a TOML file.
    pub fn save_to_file(&self, path: &PathBuf) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize deploy config to TOML")?;
        std::fs::write(path, content)
            .context(format!("Failed to write config to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    /// Load the configuration from a TOML file, or from [`CONFIG_FILENAME`] inside a directory.
    pub fn load_from_file(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            return Err(anyhow::anyhow!(
                "Configuration file or directory not found: {}",
                path.display()
            ));
        }

        let config_path = if path.is_dir() {
            path.join(CONFIG_FILENAME)
        } else {
            path.to_path_buf()
        };

        let content = std::fs::read_to_string(&config_path)
            .context(format!("Failed to read config from {}", config_path.display()))?;
        let config: Self =
            toml::from_str(&content).context("Failed to parse config file as TOML")?;
        tracing::info!(path = %config_path.display(), "Configuration loaded");
        Ok(config)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn artifact_store(&self) -> ArtifactStore {
        ArtifactStore::new(&self.artifacts)
    }

    /// JSON-RPC network described by this configuration.
    pub fn network(&self) -> Result<JsonRpcNetwork> {
        JsonRpcNetwork::new(
            self.rpc_url.clone(),
            self.artifact_store(),
            self.poll_interval(),
            self.confirmation_timeout(),
        )
    }
}
