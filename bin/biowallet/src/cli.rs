use std::path::PathBuf;

use biowallet_deploy::{Address, DeployConfig, IdentitySource};
use clap::Parser;
use tracing::level_filters::LevelFilter;
use url::Url;

#[derive(Parser)]
#[command(name = "biowallet")]
#[command(
    author,
    version,
    about = "Deploy and wire the biometric wallet contract suite"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "BIOWALLET_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Path to a Biowallet.toml configuration file, or to the directory holding it.
    ///
    /// If not provided, ./Biowallet.toml is used when it exists.
    /// Command line arguments take precedence over the file.
    #[arg(long, alias = "conf", env = "BIOWALLET_CONFIG")]
    pub config: Option<PathBuf>,

    /// The JSON-RPC endpoint of the node signing the transactions.
    #[arg(long, alias = "rpc", env = "BIOWALLET_RPC_URL")]
    pub rpc_url: Option<Url>,

    /// Expected chain id. The run is refused if the node reports another one.
    #[arg(long, env = "BIOWALLET_CHAIN_ID")]
    pub chain_id: Option<u64>,

    /// Directory of the compiled contract artifacts.
    #[arg(long, env = "BIOWALLET_ARTIFACTS")]
    pub artifacts: Option<PathBuf>,

    /// Directory receiving the deployment manifest.
    #[arg(long, env = "BIOWALLET_OUTDATA")]
    pub outdata: Option<PathBuf>,

    /// Deploy from this address. It must be unlocked on the node.
    #[arg(long, env = "BIOWALLET_IDENTITY", conflicts_with_all = ["mnemonic", "node_account"])]
    pub identity: Option<Address>,

    /// Deploy from an account derived from this mnemonic.
    #[arg(long, env = "BIOWALLET_MNEMONIC", hide_env_values = true, conflicts_with = "node_account")]
    pub mnemonic: Option<String>,

    /// Derivation index used with --mnemonic.
    #[arg(long, env = "BIOWALLET_MNEMONIC_INDEX", requires = "mnemonic", default_value_t = 0)]
    pub mnemonic_index: u32,

    /// Deploy from the n-th account managed by the node.
    #[arg(long, env = "BIOWALLET_NODE_ACCOUNT")]
    pub node_account: Option<usize>,

    /// Maximum time to wait for a transaction to be mined, in seconds.
    #[arg(long, env = "BIOWALLET_CONFIRMATION_TIMEOUT")]
    pub confirmation_timeout: Option<u64>,

    /// Interval between two receipt polls, in milliseconds.
    #[arg(long, env = "BIOWALLET_POLL_INTERVAL")]
    pub poll_interval: Option<u64>,

    /// Print the deployment plan and exit without touching the network.
    #[arg(long, env = "BIOWALLET_PLAN", default_value_t = false)]
    pub plan: bool,

    /// Write the effective configuration to this path before deploying.
    #[arg(long, env = "BIOWALLET_SAVE_CONFIG")]
    pub save_config: Option<PathBuf>,
}

impl Cli {
    /// Deployer identity selected on the command line, if any.
    pub fn identity_source(&self) -> Option<IdentitySource> {
        if let Some(address) = self.identity {
            return Some(IdentitySource::Address { address });
        }
        if let Some(phrase) = &self.mnemonic {
            return Some(IdentitySource::Mnemonic {
                phrase: phrase.clone(),
                index: self.mnemonic_index,
            });
        }
        self.node_account
            .map(|index| IdentitySource::NodeAccount { index })
    }

    /// Override the loaded configuration with every argument that was given.
    pub fn apply(&self, config: &mut DeployConfig) {
        if let Some(rpc_url) = &self.rpc_url {
            config.rpc_url = rpc_url.clone();
        }
        if let Some(chain_id) = self.chain_id {
            config.chain_id = Some(chain_id);
        }
        if let Some(artifacts) = &self.artifacts {
            config.artifacts = artifacts.clone();
        }
        if let Some(outdata) = &self.outdata {
            config.outdata = outdata.clone();
        }
        if let Some(identity) = self.identity_source() {
            config.identity = identity;
        }
        if let Some(timeout) = self.confirmation_timeout {
            config.confirmation_timeout_secs = timeout;
        }
        if let Some(interval) = self.poll_interval {
            config.poll_interval_ms = interval;
        }
    }
}
