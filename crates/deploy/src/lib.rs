//! biowallet-deploy - Deployment library for the biometric wallet contract suite.
//!
//! This crate deploys a fixed, dependency-ordered set of contracts in a single
//! run, feeds each deployed address forward to the steps that need it, and
//! finally wires the deployed units together with configuration calls.

pub mod abi;
pub mod artifacts;
mod config;
mod deployer;
mod error;
mod executor;
mod identity;
pub mod network;
pub mod plan;
mod report;
mod resolver;
pub mod rpc;
mod runner;
mod wiring;

pub use alloy_core::primitives::Address;
pub use config::{
    CONFIG_FILENAME, DEFAULT_ARTIFACTS_DIR, DEFAULT_CONFIRMATION_TIMEOUT_SECS,
    DEFAULT_OUTDATA_DIR, DEFAULT_POLL_INTERVAL_MS, DEFAULT_RPC_URL, DeployConfig,
};
pub use deployer::{Deployer, DeploymentOutcome};
pub use error::{BoxError, ConfigError, DeployError};
pub use executor::StepExecutor;
pub use identity::{Identity, IdentitySource};
pub use network::{DeployNetwork, TxReceipt};
pub use plan::{AbiValue, DeploymentPlan, DeploymentStep, InputSpec, UnitKind, WiringAction};
pub use report::{
    DeployedUnit, DeploymentManifest, MANIFEST_FILENAME, RunResult, plan_hash, plan_table,
};
pub use resolver::AddressResolver;
pub use rpc::JsonRpcNetwork;
pub use runner::{Orchestrator, RunPhase};
pub use wiring::WiringExecutor;
