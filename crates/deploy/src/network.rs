//! Transaction submission capability used by the deployment run.

use std::future::Future;

use alloy_core::primitives::{Address, TxHash};
use anyhow::Result;

use crate::{
    Identity,
    plan::{AbiValue, UnitKind},
};

/// Outcome of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    /// `false` if the transaction reverted.
    pub success: bool,
    pub block_number: u64,
    /// Address of the created contract, for deployment transactions.
    pub contract_address: Option<Address>,
}

/// A network able to deploy units and execute configuration calls.
///
/// Submission and confirmation are separate so that a transaction that was
/// accepted but never mined is still observable as "submitted".
pub trait DeployNetwork: Send + Sync {
    /// Chain id reported by the network.
    fn chain_id(&self) -> impl Future<Output = Result<u64>> + Send;

    /// Accounts managed (and unlocked) by the connected node.
    fn accounts(&self) -> impl Future<Output = Result<Vec<Address>>> + Send;

    /// Submit the creation transaction of `unit` with the given constructor arguments.
    fn submit_deployment(
        &self,
        from: &Identity,
        unit: UnitKind,
        args: &[AbiValue],
    ) -> impl Future<Output = Result<TxHash>> + Send;

    /// Submit a call to `operation` (a function signature) on the contract at `target`.
    fn submit_call(
        &self,
        from: &Identity,
        target: Address,
        operation: &str,
        args: &[AbiValue],
    ) -> impl Future<Output = Result<TxHash>> + Send;

    /// Block until the transaction is mined, or fail if it never is.
    fn wait_for_receipt(&self, tx_hash: TxHash) -> impl Future<Output = Result<TxReceipt>> + Send;
}
