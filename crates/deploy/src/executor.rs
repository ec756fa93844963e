//! Deployment of a single step.

use alloy_core::primitives::Address;

use crate::{
    Identity,
    error::DeployError,
    network::DeployNetwork,
    plan::DeploymentStep,
    resolver::AddressResolver,
};

/// Deploys one step at a time on a [`DeployNetwork`].
pub struct StepExecutor<'a, N> {
    network: &'a N,
}

impl<'a, N: DeployNetwork> StepExecutor<'a, N> {
    pub fn new(network: &'a N) -> Self {
        Self { network }
    }

    /// Deploy `step` and block until its unit is live.
    ///
    /// Every step reference must already be present in `resolver`; otherwise a
    /// configuration error is returned before anything is submitted. The caller
    /// is responsible for recording the returned address.
    pub async fn deploy(
        &self,
        step: &DeploymentStep,
        resolver: &AddressResolver,
        identity: &Identity,
    ) -> Result<Address, DeployError> {
        let args = resolver.resolve_inputs(&step.inputs, identity)?;

        tracing::info!(
            step = %step.name,
            unit = %step.unit,
            args = ?args,
            "Submitting deployment transaction..."
        );

        let tx_hash = self
            .network
            .submit_deployment(identity, step.unit, &args)
            .await
            .map_err(|e| DeployError::deployment(&step.name, e))?;

        tracing::debug!(step = %step.name, tx_hash = %tx_hash, "Waiting for deployment confirmation...");

        let receipt = self
            .network
            .wait_for_receipt(tx_hash)
            .await
            .map_err(|e| DeployError::deployment(&step.name, e))?;

        if !receipt.success {
            return Err(DeployError::deployment(
                &step.name,
                anyhow::anyhow!(
                    "Creation transaction {} reverted in block {}",
                    tx_hash,
                    receipt.block_number
                ),
            ));
        }

        let address = receipt.contract_address.ok_or_else(|| {
            DeployError::deployment(
                &step.name,
                anyhow::anyhow!("Receipt of {} carries no contract address", tx_hash),
            )
        })?;

        tracing::info!(
            step = %step.name,
            address = %address,
            block = receipt.block_number,
            "Unit deployed"
        );

        Ok(address)
    }
}
