//! Post-deployment configuration calls.

use crate::{
    Identity,
    error::DeployError,
    network::DeployNetwork,
    plan::WiringAction,
    resolver::AddressResolver,
};

/// Executes [`WiringAction`]s against already deployed units.
pub struct WiringExecutor<'a, N> {
    network: &'a N,
}

impl<'a, N: DeployNetwork> WiringExecutor<'a, N> {
    pub fn new(network: &'a N) -> Self {
        Self { network }
    }

    /// Submit the configuration transaction of `action` and wait for it to be mined.
    ///
    /// At most one transaction is submitted. Nothing is retried or undone on failure.
    pub async fn wire(
        &self,
        action: &WiringAction,
        resolver: &AddressResolver,
        identity: &Identity,
    ) -> Result<(), DeployError> {
        let target = resolver.get(&action.target)?;
        let args = resolver.resolve_inputs(&action.args, identity)?;

        tracing::info!(
            action = %action.name,
            target = %action.target,
            target_address = %target,
            operation = %action.operation,
            args = ?args,
            "Submitting wiring transaction..."
        );

        let tx_hash = self
            .network
            .submit_call(identity, target, &action.operation, &args)
            .await
            .map_err(|e| DeployError::wiring(&action.name, e))?;

        let receipt = self
            .network
            .wait_for_receipt(tx_hash)
            .await
            .map_err(|e| DeployError::wiring(&action.name, e))?;

        if !receipt.success {
            return Err(DeployError::wiring(
                &action.name,
                anyhow::anyhow!(
                    "{} on {} reverted in block {} ({})",
                    action.operation,
                    action.target,
                    receipt.block_number,
                    tx_hash
                ),
            ));
        }

        tracing::info!(action = %action.name, tx_hash = %tx_hash, "Wiring confirmed");
        Ok(())
    }
}
