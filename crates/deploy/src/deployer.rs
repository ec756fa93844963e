use anyhow::{Context, Result};

use crate::{
    DeployConfig, DeploymentManifest, DeploymentPlan, MANIFEST_FILENAME, Orchestrator, RunResult,
    network::DeployNetwork,
};

/// Outputs of a successful deployment.
#[derive(Debug, Clone)]
pub struct DeploymentOutcome {
    pub result: RunResult,
    pub manifest: DeploymentManifest,
}

/// Main deployer: checks the environment, runs the plan and records the outcome.
#[derive(Debug, Clone)]
pub struct Deployer {
    pub config: DeployConfig,
}

impl Deployer {
    pub fn new(config: DeployConfig) -> Self {
        Self { config }
    }

    /// Deploy `plan` through the JSON-RPC node described by the configuration.
    ///
    /// Every artifact is loaded up front so that a missing or broken one is
    /// reported before the first transaction.
    pub async fn deploy(&self, plan: DeploymentPlan) -> Result<DeploymentOutcome> {
        self.config
            .artifact_store()
            .verify_all()
            .context("Contract artifacts are not usable, compile the contracts first")?;

        let network = self.config.network()?;
        tracing::info!(rpc_url = %network.url(), "Connecting to network...");

        self.deploy_on(plan, network).await
    }

    /// Deploy `plan` on an arbitrary network.
    ///
    /// Errors from the run itself are returned unwrapped, so callers can
    /// downcast them to [`crate::DeployError`].
    pub async fn deploy_on<N: DeployNetwork>(
        &self,
        plan: DeploymentPlan,
        network: N,
    ) -> Result<DeploymentOutcome> {
        let chain_id = network
            .chain_id()
            .await
            .context("Failed to query the network chain id")?;

        if let Some(expected) = self.config.chain_id {
            if expected != chain_id {
                anyhow::bail!(
                    "Connected to chain {} but the configuration expects chain {}",
                    chain_id,
                    expected
                );
            }
        }

        let identity = self.config.identity.resolve(&network).await?;

        tracing::info!(
            chain_id,
            deployer = %identity.address(),
            outdata = %self.config.outdata.display(),
            "Deployment environment ready"
        );

        let mut orchestrator = Orchestrator::new(plan, network, identity);
        let result = orchestrator.run().await?;

        tracing::info!("\n{}", result.table());

        let manifest = DeploymentManifest::new(orchestrator.plan(), &result, chain_id, &identity)?;

        std::fs::create_dir_all(&self.config.outdata).context(format!(
            "Failed to create output directory {}",
            self.config.outdata.display()
        ))?;
        manifest.save_to_file(&self.config.outdata.join(MANIFEST_FILENAME))?;

        Ok(DeploymentOutcome { result, manifest })
    }
}
