//! Sequential execution of a deployment plan.

use std::fmt;

use crate::{
    Identity,
    error::{ConfigError, DeployError},
    executor::StepExecutor,
    network::DeployNetwork,
    plan::DeploymentPlan,
    report::RunResult,
    resolver::AddressResolver,
    wiring::WiringExecutor,
};

/// Where a run currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunPhase {
    NotStarted,
    /// Deploying the step at this index of the plan.
    DeployingStep(usize),
    /// Executing the wiring action at this index of the plan.
    Wiring(usize),
    Reported,
    /// Terminal failure of the named step or wiring action.
    Failed { at: String, cause: String },
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunPhase::NotStarted => write!(f, "not started"),
            RunPhase::DeployingStep(index) => write!(f, "deploying step #{}", index + 1),
            RunPhase::Wiring(index) => write!(f, "wiring action #{}", index + 1),
            RunPhase::Reported => write!(f, "reported"),
            RunPhase::Failed { at, cause } => write!(f, "failed at `{}`: {}", at, cause),
        }
    }
}

/// Drives one run of a [`DeploymentPlan`] against a network.
///
/// Steps are deployed strictly in declaration order, each one confirmed before
/// the next is submitted, then the wiring actions are executed in order. The
/// first failure ends the run. Addresses resolved before the failure remain
/// readable through [`Orchestrator::resolver`].
pub struct Orchestrator<N> {
    plan: DeploymentPlan,
    network: N,
    identity: Identity,
    resolver: AddressResolver,
    phase: RunPhase,
}

impl<N: DeployNetwork> Orchestrator<N> {
    pub fn new(plan: DeploymentPlan, network: N, identity: Identity) -> Self {
        Self {
            plan,
            network,
            identity,
            resolver: AddressResolver::new(),
            phase: RunPhase::NotStarted,
        }
    }

    pub fn plan(&self) -> &DeploymentPlan {
        &self.plan
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn resolver(&self) -> &AddressResolver {
        &self.resolver
    }

    pub fn phase(&self) -> &RunPhase {
        &self.phase
    }

    /// Execute the plan once.
    ///
    /// A second call fails without touching the network: a run never deploys a
    /// step twice.
    pub async fn run(&mut self) -> Result<RunResult, DeployError> {
        if self.phase != RunPhase::NotStarted {
            return Err(ConfigError::RunAlreadyStarted.into());
        }

        tracing::info!(
            deployer = %self.identity.address(),
            steps = self.plan.steps().len(),
            wiring_actions = self.plan.wiring().len(),
            "Starting deployment run..."
        );

        match self.execute().await {
            Ok(result) => {
                self.phase = RunPhase::Reported;
                tracing::info!(units = result.len(), "✓ Deployment run complete");
                Ok(result)
            }
            Err(err) => {
                let at = err
                    .failed_at()
                    .or_else(|| self.current_target())
                    .unwrap_or("plan")
                    .to_string();
                tracing::error!(
                    at = %at,
                    phase = %self.phase,
                    resolved = self.resolver.len(),
                    error = %err,
                    "Deployment run aborted"
                );
                self.phase = RunPhase::Failed {
                    at,
                    cause: error_chain(&err),
                };
                Err(err)
            }
        }
    }

    /// Name of the step or wiring action the run is currently on.
    fn current_target(&self) -> Option<&str> {
        match self.phase {
            RunPhase::DeployingStep(index) => self.plan.steps().get(index).map(|s| s.name.as_str()),
            RunPhase::Wiring(index) => self.plan.wiring().get(index).map(|a| a.name.as_str()),
            _ => None,
        }
    }

    async fn execute(&mut self) -> Result<RunResult, DeployError> {
        let steps = StepExecutor::new(&self.network);
        for (index, step) in self.plan.steps().iter().enumerate() {
            self.phase = RunPhase::DeployingStep(index);
            let address = steps.deploy(step, &self.resolver, &self.identity).await?;
            self.resolver.set(&step.name, address)?;
        }

        let wiring = WiringExecutor::new(&self.network);
        for (index, action) in self.plan.wiring().iter().enumerate() {
            self.phase = RunPhase::Wiring(index);
            wiring.wire(action, &self.resolver, &self.identity).await?;
        }

        Ok(RunResult::from_resolver(&self.plan, &self.resolver)?)
    }
}

/// `outer: inner: root` rendering of an error and its sources.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}
