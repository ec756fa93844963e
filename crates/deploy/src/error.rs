//! Error kinds surfaced by a deployment run.

use thiserror::Error;

/// Boxed cause coming out of the network layer.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A malformed deployment plan, or a resolver misuse that reveals one.
///
/// These are always detected before the offending transaction is submitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("deployment plan contains no steps")]
    EmptyPlan,
    #[error("step `{0}` is declared more than once")]
    DuplicateStep(String),
    #[error("wiring action `{0}` is declared more than once")]
    DuplicateAction(String),
    #[error("`{owner}` references undeclared step `{reference}`")]
    UnknownReference { owner: String, reference: String },
    #[error("step `{owner}` references step `{reference}` which is declared after it")]
    ForwardReference { owner: String, reference: String },
    #[error("wiring action `{action}` has malformed operation signature `{operation}`")]
    MalformedOperation { action: String, operation: String },
    #[error("wiring action `{action}` passes ({args}) to `{operation}`")]
    OperationMismatch {
        action: String,
        operation: String,
        args: String,
    },
    #[error("address of step `{0}` has not been resolved")]
    UnresolvedReference(String),
    #[error("address of step `{0}` is already resolved")]
    AlreadyResolved(String),
    #[error("deployment run has already been started")]
    RunAlreadyStarted,
}

/// Terminal error of a deployment run.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("invalid deployment configuration: {0}")]
    Configuration(#[from] ConfigError),
    #[error("deployment of step `{step}` failed")]
    Deployment {
        step: String,
        #[source]
        source: BoxError,
    },
    #[error("wiring action `{action}` failed")]
    Wiring {
        action: String,
        #[source]
        source: BoxError,
    },
}

impl DeployError {
    pub(crate) fn deployment(step: &str, source: impl Into<BoxError>) -> Self {
        Self::Deployment {
            step: step.to_string(),
            source: source.into(),
        }
    }

    pub(crate) fn wiring(action: &str, source: impl Into<BoxError>) -> Self {
        Self::Wiring {
            action: action.to_string(),
            source: source.into(),
        }
    }

    /// Name of the step or wiring action that failed, if the failure happened mid-run.
    pub fn failed_at(&self) -> Option<&str> {
        match self {
            Self::Configuration(_) => None,
            Self::Deployment { step, .. } => Some(step),
            Self::Wiring { action, .. } => Some(action),
        }
    }

    /// Process exit code used by the command line front-end.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Configuration(_) => 2,
            Self::Deployment { .. } => 3,
            Self::Wiring { .. } => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct() {
        let config = DeployError::from(ConfigError::EmptyPlan);
        let deploy = DeployError::deployment("auth", anyhow::anyhow!("rejected"));
        let wiring = DeployError::wiring("authorizeWallet", anyhow::anyhow!("reverted"));

        assert_eq!(config.exit_code(), 2);
        assert_eq!(deploy.exit_code(), 3);
        assert_eq!(wiring.exit_code(), 4);
    }

    #[test]
    fn test_failed_at_names_step_or_action() {
        let deploy = DeployError::deployment("spentSet", anyhow::anyhow!("timeout"));
        assert_eq!(deploy.failed_at(), Some("spentSet"));

        let wiring = DeployError::wiring("authorizeWallet", anyhow::anyhow!("timeout"));
        assert_eq!(wiring.failed_at(), Some("authorizeWallet"));

        let config = DeployError::from(ConfigError::DuplicateStep("auth".into()));
        assert_eq!(config.failed_at(), None);
    }

    #[test]
    fn test_source_is_preserved() {
        let err = DeployError::deployment("wallet", anyhow::anyhow!("nonce too low"));
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("nonce too low"));
    }
}
