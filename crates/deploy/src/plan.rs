//! Declarative deployment plan: the ordered list of units to deploy and the
//! configuration calls that wire them together once they are live.
//!
//! A [`DeploymentPlan`] can only be obtained through [`DeploymentPlan::new`], which
//! checks that every reference points at a step declared before it. A plan that
//! exists is therefore safe to execute in declaration order.

use std::collections::{HashMap, HashSet};

use alloy_core::{
    dyn_abi::DynSolValue,
    primitives::{Address, B256, Bytes, U256},
};
use serde::{Deserialize, Serialize};

use crate::{abi, error::ConfigError};

/// Public parameters registered for the CA consortium: the 64-byte master public key.
pub const MASTER_PUBLIC_KEY: [u8; 64] = [0x11; 64];
/// Threshold `t` of the consortium (any `t + 1` shares can cooperate).
pub const CONSORTIUM_THRESHOLD: u64 = 1;
/// Number of CA nodes in the consortium.
pub const CONSORTIUM_NODE_COUNT: u64 = 3;

/// The deployable contract units.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumIter,
)]
pub enum UnitKind {
    Authorization,
    SpentSet,
    ParamRegistry,
    BiometricWallet,
}

impl UnitKind {
    /// Name of the compiled contract (and of its artifact file).
    pub fn contract_name(&self) -> &'static str {
        match self {
            UnitKind::Authorization => "Authorization",
            UnitKind::SpentSet => "SpentSet",
            UnitKind::ParamRegistry => "ParamRegistry",
            UnitKind::BiometricWallet => "BiometricWallet",
        }
    }
}

/// A concrete ABI argument value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AbiValue {
    Address(Address),
    Bool(bool),
    Uint(U256),
    Bytes(Bytes),
    FixedBytes32(B256),
}

impl AbiValue {
    /// Solidity type name, used in signatures and logs.
    pub fn sol_type(&self) -> &'static str {
        match self {
            AbiValue::Address(_) => "address",
            AbiValue::Bool(_) => "bool",
            AbiValue::Uint(_) => "uint256",
            AbiValue::Bytes(_) => "bytes",
            AbiValue::FixedBytes32(_) => "bytes32",
        }
    }

    pub fn uint(value: u64) -> Self {
        AbiValue::Uint(U256::from(value))
    }
}

impl From<&AbiValue> for DynSolValue {
    fn from(value: &AbiValue) -> Self {
        match value {
            AbiValue::Address(address) => DynSolValue::Address(*address),
            AbiValue::Bool(flag) => DynSolValue::Bool(*flag),
            AbiValue::Uint(n) => DynSolValue::Uint(*n, 256),
            AbiValue::Bytes(bytes) => DynSolValue::Bytes(bytes.to_vec()),
            AbiValue::FixedBytes32(word) => DynSolValue::FixedBytes(*word, 32),
        }
    }
}

/// How one constructor or call argument is obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSpec {
    /// A constant known when the plan is written.
    Literal(AbiValue),
    /// The address of the deployer identity.
    Identity,
    /// The address of a previously deployed step.
    Step(String),
}

impl InputSpec {
    pub fn step(name: impl Into<String>) -> Self {
        InputSpec::Step(name.into())
    }

    /// Solidity type of the value this input resolves to.
    pub fn sol_type(&self) -> &'static str {
        match self {
            InputSpec::Literal(value) => value.sol_type(),
            InputSpec::Identity | InputSpec::Step(_) => "address",
        }
    }

    fn reference(&self) -> Option<&str> {
        match self {
            InputSpec::Step(name) => Some(name.as_str()),
            _ => None,
        }
    }
}

/// One unit to deploy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentStep {
    pub name: String,
    pub unit: UnitKind,
    pub inputs: Vec<InputSpec>,
}

impl DeploymentStep {
    pub fn new(name: impl Into<String>, unit: UnitKind, inputs: Vec<InputSpec>) -> Self {
        Self {
            name: name.into(),
            unit,
            inputs,
        }
    }
}

/// A configuration call issued against a deployed unit once every step is live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WiringAction {
    pub name: String,
    /// Step whose deployed unit receives the call.
    pub target: String,
    /// Solidity function signature, e.g. `setAuthorized(address,bool)`.
    pub operation: String,
    pub args: Vec<InputSpec>,
}

impl WiringAction {
    pub fn new(
        name: impl Into<String>,
        target: impl Into<String>,
        operation: impl Into<String>,
        args: Vec<InputSpec>,
    ) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            operation: operation.into(),
            args,
        }
    }
}

/// A validated, immutable deployment plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentPlan {
    steps: Vec<DeploymentStep>,
    wiring: Vec<WiringAction>,
}

impl DeploymentPlan {
    /// Validate and build a plan.
    ///
    /// Step inputs may only reference steps declared earlier. Wiring targets and
    /// arguments may reference any declared step, since wiring runs after all steps.
    pub fn new(steps: Vec<DeploymentStep>, wiring: Vec<WiringAction>) -> Result<Self, ConfigError> {
        if steps.is_empty() {
            return Err(ConfigError::EmptyPlan);
        }

        let mut positions: HashMap<&str, usize> = HashMap::with_capacity(steps.len());
        for (index, step) in steps.iter().enumerate() {
            if positions.insert(step.name.as_str(), index).is_some() {
                return Err(ConfigError::DuplicateStep(step.name.clone()));
            }
        }

        for (index, step) in steps.iter().enumerate() {
            for reference in step.inputs.iter().filter_map(InputSpec::reference) {
                match positions.get(reference) {
                    None => {
                        return Err(ConfigError::UnknownReference {
                            owner: step.name.clone(),
                            reference: reference.to_string(),
                        });
                    }
                    Some(&position) if position >= index => {
                        return Err(ConfigError::ForwardReference {
                            owner: step.name.clone(),
                            reference: reference.to_string(),
                        });
                    }
                    Some(_) => {}
                }
            }
        }

        let mut action_names = HashSet::with_capacity(wiring.len());
        for action in &wiring {
            if !action_names.insert(action.name.as_str()) {
                return Err(ConfigError::DuplicateAction(action.name.clone()));
            }

            let references = std::iter::once(action.target.as_str())
                .chain(action.args.iter().filter_map(InputSpec::reference));
            for reference in references {
                if !positions.contains_key(reference) {
                    return Err(ConfigError::UnknownReference {
                        owner: action.name.clone(),
                        reference: reference.to_string(),
                    });
                }
            }

            let expected = abi::parameter_types(&action.operation).ok_or_else(|| {
                ConfigError::MalformedOperation {
                    action: action.name.clone(),
                    operation: action.operation.clone(),
                }
            })?;
            let actual: Vec<&str> = action.args.iter().map(InputSpec::sol_type).collect();
            if expected != actual {
                return Err(ConfigError::OperationMismatch {
                    action: action.name.clone(),
                    operation: action.operation.clone(),
                    args: actual.join(","),
                });
            }
        }

        Ok(Self { steps, wiring })
    }

    /// The biometric wallet suite: authorization registry, spent-token set,
    /// consortium parameters and the wallet itself, with the wallet authorized
    /// inside the authorization unit.
    pub fn biometric_wallet() -> Result<Self, ConfigError> {
        let steps = vec![
            DeploymentStep::new("auth", UnitKind::Authorization, vec![InputSpec::Identity]),
            DeploymentStep::new("spentSet", UnitKind::SpentSet, vec![InputSpec::step("auth")]),
            DeploymentStep::new(
                "registry",
                UnitKind::ParamRegistry,
                vec![
                    InputSpec::Literal(AbiValue::Bytes(Bytes::copy_from_slice(&MASTER_PUBLIC_KEY))),
                    InputSpec::Literal(AbiValue::uint(CONSORTIUM_THRESHOLD)),
                    InputSpec::Literal(AbiValue::uint(CONSORTIUM_NODE_COUNT)),
                ],
            ),
            DeploymentStep::new(
                "wallet",
                UnitKind::BiometricWallet,
                vec![InputSpec::Identity, InputSpec::step("spentSet")],
            ),
        ];

        let wiring = vec![WiringAction::new(
            "authorizeWallet",
            "auth",
            "setAuthorized(address,bool)",
            vec![
                InputSpec::step("wallet"),
                InputSpec::Literal(AbiValue::Bool(true)),
            ],
        )];

        Self::new(steps, wiring)
    }

    pub fn steps(&self) -> &[DeploymentStep] {
        &self.steps
    }

    pub fn wiring(&self) -> &[WiringAction] {
        &self.wiring
    }

    /// Step names in declaration order.
    pub fn step_names(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|step| step.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(name: &str, inputs: Vec<InputSpec>) -> DeploymentStep {
        DeploymentStep::new(name, UnitKind::SpentSet, inputs)
    }

    #[test]
    fn test_biometric_wallet_plan_is_valid() {
        let plan = DeploymentPlan::biometric_wallet().expect("standard plan must validate");

        let names: Vec<_> = plan.step_names().collect();
        assert_eq!(names, vec!["auth", "spentSet", "registry", "wallet"]);
        assert_eq!(plan.wiring().len(), 1);
        assert_eq!(plan.wiring()[0].target, "auth");
    }

    #[test]
    fn test_registry_literals() {
        let plan = DeploymentPlan::biometric_wallet().unwrap();
        let registry = &plan.steps()[2];

        assert_eq!(registry.unit, UnitKind::ParamRegistry);
        match &registry.inputs[0] {
            InputSpec::Literal(AbiValue::Bytes(bytes)) => {
                assert_eq!(bytes.len(), 64);
                assert!(bytes.iter().all(|b| *b == 0x11));
            }
            other => panic!("unexpected registry key input: {other:?}"),
        }
        assert_eq!(registry.inputs[1], InputSpec::Literal(AbiValue::uint(1)));
        assert_eq!(registry.inputs[2], InputSpec::Literal(AbiValue::uint(3)));
    }

    #[test]
    fn test_rejects_empty_plan() {
        assert_eq!(DeploymentPlan::new(vec![], vec![]), Err(ConfigError::EmptyPlan));
    }

    #[test]
    fn test_rejects_duplicate_step() {
        let result = DeploymentPlan::new(
            vec![step("a", vec![]), step("a", vec![InputSpec::Identity])],
            vec![],
        );
        assert_eq!(result, Err(ConfigError::DuplicateStep("a".into())));
    }

    #[test]
    fn test_rejects_forward_reference() {
        let result = DeploymentPlan::new(
            vec![step("a", vec![InputSpec::step("b")]), step("b", vec![])],
            vec![],
        );
        assert_eq!(
            result,
            Err(ConfigError::ForwardReference {
                owner: "a".into(),
                reference: "b".into()
            })
        );
    }

    #[test]
    fn test_rejects_self_reference() {
        let result = DeploymentPlan::new(vec![step("a", vec![InputSpec::step("a")])], vec![]);
        assert!(matches!(result, Err(ConfigError::ForwardReference { .. })));
    }

    #[test]
    fn test_rejects_unknown_reference() {
        let result = DeploymentPlan::new(vec![step("a", vec![InputSpec::step("ghost")])], vec![]);
        assert_eq!(
            result,
            Err(ConfigError::UnknownReference {
                owner: "a".into(),
                reference: "ghost".into()
            })
        );
    }

    #[test]
    fn test_rejects_wiring_against_unknown_target() {
        let result = DeploymentPlan::new(
            vec![step("a", vec![])],
            vec![WiringAction::new("w", "b", "f()", vec![])],
        );
        assert!(matches!(result, Err(ConfigError::UnknownReference { .. })));
    }

    #[test]
    fn test_rejects_duplicate_wiring_action() {
        let action = WiringAction::new("w", "a", "f()", vec![]);
        let result = DeploymentPlan::new(vec![step("a", vec![])], vec![action.clone(), action]);
        assert_eq!(result, Err(ConfigError::DuplicateAction("w".into())));
    }

    #[test]
    fn test_wiring_may_reference_any_step() {
        let plan = DeploymentPlan::new(
            vec![step("a", vec![]), step("b", vec![InputSpec::step("a")])],
            vec![WiringAction::new("w", "a", "f(address)", vec![InputSpec::step("b")])],
        );
        assert!(plan.is_ok());
    }

    #[test]
    fn test_rejects_operation_without_parameter_list() {
        let result = DeploymentPlan::new(
            vec![step("auth", vec![]), step("wallet", vec![])],
            vec![WiringAction::new(
                "authorizeWallet",
                "auth",
                "setAuthorized",
                vec![InputSpec::step("wallet"), InputSpec::Literal(AbiValue::Bool(true))],
            )],
        );
        assert_eq!(
            result,
            Err(ConfigError::MalformedOperation {
                action: "authorizeWallet".into(),
                operation: "setAuthorized".into(),
            })
        );
    }

    #[test]
    fn test_rejects_arguments_not_matching_operation() {
        let result = DeploymentPlan::new(
            vec![step("auth", vec![]), step("wallet", vec![])],
            vec![WiringAction::new(
                "authorizeWallet",
                "auth",
                "setAuthorized(address,bool)",
                vec![InputSpec::step("wallet")],
            )],
        );
        assert_eq!(
            result,
            Err(ConfigError::OperationMismatch {
                action: "authorizeWallet".into(),
                operation: "setAuthorized(address,bool)".into(),
                args: "address".into(),
            })
        );
    }

    #[test]
    fn test_input_types() {
        assert_eq!(InputSpec::Identity.sol_type(), "address");
        assert_eq!(InputSpec::step("auth").sol_type(), "address");
        assert_eq!(InputSpec::Literal(AbiValue::Bool(true)).sol_type(), "bool");
    }

    #[test]
    fn test_abi_value_types() {
        assert_eq!(AbiValue::Bool(true).sol_type(), "bool");
        assert_eq!(AbiValue::uint(3).sol_type(), "uint256");
        assert_eq!(AbiValue::Address(Address::ZERO).sol_type(), "address");
        assert_eq!(AbiValue::Bytes(Bytes::new()).sol_type(), "bytes");
        assert_eq!(AbiValue::FixedBytes32(B256::ZERO).sol_type(), "bytes32");
    }
}
