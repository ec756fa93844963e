//! Reporting of a completed run.

use std::path::Path;

use alloy_core::primitives::Address;
use anyhow::{Context, Result};
use comfy_table::{Table, presets::UTF8_FULL};
use derive_more::Deref;
use serde::{Deserialize, Serialize, ser::SerializeMap};
use sha2::{Digest, Sha256};

use crate::{
    Identity,
    plan::{DeploymentPlan, InputSpec, UnitKind},
    resolver::AddressResolver,
};

/// The default name of the deployment manifest written after a successful run.
pub const MANIFEST_FILENAME: &str = "deployments.json";

/// A unit that went live during the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployedUnit {
    pub name: String,
    pub unit: UnitKind,
    pub address: Address,
}

/// Addresses of every step of a run that completed, including its wiring.
///
/// Only the run driver can build one, and only once the run has succeeded.
/// Serializes as a `{ step: address }` object in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Deref)]
pub struct RunResult {
    #[deref]
    units: Vec<DeployedUnit>,
}

impl RunResult {
    pub(crate) fn from_resolver(
        plan: &DeploymentPlan,
        resolver: &AddressResolver,
    ) -> Result<Self, crate::ConfigError> {
        let mut units = Vec::with_capacity(plan.steps().len());
        for step in plan.steps() {
            units.push(DeployedUnit {
                name: step.name.clone(),
                unit: step.unit,
                address: resolver.get(&step.name)?,
            });
        }
        Ok(Self { units })
    }

    /// Address of the step called `name`.
    pub fn address(&self, name: &str) -> Option<Address> {
        self.units
            .iter()
            .find(|unit| unit.name == name)
            .map(|unit| unit.address)
    }

    /// Human readable table, one row per step in declaration order.
    pub fn table(&self) -> Table {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL).set_header(vec!["Step", "Unit", "Address"]);
        for unit in &self.units {
            table.add_row(vec![
                unit.name.clone(),
                unit.unit.to_string(),
                unit.address.to_string(),
            ]);
        }
        table
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize run result")
    }
}

impl Serialize for RunResult {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.units.len()))?;
        for unit in &self.units {
            map.serialize_entry(&unit.name, &unit.address)?;
        }
        map.end()
    }
}

/// Table describing the plan, printed before anything is deployed.
pub fn plan_table(plan: &DeploymentPlan) -> Table {
    let describe = |input: &InputSpec| match input {
        InputSpec::Literal(value) => match serde_json::to_value(value) {
            Ok(json) => format!("{}: {}", value.sol_type(), json["value"]),
            Err(_) => value.sol_type().to_string(),
        },
        InputSpec::Identity => "<deployer>".to_string(),
        InputSpec::Step(name) => format!("@{}", name),
    };

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["#", "Kind", "Name", "Target", "Inputs"]);
    for (index, step) in plan.steps().iter().enumerate() {
        table.add_row(vec![
            (index + 1).to_string(),
            "deploy".to_string(),
            step.name.clone(),
            step.unit.to_string(),
            step.inputs.iter().map(describe).collect::<Vec<_>>().join("\n"),
        ]);
    }
    for (index, action) in plan.wiring().iter().enumerate() {
        table.add_row(vec![
            (plan.steps().len() + index + 1).to_string(),
            "wire".to_string(),
            action.name.clone(),
            format!("@{}.{}", action.target, action.operation),
            action.args.iter().map(describe).collect::<Vec<_>>().join("\n"),
        ]);
    }
    table
}

/// SHA-256 of the plan's canonical JSON form.
///
/// Two runs with the same hash deployed the same units with the same literal inputs.
pub fn plan_hash(plan: &DeploymentPlan) -> Result<String> {
    let json = serde_json::to_string(plan).context("Failed to serialize deployment plan")?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Record of a successful run, stored next to the deployment outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentManifest {
    pub chain_id: u64,
    pub deployer: Address,
    pub units: Vec<DeployedUnit>,
    /// SHA-256 of the deployment plan
    pub plan_hash: String,
    /// RFC 3339 timestamp of the end of the run
    pub deployed_at: String,
    /// Version of the tool that performed the deployment
    pub tool_version: String,
}

impl DeploymentManifest {
    pub fn new(
        plan: &DeploymentPlan,
        result: &RunResult,
        chain_id: u64,
        identity: &Identity,
    ) -> Result<Self> {
        Ok(Self {
            chain_id,
            deployer: identity.address(),
            units: result.units.clone(),
            plan_hash: plan_hash(plan)?,
            deployed_at: chrono::Utc::now().to_rfc3339(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    /// Save the manifest as formatted JSON.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json =
            serde_json::to_string_pretty(self).context("Failed to serialize deployment manifest")?;

        std::fs::write(path, json).context(format!(
            "Failed to write deployment manifest to {}",
            path.display()
        ))?;

        tracing::info!(path = %path.display(), "Deployment manifest saved");
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("Deployment manifest does not exist: {}", path.display());
        }

        let content = std::fs::read_to_string(path).context(format!(
            "Failed to read deployment manifest from {}",
            path.display()
        ))?;

        serde_json::from_str(&content).context("Failed to parse deployment manifest JSON")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{AbiValue, DeploymentStep, InputSpec};
    use tempdir::TempDir;

    fn completed_run() -> (DeploymentPlan, RunResult) {
        let plan = DeploymentPlan::biometric_wallet().unwrap();
        let mut resolver = AddressResolver::new();
        for (i, name) in plan.step_names().enumerate() {
            resolver.set(name, Address::repeat_byte(i as u8 + 1)).unwrap();
        }
        let result = RunResult::from_resolver(&plan, &resolver).unwrap();
        (plan, result)
    }

    #[test]
    fn test_result_json_keeps_declaration_order() {
        let (_, result) = completed_run();
        let json = serde_json::to_string(&result).unwrap();

        let positions: Vec<_> = ["auth", "spentSet", "registry", "wallet"]
            .iter()
            .map(|name| json.find(&format!("\"{}\"", name)).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{json}");
    }

    #[test]
    fn test_result_lookup() {
        let (_, result) = completed_run();
        assert_eq!(result.len(), 4);
        assert_eq!(result.address("registry"), Some(Address::repeat_byte(3)));
        assert_eq!(result.address("missing"), None);
    }

    #[test]
    fn test_result_requires_every_step() {
        let plan = DeploymentPlan::biometric_wallet().unwrap();
        let mut resolver = AddressResolver::new();
        resolver.set("auth", Address::repeat_byte(1)).unwrap();

        assert!(RunResult::from_resolver(&plan, &resolver).is_err());
    }

    #[test]
    fn test_table_lists_every_step() {
        let (_, result) = completed_run();
        let rendered = result.table().to_string();
        for name in ["auth", "spentSet", "registry", "wallet"] {
            assert!(rendered.contains(name));
        }
        assert!(rendered.contains("BiometricWallet"));
    }

    #[test]
    fn test_plan_table_describes_references() {
        let plan = DeploymentPlan::biometric_wallet().unwrap();
        let rendered = plan_table(&plan).to_string();
        assert!(rendered.contains("@spentSet"));
        assert!(rendered.contains("<deployer>"));
        assert!(rendered.contains("authorizeWallet"));
    }

    #[test]
    fn test_plan_hash_is_deterministic() {
        let plan = DeploymentPlan::biometric_wallet().unwrap();
        let hash = plan_hash(&plan).unwrap();
        assert_eq!(hash, plan_hash(&plan).unwrap());
        assert_eq!(hash.len(), 64);
    }

    #[test]
    fn test_plan_hash_changes_with_literals() {
        let plan = |flag| {
            DeploymentPlan::new(
                vec![DeploymentStep::new(
                    "auth",
                    UnitKind::Authorization,
                    vec![InputSpec::Literal(AbiValue::Bool(flag))],
                )],
                vec![],
            )
            .unwrap()
        };
        assert_ne!(plan_hash(&plan(true)).unwrap(), plan_hash(&plan(false)).unwrap());
    }

    #[test]
    fn test_manifest_save_and_load() {
        let temp_dir = TempDir::new("biowallet-test").expect("Failed to create temp dir");
        let path = temp_dir.path().join(MANIFEST_FILENAME);

        let (plan, result) = completed_run();
        let identity = Identity::new(Address::repeat_byte(0xaa));
        let manifest = DeploymentManifest::new(&plan, &result, 31337, &identity).unwrap();
        manifest.save_to_file(&path).unwrap();

        let loaded = DeploymentManifest::load_from_file(&path).unwrap();
        assert_eq!(loaded, manifest);
        assert_eq!(loaded.units.len(), 4);
        assert_eq!(loaded.deployer, identity.address());
    }

    #[test]
    fn test_manifest_load_missing_file() {
        let temp_dir = TempDir::new("biowallet-test").expect("Failed to create temp dir");
        let result = DeploymentManifest::load_from_file(&temp_dir.path().join("nope.json"));
        assert!(result.is_err());
    }
}
