//! Compiled contract artifacts.

use std::path::{Path, PathBuf};

use alloy_core::primitives::Bytes;
use anyhow::{Context, Result};
use serde::Deserialize;
use strum::IntoEnumIterator;

use crate::plan::UnitKind;

/// Creation bytecode as found in an artifact file.
///
/// Hardhat stores it as a plain hex string, Foundry as `{ "object": "0x..." }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ArtifactBytecode {
    Hex(Bytes),
    Object { object: Bytes },
}

#[derive(Debug, Deserialize)]
struct Artifact {
    bytecode: ArtifactBytecode,
}

/// Directory of compiled artifacts.
///
/// Both the Hardhat layout (`<root>/contracts/<Name>.sol/<Name>.json`) and the
/// Foundry layout (`<root>/<Name>.sol/<Name>.json`) are accepted.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn artifact_path(&self, unit: UnitKind) -> Result<PathBuf> {
        let name = unit.contract_name();
        let file = format!("{name}.sol/{name}.json");

        let candidates = [self.root.join("contracts").join(&file), self.root.join(&file)];
        candidates
            .iter()
            .find(|path| path.is_file())
            .cloned()
            .with_context(|| {
                format!(
                    "Artifact for {} not found under {}",
                    name,
                    self.root.display()
                )
            })
    }

    /// Load the creation bytecode of `unit`.
    pub fn bytecode(&self, unit: UnitKind) -> Result<Bytes> {
        let path = self.artifact_path(unit)?;
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read artifact {}", path.display()))?;
        let artifact: Artifact = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse artifact {}", path.display()))?;

        let bytecode = match artifact.bytecode {
            ArtifactBytecode::Hex(bytes) | ArtifactBytecode::Object { object: bytes } => bytes,
        };

        if bytecode.is_empty() {
            anyhow::bail!(
                "Artifact {} has no creation bytecode (abstract contract or interface?)",
                path.display()
            );
        }

        tracing::debug!(unit = %unit, path = %path.display(), size = bytecode.len(), "Loaded artifact");
        Ok(bytecode)
    }

    /// Check that every deployable unit has a usable artifact.
    pub fn verify_all(&self) -> Result<()> {
        for unit in UnitKind::iter() {
            self.bytecode(unit)?;
        }
        Ok(())
    }
}
