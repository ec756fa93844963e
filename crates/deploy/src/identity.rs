//! The deployer identity: the account that signs every transaction of a run.

use alloy_core::primitives::Address;
use alloy_signer_local::{MnemonicBuilder, coins_bip39::English};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::network::DeployNetwork;

/// Account used as transaction sender and as a constructor argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    address: Address,
}

impl Identity {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    pub fn address(&self) -> Address {
        self.address
    }
}

/// Where the deployer identity comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum IdentitySource {
    /// A fixed account address.
    Address { address: Address },
    /// An account derived from a BIP-39 mnemonic (`m/44'/60'/0'/0/<index>`).
    Mnemonic {
        phrase: String,
        #[serde(default)]
        index: u32,
    },
    /// An account managed by the connected node (`eth_accounts[index]`).
    NodeAccount {
        #[serde(default)]
        index: usize,
    },
}

impl Default for IdentitySource {
    fn default() -> Self {
        Self::NodeAccount { index: 0 }
    }
}

impl IdentitySource {
    /// Derive the address of a mnemonic account without contacting the network.
    fn derive_from_mnemonic(phrase: &str, index: u32) -> Result<Address> {
        let signer = MnemonicBuilder::<English>::default()
            .phrase(phrase)
            .index(index)
            .context("Invalid mnemonic derivation index")?
            .build()
            .context("Failed to derive account from mnemonic")?;

        Ok(Address::from_slice(signer.address().as_slice()))
    }

    /// Resolve the identity. Only [`IdentitySource::NodeAccount`] queries the network.
    pub async fn resolve<N: DeployNetwork>(&self, network: &N) -> Result<Identity> {
        let address = match self {
            Self::Address { address } => *address,
            Self::Mnemonic { phrase, index } => Self::derive_from_mnemonic(phrase, *index)?,
            Self::NodeAccount { index } => {
                let accounts = network
                    .accounts()
                    .await
                    .context("Failed to list node accounts")?;
                *accounts.get(*index).with_context(|| {
                    format!(
                        "Node exposes {} account(s), cannot use account index {}",
                        accounts.len(),
                        index
                    )
                })?
            }
        };

        tracing::info!(deployer = %address, "Resolved deployer identity");
        Ok(Identity::new(address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Development mnemonic shipped with Hardhat and Anvil.
    const DEV_MNEMONIC: &str = "test test test test test test test test test test test junk";

    #[test]
    fn test_derive_dev_account_zero() {
        let address = IdentitySource::derive_from_mnemonic(DEV_MNEMONIC, 0).unwrap();
        assert_eq!(
            address,
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
                .parse::<Address>()
                .unwrap()
        );
    }

    #[test]
    fn test_derive_dev_account_one() {
        let address = IdentitySource::derive_from_mnemonic(DEV_MNEMONIC, 1).unwrap();
        assert_eq!(
            address,
            "0x70997970C51812dc3A010C7d01b50e0d17dc79C8"
                .parse::<Address>()
                .unwrap()
        );
    }

    #[test]
    fn test_invalid_mnemonic() {
        assert!(IdentitySource::derive_from_mnemonic("not a mnemonic", 0).is_err());
    }

    #[test]
    fn test_source_toml_roundtrip() {
        let source = IdentitySource::NodeAccount { index: 2 };
        let toml = toml::to_string(&source).unwrap();
        assert!(toml.contains("source = \"node_account\""));
        assert_eq!(toml::from_str::<IdentitySource>(&toml).unwrap(), source);
    }
}
