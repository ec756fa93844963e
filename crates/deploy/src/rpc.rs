//! Ethereum JSON-RPC implementation of [`DeployNetwork`].

use std::time::Duration;

use alloy_core::primitives::{Address, Bytes, TxHash};
use anyhow::Context;
use backon::{ConstantBuilder, Retryable};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use url::Url;

use crate::{
    Identity, abi,
    artifacts::ArtifactStore,
    network::{DeployNetwork, TxReceipt},
    plan::{AbiValue, UnitKind},
};

/// Default timeout for a single RPC request.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Create an HTTP client configured for JSON-RPC requests.
pub fn create_client() -> Result<reqwest::Client, anyhow::Error> {
    reqwest::Client::builder()
        .timeout(DEFAULT_REQUEST_TIMEOUT)
        .build()
        .context("Failed to create HTTP client")
}

/// Make a JSON-RPC call and deserialize the result.
///
/// Returns an error if the request failed or the node answered with an error object.
pub async fn json_rpc_call<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &Url,
    method: &str,
    params: Vec<Value>,
) -> Result<T, anyhow::Error> {
    let response = client
        .post(url.clone())
        .json(&serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        }))
        .send()
        .await
        .with_context(|| format!("Failed to send {} request", method))?;

    let result: Value = response
        .json()
        .await
        .with_context(|| format!("Failed to parse {} response", method))?;

    if let Some(error) = result.get("error") {
        anyhow::bail!(
            "RPC error: {}",
            error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown")
        );
    }

    let result_value = result
        .get("result")
        .context("No result in response")?
        .clone();

    serde_json::from_value(result_value)
        .with_context(|| format!("Failed to deserialize {} result", method))
}

/// Deserialize a u64 from a hex quantity (with 0x prefix).
fn deserialize_u64_from_hex<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    parse_quantity(&s).map_err(serde::de::Error::custom)
}

fn parse_quantity(s: &str) -> Result<u64, std::num::ParseIntError> {
    u64::from_str_radix(s.trim_start_matches("0x"), 16)
}

/// Subset of `eth_getTransactionReceipt` used by the deployment run.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: TxHash,
    #[serde(deserialize_with = "deserialize_u64_from_hex")]
    status: u64,
    #[serde(deserialize_with = "deserialize_u64_from_hex")]
    block_number: u64,
    contract_address: Option<Address>,
}

impl From<RpcReceipt> for TxReceipt {
    fn from(receipt: RpcReceipt) -> Self {
        Self {
            tx_hash: receipt.transaction_hash,
            success: receipt.status == 1,
            block_number: receipt.block_number,
            contract_address: receipt.contract_address,
        }
    }
}

/// Deploys units through a node that holds (and signs for) the deployer account.
///
/// Transactions go through `eth_sendTransaction`, so the node must have the
/// identity's account unlocked (Hardhat, Anvil or a signing proxy).
#[derive(Debug, Clone)]
pub struct JsonRpcNetwork {
    client: reqwest::Client,
    url: Url,
    artifacts: ArtifactStore,
    poll_interval: Duration,
    confirmation_timeout: Duration,
}

impl JsonRpcNetwork {
    pub fn new(
        url: Url,
        artifacts: ArtifactStore,
        poll_interval: Duration,
        confirmation_timeout: Duration,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            client: create_client()?,
            url,
            artifacts,
            poll_interval,
            confirmation_timeout,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn send_transaction(
        &self,
        from: &Identity,
        to: Option<Address>,
        data: Bytes,
    ) -> anyhow::Result<TxHash> {
        let mut tx = serde_json::json!({
            "from": from.address(),
            "data": data,
        });
        if let Some(to) = to {
            tx["to"] = serde_json::json!(to);
        }

        json_rpc_call(&self.client, &self.url, "eth_sendTransaction", vec![tx]).await
    }

    async fn fetch_receipt(&self, tx_hash: TxHash) -> anyhow::Result<Option<RpcReceipt>> {
        json_rpc_call(
            &self.client,
            &self.url,
            "eth_getTransactionReceipt",
            vec![serde_json::json!(tx_hash)],
        )
        .await
    }

    /// Number of receipt polls that fit in the confirmation timeout.
    fn max_polls(&self) -> usize {
        let interval = self.poll_interval.as_millis().max(1);
        (self.confirmation_timeout.as_millis() / interval).max(1) as usize
    }
}

impl DeployNetwork for JsonRpcNetwork {
    async fn chain_id(&self) -> anyhow::Result<u64> {
        let chain_id: String = json_rpc_call(&self.client, &self.url, "eth_chainId", vec![]).await?;
        parse_quantity(&chain_id).with_context(|| format!("Invalid chain id '{}'", chain_id))
    }

    async fn accounts(&self) -> anyhow::Result<Vec<Address>> {
        json_rpc_call(&self.client, &self.url, "eth_accounts", vec![]).await
    }

    async fn submit_deployment(
        &self,
        from: &Identity,
        unit: UnitKind,
        args: &[AbiValue],
    ) -> anyhow::Result<TxHash> {
        let bytecode = self.artifacts.bytecode(unit)?;
        let init_code = abi::encode_deployment(&bytecode, args);

        self.send_transaction(from, None, init_code)
            .await
            .with_context(|| format!("Failed to submit {} creation transaction", unit))
    }

    async fn submit_call(
        &self,
        from: &Identity,
        target: Address,
        operation: &str,
        args: &[AbiValue],
    ) -> anyhow::Result<TxHash> {
        let calldata = abi::encode_call(operation, args)?;

        self.send_transaction(from, Some(target), calldata)
            .await
            .with_context(|| format!("Failed to submit {} on {}", operation, target))
    }

    /// Polls for the receipt until it shows up or the confirmation timeout
    /// elapses, including the time spent in slow RPC requests.
    async fn wait_for_receipt(&self, tx_hash: TxHash) -> anyhow::Result<TxReceipt> {
        let backoff = ConstantBuilder::default()
            .with_delay(self.poll_interval)
            .with_max_times(self.max_polls());

        let polling = (|| async move {
            self.fetch_receipt(tx_hash)
                .await?
                .with_context(|| format!("Transaction {} is not mined yet", tx_hash))
        })
        .retry(backoff)
        .notify(|err: &anyhow::Error, after: Duration| {
            tracing::trace!(error = %err, retry_in = ?after, "Receipt not available, polling again...");
        });

        let receipt = tokio::time::timeout(self.confirmation_timeout, polling)
            .await
            .map_err(anyhow::Error::from)
            .and_then(|polled| polled)
            .with_context(|| {
                format!(
                    "Transaction {} was not confirmed within {}s",
                    tx_hash,
                    self.confirmation_timeout.as_secs()
                )
            })?;

        Ok(receipt.into())
    }
}
