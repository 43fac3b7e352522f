//! Access to the target chain.

use std::{future::Future, time::Duration};

use alloy_core::primitives::{Address, B256, Bytes, U64, U128, U256};
use anyhow::Result;
use backon::{ExponentialBuilder, Retryable};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};
use url::Url;

use crate::rpc::{self, RpcError};

/// Number of times an idempotent read is retried on transport errors.
const READ_RETRIES: usize = 3;

/// A read-only call or gas estimation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub from: Address,
    /// `None` for contract creation.
    pub to: Option<Address>,
    pub data: Bytes,
    pub value: U256,
}

impl CallRequest {
    /// A contract-creation request carrying `data` as init code.
    pub fn create(from: Address, data: Bytes) -> Self {
        Self {
            from,
            to: None,
            data,
            value: U256::ZERO,
        }
    }

    fn to_json(&self) -> Value {
        let mut request = json!({
            "from": self.from,
            "data": self.data,
            "value": self.value,
        });
        if let Some(to) = self.to {
            request["to"] = json!(to);
        }
        request
    }
}

/// Outcome of an `eth_call`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    Success(Bytes),
    Reverted {
        message: String,
        /// Raw revert data, when the node returns it.
        data: Option<Bytes>,
    },
}

/// The fields of a transaction receipt the deployment needs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    #[serde(deserialize_with = "deserialize_u64_from_hex")]
    pub block_number: u64,
    /// `0x1` on success, `0x0` on revert. Absent on pre-Byzantium chains.
    #[serde(default)]
    pub status: Option<U64>,
    /// Address of the created contract, for creation transactions.
    #[serde(default)]
    pub contract_address: Option<Address>,
    #[serde(deserialize_with = "deserialize_u64_from_hex")]
    pub gas_used: u64,
}

impl TransactionReceipt {
    pub fn succeeded(&self) -> bool {
        self.status.is_none_or(|status| status == U64::from(1))
    }
}

/// Deserialize a u64 from a hex string (with 0x prefix).
fn deserialize_u64_from_hex<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: &str = Deserialize::deserialize(deserializer)?;
    u64::from_str_radix(s.trim_start_matches("0x"), 16).map_err(serde::de::Error::custom)
}

/// The network operations a deployment relies on.
///
/// Implemented over JSON-RPC by [`JsonRpcClient`]; tests substitute an in-memory chain.
pub trait ChainClient: Send + Sync {
    fn chain_id(&self) -> impl Future<Output = Result<u64>> + Send;

    fn block_number(&self) -> impl Future<Output = Result<u64>> + Send;

    /// Next nonce of `address`, counting pending transactions.
    fn transaction_count(&self, address: Address) -> impl Future<Output = Result<u64>> + Send;

    fn gas_price(&self) -> impl Future<Output = Result<u128>> + Send;

    fn balance(&self, address: Address) -> impl Future<Output = Result<U256>> + Send;

    fn estimate_gas(&self, request: &CallRequest) -> impl Future<Output = Result<u64>> + Send;

    /// Broadcast a signed transaction. Implementations must not retry this call.
    fn send_raw_transaction(&self, raw: &Bytes) -> impl Future<Output = Result<B256>> + Send;

    /// The receipt of `hash`, or `None` while the transaction is not mined.
    fn transaction_receipt(
        &self,
        hash: B256,
    ) -> impl Future<Output = Result<Option<TransactionReceipt>>> + Send;

    /// Execute `request` against the state at `block` without sending a transaction.
    fn call(
        &self,
        request: &CallRequest,
        block: u64,
    ) -> impl Future<Output = Result<CallOutcome>> + Send;
}

/// How long and how often to wait for a receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationOptions {
    pub timeout: Duration,
    pub poll_interval: Duration,
    /// Blocks required, counting the inclusion block.
    pub confirmations: u64,
}

/// Wait until `hash` is mined and buried under enough blocks.
///
/// Returns `None` when `timeout` elapses first. The transaction may still be mined
/// afterwards.
pub async fn await_confirmation<C: ChainClient>(
    client: &C,
    hash: B256,
    options: &ConfirmationOptions,
) -> Option<TransactionReceipt> {
    rpc::poll_until(
        "transaction receipt",
        options.timeout,
        options.poll_interval,
        || async move {
            let Some(receipt) = client.transaction_receipt(hash).await? else {
                return Ok(None);
            };

            if options.confirmations > 1 {
                let head = client.block_number().await?;
                let depth = (head + 1).saturating_sub(receipt.block_number);
                if depth < options.confirmations {
                    tracing::debug!(
                        tx_hash = %hash,
                        depth,
                        required = options.confirmations,
                        "Transaction mined, waiting for confirmations..."
                    );
                    return Ok(None);
                }
            }

            Ok::<_, anyhow::Error>(Some(receipt))
        },
    )
    .await
}

/// [`ChainClient`] over HTTP JSON-RPC.
#[derive(Debug, Clone)]
pub struct JsonRpcClient {
    client: reqwest::Client,
    url: Url,
}

impl JsonRpcClient {
    pub fn new(url: Url) -> Result<Self> {
        Ok(Self {
            client: rpc::create_client()?,
            url,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// A single request, never retried.
    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, RpcError> {
        rpc::json_rpc_call(&self.client, self.url.as_str(), method, params).await
    }

    /// An idempotent request, retried with backoff on transport errors.
    async fn read<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, RpcError> {
        (|| self.request(method, params.clone()))
            .retry(ExponentialBuilder::default().with_max_times(READ_RETRIES))
            .when(RpcError::is_transient)
            .notify(|err, delay| {
                tracing::debug!(error = %err, method, ?delay, "RPC read failed, retrying...");
            })
            .await
    }
}

impl ChainClient for JsonRpcClient {
    async fn chain_id(&self) -> Result<u64> {
        let id: U64 = self.read("eth_chainId", vec![]).await?;
        Ok(id.to())
    }

    async fn block_number(&self) -> Result<u64> {
        let number: U64 = self.read("eth_blockNumber", vec![]).await?;
        Ok(number.to())
    }

    async fn transaction_count(&self, address: Address) -> Result<u64> {
        let count: U64 = self
            .read(
                "eth_getTransactionCount",
                vec![json!(address), json!("pending")],
            )
            .await?;
        Ok(count.to())
    }

    async fn gas_price(&self) -> Result<u128> {
        let price: U128 = self.read("eth_gasPrice", vec![]).await?;
        Ok(price.to())
    }

    async fn balance(&self, address: Address) -> Result<U256> {
        Ok(self
            .read("eth_getBalance", vec![json!(address), json!("latest")])
            .await?)
    }

    async fn estimate_gas(&self, request: &CallRequest) -> Result<u64> {
        let gas: U64 = self
            .read("eth_estimateGas", vec![request.to_json()])
            .await?;
        Ok(gas.to())
    }

    async fn send_raw_transaction(&self, raw: &Bytes) -> Result<B256> {
        Ok(self
            .request("eth_sendRawTransaction", vec![json!(raw)])
            .await?)
    }

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<TransactionReceipt>> {
        Ok(self
            .read("eth_getTransactionReceipt", vec![json!(hash)])
            .await?)
    }

    async fn call(&self, request: &CallRequest, block: u64) -> Result<CallOutcome> {
        let result = self
            .read::<Bytes>(
                "eth_call",
                vec![request.to_json(), json!(format!("0x{block:x}"))],
            )
            .await;

        match result {
            Ok(output) => Ok(CallOutcome::Success(output)),
            Err(RpcError::Response { message, data, .. }) => Ok(CallOutcome::Reverted {
                message,
                data: data.and_then(|d| serde_json::from_value(d).ok()),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_from_json() {
        let receipt: TransactionReceipt = serde_json::from_value(json!({
            "transactionHash": "0x1111111111111111111111111111111111111111111111111111111111111111",
            "blockNumber": "0x1b4",
            "status": "0x1",
            "contractAddress": "0x5fbdb2315678afecb367f032d93f642f64180aa3",
            "gasUsed": "0x5208",
            "logs": []
        }))
        .unwrap();

        assert_eq!(receipt.block_number, 436);
        assert_eq!(receipt.gas_used, 21_000);
        assert!(receipt.succeeded());
        assert!(receipt.contract_address.is_some());
    }

    #[test]
    fn test_reverted_receipt() {
        let receipt: TransactionReceipt = serde_json::from_value(json!({
            "transactionHash": "0x1111111111111111111111111111111111111111111111111111111111111111",
            "blockNumber": "0x1",
            "status": "0x0",
            "contractAddress": null,
            "gasUsed": "0x1"
        }))
        .unwrap();

        assert!(!receipt.succeeded());
        assert_eq!(receipt.contract_address, None);
    }

    #[test]
    fn test_creation_request_json() {
        let request = CallRequest::create(Address::ZERO, Bytes::from_static(&[0x60, 0x80]));
        let value = request.to_json();

        assert_eq!(value["data"], "0x6080");
        assert_eq!(value["value"], "0x0");
        assert!(value.get("to").is_none());
    }
}
