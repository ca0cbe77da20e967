//! Ethereum JSON-RPC transport for contract reads and network status.

use crate::stake::{format_grouped, Address};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// JSON-RPC error code used by geth-style nodes for reverted calls.
const REVERT_ERROR_CODE: i64 = 3;

/// Failures of a contract read or status query.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CallError {
    #[error("execution reverted: {0}")]
    /// The contract call reverted.
    Reverted(String),
    #[error("rpc error {code}: {message}")]
    /// The node returned a non-revert JSON-RPC error.
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// Error message.
        message: String,
    },
    #[error("transport error: {0}")]
    /// HTTP-level failure or timeout.
    Transport(String),
    #[error("malformed response: {0}")]
    /// The response could not be decoded.
    Decode(String),
    #[error("connected to chain {actual}, expected {expected}")]
    /// The endpoint serves a different network.
    WrongChain {
        /// Configured chain id.
        expected: u64,
        /// Chain id reported by the node.
        actual: u64,
    },
}

impl CallError {
    /// Whether retrying on the next tick may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, CallError::Transport(_) | CallError::Rpc { .. })
    }
}

/// Gas price and head block reported by the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkStatus {
    /// Gas price in wei.
    pub gas_price_wei: u128,
    /// Latest block number.
    pub block_number: u64,
}

impl NetworkStatus {
    /// Gas price in gwei.
    pub fn gas_price_gwei(&self) -> f64 {
        self.gas_price_wei as f64 / 1e9
    }
}

impl std::fmt::Display for NetworkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "gas price {:.2} gwei, block {}",
            self.gas_price_gwei(),
            format_grouped(self.block_number as f64, 0)
        )
    }
}

/// Read-only chain access used by stake sources and the poller.
pub trait ContractReader: Send + Sync {
    /// Executes `eth_call` against `to` and returns the raw return data.
    fn call(&self, to: Address, data: Vec<u8>)
        -> impl Future<Output = Result<Vec<u8>, CallError>> + Send;

    /// Fetches gas price and head block.
    fn network_status(&self) -> impl Future<Output = Result<NetworkStatus, CallError>> + Send;
}

/// HTTP JSON-RPC client.
#[derive(Debug)]
pub struct RpcClient {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl RpcClient {
    /// Builds a client with a per-request timeout.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, CallError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CallError::Transport(format!("rpc client error: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, CallError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!(method, id, url = %self.url, "rpc request");
        let resp = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| CallError::Transport(format!("{method} request failed: {e}")))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(CallError::Transport(format!("{method} status {status}: {body}")));
        }
        let value: Value = resp
            .json()
            .await
            .map_err(|e| CallError::Decode(format!("{method} decode failed: {e}")))?;
        interpret_response(value)
    }

    /// `eth_chainId`.
    pub async fn chain_id(&self) -> Result<u64, CallError> {
        let value = self.request("eth_chainId", json!([])).await?;
        quantity_u64(&value)
    }

    /// Fails with [`CallError::WrongChain`] unless the node serves `expected`.
    pub async fn ensure_chain(&self, expected: u64) -> Result<(), CallError> {
        let actual = self.chain_id().await?;
        if actual != expected {
            warn!(expected, actual, "rpc endpoint serves a different chain");
            return Err(CallError::WrongChain { expected, actual });
        }
        Ok(())
    }

    /// `eth_gasPrice` in wei.
    pub async fn gas_price(&self) -> Result<u128, CallError> {
        let value = self.request("eth_gasPrice", json!([])).await?;
        quantity_u128(&value)
    }

    /// `eth_blockNumber`.
    pub async fn block_number(&self) -> Result<u64, CallError> {
        let value = self.request("eth_blockNumber", json!([])).await?;
        quantity_u64(&value)
    }
}

impl ContractReader for RpcClient {
    async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>, CallError> {
        let params = json!([
            { "to": to.to_string(), "data": format!("0x{}", hex::encode(&data)) },
            "latest"
        ]);
        let value = self.request("eth_call", params).await?;
        let raw = value
            .as_str()
            .ok_or_else(|| CallError::Decode("eth_call result is not a string".into()))?;
        let body = raw.strip_prefix("0x").unwrap_or(raw);
        hex::decode(body).map_err(|e| CallError::Decode(format!("eth_call result hex: {e}")))
    }

    async fn network_status(&self) -> Result<NetworkStatus, CallError> {
        let gas_price_wei = self.gas_price().await?;
        let block_number = self.block_number().await?;
        Ok(NetworkStatus {
            gas_price_wei,
            block_number,
        })
    }
}

/// Extracts `result` from a JSON-RPC response, classifying error objects.
///
/// Code 3, or a message mentioning a revert, becomes
/// [`CallError::Reverted`]; other error objects become [`CallError::Rpc`].
pub fn interpret_response(mut value: Value) -> Result<Value, CallError> {
    if let Some(err) = value.get("error").filter(|e| !e.is_null()) {
        let code = err.get("code").and_then(Value::as_i64).unwrap_or_default();
        let message = err
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        if code == REVERT_ERROR_CODE || message.to_ascii_lowercase().contains("revert") {
            return Err(CallError::Reverted(message));
        }
        return Err(CallError::Rpc { code, message });
    }
    match value.get_mut("result").map(Value::take) {
        Some(result) if !result.is_null() => Ok(result),
        _ => Err(CallError::Decode("response has no result".into())),
    }
}

/// Parses a `0x`-prefixed hex quantity.
pub fn parse_quantity(input: &str) -> Result<u128, CallError> {
    let raw = input.strip_prefix("0x").unwrap_or(input);
    if raw.is_empty() {
        return Err(CallError::Decode("empty hex quantity".into()));
    }
    u128::from_str_radix(raw, 16).map_err(|e| CallError::Decode(format!("invalid hex quantity: {e}")))
}

fn quantity_u128(value: &Value) -> Result<u128, CallError> {
    let raw = value
        .as_str()
        .ok_or_else(|| CallError::Decode("quantity is not a string".into()))?;
    parse_quantity(raw)
}

fn quantity_u64(value: &Value) -> Result<u64, CallError> {
    let wide = quantity_u128(value)?;
    u64::try_from(wide).map_err(|_| CallError::Decode(format!("quantity {wide} exceeds u64")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_is_extracted() {
        let value = json!({"jsonrpc": "2.0", "id": 1, "result": "0x10"});
        assert_eq!(interpret_response(value), Ok(json!("0x10")));
    }

    #[test]
    fn reverts_are_classified_by_code_or_message() {
        let by_code = json!({"id": 1, "error": {"code": 3, "message": "no stake"}});
        assert_eq!(
            interpret_response(by_code),
            Err(CallError::Reverted("no stake".into()))
        );
        let by_message = json!({"id": 1, "error": {"code": -32000, "message": "Execution Reverted"}});
        assert!(matches!(
            interpret_response(by_message),
            Err(CallError::Reverted(_))
        ));
    }

    #[test]
    fn other_errors_stay_rpc_errors() {
        let value = json!({"id": 1, "error": {"code": -32601, "message": "method not found"}});
        let err = interpret_response(value).unwrap_err();
        assert_eq!(
            err,
            CallError::Rpc {
                code: -32601,
                message: "method not found".into()
            }
        );
        assert!(err.is_transient());
        assert!(!CallError::Reverted(String::new()).is_transient());
    }

    #[test]
    fn missing_result_is_a_decode_error() {
        assert!(matches!(
            interpret_response(json!({"id": 1, "result": null})),
            Err(CallError::Decode(_))
        ));
        assert!(matches!(
            interpret_response(json!({"id": 1})),
            Err(CallError::Decode(_))
        ));
    }

    #[test]
    fn quantities_parse() {
        assert_eq!(parse_quantity("0x3b9aca00"), Ok(1_000_000_000));
        assert_eq!(parse_quantity("ff"), Ok(255));
        assert!(parse_quantity("0x").is_err());
        assert!(parse_quantity("0xzz").is_err());
        assert!(quantity_u64(&json!("0x1ffffffffffffffff")).is_err());
        assert!(quantity_u64(&json!(5)).is_err());
    }

    #[test]
    fn status_renders_gwei() {
        let status = NetworkStatus {
            gas_price_wei: 1_500_000_000,
            block_number: 12_345_678,
        };
        assert_eq!(status.gas_price_gwei(), 1.5);
        assert_eq!(status.to_string(), "gas price 1.50 gwei, block 12,345,678");
    }
}
