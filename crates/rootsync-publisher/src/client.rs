//! JSON-RPC ledger client for an EVM contract exposing
//! `setMerkleRoot(bytes32)`.
//!
//! A publication sends one `eth_sendTransaction` from an account the node
//! manages, then polls `eth_getTransactionReceipt` until the transaction is
//! mined. Failures are sorted into transient and permanent so the publisher
//! knows whether another attempt can help.

use std::time::Duration;

use reqwest::StatusCode;
use rootsync_core::{Address, Root};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha3::{Digest, Keccak256};
use tracing::{debug, info_span, warn, Instrument};

use crate::{
    error::{PublishError, Result},
    ledger::{Ledger, LedgerConfirmation, LedgerFuture},
};

/// Solidity signature of the root setter.
pub const SET_ROOT_SIGNATURE: &str = "setMerkleRoot(bytes32)";

/// JSON-RPC error codes that no retry will fix.
const PERMANENT_RPC_CODES: &[i64] = &[
    -32600, // invalid request
    -32601, // method not found
    -32602, // invalid params
    3,      // execution reverted
];

/// Connection settings for the ledger node and contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// JSON-RPC endpoint of the node.
    pub rpc_url: String,
    /// Contract holding the root (20-byte hex).
    pub contract_address: String,
    /// Account the node signs with (20-byte hex).
    pub signer_address: String,
    /// Timeout for each HTTP request.
    pub request_timeout: Duration,
    /// Interval between receipt polls.
    pub receipt_poll_interval: Duration,
    /// How long to wait for the transaction to be mined.
    pub receipt_timeout: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            contract_address: String::new(),
            signer_address: String::new(),
            request_timeout: Duration::from_secs(10),
            receipt_poll_interval: Duration::from_secs(1),
            receipt_timeout: Duration::from_secs(60),
        }
    }
}

impl LedgerConfig {
    /// Checks the URL and both account addresses.
    ///
    /// # Errors
    ///
    /// Returns `PublishError::Configuration` describing the first problem.
    pub fn validate(&self) -> Result<()> {
        let url = reqwest::Url::parse(&self.rpc_url)
            .map_err(|e| PublishError::configuration(format!("invalid rpc url: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(PublishError::configuration(format!(
                "rpc url must be http or https, got {}",
                url.scheme()
            )));
        }

        account("contract address", &self.contract_address)?;
        account("signer address", &self.signer_address)?;

        if self.receipt_poll_interval.is_zero() {
            return Err(PublishError::configuration("receipt poll interval must be positive"));
        }
        Ok(())
    }
}

fn account(label: &str, value: &str) -> Result<Address> {
    let address = Address::parse(value)
        .map_err(|e| PublishError::configuration(format!("{label}: {e}")))?;
    if address.to_bytes().len() != 20 {
        return Err(PublishError::configuration(format!("{label} must be 20 bytes, got {value}")));
    }
    Ok(address)
}

/// Encodes the calldata for `setMerkleRoot(root)`.
pub fn set_root_calldata(root: &Root) -> String {
    let selector = &Keccak256::digest(SET_ROOT_SIGNATURE.as_bytes())[..4];
    format!("0x{}{}", hex::encode(selector), hex::encode(root.as_bytes()))
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

impl RpcError {
    fn into_publish_error(self, method: &str) -> PublishError {
        let message = format!("{method} failed with rpc error {}: {}", self.code, self.message);
        if PERMANENT_RPC_CODES.contains(&self.code) {
            PublishError::permanent(message)
        } else {
            PublishError::transient(message)
        }
    }
}

/// Ledger backed by an EVM node's JSON-RPC API.
#[derive(Debug, Clone)]
pub struct JsonRpcLedger {
    client: reqwest::Client,
    config: LedgerConfig,
    contract: Address,
    signer: Address,
}

impl JsonRpcLedger {
    /// Creates a client for the configured node and contract.
    ///
    /// # Errors
    ///
    /// Returns `PublishError::Configuration` if the configuration is invalid
    /// or the HTTP client cannot be built.
    pub fn new(config: LedgerConfig) -> Result<Self> {
        config.validate()?;
        let contract = account("contract address", &config.contract_address)?;
        let signer = account("signer address", &config.signer_address)?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("rootsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PublishError::configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config, contract, signer })
    }

    /// The configuration in use.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let body = json!({ "jsonrpc": "2.0", "id": 1, "method": method, "params": params });

        let response =
            self.client.post(&self.config.rpc_url).json(&body).send().await.map_err(|e| {
                if e.is_timeout() {
                    PublishError::timeout(self.config.request_timeout)
                } else if e.is_connect() {
                    PublishError::transient(format!("connection failed: {e}"))
                } else {
                    PublishError::transient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = format!("{method} returned HTTP {status}");
            return Err(
                if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                    PublishError::transient(message)
                } else {
                    PublishError::permanent(message)
                },
            );
        }

        let parsed: RpcResponse = response
            .json()
            .await
            .map_err(|e| PublishError::transient(format!("malformed {method} response: {e}")))?;

        if let Some(error) = parsed.error {
            return Err(error.into_publish_error(method));
        }
        Ok(parsed.result.unwrap_or(Value::Null))
    }

    async fn send_transaction(&self, root: &Root) -> Result<String> {
        let params = json!([{
            "from": self.signer.as_str(),
            "to": self.contract.as_str(),
            "data": set_root_calldata(root),
        }]);

        match self.call("eth_sendTransaction", params).await? {
            Value::String(hash) => Ok(hash),
            other => Err(PublishError::transient(format!(
                "eth_sendTransaction returned no transaction hash: {other}"
            ))),
        }
    }

    async fn wait_for_receipt(&self, tx_hash: &str) -> Result<()> {
        tokio::time::timeout(self.config.receipt_timeout, self.poll_receipt(tx_hash))
            .await
            .map_err(|_| PublishError::timeout(self.config.receipt_timeout))?
    }

    async fn poll_receipt(&self, tx_hash: &str) -> Result<()> {
        loop {
            let receipt = self.call("eth_getTransactionReceipt", json!([tx_hash])).await?;
            if let Some(status) = receipt.get("status").and_then(Value::as_str) {
                return match status {
                    "0x1" => Ok(()),
                    _ => Err(PublishError::permanent(format!(
                        "transaction {tx_hash} reverted (status {status})"
                    ))),
                };
            }
            debug!(tx_hash, "transaction not mined yet");
            tokio::time::sleep(self.config.receipt_poll_interval).await;
        }
    }
}

impl Ledger for JsonRpcLedger {
    fn set_root(&self, root: Root) -> LedgerFuture<'_, LedgerConfirmation> {
        let span = info_span!("ledger_set_root", root = %root, contract = %self.contract);

        Box::pin(
            async move {
                let tx_hash = self.send_transaction(&root).await?;
                debug!(tx_hash, "root transaction submitted");

                if let Err(error) = self.wait_for_receipt(&tx_hash).await {
                    warn!(tx_hash, error = %error, "root transaction not confirmed");
                    return Err(error);
                }

                Ok(LedgerConfirmation { root, confirmation_id: tx_hash })
            }
            .instrument(span),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LedgerConfig {
        LedgerConfig {
            contract_address: format!("0x{}", "11".repeat(20)),
            signer_address: format!("0x{}", "22".repeat(20)),
            ..LedgerConfig::default()
        }
    }

    #[test]
    fn calldata_is_selector_then_root() {
        let calldata = set_root_calldata(&Root([0xab; 32]));
        let selector = hex::encode(&Keccak256::digest(SET_ROOT_SIGNATURE.as_bytes())[..4]);

        assert_eq!(calldata.len(), 2 + 8 + 64);
        assert!(calldata.starts_with(&format!("0x{selector}")));
        assert!(calldata.ends_with(&"ab".repeat(32)));
    }

    #[test]
    fn valid_config_accepted() {
        assert!(config().validate().is_ok());
        assert!(JsonRpcLedger::new(config()).is_ok());
    }

    #[test]
    fn bad_config_rejected() {
        let short_contract = LedgerConfig { contract_address: "0x1234".into(), ..config() };
        assert!(matches!(
            short_contract.validate(),
            Err(PublishError::Configuration { .. })
        ));

        let bad_url = LedgerConfig { rpc_url: "ftp://node".into(), ..config() };
        assert!(bad_url.validate().is_err());

        let missing_signer = LedgerConfig { signer_address: String::new(), ..config() };
        assert!(missing_signer.validate().is_err());
    }

    #[test]
    fn rpc_errors_classified() {
        let reverted = RpcError { code: 3, message: "execution reverted".into() };
        assert!(!reverted.into_publish_error("eth_sendTransaction").is_retryable());

        let nonce = RpcError { code: -32000, message: "nonce too low".into() };
        assert!(nonce.into_publish_error("eth_sendTransaction").is_retryable());
    }
}
