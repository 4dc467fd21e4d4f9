//! ERC-4337 bundler and paymaster client over JSON-RPC.
//!
//! # Example
//!
//! ```rust,ignore
//! use agentkit_lib::executors::{BundlerRpcConfig, RpcBundlerConnector};
//!
//! let connector = RpcBundlerConnector::new(BundlerRpcConfig::new().with_poll_interval(1_000));
//! let orchestrator = ValidationRequestOrchestrator::new(config, agents, registries, Arc::new(connector));
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::config::{BundlerRpcConfig, JsonRpcConfig};
use super::jsonrpc::JsonRpcClient;
use crate::evm::to_hex_prefixed;
use crate::validation::{
    BundlerClient, BundlerConnector, Call, GasFees, PaymasterMode, SmartAccountSigner,
    UserOperation, UserOperationReceipt,
};
use crate::{AgentkitError, Result};

/// Opens [`RpcBundlerClient`] connections.
#[derive(Clone, Debug, Default)]
pub struct RpcBundlerConnector {
    config: BundlerRpcConfig,
}

impl RpcBundlerConnector {
    /// Create a connector with the given configuration.
    pub fn new(config: BundlerRpcConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &BundlerRpcConfig {
        &self.config
    }
}

#[async_trait]
impl BundlerConnector for RpcBundlerConnector {
    async fn connect(
        &self,
        bundler_url: &str,
        chain_id: u64,
        signer: Arc<dyn SmartAccountSigner>,
        paymaster: PaymasterMode,
    ) -> Result<Box<dyn BundlerClient>> {
        let client = RpcBundlerClient::new(
            &self.config,
            bundler_url,
            chain_id,
            signer,
            paymaster,
        )?;
        Ok(Box::new(client))
    }
}

/// A bundler endpoint bound to one smart account signer.
///
/// The bundler URL doubles as the paymaster URL, as with most hosted
/// bundler providers.
pub struct RpcBundlerClient {
    rpc: Arc<JsonRpcClient>,
    receipts: UserOperationReceiptPoller,
    chain_id: u64,
    signer: Arc<dyn SmartAccountSigner>,
    paymaster: PaymasterMode,
    entry_point: String,
    sponsorship_policy_id: Option<String>,
}

/// Signer-free access to `eth_getUserOperationReceipt`.
///
/// Used by [`RpcBundlerClient`] and by tools that only follow an operation
/// submitted elsewhere.
pub struct UserOperationReceiptPoller {
    rpc: Arc<JsonRpcClient>,
    poll_interval: Duration,
}

impl UserOperationReceiptPoller {
    /// Poll `bundler_url` at the configured interval.
    pub fn new(config: &BundlerRpcConfig, bundler_url: &str) -> Result<Self> {
        let rpc = JsonRpcClient::new(
            JsonRpcConfig::new(bundler_url).with_timeout(config.timeout_secs),
        )?;
        Ok(Self::with_client(
            Arc::new(rpc),
            Duration::from_millis(config.poll_interval_ms),
        ))
    }

    fn with_client(rpc: Arc<JsonRpcClient>, poll_interval: Duration) -> Self {
        Self { rpc, poll_interval }
    }

    /// Delay between polls.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Receipt of a user operation, or `None` while it is pending.
    pub async fn fetch(&self, hash: &str) -> Result<Option<UserOperationReceipt>> {
        let receipt: Option<RpcUserOperationReceipt> = self
            .rpc
            .request("eth_getUserOperationReceipt", json!([hash]))
            .await?;
        Ok(receipt.map(|r| UserOperationReceipt {
            user_op_hash: r.user_op_hash,
            transaction_hash: r.receipt.transaction_hash,
            success: r.success,
        }))
    }

    /// Poll until the receipt appears. Never gives up on its own; bound it
    /// with `tokio::time::timeout`.
    pub async fn wait(&self, hash: &str) -> Result<UserOperationReceipt> {
        loop {
            if let Some(receipt) = self.fetch(hash).await? {
                return Ok(receipt);
            }
            tracing::trace!(hash, "user operation pending");
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcUserOperationReceipt {
    user_op_hash: String,
    success: bool,
    receipt: RpcTransactionReceipt,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcTransactionReceipt {
    transaction_hash: String,
}

impl RpcBundlerClient {
    /// Connect to `bundler_url`.
    pub fn new(
        config: &BundlerRpcConfig,
        bundler_url: &str,
        chain_id: u64,
        signer: Arc<dyn SmartAccountSigner>,
        paymaster: PaymasterMode,
    ) -> Result<Self> {
        let rpc = Arc::new(JsonRpcClient::new(
            JsonRpcConfig::new(bundler_url).with_timeout(config.timeout_secs),
        )?);
        let receipts = UserOperationReceiptPoller::with_client(
            rpc.clone(),
            Duration::from_millis(config.poll_interval_ms),
        );
        Ok(Self {
            rpc,
            receipts,
            chain_id,
            signer,
            paymaster,
            entry_point: config.entry_point.clone(),
            sponsorship_policy_id: config.sponsorship_policy_id.clone(),
        })
    }

    /// Chain this connection submits to.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn sponsor(&self, op: &mut UserOperation) -> Result<()> {
        let mut params = vec![serde_json::to_value(&*op)?, json!(self.entry_point)];
        if let Some(policy) = &self.sponsorship_policy_id {
            params.push(json!({ "sponsorshipPolicyId": policy }));
        }

        let fields: Map<String, Value> = self
            .rpc
            .request("pm_sponsorUserOperation", Value::Array(params))
            .await?;
        tracing::debug!(fields = fields.len(), "user operation sponsored");
        op.merge_fields(&fields)
    }

    /// Receipt of a user operation, or `None` while it is pending.
    pub async fn user_operation_receipt(&self, hash: &str) -> Result<Option<UserOperationReceipt>> {
        self.receipts.fetch(hash).await
    }
}

#[async_trait]
impl BundlerClient for RpcBundlerClient {
    #[tracing::instrument(skip_all, fields(chain_id = self.chain_id, calls = calls.len()))]
    async fn prepare_user_operation(
        &self,
        calls: &[Call],
        fees: Option<&GasFees>,
    ) -> Result<UserOperation> {
        let mut op = self.signer.build_user_operation(calls).await?;
        if let Some(fees) = fees {
            op.merge_fields(fees)?;
        }
        if self.paymaster == PaymasterMode::Sponsored {
            self.sponsor(&mut op).await?;
        }

        let signature = self.signer.sign_user_operation(&op, self.chain_id).await?;
        op.signature = to_hex_prefixed(signature);
        Ok(op)
    }

    async fn send_user_operation(&self, op: &UserOperation) -> Result<String> {
        let hash: String = self
            .rpc
            .request(
                "eth_sendUserOperation",
                json!([serde_json::to_value(op)?, self.entry_point]),
            )
            .await?;
        if hash.trim().is_empty() {
            return Err(AgentkitError::Serialization(
                "bundler returned an empty user operation hash".into(),
            ));
        }
        Ok(hash)
    }

    async fn wait_for_user_operation_receipt(&self, hash: &str) -> Result<UserOperationReceipt> {
        self.receipts.wait(hash).await
    }
}
