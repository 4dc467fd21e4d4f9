//! Capability traits for the services the orchestrator depends on.
//!
//! Each trait is narrow and injected at construction time. Concrete
//! JSON-RPC implementations live in [`crate::executors`]; mocks live in
//! `test_utils`.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use async_trait::async_trait;

use super::types::{
    Call, GasFees, PaymasterMode, TxValue, UserOperation, UserOperationReceipt,
};
use crate::Result;

/// An agent known to the identity registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Agent {
    /// Chain the registry lives on.
    pub chain_id: u64,
    /// Numeric agent id.
    pub agent_id: U256,
    /// Current owner, when the registry reports one.
    pub owner: Option<Address>,
}

/// Lookup of agents by numeric id.
#[async_trait]
pub trait AgentRegistry: Send + Sync {
    /// Returns `None` when no such agent exists.
    async fn get_agent(&self, chain_id: u64, agent_id: U256) -> Result<Option<Agent>>;
}

/// Input to [`ValidationRegistryClient::prepare_validation_request_tx`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationRequestParams {
    /// Agent asking for validation.
    pub agent_id: U256,
    /// Validator being asked.
    pub validator_address: String,
    /// Off-chain request payload location.
    pub request_uri: Option<String>,
    /// Caller-chosen request hash.
    pub request_hash: Option<String>,
}

/// A transaction request as produced by a registry client.
#[derive(Clone, Debug, PartialEq)]
pub struct RawTxRequest {
    /// Target contract.
    pub to: Address,
    /// Calldata.
    pub data: Vec<u8>,
    /// Value in any supported representation.
    pub value: TxValue,
}

/// Output of [`ValidationRegistryClient::prepare_validation_request_tx`].
#[derive(Clone, Debug, PartialEq)]
pub struct PreparedValidationTx {
    /// Transaction to submit.
    pub tx_request: RawTxRequest,
    /// Request hash the transaction commits to.
    pub request_hash: String,
}

/// Builds validation-request transactions for one chain.
#[async_trait]
pub trait ValidationRegistryClient: Send + Sync {
    /// Build the call asking `validator_address` to validate `agent_id`.
    async fn prepare_validation_request_tx(
        &self,
        params: &ValidationRequestParams,
    ) -> Result<PreparedValidationTx>;
}

/// Resolves the validation registry client for a chain.
#[async_trait]
pub trait ValidationRegistryProvider: Send + Sync {
    /// Fails with `RegistryUnavailable` for unknown chains.
    async fn validation_registry(&self, chain_id: u64) -> Result<Arc<dyn ValidationRegistryClient>>;
}

/// Signs ERC-4337 user operations on behalf of a smart account.
#[async_trait]
pub trait SmartAccountSigner: Send + Sync {
    /// Smart account address (the user operation `sender`).
    fn address(&self) -> Address;

    /// Entry point the account is bound to.
    fn entry_point(&self) -> Address;

    /// Build an unsigned user operation executing `calls`, with nonce and
    /// account-specific call data filled in and a dummy signature.
    async fn build_user_operation(&self, calls: &[Call]) -> Result<UserOperation>;

    /// Sign a fully populated user operation, returning the signature bytes.
    async fn sign_user_operation(&self, op: &UserOperation, chain_id: u64) -> Result<Vec<u8>>;
}

/// A wallet or account handle supplied by the caller of `execute`.
pub trait AccountClient: Send + Sync {
    /// The user operation signer, or `None` for plain key accounts.
    fn smart_account(&self) -> Option<Arc<dyn SmartAccountSigner>>;
}

/// A bundler connection bound to one signer.
#[async_trait]
pub trait BundlerClient: Send + Sync {
    /// Build, sponsor and sign a user operation for `calls`, applying `fees`
    /// verbatim when given.
    async fn prepare_user_operation(
        &self,
        calls: &[Call],
        fees: Option<&GasFees>,
    ) -> Result<UserOperation>;

    /// Submit a signed user operation, returning its hash.
    async fn send_user_operation(&self, op: &UserOperation) -> Result<String>;

    /// Wait until the user operation is included.
    async fn wait_for_user_operation_receipt(&self, hash: &str) -> Result<UserOperationReceipt>;
}

/// Opens bundler connections.
#[async_trait]
pub trait BundlerConnector: Send + Sync {
    /// Connect to `bundler_url` for `chain_id` with the given signer and
    /// paymaster mode.
    async fn connect(
        &self,
        bundler_url: &str,
        chain_id: u64,
        signer: Arc<dyn SmartAccountSigner>,
        paymaster: PaymasterMode,
    ) -> Result<Box<dyn BundlerClient>>;
}

/// Advisory gas price source.
#[async_trait]
pub trait GasOracle: Send + Sync {
    /// Recommended fee fields for the chain.
    async fn recommended_fees(&self, chain_id: u64) -> Result<GasFees>;
}
