//! Mock collaborators for orchestrator testing.
//!
//! Every mock records what it was asked and can be told to fail or stall.
//! Locks are test-only, so poisoning panics.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use alloy_primitives::{Address, U256};
use async_trait::async_trait;

use super::fixtures::TestFixtures;
use crate::evm::{format_address, to_hex_prefixed};
use crate::executors::chains::ENTRY_POINT_V07;
use crate::validation::{
    AccountClient, Agent, AgentRegistry, BundlerClient, BundlerConfig, BundlerConnector, Call,
    GasFees, GasOracle, OrchestratorConfig, PaymasterMode, PreparedValidationTx, RawTxRequest,
    SmartAccountSigner, TxValue, UserOperation, UserOperationReceipt, ValidationRegistryClient,
    ValidationRegistryProvider, ValidationRequestOrchestrator, ValidationRequestParams,
};
use crate::{AgentkitError, Result};

// ============================================================================
// Agent registry
// ============================================================================

/// In-memory agent registry.
#[derive(Default)]
pub struct MockAgentRegistry {
    agents: RwLock<HashMap<(u64, U256), Agent>>,
    failure: RwLock<Option<AgentkitError>>,
}

impl MockAgentRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent.
    pub fn insert(&self, chain_id: u64, agent_id: u64) {
        let agent_id = U256::from(agent_id);
        self.agents.write().unwrap().insert(
            (chain_id, agent_id),
            Agent {
                chain_id,
                agent_id,
                owner: Some(TestFixtures::smart_account()),
            },
        );
    }

    /// Fail every lookup with `err`.
    pub fn fail_with(&self, err: AgentkitError) {
        *self.failure.write().unwrap() = Some(err);
    }
}

#[async_trait]
impl AgentRegistry for MockAgentRegistry {
    async fn get_agent(&self, chain_id: u64, agent_id: U256) -> Result<Option<Agent>> {
        if let Some(err) = self.failure.read().unwrap().clone() {
            return Err(err);
        }
        Ok(self.agents.read().unwrap().get(&(chain_id, agent_id)).cloned())
    }
}

// ============================================================================
// Validation registry
// ============================================================================

/// Registry client returning a fixed transaction and hash.
pub struct MockValidationRegistryClient {
    to: Address,
    value: RwLock<TxValue>,
    last_params: RwLock<Option<ValidationRequestParams>>,
}

impl MockValidationRegistryClient {
    /// Client targeting [`TestFixtures::REGISTRY`] with value `0`.
    pub fn new() -> Self {
        Self {
            to: TestFixtures::registry(),
            value: RwLock::new(TxValue::from(0u64)),
            last_params: RwLock::new(None),
        }
    }

    /// Value placed in the returned transaction.
    pub fn set_value(&self, value: TxValue) {
        *self.value.write().unwrap() = value;
    }

    /// Parameters of the most recent call.
    pub fn last_params(&self) -> Option<ValidationRequestParams> {
        self.last_params.read().unwrap().clone()
    }
}

impl Default for MockValidationRegistryClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ValidationRegistryClient for MockValidationRegistryClient {
    async fn prepare_validation_request_tx(
        &self,
        params: &ValidationRequestParams,
    ) -> Result<PreparedValidationTx> {
        *self.last_params.write().unwrap() = Some(params.clone());

        let mut data = vec![0xaa, 0xf4, 0x00, 0xc4];
        data.extend_from_slice(&params.agent_id.to_be_bytes::<32>());

        Ok(PreparedValidationTx {
            tx_request: RawTxRequest {
                to: self.to,
                data,
                value: self.value.read().unwrap().clone(),
            },
            request_hash: TestFixtures::REGISTRY_REQUEST_HASH.to_string(),
        })
    }
}

/// Provider handing out one shared client for each enabled chain.
pub struct MockValidationRegistries {
    client: Arc<MockValidationRegistryClient>,
    chains: RwLock<HashSet<u64>>,
}

impl MockValidationRegistries {
    /// Provider serving `client` on no chains.
    pub fn new(client: Arc<MockValidationRegistryClient>) -> Self {
        Self {
            client,
            chains: RwLock::new(HashSet::new()),
        }
    }

    /// Serve the client on `chain_id`.
    pub fn enable_chain(&self, chain_id: u64) {
        self.chains.write().unwrap().insert(chain_id);
    }
}

#[async_trait]
impl ValidationRegistryProvider for MockValidationRegistries {
    async fn validation_registry(
        &self,
        chain_id: u64,
    ) -> Result<Arc<dyn ValidationRegistryClient>> {
        if self.chains.read().unwrap().contains(&chain_id) {
            Ok(self.client.clone())
        } else {
            Err(AgentkitError::RegistryUnavailable { chain_id })
        }
    }
}

// ============================================================================
// Accounts
// ============================================================================

/// Deterministic smart account signer.
pub struct MockSmartAccount {
    address: Address,
}

impl MockSmartAccount {
    /// Signer for [`TestFixtures::SMART_ACCOUNT`].
    pub fn new() -> Self {
        Self {
            address: TestFixtures::smart_account(),
        }
    }
}

impl Default for MockSmartAccount {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SmartAccountSigner for MockSmartAccount {
    fn address(&self) -> Address {
        self.address
    }

    fn entry_point(&self) -> Address {
        ENTRY_POINT_V07
    }

    async fn build_user_operation(&self, calls: &[Call]) -> Result<UserOperation> {
        let call_data: Vec<u8> = calls.iter().flat_map(|c| c.data.iter().copied()).collect();
        Ok(UserOperation {
            sender: format_address(&self.address),
            nonce: "0x0".into(),
            call_data: to_hex_prefixed(call_data),
            call_gas_limit: "0x10000".into(),
            verification_gas_limit: "0x10000".into(),
            pre_verification_gas: "0x10000".into(),
            max_fee_per_gas: "0x1".into(),
            max_priority_fee_per_gas: "0x1".into(),
            signature: to_hex_prefixed([0xffu8; 65]),
            ..Default::default()
        })
    }

    async fn sign_user_operation(&self, _op: &UserOperation, _chain_id: u64) -> Result<Vec<u8>> {
        Ok(vec![0x11; 65])
    }
}

/// Account handle with or without a smart account.
#[derive(Clone)]
pub struct MockAccount {
    signer: Option<Arc<dyn SmartAccountSigner>>,
}

impl MockAccount {
    /// Account backed by [`MockSmartAccount`].
    pub fn smart() -> Self {
        Self {
            signer: Some(Arc::new(MockSmartAccount::new())),
        }
    }

    /// Plain key account without user operation support.
    pub fn eoa() -> Self {
        Self { signer: None }
    }

    /// Account backed by `signer`.
    pub fn with_signer(signer: Arc<dyn SmartAccountSigner>) -> Self {
        Self {
            signer: Some(signer),
        }
    }
}

impl AccountClient for MockAccount {
    fn smart_account(&self) -> Option<Arc<dyn SmartAccountSigner>> {
        self.signer.clone()
    }
}

// ============================================================================
// Bundler
// ============================================================================

#[derive(Default)]
struct BundlerState {
    prepare_error: Option<AgentkitError>,
    send_error: Option<AgentkitError>,
    wait_error: Option<AgentkitError>,
    receipt_delay: Option<Duration>,
    receipt_reverted: bool,
    prepared_calls: Vec<Call>,
    last_fees: Option<GasFees>,
    sent: usize,
}

/// Bundler whose connections share recorded state.
#[derive(Clone, Default)]
pub struct MockBundler {
    state: Arc<RwLock<BundlerState>>,
}

impl MockBundler {
    /// Bundler that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail `prepare_user_operation` with `err`.
    pub fn fail_prepare_with(&self, err: AgentkitError) {
        self.state.write().unwrap().prepare_error = Some(err);
    }

    /// Fail `send_user_operation` with `err`.
    pub fn fail_send_with(&self, err: AgentkitError) {
        self.state.write().unwrap().send_error = Some(err);
    }

    /// Fail `wait_for_user_operation_receipt` with `err`.
    pub fn fail_wait_with(&self, err: AgentkitError) {
        self.state.write().unwrap().wait_error = Some(err);
    }

    /// Stall every receipt wait for `delay`.
    pub fn delay_receipt(&self, delay: Duration) {
        self.state.write().unwrap().receipt_delay = Some(delay);
    }

    /// Report receipts with `success = false`.
    pub fn revert_receipts(&self) {
        self.state.write().unwrap().receipt_reverted = true;
    }

    /// Calls passed to the latest `prepare_user_operation`.
    pub fn prepared_calls(&self) -> Vec<Call> {
        self.state.read().unwrap().prepared_calls.clone()
    }

    /// Fees passed to the latest `prepare_user_operation`.
    pub fn last_fees(&self) -> Option<GasFees> {
        self.state.read().unwrap().last_fees.clone()
    }

    /// Number of submitted user operations.
    pub fn sent_count(&self) -> usize {
        self.state.read().unwrap().sent
    }
}

#[async_trait]
impl BundlerClient for MockBundler {
    async fn prepare_user_operation(
        &self,
        calls: &[Call],
        fees: Option<&GasFees>,
    ) -> Result<UserOperation> {
        {
            let mut state = self.state.write().unwrap();
            if let Some(err) = state.prepare_error.clone() {
                return Err(err);
            }
            state.prepared_calls = calls.to_vec();
            state.last_fees = fees.cloned();
        }

        let signer = MockSmartAccount::new();
        let mut op = signer.build_user_operation(calls).await?;
        if let Some(fees) = fees {
            op.merge_fields(fees)?;
        }
        op.signature = to_hex_prefixed(signer.sign_user_operation(&op, 0).await?);
        Ok(op)
    }

    async fn send_user_operation(&self, _op: &UserOperation) -> Result<String> {
        let mut state = self.state.write().unwrap();
        if let Some(err) = state.send_error.clone() {
            return Err(err);
        }
        state.sent += 1;
        Ok(TestFixtures::USER_OP_HASH.to_string())
    }

    async fn wait_for_user_operation_receipt(&self, hash: &str) -> Result<UserOperationReceipt> {
        let (delay, error, reverted) = {
            let state = self.state.read().unwrap();
            (state.receipt_delay, state.wait_error.clone(), state.receipt_reverted)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = error {
            return Err(err);
        }
        Ok(UserOperationReceipt {
            user_op_hash: hash.to_string(),
            transaction_hash: TestFixtures::TX_HASH.to_string(),
            success: !reverted,
        })
    }
}

/// Connector that records connections and hands out a shared [`MockBundler`].
#[derive(Default)]
pub struct MockBundlerConnector {
    bundler: MockBundler,
    connections: RwLock<Vec<(String, u64, PaymasterMode)>>,
    failure: RwLock<Option<AgentkitError>>,
}

impl MockBundlerConnector {
    /// Connector serving `bundler`.
    pub fn new(bundler: MockBundler) -> Self {
        Self {
            bundler,
            connections: RwLock::new(Vec::new()),
            failure: RwLock::new(None),
        }
    }

    /// Fail every connection attempt with `err`.
    pub fn fail_with(&self, err: AgentkitError) {
        *self.failure.write().unwrap() = Some(err);
    }

    /// `(url, chain id, paymaster)` of every connection so far.
    pub fn connections(&self) -> Vec<(String, u64, PaymasterMode)> {
        self.connections.read().unwrap().clone()
    }
}

#[async_trait]
impl BundlerConnector for MockBundlerConnector {
    async fn connect(
        &self,
        bundler_url: &str,
        chain_id: u64,
        _signer: Arc<dyn SmartAccountSigner>,
        paymaster: PaymasterMode,
    ) -> Result<Box<dyn BundlerClient>> {
        if let Some(err) = self.failure.read().unwrap().clone() {
            return Err(err);
        }
        self.connections
            .write()
            .unwrap()
            .push((bundler_url.to_string(), chain_id, paymaster));
        Ok(Box::new(self.bundler.clone()))
    }
}

// ============================================================================
// Gas oracle
// ============================================================================

enum GasBehavior {
    Fees(GasFees),
    Fail(AgentkitError),
    Delay(Duration),
}

/// Gas oracle with switchable behaviour.
pub struct MockGasOracle {
    behavior: RwLock<GasBehavior>,
    calls: RwLock<usize>,
}

impl MockGasOracle {
    /// Oracle returning [`TestFixtures::MAX_FEE_PER_GAS`] fees.
    pub fn new() -> Self {
        let mut fees = GasFees::new();
        fees.insert("maxFeePerGas".into(), TestFixtures::MAX_FEE_PER_GAS.into());
        fees.insert("maxPriorityFeePerGas".into(), "0x3b9aca00".into());
        Self {
            behavior: RwLock::new(GasBehavior::Fees(fees)),
            calls: RwLock::new(0),
        }
    }

    /// Answer lookups with `fees`.
    pub fn set_fees(&self, fees: GasFees) {
        *self.behavior.write().unwrap() = GasBehavior::Fees(fees);
    }

    /// Fail lookups with `err`.
    pub fn fail_with(&self, err: AgentkitError) {
        *self.behavior.write().unwrap() = GasBehavior::Fail(err);
    }

    /// Stall lookups for `delay`, then fail.
    pub fn delay(&self, delay: Duration) {
        *self.behavior.write().unwrap() = GasBehavior::Delay(delay);
    }

    /// Number of lookups so far.
    pub fn call_count(&self) -> usize {
        *self.calls.read().unwrap()
    }
}

impl Default for MockGasOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GasOracle for MockGasOracle {
    async fn recommended_fees(&self, _chain_id: u64) -> Result<GasFees> {
        *self.calls.write().unwrap() += 1;
        let delay = {
            let behavior = self.behavior.read().unwrap();
            match &*behavior {
                GasBehavior::Fees(fees) => return Ok(fees.clone()),
                GasBehavior::Fail(err) => return Err(err.clone()),
                GasBehavior::Delay(delay) => *delay,
            }
        };
        tokio::time::sleep(delay).await;
        Err(AgentkitError::Transport("gas oracle stalled".into()))
    }
}

// ============================================================================
// Harness
// ============================================================================

/// Fully wired set of mocks around one orchestrator configuration.
///
/// Out of the box, agent [`TestFixtures::AGENT_ID`] exists on
/// [`TestFixtures::CHAIN_ID`], which has a registry and a bundler.
pub struct TestHarness {
    pub agents: Arc<MockAgentRegistry>,
    pub registry_client: Arc<MockValidationRegistryClient>,
    pub registries: Arc<MockValidationRegistries>,
    pub bundler: MockBundler,
    pub connector: Arc<MockBundlerConnector>,
    pub gas_oracle: Arc<MockGasOracle>,
    pub config: OrchestratorConfig,
}

impl TestHarness {
    /// Default harness.
    pub fn new() -> Self {
        let agents = Arc::new(MockAgentRegistry::new());
        agents.insert(TestFixtures::CHAIN_ID, TestFixtures::AGENT_ID);

        let registry_client = Arc::new(MockValidationRegistryClient::new());
        let registries = Arc::new(MockValidationRegistries::new(registry_client.clone()));
        registries.enable_chain(TestFixtures::CHAIN_ID);

        let bundler = MockBundler::new();
        let connector = Arc::new(MockBundlerConnector::new(bundler.clone()));

        let config = OrchestratorConfig::new(
            BundlerConfig::new().with_bundler(TestFixtures::CHAIN_ID, TestFixtures::BUNDLER_URL),
        );

        Self {
            agents,
            registry_client,
            registries,
            bundler,
            connector,
            gas_oracle: Arc::new(MockGasOracle::new()),
            config,
        }
    }

    /// Orchestrator over the mocks, with the gas oracle attached.
    pub fn orchestrator(&self) -> ValidationRequestOrchestrator {
        self.orchestrator_with_config(self.config.clone())
    }

    /// Orchestrator over the mocks with a custom configuration.
    pub fn orchestrator_with_config(&self, config: OrchestratorConfig) -> ValidationRequestOrchestrator {
        ValidationRequestOrchestrator::new(
            config,
            self.agents.clone(),
            self.registries.clone(),
            self.connector.clone(),
        )
        .with_gas_oracle(self.gas_oracle.clone())
    }

    /// Orchestrator over the mocks without a gas oracle.
    pub fn orchestrator_without_gas_oracle(&self) -> ValidationRequestOrchestrator {
        ValidationRequestOrchestrator::new(
            self.config.clone(),
            self.agents.clone(),
            self.registries.clone(),
            self.connector.clone(),
        )
    }

    /// Account able to sign user operations.
    pub fn smart_account(&self) -> MockAccount {
        MockAccount::smart()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
