//! Validation request orchestration.
//!
//! A validation request asks a validator to attest to an agent registered
//! under a `did:8004` identifier. The flow is split in two:
//!
//! 1. [`ValidationRequestOrchestrator::prepare`] resolves the agent, asks the
//!    chain's validation registry for calldata and picks the chain's bundler.
//! 2. [`ValidationRequestOrchestrator::execute`] sends the resulting plan as
//!    one sponsored ERC-4337 user operation and waits for the receipt.
//!
//! All external services are reached through the traits in this module, so
//! any stack (the JSON-RPC [`crate::executors`], an SDK wrapper, test mocks)
//! can be plugged in.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use agentkit_lib::validation::*;
//!
//! let config = OrchestratorConfig::new(BundlerConfig::from_env());
//! let orchestrator = ValidationRequestOrchestrator::new(config, agents, registries, connector)
//!     .with_gas_oracle(gas_oracle);
//!
//! let plan = orchestrator
//!     .prepare("did:8004:84532:42", "0xValidator...", &PrepareOptions::new())
//!     .await?;
//! let result = orchestrator
//!     .execute(&plan, &account, |step| println!("{}", step))
//!     .await?;
//! println!("tx {}", result.tx_hash);
//! ```

mod classify;
mod collaborators;
mod config;
mod erc8004;
mod orchestrator;
mod phase;
mod types;

pub use classify::{
    FailureClassifier, FailureKind, FailurePattern, DUPLICATE_REQUEST_ERRORS, EXISTS_SUBSTRING,
};
pub use collaborators::{
    AccountClient, Agent, AgentRegistry, BundlerClient, BundlerConnector, GasOracle,
    PreparedValidationTx, RawTxRequest, SmartAccountSigner, ValidationRegistryClient,
    ValidationRegistryProvider, ValidationRequestParams,
};
pub use config::{BundlerConfig, OrchestratorConfig, BUNDLER_URL_ENV_PREFIX};
pub use erc8004::{
    derive_request_hash, Erc8004ValidationRegistry, StaticValidationRegistries,
    VALIDATION_REGISTRY_ENV_PREFIX, VALIDATION_REQUEST_SIGNATURE,
};
pub use orchestrator::ValidationRequestOrchestrator;
pub use phase::ValidationPhase;
pub use types::{
    fee_quantity, Call, ExecutionMode, ExecutionStep, GasFees, PaymasterMode, PlanMetadata, PrepareOptions,
    TxValue, UserOperation, UserOperationReceipt, ValidationRequestPlan, ValidationRequestResult,
};
