//! JSON-RPC implementations of the orchestrator's collaborators.
//!
//! ## Feature Flags
//!
//! The `http-executor` feature flag must be enabled for actual HTTP requests:
//!
//! ```toml
//! [dependencies]
//! agentkit-lib = { version = "1.0", features = ["http-executor"] }
//! ```
//!
//! Without it every request fails with `Unimplemented`, while configuration,
//! presets and calldata helpers stay available.
//!
//! ## Supported Backends
//!
//! - **Bundler / paymaster** - ERC-4337 `eth_sendUserOperation`,
//!   `eth_getUserOperationReceipt` and `pm_sponsorUserOperation`
//! - **Gas prices** - `pimlico_getUserOperationGasPrice`
//! - **Identity registry** - ERC-8004 `ownerOf(uint256)` via `eth_call`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use agentkit_lib::executors::{
//!     chains::ChainEndpoints, BundlerRpcConfig, GasTier, RpcAgentRegistry, RpcBundlerConnector,
//!     RpcGasOracle,
//! };
//! use agentkit_lib::validation::{BundlerConfig, OrchestratorConfig, StaticValidationRegistries};
//!
//! let bundlers = BundlerConfig::from_env();
//! let agents = RpcAgentRegistry::new(&ChainEndpoints::from_env(), 30)?;
//! let gas = RpcGasOracle::new(&bundlers, GasTier::Fast, 3)?;
//!
//! let orchestrator = ValidationRequestOrchestrator::new(
//!     OrchestratorConfig::new(bundlers),
//!     Arc::new(agents),
//!     Arc::new(StaticValidationRegistries::from_env()),
//!     Arc::new(RpcBundlerConnector::new(BundlerRpcConfig::new())),
//! )
//! .with_gas_oracle(Arc::new(gas));
//! ```

mod bundler;
pub mod chains;
mod config;
mod gas;
mod identity;
mod jsonrpc;

pub use bundler::{RpcBundlerClient, RpcBundlerConnector, UserOperationReceiptPoller};
pub use config::{BundlerRpcConfig, GasTier, JsonRpcConfig};
pub use gas::RpcGasOracle;
pub use identity::{RpcAgentRegistry, OWNER_OF_SIGNATURE};
pub use jsonrpc::{JsonRpcClient, RpcError, RpcOutcome};
