//! Agentkit library.
//!
//! Building blocks for ERC-8004 agents on EVM chains. The crate holds no
//! chain state of its own; every external service is injected through a
//! trait.
//!
//! # Features
//!
//! - **Identifiers**: Parse and canonicalize `did:8004`, `did:ethr` and UAID strings
//! - **Associated accounts**: EVM-V1 account descriptors, EIP-712 record
//!   hashing and a query facade over association stores
//! - **Validation requests**: Prepare and execute ERC-8004 validation requests
//!   as sponsored ERC-4337 user operations
//! - **Executors**: JSON-RPC bundler, gas oracle and identity registry clients
//!   (behind the `http-executor` feature)
//!
//! # Example
//!
//! ```
//! use agentkit_lib::associations::{decode_evm_v1, encode_evm_v1};
//! use agentkit_lib::identifiers::AgentIdentifier;
//!
//! let id = AgentIdentifier::parse("did%3A8004%3A84532%3A7").unwrap();
//! assert_eq!(id.canonical(), "did:8004:84532:7");
//!
//! let bytes = encode_evm_v1(84532, "0x00000000000000000000000000000000000000aa").unwrap();
//! let account = decode_evm_v1(&bytes).unwrap();
//! assert_eq!(account.chain_id, 84532);
//! ```

pub mod associations;
pub mod errors;
pub mod evm;
pub mod executors;
pub mod identifiers;
pub mod prelude;
pub mod validation;

/// Test utilities for orchestrator and association testing.
///
/// This module is only available with the `test-utils` feature or in test builds.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use errors::{AgentkitError, AgentkitErrorCode};

/// Common result alias for agentkit operations.
pub type Result<T> = std::result::Result<T, AgentkitError>;
