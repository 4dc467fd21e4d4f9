//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use agentkit_lib::prelude::*;
//! ```
//!
//! ## What's Included
//!
//! - Error types: `AgentkitError`, `AgentkitErrorCode`, `Result`
//! - Identifiers: `AgentIdentifier`, `Did8004`, `DidEthr`, `Uaid`
//! - Associations: `AccountDescriptor`, `AssociationRecord`, `SignedAssociation`,
//!   `AssociationStore`
//! - Validation: `ValidationRequestOrchestrator` and its collaborator traits

// Error handling
pub use crate::errors::{AgentkitError, AgentkitErrorCode};
pub use crate::Result;

// Identifiers
pub use crate::identifiers::{canonicalize_uaid, AgentIdentifier, Did8004, DidEthr, Uaid};

// Associations
pub use crate::associations::{
    decode_evm_v1, encode_evm_v1, structured_hash, AccountDescriptor, AssociationId,
    AssociationRecord, AssociationStore, MemoryAssociationStore, SignedAssociation, Uint40,
};

// Validation
pub use crate::validation::{
    AccountClient, AgentRegistry, BundlerClient, BundlerConfig, BundlerConnector, ExecutionMode,
    ExecutionStep, GasOracle, OrchestratorConfig, PrepareOptions, SmartAccountSigner,
    ValidationRegistryProvider, ValidationRequestOrchestrator, ValidationRequestPlan,
    ValidationRequestResult,
};
