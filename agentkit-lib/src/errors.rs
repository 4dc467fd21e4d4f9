//! Error types for agentkit operations.
//!
//! Every failure surfaced by `prepare`/`execute`, the identifier parsers and
//! the descriptor codec maps to a stable [`AgentkitErrorCode`] while keeping the
//! underlying message for diagnostics.

use std::fmt;

/// Error codes for FFI and mobile integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum AgentkitErrorCode {
    /// Feature not compiled in or not implemented
    Unimplemented = 1000,
    /// Malformed agent identifier
    InvalidIdentifier = 2000,
    /// Identifier notation not accepted by this operation
    UnsupportedIdentifier = 2001,
    /// Malformed 20-byte EVM address
    InvalidAddress = 2002,
    /// Validator address missing from the request
    MissingValidator = 3000,
    /// Execution mode not supported
    UnsupportedMode = 3001,
    /// Agent lookup returned nothing
    AgentNotFound = 4000,
    /// No validation registry for the chain
    RegistryUnavailable = 4001,
    /// No bundler configured for the chain
    BundlerUnavailable = 4002,
    /// Account client cannot sign user operations
    AccountNotSmartAccount = 5000,
    /// Validation request already recorded on-chain
    AlreadyExists = 6000,
    /// Any other on-chain or transport failure during execution
    ExecutionFailed = 6001,
    /// Transport/network layer error
    Transport = 7000,
    /// Connection timeout
    ConnectionTimeout = 7001,
    /// Serialization error
    Serialization = 8000,
    /// Internal/unexpected error
    Internal = 9999,
}

/// Comprehensive error type for agentkit operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentkitError {
    /// Feature not compiled in or not implemented yet.
    Unimplemented(&'static str),

    /// The identifier string is malformed.
    InvalidIdentifier {
        /// Input as received (after percent-decoding where applicable)
        input: String,
        /// Reason for rejection
        reason: String,
    },

    /// The identifier is well-formed but its notation is not accepted here.
    UnsupportedIdentifier {
        /// Notation that was supplied (e.g. `did:ethr`)
        notation: String,
    },

    /// An address argument is not `0x` followed by 40 hex characters.
    InvalidAddress(String),

    /// The validator address was absent or blank.
    MissingValidator,

    /// The requested execution mode is not supported.
    UnsupportedMode(String),

    /// The agent registry has no agent with this id.
    AgentNotFound {
        /// Chain the lookup ran against
        chain_id: u64,
        /// Agent id as a decimal string
        agent_id: String,
    },

    /// No validation registry is known for the chain.
    RegistryUnavailable {
        /// Chain id
        chain_id: u64,
    },

    /// No bundler endpoint is configured for the chain.
    BundlerUnavailable {
        /// Chain id
        chain_id: u64,
    },

    /// The supplied account client cannot sign user operations.
    AccountNotSmartAccount,

    /// A validation request for this agent/validator pair already exists.
    AlreadyExists {
        /// Original collaborator message
        message: String,
    },

    /// Execution failed for any other reason.
    ExecutionFailed {
        /// Original collaborator message
        message: String,
    },

    /// Transport/network layer error.
    Transport(String),

    /// Connection timeout.
    ConnectionTimeout {
        /// Operation that timed out
        operation: String,
        /// Timeout duration in milliseconds
        timeout_ms: u64,
    },

    /// Serialization/deserialization error.
    Serialization(String),

    /// Internal/unexpected error.
    Internal(String),
}

impl AgentkitError {
    /// Get the error code for FFI/mobile integration.
    pub fn code(&self) -> AgentkitErrorCode {
        match self {
            Self::Unimplemented(_) => AgentkitErrorCode::Unimplemented,
            Self::InvalidIdentifier { .. } => AgentkitErrorCode::InvalidIdentifier,
            Self::UnsupportedIdentifier { .. } => AgentkitErrorCode::UnsupportedIdentifier,
            Self::InvalidAddress(_) => AgentkitErrorCode::InvalidAddress,
            Self::MissingValidator => AgentkitErrorCode::MissingValidator,
            Self::UnsupportedMode(_) => AgentkitErrorCode::UnsupportedMode,
            Self::AgentNotFound { .. } => AgentkitErrorCode::AgentNotFound,
            Self::RegistryUnavailable { .. } => AgentkitErrorCode::RegistryUnavailable,
            Self::BundlerUnavailable { .. } => AgentkitErrorCode::BundlerUnavailable,
            Self::AccountNotSmartAccount => AgentkitErrorCode::AccountNotSmartAccount,
            Self::AlreadyExists { .. } => AgentkitErrorCode::AlreadyExists,
            Self::ExecutionFailed { .. } => AgentkitErrorCode::ExecutionFailed,
            Self::Transport(_) => AgentkitErrorCode::Transport,
            Self::ConnectionTimeout { .. } => AgentkitErrorCode::ConnectionTimeout,
            Self::Serialization(_) => AgentkitErrorCode::Serialization,
            Self::Internal(_) => AgentkitErrorCode::Internal,
        }
    }

    /// Get the error message as an owned String (useful for FFI).
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Returns true if this error is potentially recoverable by retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::ConnectionTimeout { .. })
    }

    /// Returns true for outcomes the caller is expected to handle rather than
    /// report, such as a duplicate validation request.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. }) || self.is_retryable()
    }

    /// Returns true when the error already carries a stable domain kind and
    /// must not be re-classified from its message text.
    pub fn is_domain_kind(&self) -> bool {
        !matches!(
            self,
            Self::Transport(_)
                | Self::ConnectionTimeout { .. }
                | Self::Serialization(_)
                | Self::Internal(_)
                | Self::Unimplemented(_)
        )
    }

    /// Create a transport error from any error type.
    pub fn transport<E: std::error::Error>(err: E) -> Self {
        Self::Transport(err.to_string())
    }

    /// Create an invalid identifier error.
    pub fn invalid_identifier(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Create an execution failure carrying the original message.
    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            message: message.into(),
        }
    }
}

impl fmt::Display for AgentkitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unimplemented(label) => write!(f, "{} is not implemented", label),
            Self::InvalidIdentifier { input, reason } => {
                write!(f, "invalid identifier '{}': {}", input, reason)
            }
            Self::UnsupportedIdentifier { notation } => {
                write!(f, "unsupported identifier notation: {}", notation)
            }
            Self::InvalidAddress(addr) => write!(f, "invalid address: {}", addr),
            Self::MissingValidator => write!(f, "validator address is required"),
            Self::UnsupportedMode(mode) => write!(f, "unsupported execution mode: {}", mode),
            Self::AgentNotFound { chain_id, agent_id } => {
                write!(f, "agent {} not found on chain {}", agent_id, chain_id)
            }
            Self::RegistryUnavailable { chain_id } => {
                write!(f, "no validation registry for chain {}", chain_id)
            }
            Self::BundlerUnavailable { chain_id } => {
                write!(f, "no bundler configured for chain {}", chain_id)
            }
            Self::AccountNotSmartAccount => {
                write!(f, "account client does not support user operation signing")
            }
            Self::AlreadyExists { message } => {
                write!(f, "validation request already exists: {}", message)
            }
            Self::ExecutionFailed { message } => write!(f, "execution failed: {}", message),
            Self::Transport(msg) => write!(f, "transport error: {}", msg),
            Self::ConnectionTimeout {
                operation,
                timeout_ms,
            } => {
                write!(f, "{} timed out after {}ms", operation, timeout_ms)
            }
            Self::Serialization(msg) => write!(f, "serialization error: {}", msg),
            Self::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for AgentkitError {}

impl From<serde_json::Error> for AgentkitError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = AgentkitError::BundlerUnavailable { chain_id: 10 };
        assert_eq!(err.code(), AgentkitErrorCode::BundlerUnavailable);
        assert!(!err.is_retryable());

        let err = AgentkitError::Transport("reset".into());
        assert!(err.is_retryable());
        assert!(!err.is_domain_kind());
    }

    #[test]
    fn test_error_display_keeps_original_message() {
        let err = AgentkitError::execution_failed("execution reverted: 0xdeadbeef");
        assert!(err.to_string().contains("0xdeadbeef"));

        let err = AgentkitError::AlreadyExists {
            message: "request exists".into(),
        };
        assert!(err.to_string().contains("request exists"));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_helper_constructors() {
        let err = AgentkitError::invalid_identifier("did:8004:1", "too few segments");
        assert_eq!(err.code(), AgentkitErrorCode::InvalidIdentifier);
        assert!(err.is_domain_kind());
    }
}
