//! ERC-8004 validation registry calldata.
//!
//! Builds `validationRequest(address,uint256,string,bytes32)` calls against a
//! known registry address. The registry contract itself is not modelled.
//!
//! # Environment Variables
//!
//! - `AGENTKIT_VALIDATION_REGISTRY_<CHAIN_ID>` - registry address per chain

use std::collections::BTreeMap;
use std::sync::Arc;

use alloy_primitives::{Address, U256};
use async_trait::async_trait;

use super::collaborators::{
    PreparedValidationTx, RawTxRequest, ValidationRegistryClient, ValidationRegistryProvider,
    ValidationRequestParams,
};
use super::types::TxValue;
use crate::evm::{self, encode_call, keccak256, parse_address, Token};
use crate::{AgentkitError, Result};

/// Registry function called for a validation request.
pub const VALIDATION_REQUEST_SIGNATURE: &str = "validationRequest(address,uint256,string,bytes32)";

/// Environment variable prefix for registry addresses.
pub const VALIDATION_REGISTRY_ENV_PREFIX: &str = "AGENTKIT_VALIDATION_REGISTRY_";

/// Request hash used when the caller supplies none:
/// `keccak256(uint256 agentId || address validator || bytes requestUri)`,
/// packed without padding.
pub fn derive_request_hash(agent_id: U256, validator: &Address, request_uri: &str) -> [u8; 32] {
    let mut packed = Vec::with_capacity(32 + 20 + request_uri.len());
    packed.extend_from_slice(&agent_id.to_be_bytes::<32>());
    packed.extend_from_slice(validator.as_slice());
    packed.extend_from_slice(request_uri.as_bytes());
    keccak256(packed)
}

/// Calldata builder for one registry deployment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Erc8004ValidationRegistry {
    address: Address,
}

impl Erc8004ValidationRegistry {
    /// Client for the registry at `address`.
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    /// Registry address.
    pub fn address(&self) -> Address {
        self.address
    }

    fn request_hash_bytes(params: &ValidationRequestParams, validator: &Address) -> Result<[u8; 32]> {
        match params.request_hash.as_deref() {
            Some(supplied) => {
                let bytes = evm::decode_hex(supplied)
                    .filter(|b| b.len() == 32)
                    .ok_or_else(|| {
                        AgentkitError::Serialization(format!(
                            "request hash must be 32 bytes of hex: {}",
                            supplied
                        ))
                    })?;
                let mut out = [0u8; 32];
                out.copy_from_slice(&bytes);
                Ok(out)
            }
            None => Ok(derive_request_hash(
                params.agent_id,
                validator,
                params.request_uri.as_deref().unwrap_or_default(),
            )),
        }
    }
}

#[async_trait]
impl ValidationRegistryClient for Erc8004ValidationRegistry {
    async fn prepare_validation_request_tx(
        &self,
        params: &ValidationRequestParams,
    ) -> Result<PreparedValidationTx> {
        let validator = parse_address(params.validator_address.trim())?;
        let hash = Self::request_hash_bytes(params, &validator)?;

        let data = encode_call(
            VALIDATION_REQUEST_SIGNATURE,
            &[
                Token::Address(validator),
                Token::Uint(params.agent_id),
                Token::String(params.request_uri.clone().unwrap_or_default()),
                Token::FixedBytes32(hash),
            ],
        );

        // Supplied hashes are echoed as given, not re-rendered.
        let request_hash = params
            .request_hash
            .clone()
            .unwrap_or_else(|| evm::to_hex_prefixed(hash));

        Ok(PreparedValidationTx {
            tx_request: RawTxRequest {
                to: self.address,
                data,
                value: TxValue::from(0u64),
            },
            request_hash,
        })
    }
}

/// Fixed table of registry deployments keyed by chain id.
#[derive(Clone, Debug, Default)]
pub struct StaticValidationRegistries {
    registries: BTreeMap<u64, Address>,
}

impl StaticValidationRegistries {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the deployment for `chain_id`.
    pub fn with_registry(mut self, chain_id: u64, address: Address) -> Self {
        self.registries.insert(chain_id, address);
        self
    }

    /// Deployment for `chain_id`, if known.
    pub fn registry_address(&self, chain_id: u64) -> Option<Address> {
        self.registries.get(&chain_id).copied()
    }

    /// Entries of `other` replace entries of `self`.
    pub fn merge(mut self, other: StaticValidationRegistries) -> Self {
        self.registries.extend(other.registries);
        self
    }

    /// Load from `AGENTKIT_VALIDATION_REGISTRY_<CHAIN_ID>` variables.
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Load from `(name, value)` pairs. Malformed entries are skipped.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut table = Self::new();
        for (name, value) in vars {
            let Some(suffix) = name.as_ref().strip_prefix(VALIDATION_REGISTRY_ENV_PREFIX) else {
                continue;
            };
            match (suffix.parse::<u64>(), parse_address(value.as_ref().trim())) {
                (Ok(chain_id), Ok(address)) => {
                    table.registries.insert(chain_id, address);
                }
                _ => tracing::warn!(name = name.as_ref(), "ignoring malformed registry variable"),
            }
        }
        table
    }
}

#[async_trait]
impl ValidationRegistryProvider for StaticValidationRegistries {
    async fn validation_registry(&self, chain_id: u64) -> Result<Arc<dyn ValidationRegistryClient>> {
        let address = self
            .registry_address(chain_id)
            .ok_or(AgentkitError::RegistryUnavailable { chain_id })?;
        Ok(Arc::new(Erc8004ValidationRegistry::new(address)))
    }
}
