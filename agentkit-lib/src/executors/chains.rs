//! Chain presets and endpoint tables.
//!
//! # Environment Variables
//!
//! - `AGENTKIT_RPC_URL_<CHAIN_ID>` - node RPC URL, overrides the preset
//! - `AGENTKIT_IDENTITY_REGISTRY_<CHAIN_ID>` - ERC-8004 identity registry address
//! - `AGENTKIT_ENTRY_POINT` - ERC-4337 entry point, defaults to v0.7
//!
//! # Example
//!
//! ```rust,ignore
//! use agentkit_lib::executors::chains::{ChainEndpoints, BASE_SEPOLIA};
//!
//! let endpoints = ChainEndpoints::from_env();
//! let url = endpoints.rpc_url(BASE_SEPOLIA.chain_id);
//! ```

use std::collections::BTreeMap;

use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};

use crate::evm::parse_address;

/// ERC-4337 entry point v0.7, deployed at the same address on every chain.
pub const ENTRY_POINT_V07: Address = address!("0000000071727De22E5E9d8BAf0edAc6f37da032");

/// Environment variable prefix for node RPC URLs.
pub const RPC_URL_ENV_PREFIX: &str = "AGENTKIT_RPC_URL_";

/// Environment variable prefix for identity registry addresses.
pub const IDENTITY_REGISTRY_ENV_PREFIX: &str = "AGENTKIT_IDENTITY_REGISTRY_";

/// Environment variable overriding the entry point.
pub const ENTRY_POINT_ENV: &str = "AGENTKIT_ENTRY_POINT";

/// A known test network.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChainPreset {
    /// EIP-155 chain id.
    pub chain_id: u64,
    /// Human-readable name.
    pub name: &'static str,
    /// Public RPC endpoint.
    pub rpc_url: &'static str,
}

/// Ethereum Sepolia.
pub const SEPOLIA: ChainPreset = ChainPreset {
    chain_id: 11_155_111,
    name: "Ethereum Sepolia",
    rpc_url: "https://rpc.sepolia.org",
};

/// Base Sepolia.
pub const BASE_SEPOLIA: ChainPreset = ChainPreset {
    chain_id: 84_532,
    name: "Base Sepolia",
    rpc_url: "https://sepolia.base.org",
};

/// Optimism Sepolia.
pub const OPTIMISM_SEPOLIA: ChainPreset = ChainPreset {
    chain_id: 11_155_420,
    name: "Optimism Sepolia",
    rpc_url: "https://sepolia.optimism.io",
};

/// Linea Sepolia.
pub const LINEA_SEPOLIA: ChainPreset = ChainPreset {
    chain_id: 59_141,
    name: "Linea Sepolia",
    rpc_url: "https://rpc.sepolia.linea.build",
};

/// Every preset.
pub const PRESETS: &[ChainPreset] = &[SEPOLIA, BASE_SEPOLIA, OPTIMISM_SEPOLIA, LINEA_SEPOLIA];

/// Preset for `chain_id`, if any.
pub fn preset(chain_id: u64) -> Option<&'static ChainPreset> {
    PRESETS.iter().find(|p| p.chain_id == chain_id)
}

/// Entry point from `AGENTKIT_ENTRY_POINT`, or v0.7.
pub fn entry_point_from_env() -> Address {
    match std::env::var(ENTRY_POINT_ENV) {
        Ok(value) => parse_address(value.trim()).unwrap_or_else(|_| {
            tracing::warn!(value = %value, "ignoring malformed entry point, using v0.7");
            ENTRY_POINT_V07
        }),
        Err(_) => ENTRY_POINT_V07,
    }
}

/// Node RPC URLs and identity registries per chain.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainEndpoints {
    /// RPC URL overrides keyed by chain id.
    #[serde(default)]
    pub rpc_urls: BTreeMap<u64, String>,

    /// Identity registry addresses keyed by chain id.
    #[serde(default, with = "address_map")]
    pub identity_registries: BTreeMap<u64, Address>,
}

impl ChainEndpoints {
    /// Empty table; RPC lookups fall back to presets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the RPC URL for `chain_id`.
    pub fn with_rpc_url(mut self, chain_id: u64, url: impl Into<String>) -> Self {
        self.rpc_urls.insert(chain_id, url.into());
        self
    }

    /// Register the identity registry for `chain_id`.
    pub fn with_identity_registry(mut self, chain_id: u64, registry: Address) -> Self {
        self.identity_registries.insert(chain_id, registry);
        self
    }

    /// RPC URL for `chain_id`: the override, else the preset.
    pub fn rpc_url(&self, chain_id: u64) -> Option<&str> {
        self.rpc_urls
            .get(&chain_id)
            .map(String::as_str)
            .or_else(|| preset(chain_id).map(|p| p.rpc_url))
    }

    /// Identity registry for `chain_id`.
    pub fn identity_registry(&self, chain_id: u64) -> Option<Address> {
        self.identity_registries.get(&chain_id).copied()
    }

    /// Chains with an identity registry and a resolvable RPC URL.
    pub fn registry_chains(&self) -> impl Iterator<Item = u64> + '_ {
        self.identity_registries
            .keys()
            .copied()
            .filter(|chain_id| self.rpc_url(*chain_id).is_some())
    }

    /// Entries of `other` replace entries of `self`.
    pub fn merge(mut self, other: ChainEndpoints) -> Self {
        self.rpc_urls.extend(other.rpc_urls);
        self.identity_registries.extend(other.identity_registries);
        self
    }

    /// Load from environment variables.
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
        let mut endpoints = Self::new();
        for (name, value) in vars {
            let (name, value) = (name.as_ref(), value.as_ref().trim());

            if let Some(suffix) = name.strip_prefix(RPC_URL_ENV_PREFIX) {
                match suffix.parse::<u64>() {
                    Ok(chain_id) if !value.is_empty() => {
                        endpoints.rpc_urls.insert(chain_id, value.to_string());
                    }
                    _ => tracing::warn!(var = name, "ignoring malformed RPC URL variable"),
                }
            } else if let Some(suffix) = name.strip_prefix(IDENTITY_REGISTRY_ENV_PREFIX) {
                match (suffix.parse::<u64>(), parse_address(value)) {
                    (Ok(chain_id), Ok(address)) => {
                        endpoints.identity_registries.insert(chain_id, address);
                    }
                    _ => tracing::warn!(var = name, "ignoring malformed identity registry variable"),
                }
            }
        }
        endpoints
    }
}

mod address_map {
    use std::collections::BTreeMap;

    use alloy_primitives::Address;
    use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

    use crate::evm::{format_address, parse_address};

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<u64, Address>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        map.iter()
            .map(|(chain_id, address)| (*chain_id, format_address(address)))
            .collect::<BTreeMap<_, _>>()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<u64, Address>, D::Error> {
        BTreeMap::<u64, String>::deserialize(deserializer)?
            .into_iter()
            .map(|(chain_id, text)| {
                parse_address(text.trim())
                    .map(|address| (chain_id, address))
                    .map_err(D::Error::custom)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert_eq!(preset(84_532), Some(&BASE_SEPOLIA));
        assert_eq!(preset(11_155_420).map(|p| p.name), Some("Optimism Sepolia"));
        assert!(preset(1).is_none());
        assert_eq!(
            ENTRY_POINT_V07.to_string().to_lowercase(),
            "0x0000000071727de22e5e9d8baf0edac6f37da032"
        );
    }

    #[test]
    fn test_rpc_url_falls_back_to_preset() {
        let endpoints = ChainEndpoints::new().with_rpc_url(84_532, "http://localhost:8545");
        assert_eq!(endpoints.rpc_url(84_532), Some("http://localhost:8545"));
        assert_eq!(endpoints.rpc_url(59_141), Some(LINEA_SEPOLIA.rpc_url));
        assert_eq!(endpoints.rpc_url(1), None);
    }

    #[test]
    fn test_from_vars() {
        let endpoints = ChainEndpoints::from_vars([
            ("AGENTKIT_RPC_URL_31337", "http://127.0.0.1:8545"),
            ("AGENTKIT_RPC_URL_abc", "http://nowhere"),
            (
                "AGENTKIT_IDENTITY_REGISTRY_31337",
                "0x00000000000000000000000000000000000000fd",
            ),
            ("AGENTKIT_IDENTITY_REGISTRY_1", "nope"),
            ("PATH", "/usr/bin"),
        ]);
        assert_eq!(endpoints.rpc_url(31337), Some("http://127.0.0.1:8545"));
        assert!(endpoints.identity_registry(31337).is_some());
        assert!(endpoints.identity_registry(1).is_none());
        assert_eq!(endpoints.registry_chains().collect::<Vec<_>>(), vec![31337]);
    }

    #[test]
    fn test_serde_round_trip() {
        let endpoints = ChainEndpoints::new()
            .with_rpc_url(1, "https://node.test")
            .with_identity_registry(1, Address::repeat_byte(0xfd));
        let json = serde_json::to_string(&endpoints).unwrap();
        assert!(json.contains("identityRegistries"));
        let back: ChainEndpoints = serde_json::from_str(&json).unwrap();
        assert_eq!(back, endpoints);
    }
}
