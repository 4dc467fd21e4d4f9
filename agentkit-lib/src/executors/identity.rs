//! ERC-8004 identity registry lookups over `eth_call`.

use std::collections::BTreeMap;

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use serde_json::json;

use super::chains::ChainEndpoints;
use super::config::JsonRpcConfig;
use super::jsonrpc::JsonRpcClient;
use crate::evm::{decode_address_word, decode_hex, encode_call, format_address, to_hex_prefixed, Token};
use crate::validation::{Agent, AgentRegistry};
use crate::{AgentkitError, Result};

/// Registry function answering who owns an agent id.
pub const OWNER_OF_SIGNATURE: &str = "ownerOf(uint256)";

struct RegistryEndpoint {
    rpc: JsonRpcClient,
    registry: Address,
}

/// Agent registry reading `ownerOf(agentId)` from each chain's identity
/// registry. A revert or the zero owner means the agent does not exist.
pub struct RpcAgentRegistry {
    endpoints: BTreeMap<u64, RegistryEndpoint>,
}

impl RpcAgentRegistry {
    /// One client per chain that has both an identity registry and an RPC URL.
    pub fn new(chains: &ChainEndpoints, timeout_secs: u64) -> Result<Self> {
        let mut endpoints = BTreeMap::new();
        for chain_id in chains.registry_chains() {
            let (Some(url), Some(registry)) =
                (chains.rpc_url(chain_id), chains.identity_registry(chain_id))
            else {
                continue;
            };
            endpoints.insert(
                chain_id,
                RegistryEndpoint {
                    rpc: JsonRpcClient::new(JsonRpcConfig::new(url).with_timeout(timeout_secs))?,
                    registry,
                },
            );
        }
        Ok(Self { endpoints })
    }

    /// Chains this registry can answer for.
    pub fn chain_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.endpoints.keys().copied()
    }
}

/// Owner from an `ownerOf` return value; `None` for the zero address.
fn decode_owner(result: &str) -> Result<Option<Address>> {
    let bytes = decode_hex(result)
        .ok_or_else(|| AgentkitError::Serialization(format!("ownerOf returned non-hex data: {}", result)))?;
    let owner = decode_address_word(&bytes).ok_or_else(|| {
        AgentkitError::Serialization(format!("ownerOf returned a malformed address: {}", result))
    })?;
    Ok((owner != Address::ZERO).then_some(owner))
}

#[async_trait]
impl AgentRegistry for RpcAgentRegistry {
    #[tracing::instrument(skip(self, agent_id), fields(agent_id = %agent_id))]
    async fn get_agent(&self, chain_id: u64, agent_id: U256) -> Result<Option<Agent>> {
        let endpoint = self
            .endpoints
            .get(&chain_id)
            .ok_or(AgentkitError::RegistryUnavailable { chain_id })?;

        let data = encode_call(OWNER_OF_SIGNATURE, &[Token::Uint(agent_id)]);
        let params = json!([
            { "to": format_address(&endpoint.registry), "data": to_hex_prefixed(data) },
            "latest"
        ]);

        let result = match endpoint.rpc.call::<String>("eth_call", params).await? {
            Ok(result) => result,
            Err(err) if err.is_revert() => {
                tracing::debug!(error = %err, "ownerOf reverted, treating agent as absent");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        Ok(decode_owner(&result)?.map(|owner| Agent {
            chain_id,
            agent_id,
            owner: Some(owner),
        }))
    }
}
