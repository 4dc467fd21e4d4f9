//! Gas price recommendations from the bundler.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::config::{GasTier, JsonRpcConfig};
use super::jsonrpc::JsonRpcClient;
use crate::validation::{BundlerConfig, GasFees, GasOracle};
use crate::{AgentkitError, Result};

/// Gas oracle calling `pimlico_getUserOperationGasPrice` on each chain's
/// bundler.
pub struct RpcGasOracle {
    clients: BTreeMap<u64, JsonRpcClient>,
    tier: GasTier,
}

impl RpcGasOracle {
    /// One client per configured bundler.
    pub fn new(bundlers: &BundlerConfig, tier: GasTier, timeout_secs: u64) -> Result<Self> {
        let mut clients = BTreeMap::new();
        for chain_id in bundlers.chain_ids() {
            let url = bundlers.bundler_url(chain_id)?;
            clients.insert(
                chain_id,
                JsonRpcClient::new(JsonRpcConfig::new(url).with_timeout(timeout_secs))?,
            );
        }
        Ok(Self { clients, tier })
    }

    /// Tier picked from each recommendation.
    pub fn tier(&self) -> GasTier {
        self.tier
    }

    fn pick_tier(&self, mut tiers: Map<String, Value>) -> Result<GasFees> {
        match tiers.remove(self.tier.as_str()) {
            Some(Value::Object(fees)) => Ok(fees),
            _ => Err(AgentkitError::Serialization(format!(
                "gas price response has no '{}' tier",
                self.tier
            ))),
        }
    }
}

#[async_trait]
impl GasOracle for RpcGasOracle {
    async fn recommended_fees(&self, chain_id: u64) -> Result<GasFees> {
        let client = self
            .clients
            .get(&chain_id)
            .ok_or(AgentkitError::BundlerUnavailable { chain_id })?;
        let tiers: Map<String, Value> = client
            .request("pimlico_getUserOperationGasPrice", json!([]))
            .await?;
        self.pick_tier(tiers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiers() -> Map<String, Value> {
        match json!({
            "slow": { "maxFeePerGas": "0x1", "maxPriorityFeePerGas": "0x1" },
            "standard": { "maxFeePerGas": "0x2", "maxPriorityFeePerGas": "0x2" },
            "fast": { "maxFeePerGas": "0x3", "maxPriorityFeePerGas": "0x3" }
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn oracle(tier: GasTier) -> RpcGasOracle {
        let bundlers = BundlerConfig::new().with_bundler(84_532, "https://bundler.test");
        RpcGasOracle::new(&bundlers, tier, 5).unwrap()
    }

    #[test]
    fn test_picks_configured_tier() {
        let fees = oracle(GasTier::Standard).pick_tier(tiers()).unwrap();
        assert_eq!(fees["maxFeePerGas"], "0x2");
        let fees = oracle(GasTier::default()).pick_tier(tiers()).unwrap();
        assert_eq!(fees["maxFeePerGas"], "0x3");
    }

    #[test]
    fn test_missing_tier() {
        let mut partial = tiers();
        partial.remove("fast");
        assert!(matches!(
            oracle(GasTier::Fast).pick_tier(partial),
            Err(AgentkitError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_chain() {
        assert!(matches!(
            oracle(GasTier::Fast).recommended_fees(1).await,
            Err(AgentkitError::BundlerUnavailable { chain_id: 1 })
        ));
    }
}
