//! Configuration types for JSON-RPC executors.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::chains::ENTRY_POINT_V07;
use crate::evm::format_address;
use crate::AgentkitError;

/// Configuration for a single JSON-RPC endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonRpcConfig {
    /// Endpoint URL.
    pub url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    30
}

fn default_poll_interval() -> u64 {
    2_000
}

fn default_entry_point() -> String {
    format_address(&ENTRY_POINT_V07)
}

impl JsonRpcConfig {
    /// Create a configuration for `url` with the default timeout.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_secs: default_timeout(),
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Configuration shared by every bundler connection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundlerRpcConfig {
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Delay between receipt polls in milliseconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Entry point passed to the bundler.
    #[serde(default = "default_entry_point")]
    pub entry_point: String,

    /// Paymaster sponsorship policy, when the paymaster requires one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sponsorship_policy_id: Option<String>,
}

impl Default for BundlerRpcConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            poll_interval_ms: default_poll_interval(),
            entry_point: default_entry_point(),
            sponsorship_policy_id: None,
        }
    }
}

impl BundlerRpcConfig {
    /// Default configuration against the v0.7 entry point.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set the receipt poll interval.
    pub fn with_poll_interval(mut self, millis: u64) -> Self {
        self.poll_interval_ms = millis;
        self
    }

    /// Use a different entry point.
    pub fn with_entry_point(mut self, entry_point: impl Into<String>) -> Self {
        self.entry_point = entry_point.into();
        self
    }

    /// Attach a sponsorship policy to every sponsorship request.
    pub fn with_sponsorship_policy(mut self, policy_id: impl Into<String>) -> Self {
        self.sponsorship_policy_id = Some(policy_id.into());
        self
    }
}

/// Speed tier picked from a bundler's gas price recommendation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GasTier {
    /// Cheapest.
    Slow,
    /// Middle.
    Standard,
    /// Fastest inclusion.
    #[default]
    Fast,
}

impl GasTier {
    /// Key of this tier in the recommendation object.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Slow => "slow",
            Self::Standard => "standard",
            Self::Fast => "fast",
        }
    }
}

impl fmt::Display for GasTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GasTier {
    type Err = AgentkitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "slow" => Ok(Self::Slow),
            "standard" => Ok(Self::Standard),
            "fast" => Ok(Self::Fast),
            other => Err(AgentkitError::Serialization(format!(
                "unknown gas tier: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_rpc_config() {
        let config = JsonRpcConfig::new("https://rpc.test").with_timeout(5);
        assert_eq!(config.url, "https://rpc.test");
        assert_eq!(config.timeout_secs, 5);

        let parsed: JsonRpcConfig = serde_json::from_str(r#"{"url":"https://rpc.test"}"#).unwrap();
        assert_eq!(parsed.timeout_secs, 30);
    }

    #[test]
    fn test_bundler_rpc_defaults() {
        let config: BundlerRpcConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, BundlerRpcConfig::default());
        assert_eq!(config.poll_interval_ms, 2_000);
        assert_eq!(
            config.entry_point,
            "0x0000000071727de22e5e9d8baf0edac6f37da032"
        );

        let config = BundlerRpcConfig::new()
            .with_poll_interval(10)
            .with_sponsorship_policy("sp_test");
        assert_eq!(config.poll_interval_ms, 10);
        assert_eq!(config.sponsorship_policy_id.as_deref(), Some("sp_test"));
    }

    #[test]
    fn test_gas_tier() {
        assert_eq!(GasTier::default(), GasTier::Fast);
        assert_eq!("Standard".parse::<GasTier>().unwrap(), GasTier::Standard);
        assert!("turbo".parse::<GasTier>().is_err());
        assert_eq!(serde_json::to_string(&GasTier::Slow).unwrap(), "\"slow\"");
    }
}
