//! Orchestrator configuration.
//!
//! # Environment Variables
//!
//! - `AGENTKIT_BUNDLER_URL_<CHAIN_ID>` - bundler endpoint for a chain, e.g.
//!   `AGENTKIT_BUNDLER_URL_11155111=https://...`

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::classify::FailureClassifier;
use crate::{AgentkitError, Result};

/// Environment variable prefix for bundler URLs.
pub const BUNDLER_URL_ENV_PREFIX: &str = "AGENTKIT_BUNDLER_URL_";

/// Per-chain bundler endpoints.
///
/// Read-only once the orchestrator is built. A chain without an entry is
/// reported as [`AgentkitError::BundlerUnavailable`], never defaulted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BundlerConfig {
    urls: BTreeMap<u64, String>,
}

impl BundlerConfig {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the endpoint for `chain_id`.
    pub fn with_bundler(mut self, chain_id: u64, url: impl Into<String>) -> Self {
        self.urls.insert(chain_id, url.into());
        self
    }

    /// Endpoint for `chain_id`.
    pub fn bundler_url(&self, chain_id: u64) -> Result<&str> {
        self.urls
            .get(&chain_id)
            .map(String::as_str)
            .filter(|url| !url.trim().is_empty())
            .ok_or(AgentkitError::BundlerUnavailable { chain_id })
    }

    /// Configured chain ids, ascending.
    pub fn chain_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.urls.keys().copied()
    }

    /// Whether no chain is configured.
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Entries from `other` take precedence.
    pub fn merge(mut self, other: BundlerConfig) -> Self {
        self.urls.extend(other.urls);
        self
    }

    /// Load from `AGENTKIT_BUNDLER_URL_<CHAIN_ID>` variables.
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Load from an iterator of `(name, value)` pairs. Names that do not carry
    /// the prefix and a numeric chain id are skipped.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut config = Self::new();
        for (name, value) in vars {
            let Some(suffix) = name.as_ref().strip_prefix(BUNDLER_URL_ENV_PREFIX) else {
                continue;
            };
            let Ok(chain_id) = suffix.parse::<u64>() else {
                tracing::debug!(name = name.as_ref(), "ignoring malformed bundler variable");
                continue;
            };
            let value = value.into();
            if !value.trim().is_empty() {
                config.urls.insert(chain_id, value);
            }
        }
        config
    }
}

/// Settings for [`super::ValidationRequestOrchestrator`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorConfig {
    /// Bundler endpoints keyed by chain id.
    #[serde(default)]
    pub bundlers: BundlerConfig,

    /// Upper bound on the advisory gas price lookup, in milliseconds.
    #[serde(default = "default_gas_oracle_timeout_ms")]
    pub gas_oracle_timeout_ms: u64,

    /// Optional bound on the receipt wait, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_timeout_ms: Option<u64>,

    /// Duplicate-request detection table.
    #[serde(default)]
    pub classifier: FailureClassifier,
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn default_gas_oracle_timeout_ms() -> u64 {
    3_000
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            bundlers: BundlerConfig::default(),
            gas_oracle_timeout_ms: default_gas_oracle_timeout_ms(),
            receipt_timeout_ms: None,
            classifier: FailureClassifier::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Defaults with the given bundler table.
    pub fn new(bundlers: BundlerConfig) -> Self {
        Self {
            bundlers,
            ..Self::default()
        }
    }

    /// Set the gas oracle timeout.
    pub fn with_gas_oracle_timeout(mut self, timeout: Duration) -> Self {
        self.gas_oracle_timeout_ms = duration_millis(timeout);
        self
    }

    /// Bound the receipt wait.
    pub fn with_receipt_timeout(mut self, timeout: Duration) -> Self {
        self.receipt_timeout_ms = Some(duration_millis(timeout));
        self
    }

    /// Replace the failure classifier.
    pub fn with_classifier(mut self, classifier: FailureClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Gas oracle timeout as a [`Duration`].
    pub fn gas_oracle_timeout(&self) -> Duration {
        Duration::from_millis(self.gas_oracle_timeout_ms)
    }

    /// Receipt timeout as a [`Duration`].
    pub fn receipt_timeout(&self) -> Option<Duration> {
        self.receipt_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_chain_is_unavailable() {
        let config = BundlerConfig::new().with_bundler(84532, "https://bundler.base");
        assert_eq!(config.bundler_url(84532).unwrap(), "https://bundler.base");
        assert!(matches!(
            config.bundler_url(1),
            Err(AgentkitError::BundlerUnavailable { chain_id: 1 })
        ));
    }

    #[test]
    fn test_blank_url_is_unavailable() {
        let config = BundlerConfig::new().with_bundler(1, "   ");
        assert!(config.bundler_url(1).is_err());
    }

    #[test]
    fn test_from_vars() {
        let config = BundlerConfig::from_vars([
            ("AGENTKIT_BUNDLER_URL_11155111", "https://sepolia"),
            ("AGENTKIT_BUNDLER_URL_BASE", "https://ignored"),
            ("AGENTKIT_BUNDLER_URL_10", ""),
            ("HOME", "/root"),
        ]);
        assert_eq!(config.chain_ids().collect::<Vec<_>>(), vec![11155111]);
    }

    #[test]
    fn test_orchestrator_config_json() {
        let config: OrchestratorConfig = serde_json::from_str(
            r#"{"bundlers": {"84532": "https://b"}, "receiptTimeoutMs": 60000}"#,
        )
        .unwrap();
        assert_eq!(config.bundlers.bundler_url(84532).unwrap(), "https://b");
        assert_eq!(config.gas_oracle_timeout(), Duration::from_secs(3));
        assert_eq!(config.receipt_timeout(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_timeouts_keep_millisecond_precision() {
        let config = OrchestratorConfig::default()
            .with_receipt_timeout(Duration::from_millis(250))
            .with_gas_oracle_timeout(Duration::from_micros(1_500));
        assert_eq!(config.receipt_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.gas_oracle_timeout(), Duration::from_millis(1));

        let huge = OrchestratorConfig::default().with_gas_oracle_timeout(Duration::MAX);
        assert_eq!(huge.gas_oracle_timeout_ms, u64::MAX);
    }

    #[test]
    fn test_merge_prefers_other() {
        let base = BundlerConfig::new().with_bundler(1, "a").with_bundler(2, "b");
        let merged = base.merge(BundlerConfig::new().with_bundler(2, "c"));
        assert_eq!(merged.bundler_url(1).unwrap(), "a");
        assert_eq!(merged.bundler_url(2).unwrap(), "c");
    }
}
