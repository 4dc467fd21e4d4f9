//! CLI configuration: a JSON file overlaid with `AGENTKIT_*` environment
//! variables.

use std::collections::BTreeMap;
use std::path::Path;

use agentkit_lib::evm::parse_address;
use agentkit_lib::executors::chains::ChainEndpoints;
use agentkit_lib::executors::BundlerRpcConfig;
use agentkit_lib::validation::{
    BundlerConfig, StaticValidationRegistries, VALIDATION_REGISTRY_ENV_PREFIX,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

fn default_rpc_timeout() -> u64 {
    30
}

/// Everything the validation commands need to reach a chain.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentkitConfig {
    /// Bundler URL per chain.
    #[serde(default)]
    pub bundlers: BundlerConfig,

    /// Node RPC URLs and identity registries.
    #[serde(default)]
    pub chains: ChainEndpoints,

    /// Validation registry address per chain.
    #[serde(default)]
    pub validation_registries: BTreeMap<u64, String>,

    /// Bundler connection settings.
    #[serde(default)]
    pub bundler_rpc: BundlerRpcConfig,

    /// Node RPC timeout in seconds.
    #[serde(default = "default_rpc_timeout")]
    pub rpc_timeout_secs: u64,
}

impl Default for AgentkitConfig {
    fn default() -> Self {
        Self {
            bundlers: BundlerConfig::default(),
            chains: ChainEndpoints::default(),
            validation_registries: BTreeMap::new(),
            bundler_rpc: BundlerRpcConfig::default(),
            rpc_timeout_secs: default_rpc_timeout(),
        }
    }
}

impl AgentkitConfig {
    /// Read `path` (when given) and overlay the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        Ok(config.with_env_vars(std::env::vars()))
    }

    /// Parse a JSON config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Overlay `(name, value)` pairs. Variables win over file entries.
    pub fn with_env_vars<I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: Vec<(String, String)> = vars.into_iter().collect();

        self.bundlers = self
            .bundlers
            .merge(BundlerConfig::from_vars(vars.iter().cloned()));
        self.chains = self
            .chains
            .merge(ChainEndpoints::from_vars(vars.iter().cloned()));

        for (name, value) in &vars {
            let Some(chain_id) = name
                .strip_prefix(VALIDATION_REGISTRY_ENV_PREFIX)
                .and_then(|suffix| suffix.parse::<u64>().ok())
            else {
                continue;
            };
            self.validation_registries
                .insert(chain_id, value.trim().to_string());
        }
        self
    }

    /// Validation registry table. Every configured address must parse.
    pub fn validation_registries(&self) -> Result<StaticValidationRegistries> {
        let mut registries = StaticValidationRegistries::new();
        for (chain_id, address) in &self.validation_registries {
            let address = parse_address(address).with_context(|| {
                format!("Invalid validation registry for chain {}", chain_id)
            })?;
            registries = registries.with_registry(*chain_id, address);
        }
        Ok(registries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const REGISTRY: &str = "0x00000000000000000000000000000000000000b0";

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_default_config() {
        let config = AgentkitConfig::default();
        assert_eq!(config.rpc_timeout_secs, 30);
        assert!(config.bundlers.is_empty());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "bundlers": {{ "84532": "https://bundler.example/84532" }},
                "validationRegistries": {{ "84532": "{}" }},
                "rpcTimeoutSecs": 5
            }}"#,
            REGISTRY
        )
        .unwrap();

        let config = AgentkitConfig::from_file(file.path()).unwrap();
        assert_eq!(
            config.bundlers.bundler_url(84532).unwrap(),
            "https://bundler.example/84532"
        );
        assert_eq!(config.rpc_timeout_secs, 5);

        let registries = config.validation_registries().unwrap();
        assert_eq!(
            registries.registry_address(84532),
            Some(parse_address(REGISTRY).unwrap())
        );
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = AgentkitConfig::from_file(Path::new("/nonexistent/agentkit.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_env_overrides_file() {
        let config = AgentkitConfig::default()
            .with_env_vars(vars(&[
                ("AGENTKIT_BUNDLER_URL_84532", "https://env.example"),
                ("AGENTKIT_VALIDATION_REGISTRY_84532", REGISTRY),
                ("AGENTKIT_VALIDATION_REGISTRY_x", REGISTRY),
                ("UNRELATED", "1"),
            ]));

        assert_eq!(
            config.bundlers.bundler_url(84532).unwrap(),
            "https://env.example"
        );
        assert_eq!(config.validation_registries.len(), 1);
        assert!(config
            .validation_registries()
            .unwrap()
            .registry_address(84532)
            .is_some());
    }

    proptest::proptest! {
        /// Any numeric chain suffix lands in the bundler table unchanged
        #[test]
        fn test_bundler_vars_are_picked_up(chain_id in 1u64.., host in "[a-z]{1,12}") {
            let url = format!("https://{}.example", host);
            let config = AgentkitConfig::default().with_env_vars(vec![(
                format!("AGENTKIT_BUNDLER_URL_{}", chain_id),
                url.clone(),
            )]);
            proptest::prop_assert_eq!(config.bundlers.bundler_url(chain_id).unwrap(), url.as_str());
        }
    }

    #[test]
    fn test_invalid_registry_address() {
        let config = AgentkitConfig::default()
            .with_env_vars(vars(&[("AGENTKIT_VALIDATION_REGISTRY_1", "0x1234")]));
        let err = config.validation_registries().unwrap_err();
        assert!(err.to_string().contains("chain 1"));
    }
}
