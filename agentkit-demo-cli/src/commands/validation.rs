//! Validation commands - prepare ERC-8004 validation requests and follow
//! their user operations

use std::sync::Arc;
use std::time::Duration;

use agentkit_lib::executors::{RpcAgentRegistry, RpcBundlerConnector, UserOperationReceiptPoller};
use agentkit_lib::validation::{
    ExecutionMode, OrchestratorConfig, PrepareOptions, ValidationRequestOrchestrator,
};
use anyhow::{anyhow, Context, Result};

use crate::config::AgentkitConfig;
use crate::ui;

/// Orchestrator wired to the RPC-backed registry and bundler connector.
pub fn build_orchestrator(config: &AgentkitConfig) -> Result<ValidationRequestOrchestrator> {
    let agents = RpcAgentRegistry::new(&config.chains, config.rpc_timeout_secs)?;
    let registries = config.validation_registries()?;
    let connector = RpcBundlerConnector::new(config.bundler_rpc.clone());

    Ok(ValidationRequestOrchestrator::new(
        OrchestratorConfig::new(config.bundlers.clone()),
        Arc::new(agents),
        Arc::new(registries),
        Arc::new(connector),
    ))
}

/// Assemble prepare options from command-line values.
pub fn prepare_options(
    mode: &str,
    request_uri: Option<String>,
    request_hash: Option<String>,
) -> Result<PrepareOptions> {
    let mode: ExecutionMode = mode.parse()?;
    let mut options = PrepareOptions::new().with_mode(mode);
    if let Some(uri) = request_uri {
        options = options.with_request_uri(uri);
    }
    if let Some(hash) = request_hash {
        options = options.with_request_hash(hash);
    }
    Ok(options)
}

/// Build a validation request plan and print it as JSON.
pub async fn prepare(
    config: &AgentkitConfig,
    did: &str,
    validator: &str,
    request_uri: Option<String>,
    request_hash: Option<String>,
    mode: &str,
    verbose: bool,
) -> Result<()> {
    let options = prepare_options(mode, request_uri, request_hash)?;
    let orchestrator = build_orchestrator(config)?;

    let plan = orchestrator
        .prepare(did, validator, &options)
        .await
        .with_context(|| format!("Failed to prepare validation request for {}", did))?;

    if verbose {
        eprintln!("Chain {} via {}", plan.chain_id, plan.bundler_url);
    }
    ui::json(&plan)
}

/// Poll the chain's bundler until `hash` has a receipt or `timeout_secs`
/// elapses.
pub async fn wait(
    config: &AgentkitConfig,
    hash: &str,
    chain_id: u64,
    timeout_secs: u64,
    verbose: bool,
) -> Result<()> {
    let bundler_url = config.bundlers.bundler_url(chain_id)?;
    let receipts = UserOperationReceiptPoller::new(&config.bundler_rpc, bundler_url)?;

    let spinner = ui::spinner(&format!("Waiting for user operation {}", hash));
    let outcome = tokio::time::timeout(Duration::from_secs(timeout_secs), receipts.wait(hash)).await;
    spinner.finish_and_clear();

    let receipt = match outcome {
        Ok(receipt) => receipt?,
        Err(_) => {
            ui::error(&format!("No receipt after {}s", timeout_secs));
            return Err(anyhow!("Timed out waiting for user operation {}", hash));
        }
    };

    if receipt.success {
        ui::success("User operation included");
    } else {
        ui::warning("User operation included but reverted");
    }
    ui::key_value("Transaction", &receipt.transaction_hash);
    if verbose {
        ui::separator();
        ui::json(&receipt)?;
    }

    if receipt.success {
        Ok(())
    } else {
        Err(anyhow!("User operation {} reverted", hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentkit_lib::{AgentkitError, AgentkitErrorCode};

    const VALIDATOR: &str = "0x00000000000000000000000000000000000000aa";

    fn error_code(err: &anyhow::Error) -> Option<AgentkitErrorCode> {
        err.chain()
            .find_map(|cause| cause.downcast_ref::<AgentkitError>())
            .map(AgentkitError::code)
    }

    #[test]
    fn test_prepare_options() {
        let options = prepare_options("AA", Some("ipfs://req".into()), None).unwrap();
        assert_eq!(options.mode, ExecutionMode::Aa);
        assert_eq!(options.request_uri.as_deref(), Some("ipfs://req"));
        assert!(options.request_hash.is_none());

        let err = prepare_options("legacy", None, None).unwrap_err();
        assert_eq!(error_code(&err), Some(AgentkitErrorCode::UnsupportedMode));
    }

    #[tokio::test]
    async fn test_prepare_rejects_eoa() {
        let err = prepare(&AgentkitConfig::default(), "did:8004:84532:7", VALIDATOR, None, None, "eoa", false)
            .await
            .unwrap_err();
        assert_eq!(error_code(&err), Some(AgentkitErrorCode::UnsupportedMode));
    }

    #[tokio::test]
    async fn test_prepare_rejects_non_did8004() {
        let err = prepare(
            &AgentkitConfig::default(),
            "did:ethr:84532:0x00000000000000000000000000000000000000aa",
            VALIDATOR,
            None,
            None,
            "aa",
            false,
        )
        .await
        .unwrap_err();
        assert_eq!(error_code(&err), Some(AgentkitErrorCode::UnsupportedIdentifier));
    }

    #[tokio::test]
    async fn test_prepare_without_identity_registry() {
        let err = prepare(&AgentkitConfig::default(), "did:8004:84532:7", VALIDATOR, None, None, "aa", false)
            .await
            .unwrap_err();
        assert_eq!(error_code(&err), Some(AgentkitErrorCode::RegistryUnavailable));
    }

    #[tokio::test]
    async fn test_wait_requires_bundler() {
        let err = wait(&AgentkitConfig::default(), "0xabc", 84532, 1, false)
            .await
            .unwrap_err();
        assert_eq!(error_code(&err), Some(AgentkitErrorCode::BundlerUnavailable));
    }
}
