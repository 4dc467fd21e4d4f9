//! Validation request orchestration.
//!
//! [`ValidationRequestOrchestrator::prepare`] turns an identifier and a
//! validator address into a [`ValidationRequestPlan`];
//! [`ValidationRequestOrchestrator::execute`] submits that plan as a
//! sponsored user operation and waits for inclusion.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::collaborators::{
    AccountClient, AgentRegistry, BundlerClient, BundlerConnector, GasOracle,
    ValidationRegistryProvider, ValidationRequestParams,
};
use super::config::OrchestratorConfig;
use super::phase::{PhaseTracker, ValidationPhase};
use super::types::{
    fee_quantity, Call, ExecutionMode, ExecutionStep, GasFees, PaymasterMode, PlanMetadata, PrepareOptions,
    UserOperationReceipt, ValidationRequestPlan, ValidationRequestResult,
};
use crate::identifiers::AgentIdentifier;
use crate::{AgentkitError, Result};

/// Prepares and executes validation requests.
///
/// Holds no per-request state; `prepare` and `execute` may run concurrently.
pub struct ValidationRequestOrchestrator {
    config: OrchestratorConfig,
    agents: Arc<dyn AgentRegistry>,
    registries: Arc<dyn ValidationRegistryProvider>,
    connector: Arc<dyn BundlerConnector>,
    gas_oracle: Option<Arc<dyn GasOracle>>,
}

impl ValidationRequestOrchestrator {
    /// Create an orchestrator without a gas oracle.
    pub fn new(
        config: OrchestratorConfig,
        agents: Arc<dyn AgentRegistry>,
        registries: Arc<dyn ValidationRegistryProvider>,
        connector: Arc<dyn BundlerConnector>,
    ) -> Self {
        Self {
            config,
            agents,
            registries,
            connector,
            gas_oracle: None,
        }
    }

    /// Attach an advisory gas oracle.
    pub fn with_gas_oracle(mut self, oracle: Arc<dyn GasOracle>) -> Self {
        self.gas_oracle = Some(oracle);
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Build a plan for `identifier` asking `validator_address` for validation.
    ///
    /// # Errors
    ///
    /// Checked in this order:
    /// - `UnsupportedMode` when `options.mode` is `eoa`
    /// - `InvalidIdentifier` / `UnsupportedIdentifier` unless `identifier` is
    ///   a well-formed `did:8004`
    /// - `MissingValidator` when `validator_address` is blank
    /// - `AgentNotFound`, `RegistryUnavailable`, `BundlerUnavailable`
    /// - collaborator failures, unchanged
    #[tracing::instrument(skip(self, options), fields(mode = %options.mode))]
    pub async fn prepare(
        &self,
        identifier: &str,
        validator_address: &str,
        options: &PrepareOptions,
    ) -> Result<ValidationRequestPlan> {
        let mut tracker = PhaseTracker::starting_at(ValidationPhase::Idle);
        tracker.advance(ValidationPhase::Preparing)?;

        match self.build_plan(identifier, validator_address, options).await {
            Ok(plan) => {
                tracker.advance(ValidationPhase::Prepared)?;
                info!(
                    chain_id = plan.chain_id,
                    agent_id = %plan.metadata.agent_id,
                    "validation request prepared"
                );
                Ok(plan)
            }
            Err(err) => Err(tracker.fail(err)),
        }
    }

    async fn build_plan(
        &self,
        identifier: &str,
        validator_address: &str,
        options: &PrepareOptions,
    ) -> Result<ValidationRequestPlan> {
        if options.mode == ExecutionMode::Eoa {
            return Err(AgentkitError::UnsupportedMode(options.mode.to_string()));
        }

        let did = match AgentIdentifier::parse(identifier)? {
            AgentIdentifier::Did8004(did) => did,
            other => {
                return Err(AgentkitError::UnsupportedIdentifier {
                    notation: other.notation().to_string(),
                })
            }
        };

        let validator_address = validator_address.trim();
        if validator_address.is_empty() {
            return Err(AgentkitError::MissingValidator);
        }

        let chain_id = u64::from(did.chain_id());
        let agent_id = did.agent_id();

        self.agents
            .get_agent(chain_id, agent_id)
            .await?
            .ok_or_else(|| AgentkitError::AgentNotFound {
                chain_id,
                agent_id: agent_id.to_string(),
            })?;

        let registry = self.registries.validation_registry(chain_id).await?;
        let prepared = registry
            .prepare_validation_request_tx(&ValidationRequestParams {
                agent_id,
                validator_address: validator_address.to_string(),
                request_uri: options.request_uri.clone(),
                request_hash: options.request_hash.clone(),
            })
            .await?;

        let bundler_url = self.config.bundlers.bundler_url(chain_id)?.to_string();

        let request = prepared.tx_request;
        let call = Call {
            to: request.to,
            data: request.data,
            value: request.value.to_decimal_string(),
        };
        debug!(to = %call.to, value = %call.value, data_len = call.data.len(), "built call");

        Ok(ValidationRequestPlan {
            chain_id,
            bundler_url,
            mode: ExecutionMode::Aa,
            calls: vec![call],
            metadata: PlanMetadata {
                agent_id: agent_id.to_string(),
                validator_address: validator_address.to_string(),
                request_uri: options.request_uri.clone(),
                request_hash: options
                    .request_hash
                    .clone()
                    .or(Some(prepared.request_hash)),
            },
        })
    }

    /// Submit `plan` through `account`'s smart account and wait for inclusion.
    ///
    /// `status` is called with each [`ExecutionStep`] before it starts. It is
    /// purely observational.
    ///
    /// Failures other than domain errors are classified by the configured
    /// [`super::FailureClassifier`] into `AlreadyExists` or `ExecutionFailed`.
    /// Once the user operation is sent nothing is undone; dropping the
    /// returned future abandons the receipt wait only.
    #[tracing::instrument(
        skip_all,
        fields(chain_id = plan.chain_id, agent_id = %plan.metadata.agent_id)
    )]
    pub async fn execute<F>(
        &self,
        plan: &ValidationRequestPlan,
        account: &dyn AccountClient,
        status: F,
    ) -> Result<ValidationRequestResult>
    where
        F: Fn(ExecutionStep) + Send + Sync,
    {
        let mut tracker = PhaseTracker::starting_at(ValidationPhase::Prepared);

        match self.submit(plan, account, &status, &mut tracker).await {
            Ok(result) => {
                info!(
                    tx_hash = %result.tx_hash,
                    user_operation_hash = %result.user_operation_hash,
                    "validation request confirmed"
                );
                Ok(result)
            }
            Err(err) => {
                let err = self.config.classifier.classify(err);
                warn!(error = %err, phase = %tracker.phase(), "validation request failed");
                Err(tracker.fail(err))
            }
        }
    }

    async fn submit<F>(
        &self,
        plan: &ValidationRequestPlan,
        account: &dyn AccountClient,
        status: &F,
        tracker: &mut PhaseTracker,
    ) -> Result<ValidationRequestResult>
    where
        F: Fn(ExecutionStep) + Send + Sync,
    {
        if plan.mode != ExecutionMode::Aa {
            return Err(AgentkitError::UnsupportedMode(plan.mode.to_string()));
        }
        if plan.calls.is_empty() {
            return Err(AgentkitError::execution_failed("plan contains no calls"));
        }

        let signer = account
            .smart_account()
            .ok_or(AgentkitError::AccountNotSmartAccount)?;
        tracker.advance(ValidationPhase::Signing)?;

        status(ExecutionStep::Preparing);
        let bundler = self
            .connector
            .connect(
                &plan.bundler_url,
                plan.chain_id,
                signer,
                PaymasterMode::Sponsored,
            )
            .await?;

        status(ExecutionStep::CheckingAvailability);
        let fees = self.recommended_fees(plan.chain_id).await;

        status(ExecutionStep::Signing);
        let op = bundler
            .prepare_user_operation(&plan.calls, fees.as_ref())
            .await?;

        status(ExecutionStep::Submitting);
        let user_operation_hash = bundler.send_user_operation(&op).await?;
        tracker.advance(ValidationPhase::Submitted)?;
        debug!(%user_operation_hash, "user operation submitted");

        status(ExecutionStep::Confirming);
        let receipt = self
            .wait_for_receipt(bundler.as_ref(), &user_operation_hash)
            .await?;
        if !receipt.success {
            return Err(AgentkitError::execution_failed(format!(
                "user operation {} reverted in transaction {}",
                user_operation_hash, receipt.transaction_hash
            )));
        }
        tracker.advance(ValidationPhase::Confirmed)?;

        Ok(ValidationRequestResult {
            tx_hash: receipt.transaction_hash,
            validator_address: plan.metadata.validator_address.clone(),
            request_hash: plan.metadata.request_hash.clone(),
            user_operation_hash,
        })
    }

    /// Advisory fee lookup. Any failure or timeout yields `None`, meaning no
    /// fee override.
    async fn recommended_fees(&self, chain_id: u64) -> Option<GasFees> {
        let oracle = self.gas_oracle.as_ref()?;
        let limit = self.config.gas_oracle_timeout();

        match tokio::time::timeout(limit, oracle.recommended_fees(chain_id)).await {
            Ok(Ok(fees)) => normalize_fees(fees),
            Ok(Err(err)) => {
                warn!(error = %err, "gas price lookup failed, continuing without fee override");
                None
            }
            Err(_) => {
                warn!(
                    timeout_ms = limit.as_millis() as u64,
                    "gas price lookup timed out, continuing without fee override"
                );
                None
            }
        }
    }

    async fn wait_for_receipt(
        &self,
        bundler: &dyn BundlerClient,
        hash: &str,
    ) -> Result<UserOperationReceipt> {
        let Some(limit) = self.config.receipt_timeout() else {
            return bundler.wait_for_user_operation_receipt(hash).await;
        };

        tokio::time::timeout(limit, bundler.wait_for_user_operation_receipt(hash))
            .await
            .map_err(|_| AgentkitError::ConnectionTimeout {
                operation: format!("receipt wait for user operation {}", hash),
                timeout_ms: limit.as_millis() as u64,
            })?
    }
}

/// Fee map with every value as a `0x` quantity, or `None` when any entry
/// is not a quantity or the map is empty.
fn normalize_fees(fees: GasFees) -> Option<GasFees> {
    if fees.is_empty() {
        debug!("gas oracle returned no fees");
        return None;
    }
    let mut normalized = GasFees::new();
    for (key, value) in fees {
        match fee_quantity(&value) {
            Some(quantity) => {
                normalized.insert(key, quantity.into());
            }
            None => {
                warn!(field = %key, value = %value, "gas oracle returned a non-quantity fee, continuing without fee override");
                return None;
            }
        }
    }
    Some(normalized)
}
