//! Value types exchanged by the orchestrator and its collaborators.

use std::fmt;
use std::str::FromStr;

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::evm::{self, address_hex, hex_bytes};
use crate::{AgentkitError, Result};

/// How a plan is executed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Smart account via bundler and paymaster. The only supported mode.
    #[default]
    Aa,
    /// Externally owned account. Rejected for validation requests.
    Eoa,
}

impl ExecutionMode {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aa => "aa",
            Self::Eoa => "eoa",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionMode {
    type Err = AgentkitError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aa" => Ok(Self::Aa),
            "eoa" => Ok(Self::Eoa),
            other => Err(AgentkitError::UnsupportedMode(other.to_string())),
        }
    }
}

/// Options for `prepare`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareOptions {
    /// Execution mode; defaults to [`ExecutionMode::Aa`].
    #[serde(default)]
    pub mode: ExecutionMode,
    /// URI of the off-chain request payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_uri: Option<String>,
    /// Caller-chosen request hash, used verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_hash: Option<String>,
}

impl PrepareOptions {
    /// Default options (smart-account mode, no URI or hash).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the execution mode.
    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the request URI.
    pub fn with_request_uri(mut self, uri: impl Into<String>) -> Self {
        self.request_uri = Some(uri.into());
        self
    }

    /// Set the request hash.
    pub fn with_request_hash(mut self, hash: impl Into<String>) -> Self {
        self.request_hash = Some(hash.into());
        self
    }
}

/// One contract call inside a plan.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Call {
    /// Target contract.
    #[serde(with = "address_hex")]
    pub to: Address,
    /// Calldata.
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
    /// Wei value as a decimal string.
    pub value: String,
}

/// Descriptive fields carried alongside the calls.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanMetadata {
    /// Agent id in decimal.
    pub agent_id: String,
    /// Validator address as supplied.
    pub validator_address: String,
    /// Request URI, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_uri: Option<String>,
    /// Request hash: the caller's value verbatim, else the registry's.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_hash: Option<String>,
}

/// Output of `prepare`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRequestPlan {
    /// Chain the calls target.
    pub chain_id: u64,
    /// Bundler endpoint for the chain.
    pub bundler_url: String,
    /// Always [`ExecutionMode::Aa`].
    pub mode: ExecutionMode,
    /// Calls to submit as one user operation.
    pub calls: Vec<Call>,
    /// Request metadata.
    pub metadata: PlanMetadata,
}

/// Output of `execute`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRequestResult {
    /// Transaction that included the user operation.
    pub tx_hash: String,
    /// Validator address from the plan.
    pub validator_address: String,
    /// Request hash from the plan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_hash: Option<String>,
    /// User operation hash returned by the bundler.
    pub user_operation_hash: String,
}

/// Progress markers reported to the status callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExecutionStep {
    /// Connecting to the bundler.
    Preparing,
    /// Fetching gas prices.
    CheckingAvailability,
    /// Building and signing the user operation.
    Signing,
    /// Sending the user operation.
    Submitting,
    /// Waiting for the receipt.
    Confirming,
}

impl ExecutionStep {
    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Preparing => "preparing",
            Self::CheckingAvailability => "checking availability",
            Self::Signing => "signing",
            Self::Submitting => "submitting",
            Self::Confirming => "confirming",
        }
    }
}

impl fmt::Display for ExecutionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Paymaster behaviour for a bundler connection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymasterMode {
    /// Fees paid by a sponsoring paymaster.
    #[default]
    Sponsored,
    /// Fees paid by the smart account.
    None,
}

/// Fee fields returned by a gas oracle, merged verbatim into the user
/// operation (for example `maxFeePerGas`, `maxPriorityFeePerGas`).
pub type GasFees = Map<String, Value>;

/// ERC-4337 v0.7 user operation in its JSON-RPC shape.
///
/// Numeric fields are `0x` quantities, as bundlers expect them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperation {
    pub sender: String,
    pub nonce: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factory_data: Option<String>,
    pub call_data: String,
    #[serde(default)]
    pub call_gas_limit: String,
    #[serde(default)]
    pub verification_gas_limit: String,
    #[serde(default)]
    pub pre_verification_gas: String,
    #[serde(default)]
    pub max_fee_per_gas: String,
    #[serde(default)]
    pub max_priority_fee_per_gas: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_verification_gas_limit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_post_op_gas_limit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_data: Option<String>,
    #[serde(default)]
    pub signature: String,
    /// Fields without a typed slot, passed through verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// JSON-RPC names of the typed [`UserOperation`] fields.
const USER_OPERATION_FIELDS: [&str; 15] = [
    "sender",
    "nonce",
    "factory",
    "factoryData",
    "callData",
    "callGasLimit",
    "verificationGasLimit",
    "preVerificationGas",
    "maxFeePerGas",
    "maxPriorityFeePerGas",
    "paymaster",
    "paymasterVerificationGasLimit",
    "paymasterPostOpGasLimit",
    "paymasterData",
    "signature",
];

/// `0x` quantity for a fee value: `0x` strings pass unchanged, decimal
/// strings and non-negative integers are converted. Anything else is `None`.
pub fn fee_quantity(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => {
            let parsed = evm::parse_uint(text.trim())?;
            if text.starts_with("0x") {
                Some(text.clone())
            } else {
                Some(format!("0x{:x}", parsed))
            }
        }
        Value::Number(number) => number.as_u64().map(|n| format!("{:#x}", n)),
        _ => None,
    }
}

impl UserOperation {
    /// Overwrite fields with the entries of `fields`, keyed by their
    /// JSON-RPC names.
    ///
    /// Integers are written as `0x` quantities. Entries that cannot fill a
    /// typed field are skipped; unknown keys are kept in [`Self::extra`].
    pub fn merge_fields(&mut self, fields: &Map<String, Value>) -> Result<()> {
        let mut current = match serde_json::to_value(&*self)? {
            Value::Object(map) => map,
            _ => return Err(AgentkitError::Internal("user operation is not an object".into())),
        };
        for (key, value) in fields {
            if !USER_OPERATION_FIELDS.contains(&key.as_str()) {
                current.insert(key.clone(), value.clone());
                continue;
            }
            let text = match value {
                Value::String(text) => text.clone(),
                other => match fee_quantity(other) {
                    Some(quantity) => quantity,
                    None => {
                        tracing::warn!(field = %key, value = %other, "skipping unusable user operation field");
                        continue;
                    }
                },
            };
            current.insert(key.clone(), Value::String(text));
        }
        *self = serde_json::from_value(Value::Object(current))?;
        Ok(())
    }
}

/// Receipt of an included user operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationReceipt {
    /// Hash of the user operation.
    pub user_op_hash: String,
    /// Hash of the bundle transaction.
    pub transaction_hash: String,
    /// Whether the operation's execution succeeded.
    pub success: bool,
}

/// A transaction `value` in whatever shape a registry client produced it.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum TxValue {
    /// Machine integer.
    Int(i128),
    /// 256-bit integer.
    Uint(U256),
    /// Decimal or `0x` hex text.
    Text(String),
    /// Arbitrary JSON.
    Json(Value),
    /// No value given.
    #[default]
    Absent,
}

impl TxValue {
    /// Decimal string of a non-negative integer.
    ///
    /// Negative numbers and anything that is not an integer become `"0"`.
    pub fn to_decimal_string(&self) -> String {
        self.as_u256().unwrap_or(U256::ZERO).to_string()
    }

    fn as_u256(&self) -> Option<U256> {
        match self {
            Self::Int(value) => u128::try_from(*value).ok().map(U256::from),
            Self::Uint(value) => Some(*value),
            Self::Text(text) => evm::parse_uint(text.trim()),
            Self::Json(Value::Number(number)) => number.as_u64().map(U256::from),
            Self::Json(Value::String(text)) => evm::parse_uint(text.trim()),
            Self::Json(_) | Self::Absent => None,
        }
    }
}

impl From<u64> for TxValue {
    fn from(value: u64) -> Self {
        Self::Int(i128::from(value))
    }
}

impl From<i64> for TxValue {
    fn from(value: i64) -> Self {
        Self::Int(i128::from(value))
    }
}

impl From<U256> for TxValue {
    fn from(value: U256) -> Self {
        Self::Uint(value)
    }
}

impl From<&str> for TxValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for TxValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Value> for TxValue {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tx_value_normalization() {
        assert_eq!(TxValue::from(0u64).to_decimal_string(), "0");
        assert_eq!(TxValue::from(42u64).to_decimal_string(), "42");
        assert_eq!(TxValue::from(-5i64).to_decimal_string(), "0");
        assert_eq!(
            TxValue::from(U256::from(10u64).pow(U256::from(30u64))).to_decimal_string(),
            "1000000000000000000000000000000"
        );
        assert_eq!(TxValue::from("0x2a").to_decimal_string(), "42");
        assert_eq!(TxValue::from(" 17 ").to_decimal_string(), "17");
        assert_eq!(TxValue::from("-1").to_decimal_string(), "0");
        assert_eq!(TxValue::from("1.5").to_decimal_string(), "0");
        assert_eq!(TxValue::from(json!(7)).to_decimal_string(), "7");
        assert_eq!(TxValue::from(json!("0x10")).to_decimal_string(), "16");
        assert_eq!(TxValue::from(json!(1.5)).to_decimal_string(), "0");
        assert_eq!(TxValue::from(json!({"hex": "0x1"})).to_decimal_string(), "0");
        assert_eq!(TxValue::Absent.to_decimal_string(), "0");
    }

    #[test]
    fn test_execution_mode_parse() {
        assert_eq!("AA".parse::<ExecutionMode>().unwrap(), ExecutionMode::Aa);
        assert_eq!("eoa".parse::<ExecutionMode>().unwrap(), ExecutionMode::Eoa);
        assert!(matches!(
            "relay".parse::<ExecutionMode>(),
            Err(AgentkitError::UnsupportedMode(_))
        ));
    }

    #[test]
    fn test_step_labels() {
        let labels: Vec<_> = [
            ExecutionStep::Preparing,
            ExecutionStep::CheckingAvailability,
            ExecutionStep::Signing,
            ExecutionStep::Submitting,
            ExecutionStep::Confirming,
        ]
        .iter()
        .map(|s| s.label())
        .collect();
        assert_eq!(
            labels,
            ["preparing", "checking availability", "signing", "submitting", "confirming"]
        );
    }

    #[test]
    fn test_user_operation_merge_fields() {
        let mut op = UserOperation {
            sender: "0x01".into(),
            nonce: "0x0".into(),
            call_data: "0x".into(),
            max_fee_per_gas: "0x1".into(),
            ..Default::default()
        };
        let fees = json!({"maxFeePerGas": "0x64", "maxPriorityFeePerGas": "0x2", "l1Fee": 1});
        op.merge_fields(fees.as_object().unwrap()).unwrap();
        assert_eq!(op.max_fee_per_gas, "0x64");
        assert_eq!(op.max_priority_fee_per_gas, "0x2");
        assert_eq!(op.sender, "0x01");
        assert_eq!(op.extra["l1Fee"], json!(1));

        let wire = serde_json::to_value(&op).unwrap();
        assert_eq!(wire["l1Fee"], json!(1));
    }

    #[test]
    fn test_merge_fields_converts_numeric_fees() {
        let mut op = UserOperation {
            max_fee_per_gas: "0x1".into(),
            max_priority_fee_per_gas: "0x1".into(),
            ..Default::default()
        };
        let fees = json!({"maxFeePerGas": 1_000_000_000u64, "maxPriorityFeePerGas": true});
        op.merge_fields(fees.as_object().unwrap()).unwrap();
        assert_eq!(op.max_fee_per_gas, "0x3b9aca00");
        assert_eq!(op.max_priority_fee_per_gas, "0x1");
        assert!(op.extra.is_empty());
    }

    #[test]
    fn test_fee_quantity() {
        assert_eq!(fee_quantity(&json!("0x64")).as_deref(), Some("0x64"));
        assert_eq!(fee_quantity(&json!("100")).as_deref(), Some("0x64"));
        assert_eq!(fee_quantity(&json!(100)).as_deref(), Some("0x64"));
        assert_eq!(fee_quantity(&json!(-1)), None);
        assert_eq!(fee_quantity(&json!("fast")), None);
        assert_eq!(fee_quantity(&json!({"wei": 1})), None);
    }

    #[test]
    fn test_plan_json_is_camel_case() {
        let plan = ValidationRequestPlan {
            chain_id: 11155111,
            bundler_url: "https://bundler.example".into(),
            mode: ExecutionMode::Aa,
            calls: vec![Call {
                to: Address::ZERO,
                data: vec![0xaa],
                value: "0".into(),
            }],
            metadata: PlanMetadata {
                agent_id: "42".into(),
                validator_address: "0x00000000000000000000000000000000000000aa".into(),
                request_uri: None,
                request_hash: Some("0x01".into()),
            },
        };
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["chainId"], 11155111);
        assert_eq!(json["mode"], "aa");
        assert_eq!(json["calls"][0]["data"], "0xaa");
        assert_eq!(json["metadata"]["requestHash"], "0x01");
        assert!(json["metadata"].get("requestUri").is_none());
    }
}
