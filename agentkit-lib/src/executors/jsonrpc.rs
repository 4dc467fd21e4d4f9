//! JSON-RPC 2.0 over HTTP.
//!
//! # Feature Flags
//!
//! Requires the `http-executor` feature for actual HTTP requests. Without it,
//! every request returns an `Unimplemented` error.

use std::sync::atomic::{AtomicU64, Ordering};
#[cfg(feature = "http-executor")]
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::config::JsonRpcConfig;
use crate::{AgentkitError, Result};

/// Error object returned by a JSON-RPC server.
///
/// The `data` member usually carries revert data, so it stays in the
/// rendered message.
#[derive(Clone, Debug, PartialEq, thiserror::Error, Serialize, Deserialize)]
#[error("RPC error {code}: {message}{}", render_data(.data))]
pub struct RpcError {
    /// Error code.
    pub code: i64,
    /// Error message.
    pub message: String,
    /// Additional error data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

fn render_data(data: &Option<Value>) -> String {
    match data {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => format!(" (data: {})", text),
        Some(other) => format!(" (data: {})", other),
    }
}

impl RpcError {
    /// Execution reverted, as reported by `eth_call` or `eth_estimateGas`.
    pub fn is_revert(&self) -> bool {
        self.code == 3 || self.message.to_ascii_lowercase().contains("revert")
    }
}

impl From<RpcError> for AgentkitError {
    fn from(err: RpcError) -> Self {
        AgentkitError::Transport(err.to_string())
    }
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: &'a Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<RpcError>,
}

/// Outcome of one call: a result or the server's error object.
pub type RpcOutcome<T> = std::result::Result<T, RpcError>;

/// Minimal JSON-RPC client.
///
/// Request ids increase monotonically per client.
pub struct JsonRpcClient {
    config: JsonRpcConfig,
    next_id: AtomicU64,
    #[cfg(feature = "http-executor")]
    client: reqwest::Client,
}

impl JsonRpcClient {
    /// Create a new client with the given configuration.
    #[cfg(feature = "http-executor")]
    pub fn new(config: JsonRpcConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentkitError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            next_id: AtomicU64::new(1),
            client,
        })
    }

    /// Create a new client with the given configuration (stub when feature disabled).
    #[cfg(not(feature = "http-executor"))]
    pub fn new(config: JsonRpcConfig) -> Result<Self> {
        Ok(Self {
            config,
            next_id: AtomicU64::new(1),
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &JsonRpcConfig {
        &self.config
    }

    /// Call `method` and decode its result.
    ///
    /// Server error objects become `Transport` errors carrying code, message
    /// and data.
    pub async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        Ok(self.call(method, params).await??)
    }

    /// Call `method`, keeping a server error object apart from transport
    /// failures.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<RpcOutcome<T>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = serde_json::to_value(RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params: &params,
        })?;

        tracing::trace!(method, id, "JSON-RPC request");
        let response = self.post(method, &body).await?;

        if let Some(error) = response.error {
            tracing::debug!(method, code = error.code, message = %error.message, "JSON-RPC error");
            return Ok(Err(error));
        }

        serde_json::from_value(response.result)
            .map(Ok)
            .map_err(|e| {
                AgentkitError::Serialization(format!("Failed to parse {} result: {}", method, e))
            })
    }

    #[cfg(feature = "http-executor")]
    async fn post(&self, method: &str, body: &Value) -> Result<RpcResponse> {
        let response = self
            .client
            .post(&self.config.url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(method, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AgentkitError::Serialization(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            // Some bundlers answer errors with a 4xx status and a JSON-RPC body.
            if let Ok(rpc) = serde_json::from_str::<RpcResponse>(&text) {
                if rpc.error.is_some() {
                    return Ok(rpc);
                }
            }
            return Err(self.map_status_error(method, status.as_u16(), &text));
        }

        serde_json::from_str(&text).map_err(|e| {
            AgentkitError::Serialization(format!("Failed to parse JSON-RPC response: {}", e))
        })
    }

    #[cfg(not(feature = "http-executor"))]
    async fn post(&self, _method: &str, _body: &Value) -> Result<RpcResponse> {
        Err(AgentkitError::Unimplemented(
            "JSON-RPC client not compiled - enable the 'http-executor' feature",
        ))
    }

    /// Map HTTP status codes to AgentkitError.
    #[cfg(feature = "http-executor")]
    fn map_status_error(&self, method: &str, status: u16, error_text: &str) -> AgentkitError {
        match status {
            429 => AgentkitError::Transport(format!("{} rate limited: {}", method, error_text)),
            500..=599 => AgentkitError::Transport(format!(
                "{} server error ({}): {}",
                method, status, error_text
            )),
            _ => AgentkitError::Transport(format!(
                "{} request failed ({}): {}",
                method, status, error_text
            )),
        }
    }

    /// Map reqwest errors to AgentkitError.
    #[cfg(feature = "http-executor")]
    fn map_reqwest_error(&self, method: &str, e: reqwest::Error) -> AgentkitError {
        if e.is_timeout() {
            AgentkitError::ConnectionTimeout {
                operation: format!("{} request", method),
                timeout_ms: self.config.timeout_secs * 1000,
            }
        } else if e.is_connect() {
            AgentkitError::Transport(format!(
                "failed to connect to {}: {}",
                self.config.url, e
            ))
        } else {
            AgentkitError::Transport(format!("{} request failed: {}", method, e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_error_display_keeps_data() {
        let err = RpcError {
            code: -32500,
            message: "UserOperation reverted during simulation".into(),
            data: Some(Value::String("0x608d53e2".into())),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("-32500"));
        assert!(rendered.contains("(data: 0x608d53e2)"));

        let err: AgentkitError = err.into();
        assert!(err.to_string().contains("0x608d53e2"));
        assert!(!err.is_domain_kind());
    }

    #[test]
    fn test_rpc_error_revert_detection() {
        let revert = RpcError {
            code: 3,
            message: "execution reverted".into(),
            data: None,
        };
        assert!(revert.is_revert());
        assert_eq!(revert.to_string(), "RPC error 3: execution reverted");

        let other = RpcError {
            code: -32601,
            message: "method not found".into(),
            data: None,
        };
        assert!(!other.is_revert());
    }

    #[test]
    fn test_response_without_result_is_null() {
        let response: RpcResponse = serde_json::from_str(r#"{"jsonrpc":"2.0","id":1}"#).unwrap();
        assert!(response.result.is_null());
        assert!(response.error.is_none());
    }

    #[cfg(not(feature = "http-executor"))]
    #[tokio::test]
    async fn test_stub_is_unimplemented() {
        let client = JsonRpcClient::new(JsonRpcConfig::new("http://localhost:1")).unwrap();
        let result: Result<String> = client.request("eth_chainId", Value::Array(vec![])).await;
        assert!(matches!(result, Err(AgentkitError::Unimplemented(_))));
    }
}
