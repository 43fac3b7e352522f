//! Shared RPC utilities for interacting with Ethereum JSON-RPC endpoints.

use std::{future::Future, time::Duration};

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Default timeout for RPC requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Failure of a single JSON-RPC request.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// The endpoint could not be reached or answered with garbage.
    #[error("failed to send {method} request: {source}")]
    Transport {
        method: String,
        #[source]
        source: reqwest::Error,
    },
    /// The endpoint answered with a JSON-RPC error object.
    #[error("RPC error {code}: {message}")]
    Response {
        code: i64,
        message: String,
        data: Option<Value>,
    },
    /// The endpoint answered, but not with what was asked for.
    #[error("unexpected {method} response: {reason}")]
    Decode { method: String, reason: String },
}

impl RpcError {
    /// Whether the same request may succeed if sent again.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

/// Create an HTTP client configured for JSON-RPC requests.
pub fn create_client() -> Result<reqwest::Client, anyhow::Error> {
    use anyhow::Context;

    reqwest::Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .build()
        .context("Failed to create HTTP client")
}

/// Make a JSON-RPC call and deserialize the result.
///
/// # Arguments
/// * `client` - The HTTP client to use
/// * `url` - The RPC endpoint URL
/// * `method` - The RPC method name
/// * `params` - The method parameters
///
/// # Returns
/// The deserialized result. A `null` result deserializes into `T` like any other
/// value, so use an `Option<T>` for methods that return `null` when nothing is found.
pub async fn json_rpc_call<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    method: &str,
    params: Vec<Value>,
) -> Result<T, RpcError> {
    let transport = |source| RpcError::Transport {
        method: method.to_string(),
        source,
    };

    let response = client
        .post(url)
        .json(&serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        }))
        .send()
        .await
        .map_err(transport)?;

    let result: Value = response.json().await.map_err(transport)?;

    if let Some(error) = result.get("error") {
        return Err(RpcError::Response {
            code: error.get("code").and_then(Value::as_i64).unwrap_or_default(),
            message: error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown")
                .to_string(),
            data: error.get("data").cloned(),
        });
    }

    let result_value = result.get("result").ok_or_else(|| RpcError::Decode {
        method: method.to_string(),
        reason: "no result in response".to_string(),
    })?;

    serde_json::from_value(result_value.clone()).map_err(|e| RpcError::Decode {
        method: method.to_string(),
        reason: e.to_string(),
    })
}

/// Poll `check_fn` until it yields a value or `timeout` elapses.
///
/// Errors returned by `check_fn` are logged and polling continues: a flaky endpoint
/// must not be mistaken for a missing result. The timeout bounds the whole wait,
/// including a check that is still in flight when it expires.
///
/// # Returns
/// `Some(value)` as soon as the check produces one, `None` after the timeout.
pub async fn poll_until<T, F, Fut>(
    name: &str,
    timeout: Duration,
    interval: Duration,
    check_fn: F,
) -> Option<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Option<T>, anyhow::Error>>,
{
    let start = std::time::Instant::now();

    let poll = async {
        loop {
            match check_fn().await {
                Ok(Some(value)) => return value,
                Ok(None) => {
                    tracing::trace!(name, elapsed = ?start.elapsed(), "Not ready yet, polling again...");
                }
                Err(e) => {
                    tracing::debug!(error = %e, name, "Poll failed, retrying...");
                }
            }

            tokio::time::sleep(interval).await;
        }
    };

    match tokio::time::timeout(timeout, poll).await {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::debug!(name, ?timeout, "Gave up polling");
            None
        }
    }
}
