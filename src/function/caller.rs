//! HTTP transport for function calls.

use axum::body::Bytes;
use reqwest::{header, Client, StatusCode};
use std::time::Duration;

use super::FunctionError;

/// Calls HTTP-backed functions.
#[derive(Debug, Clone)]
pub struct FunctionCaller {
    client: Client,
}

impl FunctionCaller {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Failed to build function client, using defaults");
                Client::new()
            });

        Self { client }
    }

    /// POST the JSON payload to the function and return the raw response body.
    ///
    /// A 500 response is a function runtime error; other statuses pass the
    /// body through to the caller.
    pub async fn call_http(&self, url: &str, payload: Vec<u8>) -> Result<Bytes, FunctionError> {
        let resp = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
            .map_err(FunctionError::CallFailed)?;

        if resp.status() == StatusCode::INTERNAL_SERVER_ERROR {
            return Err(FunctionError::Runtime {
                status: resp.status().as_u16(),
            });
        }

        resp.bytes().await.map_err(FunctionError::CallFailed)
    }
}

impl Default for FunctionCaller {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}
