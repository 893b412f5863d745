//! Responses returned by functions behind sync HTTP subscriptions.

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

pub const MALFORMED_RESPONSE: &str = "HTTP response object returned by function malformed.";

/// HTTP response object a function returns for an `http.request` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpResponse {
    #[serde(default = "default_status")]
    pub status_code: u16,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Either a string sent as-is or a JSON value sent serialized.
    #[serde(default)]
    pub body: Value,
}

fn default_status() -> u16 {
    200
}

impl HttpResponse {
    pub fn new(status_code: u16) -> Self {
        Self {
            status_code,
            headers: HashMap::new(),
            body: Value::Null,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    /// JSON body with the matching content type.
    pub fn json(status_code: u16, body: &impl Serialize) -> Self {
        Self::new(status_code)
            .with_header("Content-Type", "application/json")
            .with_body(Value::String(serde_json::to_string(body).unwrap_or_default()))
    }

    /// Decode a function result; `None` when it is not a response object.
    pub fn decode(raw: &[u8]) -> Option<Self> {
        match serde_json::from_slice::<Value>(raw).ok()? {
            value @ Value::Object(_) => serde_json::from_value(value).ok(),
            _ => None,
        }
    }

    fn body_bytes(&self) -> Vec<u8> {
        match &self.body {
            Value::Null => Vec::new(),
            Value::String(s) => s.clone().into_bytes(),
            other => other.to_string().into_bytes(),
        }
    }
}

impl IntoResponse for HttpResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::OK);
        let mut response = Response::new(Body::from(self.body_bytes()));
        *response.status_mut() = status;

        for (name, value) in &self.headers {
            match (HeaderName::try_from(name.as_str()), HeaderValue::from_str(value)) {
                (Ok(name), Ok(value)) => {
                    response.headers_mut().insert(name, value);
                }
                _ => tracing::debug!(header = %name, "Dropping invalid response header"),
            }
        }
        response
    }
}
