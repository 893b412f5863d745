//! Event model.
//!
//! Every payload that passes through the gateway is normalized into an
//! [`Event`] shaped after CloudEvents v0.1.
//!
//! # Data Flow
//! ```text
//! Incoming HTTP request
//!     → parse.rs (content mode detection, body decoding)
//!     → Event (validated)
//!     → router (sync call) or dispatcher (async fan-out)
//! ```

pub mod parse;
pub mod system;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

pub use parse::{from_request, IncomingRequest};

/// CloudEvents version produced and accepted.
pub const CLOUD_EVENTS_VERSION: &str = "0.1";

/// Revision of the request to event transformation.
pub const TRANSFORMATION_VERSION: &str = "0.1";

/// Source stamped on events built by the gateway.
pub const GATEWAY_SOURCE: &str =
    "https://serverless.com/event-gateway/#transformationVersion=0.1";

/// Errors raised while building an event from a request.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("malformed JSON body")]
    MalformedJson,

    #[error("CloudEvent doesn't validate: {0}")]
    Invalid(String),

    #[error("invalid content type {0:?}")]
    ContentType(String),
}

/// Name of an event type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct EventType(String);

impl EventType {
    /// Synchronous function invocation.
    pub const INVOKE: &'static str = "invoke";
    /// Plain HTTP request that is not a CloudEvent.
    pub const HTTP_REQUEST: &'static str = "http.request";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn invoke() -> Self {
        Self::new(Self::INVOKE)
    }

    pub fn http_request() -> Self {
        Self::new(Self::HTTP_REQUEST)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_invoke(&self) -> bool {
        self.0 == Self::INVOKE
    }

    pub fn is_http_request(&self) -> bool {
        self.0 == Self::HTTP_REQUEST
    }

    /// System events are emitted by the gateway itself.
    pub fn is_system(&self) -> bool {
        self.0.starts_with(system::SYSTEM_PREFIX)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Event flowing through the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default)]
    pub event_type: EventType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type_version: Option<String>,

    #[serde(default)]
    pub cloud_events_version: String,

    #[serde(default)]
    pub source: String,

    #[serde(rename = "eventID", default)]
    pub event_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_time: Option<DateTime<Utc>>,

    #[serde(rename = "schemaURL", default, skip_serializing_if = "Option::is_none")]
    pub schema_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map<String, Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    #[serde(default)]
    pub data: Value,
}

impl Event {
    /// Build a gateway-originated event with a fresh id and timestamp.
    pub fn new(event_type: EventType, content_type: impl Into<String>, data: Value) -> Self {
        let mut marker = Map::new();
        marker.insert("transformed".into(), Value::Bool(true));
        marker.insert(
            "transformation-version".into(),
            Value::String(TRANSFORMATION_VERSION.into()),
        );
        let mut extensions = Map::new();
        extensions.insert("eventgateway".into(), Value::Object(marker));

        Self {
            event_type,
            event_type_version: None,
            cloud_events_version: CLOUD_EVENTS_VERSION.to_string(),
            source: GATEWAY_SOURCE.to_string(),
            event_id: Uuid::new_v4().to_string(),
            event_time: Some(Utc::now()),
            schema_url: None,
            extensions: Some(extensions),
            content_type: Some(content_type.into()),
            data,
        }
    }

    /// Check required CloudEvents attributes.
    pub fn validate(&self) -> Result<(), EventError> {
        let missing: Vec<&str> = [
            ("eventType", self.event_type.as_str()),
            ("cloudEventsVersion", self.cloud_events_version.as_str()),
            ("source", self.source.as_str()),
            ("eventID", self.event_id.as_str()),
        ]
        .iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(field, _)| *field)
        .collect();

        if !missing.is_empty() {
            return Err(EventError::Invalid(format!(
                "missing required field(s): {}",
                missing.join(", ")
            )));
        }

        if url::Url::parse(&self.source).is_err() && !self.source.starts_with('/') {
            return Err(EventError::Invalid(format!(
                "source {:?} is not a valid URI",
                self.source
            )));
        }

        Ok(())
    }

    pub fn is_system(&self) -> bool {
        self.event_type.is_system()
    }

    /// Request data, present on `http.request` events.
    pub fn http_request(&self) -> Option<HttpRequestData> {
        if !self.event_type.is_http_request() {
            return None;
        }
        serde_json::from_value(self.data.clone()).ok()
    }
}

/// Payload of `http.request` events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpRequestData {
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub query: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub body: Value,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub params: HashMap<String, String>,
}
