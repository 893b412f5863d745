//! Subscriptions bind an event type to a function.
//!
//! - `async`: matching events are fanned out in the background
//! - `sync`: the function answers the request that carried the event, so the
//!   subscription also names an HTTP method and a path pattern

use base64::Engine;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::event::EventType;
use crate::function::FunctionId;

/// Unique subscription identifier, derived from its routing fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct SubscriptionId(String);

impl SubscriptionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionType {
    #[default]
    Async,
    Sync,
}

impl fmt::Display for SubscriptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionType::Async => f.write_str("async"),
            SubscriptionType::Sync => f.write_str("sync"),
        }
    }
}

/// CORS settings for sync subscriptions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cors {
    pub origins: Vec<String>,
    pub methods: Vec<String>,
    pub headers: Vec<String>,
    #[serde(default)]
    pub allow_credentials: bool,
}

impl Default for Cors {
    fn default() -> Self {
        Self {
            origins: vec!["*".into()],
            methods: ["HEAD", "GET", "POST"].iter().map(|m| m.to_string()).collect(),
            headers: ["Origin", "Accept", "Content-Type"].iter().map(|h| h.to_string()).collect(),
            allow_credentials: false,
        }
    }
}

const METHODS: &[&str] = &["GET", "POST", "DELETE", "PUT", "PATCH", "HEAD", "OPTIONS"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    #[serde(default)]
    pub space: String,

    #[serde(default)]
    pub subscription_id: SubscriptionId,

    #[serde(rename = "type", default)]
    pub kind: SubscriptionType,

    pub event_type: EventType,

    pub function_id: FunctionId,

    #[serde(default = "default_path")]
    pub path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cors: Option<Cors>,
}

fn default_path() -> String {
    "/".to_string()
}

impl Subscription {
    pub fn new_async(space: &str, event_type: &str, function_id: &str) -> Self {
        Self {
            space: space.to_string(),
            subscription_id: SubscriptionId::default(),
            kind: SubscriptionType::Async,
            event_type: EventType::new(event_type),
            function_id: FunctionId::new(function_id),
            path: default_path(),
            method: None,
            cors: None,
        }
    }

    pub fn new_sync(space: &str, event_type: &str, function_id: &str, method: &str, path: &str) -> Self {
        Self {
            kind: SubscriptionType::Sync,
            method: Some(method.to_string()),
            path: path.to_string(),
            ..Self::new_async(space, event_type, function_id)
        }
    }

    /// Fill defaults and check field formats. Must run before `compute_id`.
    pub fn normalize(&mut self) -> Result<(), String> {
        if self.event_type.as_str().is_empty() {
            return Err("eventType is required".into());
        }
        if !self.function_id.is_valid() {
            return Err(format!("invalid functionId {:?}", self.function_id.as_str()));
        }

        if !self.path.starts_with('/') {
            self.path.insert(0, '/');
        }
        if self.path.contains(char::is_whitespace) {
            return Err(format!("invalid path {:?}", self.path));
        }

        let method = self.method.as_deref().unwrap_or("POST").to_ascii_uppercase();
        if !METHODS.contains(&method.as_str()) {
            return Err(format!("unsupported method {:?}", method));
        }
        self.method = Some(method);

        match self.kind {
            SubscriptionType::Async => {
                if self.event_type.is_http_request() {
                    return Err("http.request events can only have sync subscriptions".into());
                }
                self.cors = None;
            }
            SubscriptionType::Sync => {
                if let Some(cors) = &self.cors {
                    if cors.origins.is_empty() || cors.methods.is_empty() || cors.headers.is_empty() {
                        return Err("cors origins, methods and headers must not be empty".into());
                    }
                }
            }
        }

        self.subscription_id = self.compute_id();
        Ok(())
    }

    /// Deterministic id: base64url of the routing fields.
    ///
    /// Sync ids leave out the function so two functions can never claim the
    /// same method and path.
    pub fn compute_id(&self) -> SubscriptionId {
        let path = escape_path(&self.path);
        let method = self.method.as_deref().unwrap_or_default();
        let raw = match self.kind {
            SubscriptionType::Async => format!(
                "{},{},{},{},{}",
                self.kind, self.event_type, self.function_id, path, method
            ),
            SubscriptionType::Sync => {
                format!("{},{},{},{}", self.kind, self.event_type, path, method)
            }
        };

        SubscriptionId(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(raw))
    }
}

/// Bytes escaped in a single path segment. Unreserved characters and
/// `$&+:=@` stay as they are.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b':')
    .remove(b'=')
    .remove(b'@');

fn escape_path(path: &str) -> String {
    utf8_percent_encode(path, PATH_SEGMENT).to_string()
}
