use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Header carrying the event name in emit requests.
pub const EVENT_HEADER: &str = "Event";
/// Header carrying the target space.
pub const SPACE_HEADER: &str = "Space";
/// Header naming the function for synchronous invocation.
pub const FUNCTION_ID_HEADER: &str = "Function-ID";

/// Errors returned by the gateway client.
#[derive(Debug, thiserror::Error)]
pub enum SdkError {
    #[error("invalid gateway url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("request to event gateway failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("event gateway returned status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("failed to decode gateway response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Client settings.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Gateway events URL. A bare host gets `https://` prepended.
    pub url: String,
    /// Space to emit into. The gateway falls back to its default space when unset.
    pub space: Option<String>,
    pub timeout: Duration,
}

impl GatewayConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            space: None,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_space(mut self, space: impl Into<String>) -> Self {
        self.space = Some(space.into());
        self
    }
}

/// Emit envelope, also the request body of `emit`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmitRequest {
    pub event: String,
    pub data: serde_json::Value,
}

impl EmitRequest {
    pub fn new(event: impl Into<String>, data: impl Serialize) -> Result<Self, SdkError> {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_value(data)?,
        })
    }
}

pub struct EventGateway {
    client: Client,
    url: Url,
    space: Option<String>,
}

impl EventGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, SdkError> {
        let url = normalize_url(&config.url)?;
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            url,
            space: config.space,
        })
    }

    /// Gateway URL requests are sent to.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Publish an event. Performs exactly one POST; failures are not retried.
    pub async fn emit(&self, req: EmitRequest) -> Result<(), SdkError> {
        let mut builder = self
            .client
            .post(self.url.clone())
            .header(EVENT_HEADER, &req.event)
            .json(&req);

        if let Some(space) = &self.space {
            builder = builder.header(SPACE_HEADER, space);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SdkError::Status { status, body });
        }

        tracing::debug!(event = %req.event, status = %status, "Event emitted");
        Ok(())
    }

    /// Call a registered function synchronously and return its JSON result.
    pub async fn invoke(
        &self,
        function_id: &str,
        data: serde_json::Value,
    ) -> Result<serde_json::Value, SdkError> {
        let mut builder = self
            .client
            .post(self.url.clone())
            .header(EVENT_HEADER, "invoke")
            .header(FUNCTION_ID_HEADER, function_id)
            .json(&data);

        if let Some(space) = &self.space {
            builder = builder.header(SPACE_HEADER, space);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(SdkError::Status { status, body: text });
        }

        if text.is_empty() {
            return Ok(serde_json::Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

fn normalize_url(raw: &str) -> Result<Url, SdkError> {
    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    };

    Url::parse(&with_scheme).map_err(|source| SdkError::InvalidUrl {
        url: raw.to_string(),
        source,
    })
}
