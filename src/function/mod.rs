//! Functions that events are delivered to.
//!
//! A function is registered per space and backed by a provider:
//! - `http`: the event is POSTed as JSON to a URL
//! - `weighted`: one of several other functions is picked by weight per call

pub mod caller;

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use caller::FunctionCaller;

/// Errors raised while calling a function.
#[derive(Debug, thiserror::Error)]
pub enum FunctionError {
    #[error("Function {0:?} not found.")]
    NotFound(FunctionId),

    #[error("Function call failed. Error: {0}")]
    CallFailed(#[source] reqwest::Error),

    #[error("Function call failed because of runtime error. Error: HTTP status code: {status}")]
    Runtime { status: u16 },

    #[error("target function weights sum to 0, there is not one function to target")]
    NoWeightedTarget,

    #[error("weighted function {0:?} must target http functions only")]
    NestedWeighted(FunctionId),

    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
}

impl FunctionError {
    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FunctionError::CallFailed(_) | FunctionError::Runtime { .. })
    }
}

/// Unique function identifier within a space.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct FunctionId(String);

impl FunctionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Ids are limited to `[a-zA-Z0-9._-]+`.
    pub fn is_valid(&self) -> bool {
        is_identifier(&self.0)
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FunctionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Shared identifier rule for spaces and function ids.
pub fn is_identifier(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

/// A function registered in a space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Function {
    #[serde(default)]
    pub space: String,
    pub function_id: FunctionId,
    pub provider: Provider,
}

impl Function {
    pub fn http(space: impl Into<String>, id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            space: space.into(),
            function_id: FunctionId::new(id),
            provider: Provider::Http { url: url.into() },
        }
    }
}

/// Backing provider of a function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Provider {
    Http { url: String },
    Weighted { functions: WeightedFunctions },
}

impl Provider {
    /// Check provider specific fields.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Provider::Http { url } => {
                let parsed = url::Url::parse(url).map_err(|e| format!("invalid url {:?}: {}", url, e))?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(format!("url {:?} must use http or https", url));
                }
                Ok(())
            }
            Provider::Weighted { functions } => {
                if functions.is_empty() {
                    return Err("weighted provider requires at least one function".into());
                }
                if functions.iter().any(|f| f.weight == 0) {
                    return Err("weighted function weights must be greater than 0".into());
                }
                Ok(())
            }
        }
    }
}

/// A function with its load-balancing weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightedFunction {
    pub function_id: FunctionId,
    pub weight: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightedFunctions(pub Vec<WeightedFunction>);

impl WeightedFunctions {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WeightedFunction> {
        self.0.iter()
    }

    /// Pick one function with probability proportional to its weight.
    pub fn choose(&self) -> Result<FunctionId, FunctionError> {
        self.choose_with(&mut rand::thread_rng())
    }

    pub fn choose_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<FunctionId, FunctionError> {
        if let [only] = self.0.as_slice() {
            return Ok(only.function_id.clone());
        }

        let total: u64 = self.0.iter().map(|f| u64::from(f.weight)).sum();
        if total == 0 {
            return Err(FunctionError::NoWeightedTarget);
        }

        let chosen = rng.gen_range(1..=total);
        let mut so_far = 0u64;
        for f in &self.0 {
            so_far += u64::from(f.weight);
            if so_far >= chosen {
                return Ok(f.function_id.clone());
            }
        }

        Err(FunctionError::NoWeightedTarget)
    }
}
