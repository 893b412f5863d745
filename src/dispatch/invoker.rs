//! Resolves a function id to a concrete HTTP target and calls it.

use axum::body::Bytes;
use std::sync::Arc;
use std::time::Instant;

use crate::catalog::Catalog;
use crate::event::Event;
use crate::function::{FunctionCaller, FunctionError, FunctionId, Provider};
use crate::observability::metrics;

pub struct Invoker {
    catalog: Arc<Catalog>,
    caller: FunctionCaller,
}

impl Invoker {
    pub fn new(catalog: Arc<Catalog>, caller: FunctionCaller) -> Self {
        Self { catalog, caller }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Call a function with the event as its JSON payload.
    ///
    /// Weighted functions pick one target per call; the target must be an
    /// HTTP function.
    pub async fn invoke(&self, space: &str, function_id: &FunctionId, event: &Event) -> Result<Bytes, FunctionError> {
        let url = self.resolve_url(space, function_id)?;
        let payload = serde_json::to_vec(event)?;

        let start = Instant::now();
        let result = self.caller.call_http(&url, payload).await;
        metrics::record_invocation(function_id.as_str(), result.is_ok(), start);

        match &result {
            Ok(body) => tracing::debug!(
                space = %space,
                function_id = %function_id,
                event_type = %event.event_type,
                response_bytes = body.len(),
                "Function invoked"
            ),
            Err(e) => tracing::debug!(
                space = %space,
                function_id = %function_id,
                event_type = %event.event_type,
                error = %e,
                "Function invocation failed"
            ),
        }
        result
    }

    fn resolve_url(&self, space: &str, function_id: &FunctionId) -> Result<String, FunctionError> {
        let function = self
            .catalog
            .get_function(space, function_id)
            .map_err(|_| FunctionError::NotFound(function_id.clone()))?;

        match function.provider {
            Provider::Http { url } => Ok(url),
            Provider::Weighted { functions } => {
                let chosen = functions.choose()?;
                let target = self
                    .catalog
                    .get_function(space, &chosen)
                    .map_err(|_| FunctionError::NotFound(chosen.clone()))?;
                match target.provider {
                    Provider::Http { url } => Ok(url),
                    Provider::Weighted { .. } => Err(FunctionError::NestedWeighted(chosen)),
                }
            }
        }
    }
}
