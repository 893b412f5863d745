//! Events API handler.
//!
//! Every request on the events listener becomes an event. Custom events are
//! queued for their async subscribers, `invoke` calls one function directly
//! and `http.request` events are answered by the function behind the
//! matching sync subscription.

use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::{HeaderMap, Method, Request, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::catalog::Catalog;
use crate::dispatch::Dispatcher;
use crate::event::{from_request, system, Event, IncomingRequest};
use crate::function::{FunctionError, FunctionId};
use crate::http::cors;
use crate::http::response::{HttpResponse, MALFORMED_RESPONSE};
use crate::observability::metrics;

pub const SPACE_HEADER: &str = "space";
pub const FUNCTION_ID_HEADER: &str = "function-id";

/// Shared state of the events API.
#[derive(Clone)]
pub struct EventsState {
    pub catalog: Arc<Catalog>,
    pub dispatcher: Arc<Dispatcher>,
    pub default_space: Arc<str>,
    pub max_body_size: usize,
}

pub async fn handle_event(State(state): State<EventsState>, request: Request<Body>) -> Response {
    let method = request.method().clone();
    let response = dispatch_request(&state, request).await;
    metrics::record_request(method.as_str(), response.status().as_u16());
    response
}

async fn dispatch_request(state: &EventsState, request: Request<Body>) -> Response {
    if state.dispatcher.is_draining() {
        return (StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable").into_response();
    }

    if cors::is_event_preflight(request.method(), request.headers()) {
        return cors::allow_all_preflight(request.headers());
    }

    let (parts, body) = request.into_parts();
    let body = match to_bytes(body, state.max_body_size).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(error = %e, "Failed to read request body");
            return (StatusCode::PAYLOAD_TOO_LARGE, "request body too large").into_response();
        }
    };

    let space = parts
        .headers
        .get(SPACE_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| state.default_space.to_string());
    let path = parts.uri.path().to_string();

    let incoming = IncomingRequest {
        method: &parts.method,
        uri: &parts.uri,
        headers: &parts.headers,
        body: &body,
    };
    let event = match from_request(&incoming) {
        Ok(event) => event,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    tracing::debug!(
        space = %space,
        path = %path,
        event_type = %event.event_type,
        event_id = %event.event_id,
        "Event received"
    );
    state
        .dispatcher
        .publish_system(&space, system::event_received(&path, &event, &flatten_headers(&parts.headers)));

    if event.event_type.is_http_request() {
        metrics::record_event_received("http");
        return handle_sync(state, &space, &path, &parts.method, &parts.headers, event).await;
    }

    let mut response = handle_custom(state, &space, &path, &parts.method, &parts.headers, event).await;
    cors::allow_all(&parts.headers, &mut response);
    response
}

async fn handle_custom(
    state: &EventsState,
    space: &str,
    path: &str,
    method: &Method,
    headers: &HeaderMap,
    event: Event,
) -> Response {
    if cors::is_preflight(method, headers) {
        return cors::allow_all_preflight(headers);
    }
    if method != Method::POST {
        return (StatusCode::BAD_REQUEST, "custom event can be emitted only with POST method").into_response();
    }

    if event.event_type.is_invoke() {
        metrics::record_event_received("invoke");
        return handle_invoke(state, space, headers, event).await;
    }

    if event.is_system() {
        metrics::record_event_received("system");
        tracing::debug!(event_type = %event.event_type, "System event from outside ignored");
        return StatusCode::ACCEPTED.into_response();
    }

    metrics::record_event_received("custom");
    let routes = state.catalog.routes();
    if let Some((target, _)) = routes.sync_target(space, method.as_str(), path, &event.event_type) {
        let function_id = target.function_id.clone();
        return match call_function(state, space, &function_id, &event).await {
            Ok(body) => (StatusCode::OK, body).into_response(),
            Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
        };
    }

    state.dispatcher.enqueue(space, path, event);
    StatusCode::ACCEPTED.into_response()
}

async fn handle_invoke(state: &EventsState, space: &str, headers: &HeaderMap, event: Event) -> Response {
    let Some(function_id) = headers
        .get(FUNCTION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(FunctionId::new)
    else {
        return (StatusCode::BAD_REQUEST, "Function-ID header is required for invoke events").into_response();
    };

    match call_function(state, space, &function_id, &event).await {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

async fn handle_sync(
    state: &EventsState,
    space: &str,
    path: &str,
    method: &Method,
    headers: &HeaderMap,
    mut event: Event,
) -> Response {
    let routed_method = cors::effective_method(method, headers);
    let routes = state.catalog.routes();
    let Some((target, params)) = routes.sync_target(space, &routed_method, path, &event.event_type) else {
        tracing::debug!(space = %space, method = %routed_method, path = %path, "No sync subscription");
        return (StatusCode::NOT_FOUND, "resource not found").into_response();
    };

    if let Some(cors_config) = &target.cors {
        if cors::is_preflight(method, headers) {
            return cors::preflight(cors_config, headers);
        }
    }

    if let Some(mut data) = event.http_request() {
        data.params = params;
        event.data = serde_json::to_value(data).unwrap_or(Value::Null);
    }

    let mut response = match call_function(state, space, &target.function_id, &event).await {
        Ok(raw) => match HttpResponse::decode(&raw) {
            Some(http_response) => http_response.into_response(),
            None => {
                tracing::info!(
                    function_id = %target.function_id,
                    response = %String::from_utf8_lossy(&raw),
                    "{}",
                    MALFORMED_RESPONSE
                );
                (StatusCode::INTERNAL_SERVER_ERROR, MALFORMED_RESPONSE).into_response()
            }
        },
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    };

    if let Some(cors_config) = &target.cors {
        cors::apply(cors_config, headers, &mut response);
    }
    response
}

/// Call a function synchronously, publishing the matching system events.
async fn call_function(
    state: &EventsState,
    space: &str,
    function_id: &FunctionId,
    event: &Event,
) -> Result<axum::body::Bytes, FunctionError> {
    let dispatcher = &state.dispatcher;
    dispatcher.publish_system(space, system::function_invoking(space, function_id, event));

    let result = dispatcher.invoker().invoke(space, function_id, event).await;
    match &result {
        Ok(body) => dispatcher.publish_system(space, system::function_invoked(space, function_id, event, body)),
        Err(e) => {
            tracing::info!(space = %space, function_id = %function_id, error = %e, "Function invocation failed");
            dispatcher.publish_system(
                space,
                system::function_invocation_failed(space, function_id, event, &e.to_string()),
            );
        }
    }
    result
}

fn flatten_headers(headers: &HeaderMap) -> HashMap<String, String> {
    let mut out: HashMap<String, String> = HashMap::new();
    for (name, value) in headers {
        let Ok(value) = value.to_str() else { continue };
        out.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    out
}
