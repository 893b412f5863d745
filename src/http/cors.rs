//! CORS handling for the events API.
//!
//! Sync subscriptions carry their own CORS settings; custom events are
//! open to every origin.

use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::subscription::Cors;

/// A preflight is an `OPTIONS` request naming the method it wants to use.
pub fn is_preflight(method: &Method, headers: &HeaderMap) -> bool {
    method == Method::OPTIONS && headers.contains_key(header::ACCESS_CONTROL_REQUEST_METHOD)
}

/// A browser preflight for a custom event: the `Event` header is only
/// announced in `Access-Control-Request-Headers`, never sent.
pub fn is_event_preflight(method: &Method, headers: &HeaderMap) -> bool {
    method == Method::OPTIONS
        && headers
            .get_all(header::ACCESS_CONTROL_REQUEST_HEADERS)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .any(|name| name.trim().eq_ignore_ascii_case("event"))
}

/// Method the request will actually be routed as.
pub fn effective_method(method: &Method, headers: &HeaderMap) -> String {
    if is_preflight(method, headers) {
        if let Some(requested) = headers
            .get(header::ACCESS_CONTROL_REQUEST_METHOD)
            .and_then(|v| v.to_str().ok())
        {
            return requested.to_ascii_uppercase();
        }
    }
    method.as_str().to_string()
}

fn origin_allowed(cors: &Cors, origin: &str) -> bool {
    cors.origins.iter().any(|allowed| match allowed.split_once('*') {
        Some((prefix, suffix)) => {
            origin.len() >= prefix.len() + suffix.len() && origin.starts_with(prefix) && origin.ends_with(suffix)
        }
        None => allowed.eq_ignore_ascii_case(origin),
    })
}

fn request_origin(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::ORIGIN).and_then(|v| v.to_str().ok())
}

/// Answer a preflight from the subscription's settings.
pub fn preflight(cors: &Cors, headers: &HeaderMap) -> Response {
    let mut response = StatusCode::OK.into_response();
    let Some(origin) = request_origin(headers) else {
        return response;
    };
    if !origin_allowed(cors, origin) {
        return response;
    }

    let requested = headers
        .get(header::ACCESS_CONTROL_REQUEST_METHOD)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !cors.methods.iter().any(|m| m.eq_ignore_ascii_case(requested)) {
        return response;
    }

    let out = response.headers_mut();
    set(out, header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    set(out, header::ACCESS_CONTROL_ALLOW_METHODS, &requested.to_ascii_uppercase());
    if !cors.headers.is_empty() {
        set(out, header::ACCESS_CONTROL_ALLOW_HEADERS, &cors.headers.join(", "));
    }
    if cors.allow_credentials {
        set(out, header::ACCESS_CONTROL_ALLOW_CREDENTIALS, "true");
    }
    out.append(header::VARY, HeaderValue::from_static("Origin"));
    response
}

/// Add allow-origin headers to an actual response when the origin is allowed.
pub fn apply(cors: &Cors, request_headers: &HeaderMap, response: &mut Response) {
    let Some(origin) = request_origin(request_headers) else {
        return;
    };
    if !origin_allowed(cors, origin) {
        return;
    }
    let out = response.headers_mut();
    set(out, header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    if cors.allow_credentials {
        set(out, header::ACCESS_CONTROL_ALLOW_CREDENTIALS, "true");
    }
    out.append(header::VARY, HeaderValue::from_static("Origin"));
}

/// Permissive CORS used for custom events.
pub fn allow_all(request_headers: &HeaderMap, response: &mut Response) {
    if request_origin(request_headers).is_some() {
        response
            .headers_mut()
            .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    }
}

/// Preflight answer for custom events.
pub fn allow_all_preflight(request_headers: &HeaderMap) -> Response {
    let mut response = StatusCode::OK.into_response();
    allow_all(request_headers, &mut response);
    let out = response.headers_mut();
    out.insert(header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("POST"));
    if let Some(requested) = request_headers.get(header::ACCESS_CONTROL_REQUEST_HEADERS) {
        out.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, requested.clone());
    }
    response
}

fn set(headers: &mut HeaderMap, name: header::HeaderName, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(name, value);
    }
}
