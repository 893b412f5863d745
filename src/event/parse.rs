//! Request to event transformation.
//!
//! # Content modes, checked in order
//! - Structured: `Content-Type: application/cloudevents+json`
//! - Binary: `CE-EventType`, `CE-CloudEventsVersion`, `CE-Source`, `CE-EventID` headers
//! - Legacy: `Event` header names the type (the SDK uses this mode)
//! - Anything else becomes an `http.request` event

use axum::http::{HeaderMap, Method, Uri};
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

use super::{Event, EventError, EventType, HttpRequestData};

pub const MIME_JSON: &str = "application/json";
pub const MIME_CLOUD_EVENTS_JSON: &str = "application/cloudevents+json";
pub const MIME_OCTET_STREAM: &str = "application/octet-stream";
const MIME_FORM_MULTIPART: &str = "multipart/form-data";
const MIME_FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Borrowed view over the parts of a request needed to build an event.
#[derive(Debug, Clone, Copy)]
pub struct IncomingRequest<'a> {
    pub method: &'a Method,
    pub uri: &'a Uri,
    pub headers: &'a HeaderMap,
    pub body: &'a [u8],
}

/// Build an event from an incoming request.
pub fn from_request(req: &IncomingRequest<'_>) -> Result<Event, EventError> {
    let mime = media_type(req.headers)?;

    if mime == MIME_CLOUD_EVENTS_JSON {
        return parse_structured(req.body);
    }

    if is_binary_mode(req.headers) {
        return parse_binary(req.headers, &mime, req.body);
    }

    if let Some(name) = header_str(req.headers, "event") {
        return parse_legacy(EventType::new(name), &mime, req.body);
    }

    let body = decode_body(&mime, req.body)?;
    Ok(Event::new(
        EventType::http_request(),
        MIME_CLOUD_EVENTS_JSON,
        serde_json::to_value(http_request_data(req, body)).unwrap_or(Value::Null),
    ))
}

/// Decode a request body according to its media type.
///
/// JSON is parsed, forms are kept as text, other UTF-8 payloads become
/// strings and binary payloads are base64 encoded.
pub fn decode_body(mime: &str, body: &[u8]) -> Result<Value, EventError> {
    if body.is_empty() {
        return Ok(Value::Null);
    }

    if mime == MIME_JSON || mime.ends_with("+json") {
        return serde_json::from_slice(body).map_err(|_| EventError::MalformedJson);
    }

    if mime.starts_with(MIME_FORM_MULTIPART) || mime == MIME_FORM_URLENCODED {
        return Ok(Value::String(String::from_utf8_lossy(body).into_owned()));
    }

    match std::str::from_utf8(body) {
        Ok(text) => Ok(Value::String(text.to_string())),
        Err(_) => Ok(Value::String(
            base64::engine::general_purpose::STANDARD.encode(body),
        )),
    }
}

/// Media type of the request without parameters, lowercased.
pub fn media_type(headers: &HeaderMap) -> Result<String, EventError> {
    let raw = match headers.get(axum::http::header::CONTENT_TYPE) {
        None => return Ok(MIME_OCTET_STREAM.to_string()),
        Some(v) => v
            .to_str()
            .map_err(|_| EventError::ContentType("<non-ascii>".into()))?,
    };

    let essence = raw.split(';').next().unwrap_or_default().trim();
    if essence.is_empty() {
        return Ok(MIME_OCTET_STREAM.to_string());
    }
    if !essence.contains('/') {
        return Err(EventError::ContentType(raw.to_string()));
    }
    Ok(essence.to_ascii_lowercase())
}

fn parse_structured(body: &[u8]) -> Result<Event, EventError> {
    let event: Event = serde_json::from_slice(body).map_err(|_| EventError::MalformedJson)?;
    event.validate()?;
    Ok(event)
}

fn parse_binary(headers: &HeaderMap, mime: &str, body: &[u8]) -> Result<Event, EventError> {
    let get = |name: &str| header_str(headers, name).unwrap_or_default().to_string();

    let mut extensions = Map::new();
    for (name, value) in headers {
        if let Some(key) = name.as_str().strip_prefix("ce-x-") {
            if let Ok(value) = value.to_str() {
                extensions.insert(key.to_string(), Value::String(value.to_string()));
            }
        }
    }

    let event = Event {
        event_type: EventType::new(get("ce-eventtype")),
        event_type_version: header_str(headers, "ce-eventtypeversion").map(str::to_string),
        cloud_events_version: get("ce-cloudeventsversion"),
        source: get("ce-source"),
        event_id: get("ce-eventid"),
        event_time: header_str(headers, "ce-eventtime")
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
            .map(|t| t.with_timezone(&Utc)),
        schema_url: header_str(headers, "ce-schemaurl")
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        extensions: Some(extensions),
        content_type: header_str(headers, "content-type").map(str::to_string),
        data: decode_body(mime, body)?,
    };

    event.validate()?;
    Ok(event)
}

/// Body shape sent by the SDK's `emit`.
#[derive(Deserialize)]
struct EmitEnvelope {
    event: String,
    #[serde(default)]
    data: Value,
}

fn parse_legacy(event_type: EventType, mime: &str, body: &[u8]) -> Result<Event, EventError> {
    if mime != MIME_JSON {
        return Ok(Event::new(event_type, mime, decode_body(mime, body)?));
    }

    let value = decode_body(mime, body)?;

    if let Ok(envelope) = serde_json::from_value::<EmitEnvelope>(value.clone()) {
        if envelope.event == event_type.as_str() {
            return Ok(Event::new(event_type, mime, envelope.data));
        }
    }

    if let Ok(event) = serde_json::from_value::<Event>(value.clone()) {
        if event.validate().is_ok() {
            return Ok(event);
        }
    }

    Ok(Event::new(event_type, mime, value))
}

fn http_request_data(req: &IncomingRequest<'_>, body: Value) -> HttpRequestData {
    let headers = req
        .headers
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
        .collect();

    let mut query: HashMap<String, Vec<String>> = HashMap::new();
    if let Some(raw) = req.uri.query() {
        for (k, v) in url::form_urlencoded::parse(raw.as_bytes()) {
            query.entry(k.into_owned()).or_default().push(v.into_owned());
        }
    }

    let host = header_str(req.headers, "host")
        .map(str::to_string)
        .or_else(|| req.uri.host().map(str::to_string))
        .unwrap_or_default();

    HttpRequestData {
        headers,
        query,
        body,
        host,
        path: req.uri.path().to_string(),
        method: req.method.to_string(),
        params: HashMap::new(),
    }
}

fn is_binary_mode(headers: &HeaderMap) -> bool {
    ["ce-eventtype", "ce-cloudeventsversion", "ce-source", "ce-eventid"]
        .iter()
        .all(|h| header_str(headers, h).is_some_and(|v| !v.is_empty()))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
