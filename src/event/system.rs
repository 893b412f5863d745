//! Events emitted by the gateway about its own activity.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

use super::{Event, EventType};
use crate::function::FunctionId;

pub const SYSTEM_PREFIX: &str = "gateway.";

pub const EVENT_RECEIVED: &str = "gateway.event.received";
pub const FUNCTION_INVOKING: &str = "gateway.function.invoking";
pub const FUNCTION_INVOKED: &str = "gateway.function.invoked";
pub const FUNCTION_INVOCATION_FAILED: &str = "gateway.function.invocationFailed";

#[derive(Debug, Serialize)]
struct EventReceived<'a> {
    path: &'a str,
    event: &'a Event,
    headers: &'a HashMap<String, String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FunctionActivity<'a> {
    space: &'a str,
    function_id: &'a FunctionId,
    event: &'a Event,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

pub fn event_received(path: &str, event: &Event, headers: &HashMap<String, String>) -> Event {
    system_event(EVENT_RECEIVED, &EventReceived { path, event, headers })
}

pub fn function_invoking(space: &str, function_id: &FunctionId, event: &Event) -> Event {
    system_event(
        FUNCTION_INVOKING,
        &FunctionActivity { space, function_id, event, result: None, error: None },
    )
}

pub fn function_invoked(space: &str, function_id: &FunctionId, event: &Event, result: &[u8]) -> Event {
    let result = serde_json::from_slice(result)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(result).into_owned()));
    system_event(
        FUNCTION_INVOKED,
        &FunctionActivity { space, function_id, event, result: Some(&result), error: None },
    )
}

pub fn function_invocation_failed(
    space: &str,
    function_id: &FunctionId,
    event: &Event,
    error: &str,
) -> Event {
    system_event(
        FUNCTION_INVOCATION_FAILED,
        &FunctionActivity { space, function_id, event, result: None, error: Some(error) },
    )
}

fn system_event(name: &str, data: &impl Serialize) -> Event {
    let data = serde_json::to_value(data).unwrap_or(Value::Null);
    Event::new(EventType::new(name), super::parse::MIME_JSON, data)
}
