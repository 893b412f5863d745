//! Events API end to end: emit, async delivery, sync HTTP routing, invoke.

use serde_json::{json, Value};

use event_gateway::catalog::{EventTypeDefinition, Seed};
use event_gateway::function::Function;
use event_gateway::subscription::{Cors, Subscription};
use event_gateway::users;
use event_gateway_sdk::{EmitRequest, EventGateway, GatewayConfig};

mod common;

const SPACE: &str = "default";

fn seed_async(function_url: String) -> Seed {
    Seed {
        event_types: vec![EventTypeDefinition { space: String::new(), name: "user.created".into() }],
        functions: vec![Function::http("", "crm", function_url)],
        subscriptions: vec![Subscription::new_async("", "user.created", "crm")],
    }
}

#[tokio::test]
async fn test_emitted_event_reaches_async_subscriber() {
    let (addr, requests) = common::start_mock_backend("{}").await;
    let mut config = common::test_config();
    config.seed = seed_async(format!("http://{}/crm", addr));
    let gw = common::spawn_gateway(config).await;

    let sdk = EventGateway::new(GatewayConfig::new(&gw.events_url).with_space(SPACE)).unwrap();
    let user = json!({ "username": "sls-fan", "email": "bjones12@bigcorp.com" });
    common::within(sdk.emit(EmitRequest::new("user.created", &user).unwrap()))
        .await
        .unwrap();

    let seen = requests.wait_for(1).await;
    let event = seen[0].json();
    assert_eq!(seen[0].path, "/crm");
    assert_eq!(event["eventType"], "user.created");
    assert_eq!(event["cloudEventsVersion"], "0.1");
    assert_eq!(event["data"], user);
}

#[tokio::test]
async fn test_failed_delivery_is_retried() {
    let (addr, requests) = common::start_programmable_backend(|n| {
        if n == 1 { (500, "crash".to_string()) } else { (200, "{}".to_string()) }
    })
    .await;
    let mut config = common::test_config();
    config.seed = seed_async(format!("http://{}/crm", addr));
    let gw = common::spawn_gateway(config).await;

    let resp = reqwest::Client::new()
        .post(&gw.events_url)
        .header("Event", "user.created")
        .json(&json!({ "id": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 202);

    let seen = requests.wait_for(2).await;
    assert_eq!(seen[0].json()["eventID"], seen[1].json()["eventID"]);
}

#[tokio::test]
async fn test_custom_event_requires_post() {
    let gw = common::spawn_gateway(common::test_config()).await;

    let resp = reqwest::Client::new()
        .get(&gw.events_url)
        .header("Event", "user.created")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(resp.text().await.unwrap(), "custom event can be emitted only with POST method");
}

#[tokio::test]
async fn test_malformed_json_rejected() {
    let gw = common::spawn_gateway(common::test_config()).await;

    let resp = reqwest::Client::new()
        .post(&gw.events_url)
        .header("Event", "user.created")
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_unrouted_http_request_is_not_found() {
    let gw = common::spawn_gateway(common::test_config()).await;

    let resp = reqwest::get(format!("{}/nowhere", gw.events_url)).await.unwrap();
    assert_eq!(resp.status(), 404);
    assert_eq!(resp.text().await.unwrap(), "resource not found");
}

#[tokio::test]
async fn test_sync_subscription_serves_users() {
    let users_addr = common::serve(users::router()).await;
    let gw = common::spawn_gateway(common::test_config()).await;

    gw.catalog
        .register_function(Function::http(SPACE, "users-get", format!("http://{}/users/get", users_addr)))
        .unwrap();
    gw.catalog
        .register_function(Function::http(SPACE, "users-delete", format!("http://{}/users/delete", users_addr)))
        .unwrap();
    gw.catalog
        .create_subscription(Subscription::new_sync(SPACE, "http.request", "users-get", "GET", "/users/:id"))
        .unwrap();
    gw.catalog
        .create_subscription(Subscription::new_sync(SPACE, "http.request", "users-delete", "DELETE", "/users/:id"))
        .unwrap();

    let client = reqwest::Client::new();
    let resp = client.get(format!("{}/users/42", gw.events_url)).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"], "application/json");
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["id"], "42");
    assert!(body["name"].is_string());
    assert!(body["email"].is_string());

    let resp = client.delete(format!("{}/users/7", gw.events_url)).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Deleted user with id 7");

    let resp = client.post(format!("{}/users/7", gw.events_url)).send().await.unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_sync_function_sees_request_data() {
    let response = r#"{"statusCode":201,"headers":{"x-handled":"yes"},"body":"created"}"#;
    let (addr, requests) = common::start_mock_backend(response).await;
    let gw = common::spawn_gateway(common::test_config()).await;

    gw.catalog
        .register_function(Function::http(SPACE, "handler", format!("http://{}/", addr)))
        .unwrap();
    gw.catalog
        .create_subscription(Subscription::new_sync(SPACE, "http.request", "handler", "POST", "/orders/:id"))
        .unwrap();

    let resp = reqwest::Client::new()
        .post(format!("{}/orders/9?tag=a&tag=b", gw.events_url))
        .json(&json!({ "qty": 3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    assert_eq!(resp.headers()["x-handled"], "yes");
    assert_eq!(resp.text().await.unwrap(), "created");

    let event = requests.all()[0].json();
    assert_eq!(event["eventType"], "http.request");
    assert_eq!(event["data"]["method"], "POST");
    assert_eq!(event["data"]["path"], "/orders/9");
    assert_eq!(event["data"]["params"]["id"], "9");
    assert_eq!(event["data"]["query"]["tag"], json!(["a", "b"]));
    assert_eq!(event["data"]["body"], json!({ "qty": 3 }));
}

#[tokio::test]
async fn test_malformed_function_response() {
    let (addr, _) = common::start_mock_backend("not an object").await;
    let gw = common::spawn_gateway(common::test_config()).await;

    gw.catalog
        .register_function(Function::http(SPACE, "broken", format!("http://{}/", addr)))
        .unwrap();
    gw.catalog
        .create_subscription(Subscription::new_sync(SPACE, "http.request", "broken", "GET", "/broken"))
        .unwrap();

    let resp = reqwest::get(format!("{}/broken", gw.events_url)).await.unwrap();
    assert_eq!(resp.status(), 500);
    assert_eq!(resp.text().await.unwrap(), "HTTP response object returned by function malformed.");
}

#[tokio::test]
async fn test_invoke_returns_function_result() {
    let (addr, requests) = common::start_mock_backend(r#"{"answer":42}"#).await;
    let gw = common::spawn_gateway(common::test_config()).await;
    gw.catalog
        .register_function(Function::http(SPACE, "calc", format!("http://{}/", addr)))
        .unwrap();

    let sdk = EventGateway::new(GatewayConfig::new(&gw.events_url)).unwrap();
    let result = sdk.invoke("calc", json!({ "q": "meaning" })).await.unwrap();
    assert_eq!(result, json!({ "answer": 42 }));

    let event = requests.all()[0].json();
    assert_eq!(event["eventType"], "invoke");
    assert_eq!(event["data"], json!({ "q": "meaning" }));
}

#[tokio::test]
async fn test_invoke_unknown_function_fails() {
    let gw = common::spawn_gateway(common::test_config()).await;

    let resp = reqwest::Client::new()
        .post(&gw.events_url)
        .header("Event", "invoke")
        .header("Function-ID", "missing")
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
}

#[tokio::test]
async fn test_external_system_event_accepted_not_delivered() {
    let (addr, requests) = common::start_mock_backend("{}").await;
    let gw = common::spawn_gateway(common::test_config()).await;
    gw.catalog
        .register_function(Function::http(SPACE, "audit", format!("http://{}/", addr)))
        .unwrap();
    gw.catalog
        .create_subscription(Subscription::new_async(SPACE, "gateway.function.invoked", "audit"))
        .unwrap();

    let resp = reqwest::Client::new()
        .post(&gw.events_url)
        .header("Event", "gateway.function.invoked")
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 202);

    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    assert_eq!(requests.len(), 0);
}

#[tokio::test]
async fn test_system_events_published_for_deliveries() {
    let (crm_addr, _) = common::start_mock_backend("{}").await;
    let (audit_addr, audit) = common::start_mock_backend("{}").await;
    let mut config = common::test_config();
    config.seed = seed_async(format!("http://{}/crm", crm_addr));
    let gw = common::spawn_gateway(config).await;

    gw.catalog
        .register_function(Function::http(SPACE, "audit", format!("http://{}/", audit_addr)))
        .unwrap();
    gw.catalog
        .create_subscription(Subscription::new_async(SPACE, "gateway.function.invoked", "audit"))
        .unwrap();

    reqwest::Client::new()
        .post(&gw.events_url)
        .header("Event", "user.created")
        .json(&json!({ "id": 5 }))
        .send()
        .await
        .unwrap();

    let seen = audit.wait_for(1).await;
    let event = seen[0].json();
    assert_eq!(event["eventType"], "gateway.function.invoked");
    assert_eq!(event["data"]["functionId"], "crm");
    assert_eq!(event["data"]["event"]["data"], json!({ "id": 5 }));
}

#[tokio::test]
async fn test_draining_gateway_stops_cleanly() {
    let gw = common::spawn_gateway(common::test_config()).await;
    gw.shutdown.trigger();

    let result = common::within(gw.handle).await.unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_draining_gateway_rejects_events() {
    let gw = common::spawn_gateway(common::test_config()).await;
    gw.dispatcher.close_intake();

    let resp = reqwest::Client::new()
        .post(&gw.events_url)
        .header("event", "user.created")
        .json(&json!({ "id": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 503);
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let mut config = common::test_config();
    config.limits.max_body_size = 64;
    let gw = common::spawn_gateway(config).await;

    let resp = reqwest::Client::new()
        .post(&gw.events_url)
        .header("event", "user.created")
        .header("content-type", "application/json")
        .body(format!("{{\"blob\":\"{}\"}}", "x".repeat(1024)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 413);
}

#[tokio::test]
async fn test_custom_event_preflight_allows_all() {
    let mut config = common::test_config();
    config.seed = seed_async("http://127.0.0.1:9/crm".into());
    let gw = common::spawn_gateway(config).await;
    let client = reqwest::Client::new();

    let resp = client
        .request(reqwest::Method::OPTIONS, &gw.events_url)
        .header("origin", "https://app.example")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "event,content-type")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");
    assert_eq!(resp.headers()["access-control-allow-methods"], "POST");
    assert_eq!(resp.headers()["access-control-allow-headers"], "event,content-type");

    let resp = client
        .post(&gw.events_url)
        .header("origin", "https://app.example")
        .header("event", "user.created")
        .json(&json!({ "id": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 202);
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");
}

#[tokio::test]
async fn test_sync_subscription_cors() {
    let (addr, _requests) = common::start_mock_backend(r#"{"statusCode":200,"body":"ok"}"#).await;
    let gw = common::spawn_gateway(common::test_config()).await;

    gw.catalog
        .register_function(Function::http(SPACE, "hello", format!("http://{}/hello", addr)))
        .unwrap();
    let mut sub = Subscription::new_sync(SPACE, "http.request", "hello", "GET", "/hello");
    sub.cors = Some(Cors {
        origins: vec!["https://app.test".into()],
        methods: vec!["GET".into()],
        headers: vec!["Content-Type".into()],
        allow_credentials: false,
    });
    gw.catalog.create_subscription(sub).unwrap();

    let client = reqwest::Client::new();
    let url = format!("{}/hello", gw.events_url);

    let resp = client
        .request(reqwest::Method::OPTIONS, &url)
        .header("origin", "https://app.test")
        .header("access-control-request-method", "GET")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["access-control-allow-origin"], "https://app.test");
    assert_eq!(resp.headers()["access-control-allow-methods"], "GET");
    assert_eq!(resp.headers()["access-control-allow-headers"], "Content-Type");

    let resp = client.get(&url).header("origin", "https://app.test").send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["access-control-allow-origin"], "https://app.test");
    assert_eq!(resp.text().await.unwrap(), "ok");

    let resp = client.get(&url).header("origin", "https://evil.test").send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.headers().get("access-control-allow-origin").is_none());
}
