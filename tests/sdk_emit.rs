//! Emit client against a capturing backend.

use serde_json::json;

use event_gateway_sdk::{EmitRequest, EventGateway, GatewayConfig, SdkError};

mod common;

#[tokio::test]
async fn test_emit_sends_exactly_one_request() {
    let (addr, requests) = common::start_mock_backend("").await;
    let gateway = EventGateway::new(GatewayConfig::new(format!("http://{}", addr)).with_space("acme")).unwrap();

    let user = json!({
        "username": "sls-fan",
        "firstname": "Bill",
        "lastname": "Jones",
        "company": "Big Corp, Inc.",
        "email": "bjones12@bigcorp.com",
    });
    gateway.emit(EmitRequest::new("user.created", &user).unwrap()).await.unwrap();

    // Give a stray second request time to show up.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    let seen = requests.all();
    assert_eq!(seen.len(), 1);

    let req = &seen[0];
    assert_eq!(req.method, reqwest::Method::POST);
    assert_eq!(req.headers["event"], "user.created");
    assert_eq!(req.headers["space"], "acme");
    assert_eq!(req.headers["content-type"], "application/json");
    assert_eq!(req.json(), json!({ "event": "user.created", "data": user }));
}

#[tokio::test]
async fn test_emit_without_space_omits_header() {
    let (addr, requests) = common::start_mock_backend("").await;
    let gateway = EventGateway::new(GatewayConfig::new(format!("http://{}", addr))).unwrap();

    gateway.emit(EmitRequest::new("ping", json!({})).unwrap()).await.unwrap();

    let seen = requests.wait_for(1).await;
    assert!(seen[0].headers.get("space").is_none());
}

#[tokio::test]
async fn test_emit_error_status_is_not_retried() {
    let (addr, requests) = common::start_programmable_backend(|_| (500, "boom".to_string())).await;
    let gateway = EventGateway::new(GatewayConfig::new(format!("http://{}", addr))).unwrap();

    let err = gateway
        .emit(EmitRequest::new("user.created", json!({ "id": 1 })).unwrap())
        .await
        .unwrap_err();

    match err {
        SdkError::Status { status, body } => {
            assert_eq!(status.as_u16(), 500);
            assert_eq!(body, "boom");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(requests.len(), 1);
}

#[tokio::test]
async fn test_emit_network_failure_propagates() {
    // Bind and drop to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let gateway = EventGateway::new(GatewayConfig::new(format!("http://{}", addr))).unwrap();
    let err = gateway
        .emit(EmitRequest::new("user.created", json!({})).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, SdkError::Http(_)));
}
