//! Mock user functions served over HTTP.

use serde_json::{json, Value};

use event_gateway::event::{Event, EventType, HttpRequestData};
use event_gateway::http::HttpResponse;
use event_gateway::users;

mod common;

fn http_event(method: &str, id: Option<&str>) -> Event {
    let mut data = HttpRequestData {
        method: method.into(),
        path: "/users".into(),
        ..Default::default()
    };
    if let Some(id) = id {
        data.params.insert("id".into(), id.into());
    }
    Event::new(EventType::http_request(), "application/json", serde_json::to_value(data).unwrap())
}

async fn call(path: &str, event: &Event) -> (HttpResponse, Value) {
    let addr = common::serve(users::router()).await;
    let resp = reqwest::Client::new()
        .post(format!("http://{}{}", addr, path))
        .json(event)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let http_response: HttpResponse = resp.json().await.unwrap();
    let body = serde_json::from_str(http_response.body.as_str().unwrap()).unwrap();
    (http_response, body)
}

#[tokio::test]
async fn test_get_handler() {
    let (resp, body) = call("/users/get", &http_event("GET", Some("42"))).await;
    assert_eq!(resp.status_code, 200);
    assert_eq!(resp.headers["Content-Type"], "application/json");
    assert_eq!(body["id"], "42");
    assert!(body["name"].as_str().is_some_and(|n| !n.is_empty()));
    assert!(body["email"].as_str().is_some_and(|e| e.contains('@')));
}

#[tokio::test]
async fn test_post_handler() {
    let (resp, body) = call("/users/create", &http_event("POST", None)).await;
    assert_eq!(resp.status_code, 200);
    assert_eq!(resp.headers["Content-Type"], "application/json");
    assert!(body["id"].is_number());
    assert!(body["name"].is_string());
    assert!(body["email"].is_string());
}

#[tokio::test]
async fn test_delete_handler() {
    let (resp, body) = call("/users/delete", &http_event("DELETE", Some("9"))).await;
    assert_eq!(resp.status_code, 200);
    assert_eq!(resp.headers["Content-Type"], "application/json");
    assert_eq!(body, json!({ "message": "Deleted user with id 9" }));
}
