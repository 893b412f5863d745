//! Mock user functions.
//!
//! Each handler receives an `http.request` event and answers with an HTTP
//! response object carrying fabricated user data. Served by the
//! `users-service` binary and registered as gateway functions.

pub mod fake;

use axum::{routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::event::Event;
use crate::http::HttpResponse;

/// Plain user record, as emitted with `user.created`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub company: String,
    pub email: String,
}

fn log_event(handler: &str, event: &Event) {
    tracing::info!(
        handler,
        event_type = %event.event_type,
        event_id = %event.event_id,
        event = %serde_json::to_string(event).unwrap_or_default(),
        "User function called"
    );
}

fn path_id(event: &Event) -> Option<String> {
    event.http_request()?.params.get("id").cloned()
}

fn missing_id() -> HttpResponse {
    HttpResponse::json(400, &json!({ "message": "missing path parameter id" }))
}

pub fn get_user(event: &Event) -> HttpResponse {
    log_event("get", event);
    let Some(id) = path_id(event) else {
        return missing_id();
    };

    let mut rng = rand::thread_rng();
    let name = fake::name(&mut rng);
    let email = fake::email(&mut rng, &name);
    HttpResponse::json(200, &json!({ "id": id, "name": name, "email": email }))
}

pub fn create_user(event: &Event) -> HttpResponse {
    log_event("create", event);

    let mut rng = rand::thread_rng();
    let name = fake::name(&mut rng);
    let email = fake::email(&mut rng, &name);
    HttpResponse::json(200, &json!({ "id": fake::id(&mut rng), "name": name, "email": email }))
}

pub fn delete_user(event: &Event) -> HttpResponse {
    log_event("delete", event);
    let Some(id) = path_id(event) else {
        return missing_id();
    };

    HttpResponse::json(200, &json!({ "message": format!("Deleted user with id {}", id) }))
}

pub fn router() -> Router {
    Router::new()
        .route("/users/get", post(|Json(event): Json<Event>| async move { Json(get_user(&event)) }))
        .route("/users/create", post(|Json(event): Json<Event>| async move { Json(create_user(&event)) }))
        .route("/users/delete", post(|Json(event): Json<Event>| async move { Json(delete_user(&event)) }))
}
