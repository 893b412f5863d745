//! Register the mock users service with a local gateway.
//!
//! Start `event-gateway` and `users-service` first, then run:
//!
//! ```text
//! cargo run --example register_users_service -- [config-api-url] [users-service-url]
//! ```
//!
//! Afterwards `GET http://localhost:4000/users/42` is answered by the
//! users service.

use serde_json::{json, Value};

const SPACE: &str = "default";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().init();

    let mut args = std::env::args().skip(1);
    let config_api = args.next().unwrap_or_else(|| "http://localhost:4001".to_string());
    let users = args.next().unwrap_or_else(|| "http://localhost:3000".to_string());

    let client = reqwest::Client::new();
    let base = format!("{}/v1/spaces/{}", config_api, SPACE);

    let functions = [
        ("users-get", "get"),
        ("users-create", "create"),
        ("users-delete", "delete"),
    ];
    for (id, action) in functions {
        let body = json!({
            "functionId": id,
            "provider": { "type": "http", "url": format!("{}/users/{}", users, action) },
        });
        post(&client, &format!("{}/functions", base), body).await?;
    }

    let routes = [
        ("GET", "/users/:id", "users-get"),
        ("POST", "/users", "users-create"),
        ("DELETE", "/users/:id", "users-delete"),
    ];
    for (method, path, function_id) in routes {
        let body = json!({
            "type": "sync",
            "eventType": "http.request",
            "functionId": function_id,
            "method": method,
            "path": path,
        });
        post(&client, &format!("{}/subscriptions", base), body).await?;
    }

    tracing::info!("Users service registered");
    Ok(())
}

async fn post(client: &reqwest::Client, url: &str, body: Value) -> Result<(), Box<dyn std::error::Error>> {
    let resp = client.post(url).json(&body).send().await?;
    let status = resp.status();
    if status.is_success() || status == reqwest::StatusCode::CONFLICT {
        tracing::info!(url, status = %status, "Registered");
        Ok(())
    } else {
        let text = resp.text().await.unwrap_or_default();
        Err(format!("{} returned {}: {}", url, status, text).into())
    }
}
