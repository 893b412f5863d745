//! Emit `user.created` to a hosted gateway space.
//!
//! ```text
//! cargo run --example emit_user_created -- [space] [url]
//! ```

use event_gateway::users::User;
use event_gateway_sdk::{EmitRequest, EventGateway, GatewayConfig};

const SPACE: &str = "examplestest";

async fn create_user(gateway: &EventGateway, user: &User) -> Result<(), Box<dyn std::error::Error>> {
    // Persisting the user is left to the service.
    gateway.emit(EmitRequest::new("user.created", user)?).await?;
    tracing::info!("Emitted user.created event!");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().init();

    let mut args = std::env::args().skip(1);
    let space = args.next().unwrap_or_else(|| SPACE.to_string());
    let url = args
        .next()
        .unwrap_or_else(|| format!("https://{}.slsgateway.com", space));

    let gateway = EventGateway::new(GatewayConfig::new(url).with_space(space))?;

    let user = User {
        username: "sls-fan".into(),
        firstname: "Bill".into(),
        lastname: "Jones".into(),
        company: "Big Corp, Inc.".into(),
        email: "bjones12@bigcorp.com".into(),
    };

    create_user(&gateway, &user).await
}
