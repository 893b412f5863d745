use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde_json::{json, Value};

use event_gateway_sdk::{EmitRequest, EventGateway, GatewayConfig};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Management CLI for the Event Gateway", long_about = None)]
struct Cli {
    /// Config API URL.
    #[arg(short, long, default_value = "http://localhost:4001")]
    url: String,

    /// Events API URL, used by `emit` and `invoke`.
    #[arg(short, long, default_value = "http://localhost:4000")]
    events_url: String,

    /// Bearer token for the config API.
    #[arg(short, long)]
    key: Option<String>,

    #[arg(short, long, default_value = "default")]
    space: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gateway status
    Status,
    /// List registered event types
    EventTypes,
    /// Register an event type
    CreateEventType { name: String },
    /// List registered functions
    Functions,
    /// Register an HTTP function
    RegisterFunction { id: String, url: String },
    /// Remove a function
    DeleteFunction { id: String },
    /// List subscriptions
    Subscriptions,
    /// Subscribe a function asynchronously to an event type
    Subscribe {
        event_type: String,
        function_id: String,
        #[arg(long, default_value = "/")]
        path: String,
    },
    /// Route an HTTP method and path to a function
    SubscribeHttp {
        method: String,
        path: String,
        function_id: String,
    },
    /// Remove a subscription
    Unsubscribe { id: String },
    /// Emit a custom event with a JSON payload
    Emit { event: String, data: String },
    /// Invoke a function synchronously with a JSON payload
    Invoke { function_id: String, data: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if let Some(key) = &cli.key {
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", key))?);
    }
    let api = Api { client, headers, base: format!("{}/v1/spaces/{}", cli.url, cli.space) };

    match cli.command {
        Commands::Status => {
            let res = api.client.get(format!("{}/v1/status", cli.url)).headers(api.headers.clone()).send().await?;
            print_response(res).await?;
        }
        Commands::EventTypes => api.send(Method::GET, "eventtypes", None).await?,
        Commands::CreateEventType { name } => api.send(Method::POST, "eventtypes", Some(json!({ "name": name }))).await?,
        Commands::Functions => api.send(Method::GET, "functions", None).await?,
        Commands::RegisterFunction { id, url } => {
            let body = json!({ "functionId": id, "provider": { "type": "http", "url": url } });
            api.send(Method::POST, "functions", Some(body)).await?
        }
        Commands::DeleteFunction { id } => api.send(Method::DELETE, &format!("functions/{}", id), None).await?,
        Commands::Subscriptions => api.send(Method::GET, "subscriptions", None).await?,
        Commands::Subscribe { event_type, function_id, path } => {
            let body = json!({ "type": "async", "eventType": event_type, "functionId": function_id, "path": path });
            api.send(Method::POST, "subscriptions", Some(body)).await?
        }
        Commands::SubscribeHttp { method, path, function_id } => {
            let body = json!({
                "type": "sync",
                "eventType": "http.request",
                "functionId": function_id,
                "method": method,
                "path": path,
            });
            api.send(Method::POST, "subscriptions", Some(body)).await?
        }
        Commands::Unsubscribe { id } => api.send(Method::DELETE, &format!("subscriptions/{}", id), None).await?,
        Commands::Emit { event, data } => {
            let gateway = EventGateway::new(GatewayConfig::new(&cli.events_url).with_space(&cli.space))?;
            let data: Value = serde_json::from_str(&data)?;
            gateway.emit(EmitRequest::new(event.as_str(), data)?).await?;
            println!("Emitted {} event!", event);
        }
        Commands::Invoke { function_id, data } => {
            let gateway = EventGateway::new(GatewayConfig::new(&cli.events_url).with_space(&cli.space))?;
            let data: Value = serde_json::from_str(&data)?;
            let result = gateway.invoke(&function_id, data).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}

struct Api {
    client: reqwest::Client,
    headers: HeaderMap,
    base: String,
}

impl Api {
    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<(), Box<dyn std::error::Error>> {
        let mut req = self
            .client
            .request(method, format!("{}/{}", self.base, path))
            .headers(self.headers.clone());
        if let Some(body) = body {
            req = req.json(&body);
        }
        print_response(req.send().await?).await
    }
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Config API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let text = res.text().await?;
    if text.is_empty() {
        println!("{}", status);
        return Ok(());
    }
    let json: Value = serde_json::from_str(&text)?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
