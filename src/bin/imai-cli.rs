use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "imai-cli")]
#[command(about = "Management CLI for the IMAI gateway", long_about = None)]
struct Cli {
    #[arg(short, long, env = "IMAI_GATEWAY_URL", default_value = "http://localhost:3000")]
    url: String,

    #[arg(short, long, env = "IMAI_ADMIN_KEY", default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Gateway version and uptime
    Status,
    /// Live rate-limit windows per key
    Limits,
    /// Per-provider queue depth and counters
    Queues,
    /// Public health check (no key needed)
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let path = match cli.command {
        Commands::Status => "/admin/status",
        Commands::Limits => "/admin/limits",
        Commands::Queues => "/admin/queues",
        Commands::Health => "/health",
    };

    let res = client
        .get(format!("{base}{path}"))
        .headers(headers)
        .send()
        .await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gateway returned status {status}");
        if let Ok(text) = res.text().await {
            eprintln!("Response: {text}");
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
