use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "config-cli")]
#[command(about = "Management CLI for the configuration service", long_about = None)]
struct Cli {
    #[arg(short, long, env = "CONFIGD_URL", default_value = "http://127.0.0.1:8888")]
    url: String,

    #[arg(short, long, env = "CONFIGD_API_KEY", default_value = "")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the configuration, optionally only the named keys
    Get { keys: Vec<String> },
    /// Apply a partial update given as JSON
    Set { json: String },
    /// Import a full configuration snapshot from a file
    Import { file: PathBuf },
    /// Reset the configuration to defaults
    Reset,
    /// Check service status
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let config_url = format!("{}/api/config", cli.url);

    let mut headers = HeaderMap::new();
    if !cli.key.is_empty() {
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
        );
    }

    let res = match cli.command {
        Commands::Get { keys } => {
            let mut req = client.get(&config_url).headers(headers);
            if !keys.is_empty() {
                req = req.json(&keys);
            }
            req.send().await?
        }
        Commands::Set { json } => {
            let body: Value = serde_json::from_str(&json)?;
            client.put(&config_url).headers(headers).json(&body).send().await?
        }
        Commands::Import { file } => {
            let body: Value = serde_json::from_str(&std::fs::read_to_string(&file)?)?;
            client.post(&config_url).headers(headers).json(&body).send().await?
        }
        Commands::Reset => client.delete(&config_url).headers(headers).send().await?,
        Commands::Status => client.get(format!("{}/health", cli.url)).send().await?,
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    let pretty = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|json| serde_json::to_string_pretty(&json).ok())
        .unwrap_or(text);

    if !status.is_success() {
        eprintln!("Error: config API returned status {}", status);
        eprintln!("{}", pretty);
        std::process::exit(1);
    }

    println!("{}", pretty);
    Ok(())
}
