use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "cdp-proxy-cli")]
#[command(about = "Operator CLI for the CDP proxy", long_about = None)]
struct Cli {
    /// Public proxy address.
    #[arg(short, long, default_value = "http://localhost:9222")]
    url: String,

    /// Admin endpoint address.
    #[arg(short, long, default_value = "http://localhost:9221")]
    admin_url: String,

    /// Admin API key, when one is configured.
    #[arg(short, long)]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show browser version and the advertised debugger URL
    Version,
    /// List debuggable targets
    Targets,
    /// Restart the browser process
    Restart,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Version => {
            let res = client.get(format!("{}/json/version", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Targets => {
            let res = client.get(format!("{}/json/list", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Restart => {
            let mut headers = HeaderMap::new();
            if let Some(key) = &cli.key {
                headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {key}"))?);
            }
            let res = client
                .post(format!("{}/restart-chromium", cli.admin_url))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    let rendered = match serde_json::from_str::<Value>(&text) {
        Ok(json) => serde_json::to_string_pretty(&json)?,
        Err(_) => text,
    };

    if !status.is_success() {
        eprintln!("Error: {status}");
        eprintln!("{rendered}");
        std::process::exit(1);
    }

    println!("{rendered}");
    Ok(())
}
