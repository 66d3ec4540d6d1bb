use std::path::PathBuf;

use clap::{Parser, Subcommand};

use owner_guard::config::{load_config, GuardConfig};
use owner_guard::guard::epoch_millis;
use owner_guard::routing::RouteTable;
use owner_guard::security::csrf::generate_token;
use owner_guard::security::rate_info::RateLimitInfo;

#[derive(Parser)]
#[command(name = "guard-cli")]
#[command(about = "Operator CLI for the owner dashboard guard", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a fresh CSRF token
    Token,
    /// Load and validate a configuration file
    CheckConfig { path: PathBuf },
    /// Show how a path is classified
    Classify {
        path: String,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// GET a URL and report its rate-limit headers
    Probe { url: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Token => {
            println!("{}", generate_token());
        }
        Commands::CheckConfig { path } => match load_config(&path) {
            Ok(config) => {
                println!("{} is valid", path.display());
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        },
        Commands::Classify { path, config } => {
            let config = match config {
                Some(file) => load_config(&file)?,
                None => GuardConfig::default(),
            };
            let table = RouteTable::from_config(&config.routes);
            let report = serde_json::json!({
                "path": path,
                "class": table.classify(&path).as_str(),
                "rate_limited": config.rate_limit.enabled && table.is_rate_limited(&path),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Probe { url } => {
            let client = reqwest::Client::builder()
                .redirect(reqwest::redirect::Policy::none())
                .build()?;
            let res = client.get(&url).send().await?;
            println!("Status: {}", res.status());
            match RateLimitInfo::from_headers(res.headers()) {
                Some(info) => {
                    println!("{}", serde_json::to_string_pretty(&info)?);
                    println!("{}", info.message(epoch_millis()));
                }
                None => println!("No rate-limit headers on the response"),
            }
        }
    }

    Ok(())
}
