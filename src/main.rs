//! Owner dashboard request guard.
//!
//! Sits in front of the dashboard and decides, per request, whether it may
//! pass, must be redirected, or is refused.
//!
//! ```text
//!                     ┌────────────────────────────────────────────┐
//!                     │                 OWNER GUARD                │
//!   Client Request    │  ┌──────────┐   ┌───────┐   ┌──────────┐   │
//!   ──────────────────┼─▶│ request  │──▶│ guard │──▶│ session  │   │
//!                     │  │ id/trace │   │verdict│   │ routes   │   │
//!                     │  └──────────┘   └───┬───┘   └──────────┘   │
//!                     │        redirect /   │  continue            │
//!                     │        reject       ▼                      │
//!   Client Response   │              ┌──────────────┐              │
//!   ◀─────────────────┼──────────────│   upstream   │◀─────────────┼── Dashboard
//!                     │              └──────────────┘              │
//!                     └────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use owner_guard::config::{load_config, validate_config, watcher::ConfigWatcher, GuardConfig};
use owner_guard::lifecycle::{signals::shutdown_on_signal, Shutdown};
use owner_guard::observability::{logging, metrics};
use owner_guard::HttpServer;

#[derive(Parser)]
#[command(name = "owner-guard")]
#[command(about = "Session, CSRF and rate-limit guard for the owner dashboard", long_about = None)]
struct Cli {
    /// TOML configuration file (watched for changes).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address.
    #[arg(long)]
    bind: Option<String>,

    /// Override upstream.address.
    #[arg(long)]
    upstream: Option<String>,

    /// Write cookies with the Secure flag.
    #[arg(long)]
    production: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GuardConfig::default(),
    };
    if let Some(bind) = &cli.bind {
        config.listener.bind_address = bind.clone();
    }
    if let Some(upstream) = &cli.upstream {
        config.upstream.address = Some(upstream.clone());
    }
    config.cookies.production |= cli.production;
    if let Err(errors) = validate_config(&config) {
        for e in &errors {
            eprintln!("config error: {e}");
        }
        return Err(format!("{} configuration error(s)", errors.len()).into());
    }

    logging::init_logging(&config.observability);
    tracing::info!("owner-guard v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = ?config.upstream.address,
        production = config.cookies.production,
        rate_limit_enabled = config.rate_limit.enabled,
        max_requests = config.rate_limit.max_requests,
        window_ms = config.rate_limit.window_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // CLI overrides are re-applied to every reloaded file.
    let (config_tx, config_updates) = mpsc::unbounded_channel();
    let _watcher = match &cli.config {
        Some(path) => {
            let (watcher, mut file_updates) = ConfigWatcher::new(path);
            let overrides = (cli.bind.clone(), cli.upstream.clone(), cli.production);
            tokio::spawn(async move {
                while let Some(mut next) = file_updates.recv().await {
                    if let Some(bind) = &overrides.0 {
                        next.listener.bind_address = bind.clone();
                    }
                    if let Some(upstream) = &overrides.1 {
                        next.upstream.address = Some(upstream.clone());
                    }
                    next.cookies.production |= overrides.2;
                    if config_tx.send(next).is_err() {
                        break;
                    }
                }
            });
            Some(watcher.run()?)
        }
        None => None,
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    tokio::spawn(shutdown_on_signal(shutdown.clone()));

    let server = HttpServer::new(config);
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
