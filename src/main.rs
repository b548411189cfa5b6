//! HTTP endpoint monitor.
//!
//! # Architecture Overview
//!
//! ```text
//!   commands ──▶ store (JSON) ──▶ monitor.add_request / remove_request
//!                                      │
//!                                      ▼
//!                               ┌─────────────┐
//!                               │  scheduler  │ round-robin live set
//!                               └──────┬──────┘
//!                                      │ next()
//!                    ┌─────────────────┼─────────────────┐
//!                    ▼                 ▼                 ▼
//!                worker 0          worker 1   ...    worker N-1
//!                    │  GET url (5s timeout), debounce  │
//!                    └─────────────────┬─────────────────┘
//!                                      ▼
//!                            bounded event channel
//!                                      │
//!                                      ▼
//!                         delivery (log / webhook)
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::BufReader;

use http_monitor::commands::console::run_console;
use http_monitor::commands::{Command, CommandHandler};
use http_monitor::config::{load_config_or_default, AppConfig};
use http_monitor::delivery::{run_delivery, LogDelivery, WebhookDelivery};
use http_monitor::health::HttpProber;
use http_monitor::lifecycle::signals::wait_for_signal;
use http_monitor::monitor::{EventReceiver, Monitor};
use http_monitor::observability::{logging, metrics};
use http_monitor::scheduler::OwnerId;
use http_monitor::store::SubscriptionStore;

#[derive(Parser)]
#[command(name = "http-monitor")]
#[command(about = "Probe HTTP(S) endpoints and report health changes", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the monitor until SIGINT/SIGTERM
    Run {
        /// Read commands (add/rm/list) from stdin while running
        #[arg(long)]
        interactive: bool,
    },
    /// Subscribe an owner to an endpoint
    Add { owner: OwnerId, url: String },
    /// Unsubscribe by URL or list index
    Rm { owner: OwnerId, target: String },
    /// List an owner's endpoints
    List { owner: OwnerId },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let (config, found) = load_config_or_default(&cli.config)?;
    logging::init_logging(&config.observability)?;
    if !found {
        tracing::warn!(path = %cli.config.display(), "Config file not found, using defaults");
    }

    tracing::info!(
        workers = config.monitor.workers,
        probe_interval_ms = config.monitor.probe_interval_ms,
        store = %config.store.path,
        "Configuration loaded"
    );

    let store = SubscriptionStore::open(&config.store.path)?;
    let (monitor, events) = Monitor::new(&config.monitor, HttpProber::new()?);
    let monitor = Arc::new(monitor);
    monitor.seed(store.load_all())?;

    let handler = CommandHandler::new(monitor.clone(), store.clone());

    let command = match cli.command {
        Commands::Run { interactive } => {
            return run(config, monitor, events, handler, store, interactive).await;
        }
        Commands::Add { owner, url } => Command::Add { owner, url },
        Commands::Rm { owner, target } => Command::Remove { owner, target },
        Commands::List { owner } => Command::List { owner },
    };

    println!("{}", handler.execute(command)?);
    Ok(())
}

async fn run(
    config: AppConfig,
    monitor: Arc<Monitor>,
    events: EventReceiver,
    handler: CommandHandler,
    store: SubscriptionStore,
    interactive: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }
    metrics::set_endpoints(monitor.len());

    let delivery = match &config.delivery.webhook_url {
        Some(url) => {
            let webhook = WebhookDelivery::new(url, Duration::from_secs(config.delivery.timeout_secs))?;
            tracing::info!(webhook = %url, "Delivering events to webhook");
            tokio::spawn(run_delivery(events, webhook))
        }
        None => {
            tracing::info!("No webhook configured, events are only logged");
            tokio::spawn(run_delivery(events, LogDelivery))
        }
    };

    monitor.start()?;

    let signal = if interactive {
        let stdin = BufReader::new(tokio::io::stdin());
        tokio::select! {
            signal = wait_for_signal() => signal,
            result = run_console(&handler, stdin, tokio::io::stdout()) => {
                if let Err(e) = result {
                    tracing::error!(error = %e, "Console failed");
                }
                wait_for_signal().await
            }
        }
    } else {
        wait_for_signal().await
    };
    tracing::warn!(signal, "Shutdown signal received");

    monitor.stop().await?;
    let delivered = delivery.await?;
    store.save()?;

    tracing::info!(delivered, "Shutdown complete");
    Ok(())
}
