//! Resource lister service.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────────┐
//!                       │               RESOURCE LISTER                │
//!     Client Request    │  ┌────────┐   ┌────────┐   ┌──────────────┐  │
//!     ──────────────────┼─▶│  http  │──▶│ route  │──▶│ relay        │  │
//!                       │  │ server │   │ match  │   │ (GET + auth) │──┼──▶ Upstream
//!                       │  └────────┘   └────────┘   └──────┬───────┘  │    listing API
//!     Client Response   │                                   │          │
//!     ◀─────────────────┼──────── status + streamed body ◀──┘          │
//!                       │                                              │
//!                       │  config · observability · lifecycle          │
//!                       └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use resource_lister::config::load_config;
use resource_lister::lifecycle::{spawn_signal_listener, Shutdown};
use resource_lister::observability::{logging, metrics};
use resource_lister::HttpServer;

#[derive(Parser)]
#[command(name = "resource-lister")]
#[command(about = "Authenticated pass-through for upstream resource listings", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "resource-lister.toml")]
    config: PathBuf,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,

    /// Override `observability.log_level`.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_config(&cli.config)?;
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    if let Some(level) = cli.log_level {
        config.observability.log_level = level;
    }

    logging::init_logging(&config.observability);

    tracing::info!("resource-lister v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        config = %cli.config.display(),
        bind_address = %config.listener.bind_address,
        listers = config.listers.len(),
        upstream_timeout_secs = config.timeouts.upstream_secs,
        "Configuration loaded"
    );

    let metrics_address = config
        .observability
        .metrics_enabled
        .then(|| config.observability.metrics_address.clone());
    let bind_address = config.listener.bind_address.clone();

    // validates overrides too
    let server = HttpServer::new(config)?;

    if let Some(addr) = metrics_address {
        metrics::init_metrics(addr.parse()?)?;
    }

    let listener = TcpListener::bind(&bind_address).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(address = %local_addr, "Listening for connections");

    let shutdown = Shutdown::new();
    spawn_signal_listener(&shutdown);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
