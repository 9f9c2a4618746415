//! Inferno Server - headless signal service
//!
//! Keeps candle windows in sync with the feed and answers signal requests as
//! newline-delimited JSON over TCP. Metrics are pushed via structured JSON
//! logs to stdout.
//!
//! # Usage
//! ```sh
//! FEED_MODE=mock cargo run --bin server -- --bind 127.0.0.1:7878
//! ```
//!
//! # Environment Variables
//! - `SYMBOLS`, `CANDLE_INTERVAL`, `MAX_CANDLES` - feed setup
//! - `MODELS_DIR`, `MODEL_FILE` - model artifact location
//! - `OBSERVABILITY_ENABLED` - Enable metrics reporting (default: true)
//! - `OBSERVABILITY_INTERVAL` - Interval in seconds between metric outputs (default: 60)

use anyhow::Result;
use clap::Parser;
use inferno::application::system::Application;
use inferno::config::{Config, FeedMode};
use inferno::infrastructure::observability::MetricsReporter;
use inferno::infrastructure::rpc::RpcServer;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{Level, info, warn};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about = "Trading signal service", long_about = None)]
struct Args {
    /// Address for the RPC listener (overrides RPC_BIND_ADDRESS)
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Model artifact path (overrides MODELS_DIR/MODEL_FILE)
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Use the in-process mock feed instead of Hyperliquid
    #[arg(long)]
    mock: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    info!("Inferno Server {} starting...", env!("CARGO_PKG_VERSION"));

    let mut config = Config::from_env()?;
    if let Some(bind) = args.bind {
        config.rpc.bind_address = bind;
    }
    if let Some(model) = &args.model {
        config.model.override_path(model);
    }
    if args.mock {
        config.feed.mode = FeedMode::Mock;
    }
    info!(
        "Configuration loaded: Feed={:?}, Symbols={:?}, Interval={}, Windows={:?}",
        config.feed.mode, config.feed.symbols, config.feed.interval, config.strategy.look_back_windows
    );

    let bind_address = config.rpc.bind_address;
    let observability = config.observability.clone();

    info!("Building signal application...");
    let app = Application::build(config).await?;

    info!("Starting candle feed...");
    let handle = app.start().await?;
    info!("Candle feed running.");

    if observability.enabled {
        let reporter = MetricsReporter::new(
            handle.store.clone(),
            handle.model.clone(),
            handle.metrics.clone(),
            observability.interval_secs,
        );
        tokio::spawn(async move {
            reporter.run().await;
        });
        info!(
            "Metrics reporter started (interval: {}s)",
            observability.interval_secs
        );
    } else {
        info!("Metrics reporting disabled.");
    }

    let server = RpcServer::bind(bind_address, handle.service.clone()).await?;
    info!("Server running on {}. Press Ctrl+C to shutdown.", server.local_addr()?);

    let result = server
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Unable to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Shutdown signal received.");
        })
        .await;

    handle.shutdown().await;
    result
}
