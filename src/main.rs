//! Prometheus exporter for OpenSIPS statistics.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

use opensips_exporter::config::LogFormat;
use opensips_exporter::{Collector, DatagramClient, ExporterConfig, HttpServer, Registry};

/// Prometheus exporter for OpenSIPS statistics.
#[derive(Parser, Debug)]
#[command(name = "opensips-exporter")]
#[command(about = "Export OpenSIPS statistics as Prometheus metrics")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long)]
    config: Option<String>,

    /// HTTP listen address (overrides config).
    #[arg(long)]
    listen: Option<String>,

    /// OpenSIPS mi_datagram address (overrides config).
    #[arg(long)]
    mi_address: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = if let Some(config_path) = &args.config {
        ExporterConfig::load_from_file(config_path)?
    } else {
        ExporterConfig::default()
    };

    // CLI overrides
    if let Some(listen) = args.listen {
        config.prometheus.listen = listen;
    }
    if let Some(mi_address) = args.mi_address {
        config.mi.address = mi_address;
    }

    // Initialize logging
    let log_level = args.log_level.parse().unwrap_or(Level::INFO);
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("opensips_exporter={}", log_level).parse()?);

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }

    info!("Starting OpenSIPS Prometheus Exporter");

    // Register every processor up front; a conflicting metric registration
    // refuses to start instead of corrupting scrapes later.
    let registry = Registry::with_default_processors(config.prometheus.namespace.clone())
        .context("metric registration failed")?;
    let collector = Arc::new(Collector::new(registry));

    let listen_addr = config
        .prometheus
        .listen
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid listen address: {}", e))?;
    let mi_addr = config
        .mi
        .address
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid management interface address: {}", e))?;

    let provider = Arc::new(DatagramClient::new(
        mi_addr,
        Duration::from_secs(config.mi.timeout_secs),
    ));

    info!(mi = %config.mi.address, "Fetching statistics over mi_datagram");

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let http_server = HttpServer::new(
        collector.clone(),
        provider,
        listen_addr,
        config.prometheus.path.clone(),
    );

    let http_task = tokio::spawn(async move {
        if let Err(e) = http_server.run(shutdown_rx).await {
            error!("HTTP server error: {}", e);
        }
    });

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = tokio::signal::unix::signal(
                    tokio::signal::unix::SignalKind::terminate()
                ).expect("failed to install SIGTERM handler");
                sigterm.recv().await;
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            info!("Received SIGTERM, shutting down...");
        }
    }

    shutdown_tx.send(true)?;
    let _ = tokio::time::timeout(Duration::from_secs(5), http_task).await;

    let stats = collector.stats();
    info!(
        scrapes = stats.scrapes,
        scrape_failures = stats.scrape_failures,
        "Final statistics"
    );

    info!("Exporter stopped");
    Ok(())
}
