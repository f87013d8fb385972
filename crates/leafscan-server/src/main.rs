//! LeafScan Server
//!
//! Diagnoses plant leaf diseases from uploaded photos.
//!
//! Loads the plant-presence gate and the disease classifier once at startup,
//! then serves `/predict`, `/health` and `/metrics`.

use anyhow::{Context, Result};
use clap::Parser;
use leafscan_server::{create_router, AppConfig, AppState};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::signal;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "leafscan-server")]
#[command(about = "Plant leaf disease diagnosis service", long_about = None)]
struct Cli {
    /// Configuration file path (optional; defaults apply when missing)
    #[arg(short, long, env = "LEAFSCAN_CONFIG", default_value = "leafscan.yaml")]
    config: String,

    /// Listen address
    #[arg(short = 'l', long, env = "LEAFSCAN_LISTEN")]
    listen: Option<String>,

    /// Listen port
    #[arg(short = 'P', long, env = "LEAFSCAN_PORT")]
    port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "LEAFSCAN_LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(cli.verbose, cli.log_json);

    info!("Starting LeafScan server");

    // Load configuration
    let mut config = AppConfig::load(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config))?;
    if let Some(listen) = cli.listen {
        config.server.listen = listen;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    config.server.validate()?;
    info!("Configuration loaded successfully");
    info!("Gate: {:?}", config.pipeline.gate.architecture);
    info!("Device: {:?}", config.pipeline.device);

    // Initialize metrics
    let metrics_handle = init_metrics()?;

    let addr = config.server.socket_addr()?;
    let state = AppState::load(config.server, config.pipeline, metrics_handle)
        .await
        .context("failed to load models")?;

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on http://{}", addr);

    // Graceful shutdown handler
    let shutdown = async {
        shutdown_signal().await;
        warn!("Shutdown signal received, stopping server...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool, json: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("leafscan=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("leafscan=info,tower_http=info"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(
        "leafscan_requests_total",
        "Total number of requests by endpoint"
    );
    metrics::describe_counter!(
        "leafscan_diagnoses_total",
        "Total number of completed diagnoses by outcome"
    );
    metrics::describe_histogram!(
        "leafscan_inference_latency_us",
        metrics::Unit::Microseconds,
        "Pipeline latency per diagnosis in microseconds, decode included"
    );
    metrics::describe_counter!("leafscan_errors_total", "Total number of failed requests by kind");

    info!("Metrics exporter initialized");
    Ok(handle)
}
