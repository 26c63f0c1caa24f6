//! LangSift Server
//!
//! HTTP service for programming-language classification.
//!
//! The server keeps a file-backed catalogue of trained models, rebuilds
//! artifacts from the training corpus when they are missing or
//! unreadable, and serves predictions over a small JSON API.

use anyhow::Result;
use clap::{Parser, Subcommand};
use langsift_serve::Rebuilder;
use metrics_exporter_prometheus::PrometheusHandle;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

mod config;
mod routes;

use config::ServerConfig;

#[derive(Parser, Debug)]
#[command(name = "langsift-server")]
#[command(about = "Programming-language classification service", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "langsift.yaml", global = true)]
    config: String,

    /// Registry file path (overrides the config file)
    #[arg(long, global = true)]
    registry: Option<PathBuf>,

    /// Artifact directory (overrides the config file)
    #[arg(long, global = true)]
    models_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the prediction API
    Serve {
        /// Listen address
        #[arg(short = 'l', long, default_value = "0.0.0.0")]
        listen: String,

        /// Listen port
        #[arg(short = 'P', long, default_value = "8080")]
        port: u16,
    },

    /// Make sure the default model exists, training it if necessary
    Rebuild {
        /// Rebuild even when an artifact is already present
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    info!("Starting LangSift server");

    let config = ServerConfig::load(&cli.config, &cli)?;
    info!("Configuration loaded");
    info!("Registry: {}", config.registry_path.display());
    info!("Models dir: {}", config.models_dir.display());
    info!("Corpus: {}", config.corpus.describe());

    match cli.command {
        Command::Serve { listen, port } => serve(config, &listen, port).await,
        Command::Rebuild { force } => rebuild(config, force).await,
    }
}

/// Run the HTTP API with graceful shutdown
async fn serve(config: ServerConfig, listen: &str, port: u16) -> Result<()> {
    let metrics_handle = init_metrics()?;
    let state = routes::AppState::new(config, metrics_handle);

    info!("Ensuring the default model is ready...");
    let template = state.config.default_descriptor();
    if state.rebuilder.ensure_default(&template).await? {
        metrics::counter!("langsift_rebuilds_total").increment(1);
    }
    info!("Default model ready: {}", template.id);

    let addr: SocketAddr = format!("{listen}:{port}").parse()?;
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// One-shot rebuild of the default model
async fn rebuild(config: ServerConfig, force: bool) -> Result<()> {
    let store = Arc::new(config.registry_store());
    let rebuilder = Rebuilder::new(
        config.corpus_source(),
        Arc::clone(&store),
        config.rebuild.clone(),
    );
    let template = config.default_descriptor();

    if force {
        // rebuild whatever the catalogue currently calls the default
        let descriptor = match store.try_load().await? {
            Some(registry) => registry.default_descriptor().cloned().unwrap_or(template),
            None => template,
        };
        info!("Force-rebuilding model '{}'", descriptor.id);
        rebuilder.rebuild(&descriptor).await?;
    } else if !rebuilder.ensure_default(&template).await? {
        info!("Artifact already present, nothing to do");
        return Ok(());
    }

    info!("Default model ready");
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    warn!("Shutdown signal received, stopping server...");
}

const VERBOSE_FILTER: &str = "langsift_server=debug,langsift_serve=debug,langsift_train=debug,\
                              langsift_data=debug,langsift_model=debug,tower_http=debug";

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(
        "langsift_requests_total",
        "Total number of API requests processed"
    );
    metrics::describe_counter!(
        "langsift_predictions_total",
        "Predictions served, labeled by outcome"
    );
    metrics::describe_counter!(
        "langsift_rebuilds_total",
        "Model artifacts rebuilt at startup"
    );
    metrics::describe_counter!("langsift_errors_total", "API errors by type");
    metrics::describe_histogram!(
        "langsift_inference_latency_us",
        metrics::Unit::Microseconds,
        "Single-prediction latency in microseconds"
    );

    info!("Metrics exporter initialized");
    Ok(handle)
}
