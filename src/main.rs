//! Vehicle price and condition prediction server.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use vehicle_inference::{router, AppState, ServiceConfig, VehiclePredictor};

#[derive(Parser)]
#[command(name = "vehicle-inference")]
#[command(about = "Serve vehicle price and condition predictions over HTTP", long_about = None)]
struct Cli {
    /// Optional TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the trained artifacts
    #[arg(long)]
    models_dir: Option<PathBuf>,

    /// Interface to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,
}

impl Cli {
    fn resolve_config(&self) -> anyhow::Result<ServiceConfig> {
        let config = match &self.config {
            Some(path) => ServiceConfig::load(path)?,
            None => ServiceConfig::default(),
        };
        let mut config = config.with_env()?;

        if let Some(dir) = &self.models_dir {
            config.models_dir = dir.clone();
        }
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // A failed load degrades the service instead of exiting
    let state = match VehiclePredictor::load(&config.artifact_paths(), &config.model_labels()) {
        Ok(predictor) => {
            tracing::info!(
                regression = predictor.regression_model(),
                classification = predictor.classification_model(),
                "all models loaded"
            );
            AppState::ready(Arc::new(predictor))
        }
        Err(e) => {
            tracing::warn!(error = %e, "could not load models, predictions unavailable");
            AppState::unavailable(e.to_string())
        }
    };

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(
        addr = %bind_addr,
        models_dir = %config.models_dir.display(),
        models_loaded = state.models_loaded(),
        "server listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
