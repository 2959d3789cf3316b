//! MetalPathfinder API (mpf-api) - Main entry point
//!
//! Loads configuration, opens the SQLite database, constructs the Spotify
//! and AI gateways and serves the HTTP API until SIGINT/SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mpf_api::catalog::SpotifyClient;
use mpf_api::generator::OpenAiClient;
use mpf_api::{build_router, AppState};
use mpf_common::config::ServiceConfig;
use mpf_common::db::init_database;

/// Command-line arguments for mpf-api
#[derive(Parser, Debug)]
#[command(name = "mpf-api")]
#[command(about = "MetalPathfinder recommendation service")]
#[command(version)]
struct Args {
    /// TOML config file (overrides MPF_CONFIG and the platform default)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, e.g. 0.0.0.0:5780
    #[arg(short, long, env = "MPF_BIND")]
    bind: Option<String>,

    /// SQLite database file
    #[arg(short, long, env = "MPF_DATABASE_PATH")]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mpf_api=info,mpf_common=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting mpf-api v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    let mut config =
        ServiceConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if let Some(database) = args.database {
        config.database_path = database;
    }
    config.validate().context("Invalid configuration")?;

    info!("Database: {}", config.database_path.display());
    let db = init_database(&config.database_path)
        .await
        .context("Failed to initialize database")?;

    let catalog = SpotifyClient::from_config(&config.spotify)
        .context("Failed to create Spotify client")?;
    let generator =
        OpenAiClient::from_config(&config.ai).context("Failed to create AI client")?;
    info!(model = %config.ai.model, base_url = %config.ai.base_url, "AI generator configured");

    if config.library.reject_blocked_tracks {
        info!("Library additions of actively blocked tracks will be rejected");
    }

    let state = AppState::new(db, Arc::new(catalog), Arc::new(generator), &config.library);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;
    info!("Listening on {}", config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
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
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
