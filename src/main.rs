#![forbid(unsafe_code)]

//! `crm-ingest`: import and webhook ingestion server.
//!
//! Loads configuration, opens the database, seeds the advisor roster, and
//! serves the import and webhook endpoints until SIGINT or SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use crm_ingest::config::GlobalConfig;
use crm_ingest::http::{serve_http, AppState};
use crm_ingest::persistence::advisor_repo::AdvisorRepo;
use crm_ingest::persistence::db;
use crm_ingest::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "crm-ingest", about = "CRM import and webhook ingestion server", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Override the configured HTTP port.
    #[arg(long)]
    port: Option<u16>,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("crm-ingest server bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let mut config = GlobalConfig::load_from_path(&args.config)?;
    config.apply_env_overrides();
    if let Some(port) = args.port {
        config.http_port = port;
    }
    let config = Arc::new(config);
    info!("configuration loaded");

    // ── Initialize database ─────────────────────────────
    let db = Arc::new(db::connect(&config.database).await?);
    let seeded = AdvisorRepo::new(Arc::clone(&db))
        .seed(&config.advisors)
        .await?;
    info!(advisors = seeded, "advisor roster seeded");

    let state = Arc::new(AppState::new(Arc::clone(&config), Arc::clone(&db)));

    // ── Start HTTP server ───────────────────────────────
    let ct = CancellationToken::new();
    let mut http_handle = tokio::spawn(serve_http(state, ct.clone()));

    // ── Wait for shutdown signal or server exit ─────────
    let finished = tokio::select! {
        () = shutdown_signal() => None,
        finished = &mut http_handle => Some(finished),
    };
    let served = match finished {
        Some(finished) => finished,
        None => {
            info!("shutdown signal received");
            ct.cancel();
            http_handle.await
        }
    };
    let served = served
        .map_err(|err| AppError::Config(format!("http server task panicked: {err}")))
        .and_then(|result| result);
    if let Err(err) = &served {
        error!(%err, "http server failed");
    }

    db.close().await;
    served?;
    info!("crm-ingest shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
