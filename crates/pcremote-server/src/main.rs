//! PC Remote host server entry point.
//!
//! Loads configuration, builds the shared [`AppState`], starts the background
//! services and serves the HTTP API until Ctrl-C / SIGTERM.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ Cli::into_server_config()   -- config file + CLI overrides
//!  └─ AppState::new()             -- pairing, tokens, nonces, sessions, host
//!  └─ start services
//!       ├─ code rotation     (Tokio task, every rotation interval)
//!       ├─ housekeeping      (Tokio task, every sweep interval)
//!       ├─ metrics sampling  (Tokio task, when [metrics] is enabled)
//!       ├─ discovery         (Tokio task, UDP beacon responder)
//!       └─ axum HTTP server  (until shutdown signal)
//! ```
//!
//! # Usage
//!
//! ```text
//! pcremote-server [OPTIONS]
//!
//! Options:
//!   --config <PATH>          Config file [default: platform config dir]
//!   --port <PORT>            HTTP port [default from config: 8000]
//!   --discovery-port <PORT>  UDP discovery port [default from config: 9999]
//!   --bind <IP>              HTTP bind address [default from config: 0.0.0.0]
//!   --log-level <LEVEL>      Log level when RUST_LOG is unset
//!   --write-config           Write the effective config to the config path and exit
//! ```

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pcremote_server::infrastructure::http::create_router;
use pcremote_server::infrastructure::network::discovery::run_discovery_responder;
use pcremote_server::infrastructure::scheduler::{
    start_code_rotation, start_housekeeping, start_metrics_sampling,
};
use pcremote_server::infrastructure::storage::config::{
    config_file_path, load_config, load_config_from, save_config_to, ServerConfig,
};
use pcremote_server::AppState;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// PC Remote host server.
///
/// Pairs phones on the local network and exposes the remote-control HTTP API.
#[derive(Debug, Parser)]
#[command(
    name = "pcremote-server",
    about = "Host server for the PC Remote Android client",
    version
)]
struct Cli {
    /// Path to the TOML config file.  Defaults to the platform config dir.
    #[arg(long, env = "PCREMOTE_CONFIG")]
    config: Option<PathBuf>,

    /// TCP port for the HTTP API.
    #[arg(long, env = "PCREMOTE_PORT")]
    port: Option<u16>,

    /// UDP port for discovery beacons.
    #[arg(long, env = "PCREMOTE_DISCOVERY_PORT")]
    discovery_port: Option<u16>,

    /// IP address to bind the HTTP API to.
    #[arg(long, env = "PCREMOTE_BIND")]
    bind: Option<String>,

    /// Log level used when `RUST_LOG` is not set.
    #[arg(long, env = "PCREMOTE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Write the effective configuration to the config path and exit.
    #[arg(long)]
    write_config: bool,
}

impl Cli {
    /// Loads the config file and applies CLI overrides on top.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// resulting configuration fails validation.
    fn into_server_config(self) -> anyhow::Result<(ServerConfig, Option<PathBuf>, bool)> {
        let mut config = match &self.config {
            Some(path) => load_config_from(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => load_config().context("failed to load config")?,
        };

        if let Some(port) = self.port {
            config.server.http_port = port;
        }
        if let Some(port) = self.discovery_port {
            config.discovery.port = port;
        }
        if let Some(bind) = self.bind {
            config.server.bind_address = bind;
        }
        if let Some(level) = self.log_level {
            config.server.log_level = level;
        }

        config.validate().context("invalid configuration")?;
        Ok((config, self.config, self.write_config))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (config, config_path, write_config) = Cli::parse().into_server_config()?;

    // Initialise structured logging.  Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level)),
        )
        .init();

    if write_config {
        let path = match config_path {
            Some(path) => path,
            None => config_file_path().context("no config path available")?,
        };
        save_config_to(&path, &config)
            .with_context(|| format!("failed to write config to {}", path.display()))?;
        info!("wrote configuration to {}", path.display());
        return Ok(());
    }

    info!(version = env!("CARGO_PKG_VERSION"), "PC Remote host starting");

    let http_addr = config.http_addr()?;
    let state = AppState::new(config.clone());

    // Shutdown token shared across all background services.
    let cancel = CancellationToken::new();

    // ── Background loops ──────────────────────────────────────────────────────
    let rotation = start_code_rotation(
        state.clone(),
        Duration::from_secs(config.security.code_rotation_interval_secs),
        cancel.clone(),
    );
    let housekeeping = start_housekeeping(
        state.clone(),
        Duration::from_secs(config.sessions.sweep_interval_secs),
        cancel.clone(),
    );
    let sampling = config.metrics.enabled.then(|| {
        start_metrics_sampling(
            state.clone(),
            Duration::from_secs(config.metrics.sample_interval_secs),
            cancel.clone(),
        )
    });

    // ── Discovery responder ───────────────────────────────────────────────────
    let discovery = config.discovery.enabled.then(|| {
        tokio::spawn(run_discovery_responder(
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.discovery.port)),
            config.server.http_port,
            Duration::from_secs(config.discovery.retry_delay_secs),
            cancel.clone(),
        ))
    });

    // ── HTTP server ───────────────────────────────────────────────────────────
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(http_addr)
        .await
        .with_context(|| format!("failed to bind HTTP listener on {http_addr}"))?;
    info!("HTTP API listening on {http_addr}");

    let shutdown = cancel.clone();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown_signal().await;
        shutdown.cancel();
    })
    .await
    .context("HTTP server error")?;

    // The server may also stop on its own; make sure the loops follow.
    cancel.cancel();
    info!("waiting for background services");
    let _ = rotation.await;
    let _ = housekeeping.await;
    if let Some(handle) = sampling {
        let _ = handle.await;
    }
    if let Some(handle) = discovery {
        let _ = handle.await;
    }

    info!("PC Remote host stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
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

    info!("shutdown signal received");
}
