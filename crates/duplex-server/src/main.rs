//! `duplexd` — relay server binary.

#![deny(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use duplex_server::config::RelayConfig;
use duplex_server::server::RelayServer;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Two-party real-time message relay.
#[derive(Parser, Debug)]
#[command(name = "duplexd", about = "Two-party real-time message relay")]
struct Cli {
    /// Host to bind.
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (0 for auto-assign).
    #[arg(long)]
    port: Option<u16>,

    /// Grace window in seconds before a disconnected user is evicted.
    #[arg(long)]
    grace_window_secs: Option<u64>,

    /// Per-room history cap (0 keeps everything).
    #[arg(long)]
    max_history_per_room: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = RelayConfig::from_env();
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(grace) = cli.grace_window_secs {
        config.grace_window_secs = grace;
    }
    if let Some(cap) = cli.max_history_per_room {
        config.max_history_per_room = cap;
    }

    let server = RelayServer::new(config);
    let (addr, serve_handle) = server.listen().await?;
    info!(%addr, "duplex relay listening");

    wait_for_signal().await;
    info!("shutdown signal received");

    server
        .shutdown()
        .graceful_shutdown(server.gateway(), vec![serve_handle], None)
        .await;
    Ok(())
}

/// Resolve on SIGINT or, on unix, SIGTERM.
async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut term = match signal(SignalKind::terminate()) {
            Ok(term) => term,
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
