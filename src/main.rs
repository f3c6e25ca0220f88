//! statusws server binary.

use std::error::Error;
use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use statusws::{Server, ServerConfig, SessionConfig};

/// WebSocket server that streams a status line to each client until it closes.
#[derive(Parser, Debug)]
#[command(name = "statusws", version, about)]
struct Cli {
    /// Address to bind.
    #[arg(long, default_value = "127.0.0.1:5000")]
    bind: SocketAddr,

    /// Route that accepts WebSocket upgrades.
    #[arg(long, default_value = "/ws")]
    path: String,

    /// Milliseconds between status messages.
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(1..))]
    interval_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = ServerConfig::default()
        .with_bind(cli.bind)
        .with_path(cli.path)
        .with_session(
            SessionConfig::default().with_status_interval(Duration::from_millis(cli.interval_ms)),
        );

    let handle = Server::bind(config).await?;
    tracing::info!(addr = %handle.local_addr(), "statusws ready");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");

    handle.shutdown();
    handle.join().await?;
    Ok(())
}
