use clap::Parser;
use std::sync::Arc;
use tracing::{debug, info};

use redislite::codec::DEFAULT_MAX_FRAME_SIZE;
use redislite::commands::Registry;
use redislite::config::{Config, DEFAULT_HOST, DEFAULT_PORT};
use redislite::server::Server;
use redislite::store::MemoryStore;
use redislite::Error;

#[derive(Parser, Debug)]
struct Args {
    /// The address to bind to
    #[arg(long, env = "REDISLITE_HOST", default_value = DEFAULT_HOST)]
    host: String,

    /// The port to listen on
    #[arg(short, long, env = "REDISLITE_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Largest frame, in bytes, accepted from a client
    #[arg(long, env = "REDISLITE_MAX_FRAME_SIZE", default_value_t = DEFAULT_MAX_FRAME_SIZE)]
    max_frame_size: usize,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Config {
            host: args.host,
            port: args.port,
            max_frame_size: args.max_frame_size,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let _ = tracing_subscriber::fmt()
        .try_init()
        .map_err(|e| debug!("Failed to initialize global tracing: {}", e));

    let args = Args::parse();

    let server = Server::new(
        args.into(),
        Registry::with_builtins(),
        Arc::new(MemoryStore::new()),
    );
    server.start().await?;

    shutdown_signal().await?;
    info!("Received shutdown signal, stopping server");

    server.stop().await;
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() -> Result<(), Error> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res?,
        _ = terminate.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<(), Error> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
