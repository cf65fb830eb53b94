use anyhow::Result;
use api_server::{Server, ServerTransport};
use clap::Parser;
use common::config::Config;
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

/// Maximum time to wait for graceful shutdown.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(
    name = "modelplex",
    version,
    about = "Multi-upstream AI inference gateway behind an OpenAI-shaped API"
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Serve on a Unix socket at this path instead of TCP.
    #[arg(short, long, conflicts_with = "http")]
    socket: Option<PathBuf>,

    /// TCP listen address.
    #[arg(long, default_value = "127.0.0.1:41041")]
    http: SocketAddr,

    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenv().ok();

    let config = Config::load(&cli.config)?;
    let default_level = if cli.verbose {
        "debug".into()
    } else {
        config.server.log_level.clone()
    };
    let _guard = common::logging_stdout(&default_level);

    info!(config = %cli.config.display(), "loaded configuration");

    let transport = match &cli.socket {
        Some(path) => ServerTransport::Socket(path.clone()),
        None => ServerTransport::Tcp(cli.http),
    };
    let server = Server::new(&config, transport)?;

    let mut serve_error = server.start().await?;

    tokio::select! {
        _ = shutdown_signal() => info!("shutting down..."),
        err = &mut serve_error => {
            if let Ok(err) = err {
                error!("server failed: {err}");
            }
        }
    }

    server.stop(SHUTDOWN_TIMEOUT).await;
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let ctrl_c = tokio::signal::ctrl_c();
    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = ctrl_c => {}
                _ = term.recv() => {}
            }
        }
        Err(_) => {
            let _ = ctrl_c.await;
        }
    }
}
