// server: One node of the replicated bulletin-board cluster.

use clap::Parser;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(about = "Replicated bulletin-board article server")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, default_value = "/etc/bboard/server.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match server::load_config_from_path(&cli.config) {
        Ok(config) => {
            info!(
                listen = %config.listen,
                mode = ?config.mode,
                cluster = config.servers.len(),
                "config loaded"
            );
            config
        }
        Err(e) => {
            eprintln!("FATAL: failed to load config: {e}");
            std::process::exit(1);
        }
    };

    let srv = match server::Server::bind(config).await {
        Ok(srv) => srv,
        Err(e) => {
            eprintln!("FATAL: failed to bind listener: {e}");
            std::process::exit(1);
        }
    };
    let handle = srv.spawn();

    // Run until killed; there is no graceful shutdown protocol.
    if let Err(e) = tokio::signal::ctrl_c().await {
        eprintln!("FATAL: signal handler failed: {e}");
        std::process::exit(1);
    }
    info!("shutting down");
    handle.shutdown();
}
