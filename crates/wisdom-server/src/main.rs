//! Wisdom Server Entry Point

use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use wisdom_server::{Server, ServerConfig};

#[tokio::main]
async fn main() {
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    // An explicit data directory argument overrides WISDOM_DATA_DIR
    let config = match std::env::args().nth(1) {
        Some(dir) => ServerConfig {
            data_dir: PathBuf::from(dir),
            ..config
        },
        None => config,
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    info!("Wisdom v{}", Server::version());

    let server = match Server::load(config).await {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to create server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.start().await {
        error!("Failed to start server: {}", e);
        std::process::exit(1);
    }

    // Wait for shutdown signal
    info!("Press Ctrl+C to stop the server");

    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("Received shutdown signal");
        }
        Err(e) => {
            error!("Failed to listen for shutdown signal: {}", e);
        }
    }

    if let Err(e) = server.stop().await {
        error!("Error during shutdown: {}", e);
    }

    info!("Goodbye!");
}
