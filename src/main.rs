//! fake-mysql-server: a MySQL protocol test double
//!
//! Runs the fake server in the foreground until Ctrl-C.

use fake_mysql_server::{Config, Server};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        listen = %config.listen,
        server_version = %config.server_version,
        max_connections = config.max_connections,
        "Starting fake-mysql-server"
    );

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            return;
        }
        info!("Received Ctrl-C");
        signal_cancel.cancel();
    });

    Server::new(config).run(cancel).await?;
    Ok(())
}
