//! TCP server for fake MySQL connections.
//!
//! Accepts connections, registers each one with the `Registry` and runs a
//! `ConnectionHandler` on its own task. Cancelling the server's token stops
//! the accept loop and closes every open connection.

use crate::config::Config;
use crate::protocols::mysql::{ConnectionError, ConnectionHandler};
use crate::registry::Registry;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Server instance
pub struct Server {
    config: Config,
    registry: Arc<Registry>,
    connection_limit: Arc<Semaphore>,
}

impl Server {
    /// Create a new server instance
    pub fn new(config: Config) -> Self {
        let connection_limit = Arc::new(Semaphore::new(config.max_connections));

        Server {
            config,
            registry: Registry::new(),
            connection_limit,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Bind the listener and accept connections on a background task.
    pub async fn bind(self) -> std::io::Result<RunningServer> {
        let listener = TcpListener::bind(&self.config.listen).await?;
        let local_addr = listener.local_addr()?;
        info!(address = %local_addr, "Server listening");

        let cancel = CancellationToken::new();
        let registry = Arc::clone(&self.registry);
        let task = tokio::spawn(self.serve(listener, cancel.clone()));

        Ok(RunningServer {
            local_addr,
            registry,
            cancel,
            task,
        })
    }

    /// Bind the listener and serve until `cancel` fires, then wait for open
    /// connections to close.
    pub async fn run(self, cancel: CancellationToken) -> std::io::Result<()> {
        let listener = TcpListener::bind(&self.config.listen).await?;
        info!(address = %listener.local_addr()?, "Server listening");

        let registry = Arc::clone(&self.registry);
        self.serve(listener, cancel).await;
        registry.wait_idle().await;
        info!("Server stopped");
        Ok(())
    }

    async fn serve(self, listener: TcpListener, cancel: CancellationToken) {
        let server_version: Arc<str> = Arc::from(self.config.server_version.as_str());

        loop {
            // Wait for a connection slot
            let permit = tokio::select! {
                permit = Arc::clone(&self.connection_limit).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
                _ = cancel.cancelled() => break,
            };

            let (stream, peer) = tokio::select! {
                result = listener.accept() => match result {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        error!(error = %e, "Failed to accept connection");
                        continue;
                    }
                },
                _ = cancel.cancelled() => break,
            };

            let handler = ConnectionHandler::new(self.registry.register(), server_version.as_ref());
            let connection_cancel = cancel.child_token();

            tokio::spawn(async move {
                let connection_id = handler.connection_id();
                debug!(connection_id, peer = %peer, "New connection");

                match handle_stream(handler, stream, connection_cancel).await {
                    Ok(()) => debug!(connection_id, "Connection closed"),
                    Err(e) if e.is_disconnect() => {
                        debug!(connection_id, error = %e, "Client disconnected")
                    }
                    Err(e) => warn!(connection_id, error = %e, "Connection error"),
                }
                drop(permit);
            });
        }

        info!("Server shutting down");
    }
}

async fn handle_stream(
    handler: ConnectionHandler,
    stream: TcpStream,
    cancel: CancellationToken,
) -> Result<(), ConnectionError> {
    if let Err(e) = stream.set_nodelay(true) {
        warn!(error = %e, "Failed to set TCP_NODELAY");
    }
    handler.run(stream, cancel).await
}

/// Handle to a server accepting connections in the background.
pub struct RunningServer {
    local_addr: SocketAddr,
    registry: Arc<Registry>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl RunningServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Stop accepting, close every connection and wait for them to finish.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Err(e) = (&mut self.task).await {
            error!(error = %e, "Accept loop failed");
        }
        self.registry.wait_idle().await;
    }
}

impl Drop for RunningServer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
