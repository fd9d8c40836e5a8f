//! MySQL connection handler.
//!
//! Drives one client connection: greeting, handshake response, then the
//! command loop until the client quits, the transport fails or the server
//! cancels the connection.

use super::command::CommandKind;
use super::error::ConnectionError;
use super::handshake::HandshakeInfo;
use super::packet::{read_packet, write_packet};
use super::response::{write_error, write_ok};
use crate::registry::DisconnectGuard;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Sequence number of the server greeting.
const GREETING_SEQUENCE: u8 = 0;

/// Sequence number of the OK that completes the handshake.
const HANDSHAKE_OK_SEQUENCE: u8 = 2;

/// Sequence number of every command response.
const COMMAND_RESPONSE_SEQUENCE: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitingCommand,
    Closed,
}

/// Owns one accepted connection for its whole lifetime.
#[derive(Debug)]
pub struct ConnectionHandler {
    info: HandshakeInfo,
    guard: DisconnectGuard,
}

impl ConnectionHandler {
    /// Create a handler for a registered connection.
    ///
    /// The guard's connection id is advertised in the greeting. The guard
    /// itself is dropped when the handler finishes, however it finishes.
    pub fn new(guard: DisconnectGuard, server_version: impl Into<String>) -> Self {
        Self {
            info: HandshakeInfo::new(guard.connection_id(), server_version),
            guard,
        }
    }

    pub fn connection_id(&self) -> u32 {
        self.info.connection_id
    }

    /// Run the connection to completion.
    ///
    /// When `cancel` fires, the stream is dropped, which closes the
    /// transport, and `ConnectionClosed` is returned.
    pub async fn run<S>(self, stream: S, cancel: CancellationToken) -> Result<(), ConnectionError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let ConnectionHandler { info, guard: _guard } = self;

        tokio::select! {
            result = serve(stream, &info) => result,
            _ = cancel.cancelled() => {
                debug!(connection_id = info.connection_id, "Connection cancelled");
                Err(ConnectionError::ConnectionClosed)
            }
        }
    }
}

async fn serve<S>(mut stream: S, info: &HandshakeInfo) -> Result<(), ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let connection_id = info.connection_id;

    write_packet(&mut stream, GREETING_SEQUENCE, |buf| info.write_to(buf)).await?;
    // Credentials are not checked.
    let response = read_packet(&mut stream).await?;
    trace!(connection_id, len = response.len(), "Handshake response");
    write_packet(&mut stream, HANDSHAKE_OK_SEQUENCE, write_ok).await?;
    debug!(connection_id, "Handshake complete");

    let mut state = State::AwaitingCommand;
    while state == State::AwaitingCommand {
        let payload = read_packet(&mut stream).await?;
        state = dispatch(&mut stream, connection_id, &payload).await?;
    }

    debug!(connection_id, "Client quit");
    if let Err(e) = stream.shutdown().await {
        trace!(connection_id, error = %e, "Shutdown after quit failed");
    }
    Ok(())
}

/// Answer one command packet and return the next state.
async fn dispatch<W>(
    stream: &mut W,
    connection_id: u32,
    payload: &[u8],
) -> Result<State, ConnectionError>
where
    W: AsyncWrite + Unpin,
{
    match CommandKind::parse(payload) {
        Some(CommandKind::Quit) => {
            write_packet(stream, COMMAND_RESPONSE_SEQUENCE, write_ok).await?;
            Ok(State::Closed)
        }
        Some(command @ (CommandKind::Ping | CommandKind::Query | CommandKind::ResetConnection)) => {
            trace!(connection_id, ?command, "Acknowledging command");
            write_packet(stream, COMMAND_RESPONSE_SEQUENCE, write_ok).await?;
            Ok(State::AwaitingCommand)
        }
        Some(command) => {
            warn!(connection_id, %command, "Unhandled command");
            write_packet(stream, COMMAND_RESPONSE_SEQUENCE, write_error).await?;
            Ok(State::AwaitingCommand)
        }
        None => {
            warn!(connection_id, "Empty command packet");
            write_packet(stream, COMMAND_RESPONSE_SEQUENCE, write_error).await?;
            Ok(State::AwaitingCommand)
        }
    }
}
