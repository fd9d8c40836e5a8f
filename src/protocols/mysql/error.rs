//! Connection-level errors.

use thiserror::Error;

/// Errors that end a connection.
///
/// Unhandled commands are not represented here: they are answered with an
/// error packet and the connection keeps running.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// A header or payload was cut short or could not be decoded.
    #[error("framing error: {0}")]
    Framing(String),

    /// The peer closed the connection before a packet started.
    #[error("connection closed")]
    ConnectionClosed,

    /// Any other transport failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConnectionError {
    /// True when the connection ended because the client went away.
    pub fn is_disconnect(&self) -> bool {
        match self {
            ConnectionError::ConnectionClosed => true,
            ConnectionError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
            ),
            ConnectionError::Framing(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let e = ConnectionError::Framing("truncated header".to_string());
        assert_eq!(e.to_string(), "framing error: truncated header");
        assert_eq!(ConnectionError::ConnectionClosed.to_string(), "connection closed");
    }

    #[test]
    fn test_is_disconnect() {
        assert!(ConnectionError::ConnectionClosed.is_disconnect());
        assert!(ConnectionError::from(std::io::Error::from(
            std::io::ErrorKind::ConnectionReset
        ))
        .is_disconnect());
        assert!(!ConnectionError::Framing("x".to_string()).is_disconnect());
    }
}
