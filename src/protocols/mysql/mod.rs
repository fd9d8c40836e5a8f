//! MySQL client/server protocol, just enough for a test double.
//!
//! The server completes the handshake without checking credentials and
//! answers commands with fixed packets:
//!
//! ```text
//! S -> C  greeting (seq 0)
//! C -> S  handshake response (ignored)
//! S -> C  OK (seq 2)
//!
//! C -> S  COM_QUERY / COM_PING / COM_RESET_CONNECTION
//! S -> C  OK (seq 1)
//!
//! C -> S  any other command
//! S -> C  ERR 1105 (seq 1)
//!
//! C -> S  COM_QUIT
//! S -> C  OK (seq 1), connection closed
//! ```
//!
//! Queries are never executed and never return rows.

pub mod command;
pub mod error;
pub mod handler;
pub mod handshake;
pub mod packet;
pub mod response;

pub use command::CommandKind;
pub use error::ConnectionError;
pub use handler::ConnectionHandler;
pub use handshake::{Capabilities, HandshakeInfo};
