//! Protocol implementations.
//!
//! - `mysql`: MySQL wire protocol handshake and command loop

pub mod mysql;
