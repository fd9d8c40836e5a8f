//! fake-mysql-server: a MySQL protocol test double
//!
//! Speaks enough of the MySQL client/server protocol for a driver's test
//! suite to connect, authenticate and issue commands:
//! - Protocol 10 greeting with a deterministic auth challenge
//! - Any handshake response is accepted
//! - `COM_QUERY`, `COM_PING`, `COM_RESET_CONNECTION` and `COM_QUIT` get an OK
//! - Every other command gets an error packet
//!
//! ```no_run
//! use fake_mysql_server::{Config, Server};
//!
//! # async fn demo() -> std::io::Result<()> {
//! let config = Config {
//!     listen: "127.0.0.1:0".to_string(),
//!     ..Config::default()
//! };
//! let server = Server::new(config).bind().await?;
//! let url = format!("mysql://root@{}/test", server.local_addr());
//! // ... point the driver under test at `url` ...
//! server.shutdown().await;
//! # let _ = url;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod protocols;
pub mod registry;
pub mod server;

pub use config::Config;
pub use registry::{DisconnectGuard, Registry};
pub use server::{RunningServer, Server};
