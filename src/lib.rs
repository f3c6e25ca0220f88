//! # statusws
//!
//! An RFC 6455 WebSocket server that, for every upgraded connection, logs
//! whatever the client sends and pushes a status line back once per interval
//! until the client closes.
//!
//! ## Layout
//!
//! - [`protocol`]: frame format, masking, validation, the opening handshake
//! - [`codec`]: buffered frame I/O over stream halves
//! - [`connection`]: the frame channel and its read and write halves
//! - [`session`]: the per-connection coordinator, monitor and producer
//! - [`server`]: axum routing and the upgrade endpoint
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use statusws::{Server, ServerConfig};
//!
//! # async fn run() -> statusws::Result<()> {
//! let handle = Server::bind(ServerConfig::default()).await?;
//! println!("listening on ws://{}/ws", handle.local_addr());
//!
//! tokio::signal::ctrl_c().await?;
//! handle.shutdown();
//! handle.join().await
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod message;
pub mod protocol;
pub mod server;
pub mod session;

pub use config::{Config, DEFAULT_CLOSE_REASON, Limits, ServerConfig, SessionConfig};
pub use connection::{ConnectionState, WebSocket, WsReader, WsWriter};
pub use error::{Error, Result};
pub use message::{CloseCode, CloseFrame, DataFrame, DataKind, Message};
pub use protocol::{OpCode, UpgradeRequest, WS_GUID, compute_accept_key};
pub use server::{AppState, Server, ServerHandle, SessionStats, StatsSnapshot, router, serve};
pub use session::{
    CancellationSignal, ConnectionId, Coordinator, MonitorExit, MonitorReport, ProducerExit,
    SessionReport, StatusMessage,
};
