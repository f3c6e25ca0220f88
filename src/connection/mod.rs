//! The frame channel over an upgraded stream.
//!
//! A [`WebSocket`] wraps the stream hyper hands over after a 101 response.
//! It is normally [split](WebSocket::split) right away: the read half
//! ([`WsReader`]) can only receive and the write half ([`WsWriter`]) is the
//! only thing that can put frames on the wire.
//!
//! Control frames stay below this layer. A Ping read by the [`WsReader`] is
//! queued to the [`WsWriter`], which sends the matching Pong the next time it
//! waits in [`WsWriter::idle_until`]. Pongs are discarded.
//!
//! ## Example
//!
//! ```rust,ignore
//! use statusws::{CloseCode, Config, Message, WebSocket};
//!
//! let ws = WebSocket::from_upgraded(io, Config::server());
//! let (mut reader, mut writer) = ws.split();
//!
//! writer.send(Message::text("hello")).await?;
//! writer.idle_until(Instant::now() + Duration::from_secs(1)).await?;
//! let msg = reader.receive().await?;
//! writer.close(CloseCode::Normal, "done").await?;
//! ```

mod channel;
mod state;

pub use channel::{WebSocket, WsReader, WsWriter};
pub use state::ConnectionState;
