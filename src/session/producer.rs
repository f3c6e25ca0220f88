//! Outbound side of a session: a status line every interval.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::io::AsyncWrite;
use tokio::time::Instant;
use tracing::debug;

use crate::connection::WsWriter;
use crate::error::Result;
use crate::message::Message;
use crate::session::{CancellationSignal, ConnectionId};

/// The text pushed to the client: `Testing for {id} at {HH:MM:SS}...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub id: ConnectionId,
    pub at: DateTime<Local>,
}

impl StatusMessage {
    /// A status message stamped with the current local time.
    #[must_use]
    pub fn now(id: ConnectionId) -> Self {
        Self {
            id,
            at: Local::now(),
        }
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Testing for {} at {}...", self.id, self.at.format("%H:%M:%S"))
    }
}

/// Send a status message, then wait `interval`, until `signal` is cancelled.
///
/// The signal is checked only at the top of each iteration; an in-flight send
/// or wait always completes. Client Pings are answered during the wait.
/// Returns the number of status messages sent.
///
/// # Errors
///
/// The first failed write, status or Pong, is returned as is. The signal is
/// left untouched.
pub async fn run<W>(
    writer: &mut WsWriter<W>,
    id: ConnectionId,
    signal: &CancellationSignal,
    interval: Duration,
) -> Result<usize>
where
    W: AsyncWrite + Unpin,
{
    let mut sent = 0;

    while !signal.is_cancelled() {
        let status = StatusMessage::now(id);
        writer.send(Message::text(status.to_string())).await?;
        sent += 1;
        debug!("sending random data to client");

        writer.idle_until(Instant::now() + interval).await?;
    }

    debug!(sent, "random data has stopped");
    Ok(sent)
}
