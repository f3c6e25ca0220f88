//! Inbound side of a session: drain client frames until the client leaves.

use tokio::io::AsyncRead;
use tracing::{debug, info, warn};

use crate::connection::WsReader;
use crate::error::Error;
use crate::message::{CloseFrame, Message};
use crate::session::CancellationSignal;

/// Why the monitor loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorExit {
    /// The client sent a Close frame.
    ClosedByClient(Option<CloseFrame>),
    /// The signal was already cancelled when a frame arrived.
    Cancelled,
    /// The stream ended or produced an invalid frame.
    ReceiveFailed(Error),
}

/// Outcome of [`run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorReport {
    /// Data frames received and logged. Control frames and frames arriving
    /// after cancellation are not counted.
    pub frames_received: usize,
    pub exit: MonitorExit,
}

/// Receive and log client frames until a Close, a receive error, or
/// cancellation.
///
/// The first receive happens regardless of the signal. On every exit path the
/// signal is cancelled, so the producer stops at its next check.
pub async fn run<R>(reader: &mut WsReader<R>, signal: &CancellationSignal) -> MonitorReport
where
    R: AsyncRead + Unpin,
{
    let mut frames_received = 0;

    let exit = loop {
        match reader.receive().await {
            Ok(Message::Close(frame)) => break MonitorExit::ClosedByClient(frame),
            Ok(Message::Data(_)) if signal.is_cancelled() => break MonitorExit::Cancelled,
            Ok(Message::Data(_)) => {
                debug!("received data from client");
                frames_received += 1;
            }
            Err(error) => {
                if error.is_disconnect() {
                    debug!(%error, "client went away");
                } else {
                    warn!(%error, "invalid frame from client");
                }
                break MonitorExit::ReceiveFailed(error);
            }
        }
    };

    signal.cancel();
    info!(frames_received, "connection closed by client");

    MonitorReport {
        frames_received,
        exit,
    }
}
