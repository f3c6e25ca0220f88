//! Lifecycle of one upgraded connection.
//!
//! A [`Coordinator`] takes a [`WebSocket`], splits it, and runs two tasks
//! against one [`CancellationSignal`]:
//!
//! - the [inbound monitor](monitor::run) owns the read half and logs every
//!   client data frame until the client closes or the stream fails, then
//!   cancels the signal;
//! - the [outbound producer](producer::run) owns the write half and sends a
//!   [`StatusMessage`] every interval until the signal is cancelled, answering
//!   client Pings while it waits.
//!
//! Both tasks are joined, whichever finishes first. Only then is the Normal
//! Closure frame written, through the write half the producer hands back.

pub mod monitor;
pub mod producer;
mod signal;

use std::fmt;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::connection::{WebSocket, WsWriter};
use crate::error::Error;
use crate::message::CloseCode;

pub use monitor::{MonitorExit, MonitorReport};
pub use producer::StatusMessage;
pub use signal::CancellationSignal;

/// Random identifier assigned to a connection when it is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// A new random (v4) id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ConnectionId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// How the producer task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProducerExit {
    /// Saw the cancelled signal after sending `sent` messages.
    Stopped { sent: usize },
    /// A send failed and the loop gave up.
    SendFailed(Error),
    /// The task panicked.
    Panicked,
}

/// Summary of a finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub id: ConnectionId,
    /// `None` if the monitor task panicked.
    pub monitor: Option<MonitorReport>,
    pub producer: ProducerExit,
    /// Whether the final Normal Closure frame reached the stream.
    pub close_sent: bool,
}

impl SessionReport {
    /// Client frames the monitor logged.
    #[must_use]
    pub fn frames_received(&self) -> usize {
        self.monitor.as_ref().map_or(0, |m| m.frames_received)
    }

    /// Status messages the producer sent, when it stopped normally.
    #[must_use]
    pub fn messages_sent(&self) -> usize {
        match self.producer {
            ProducerExit::Stopped { sent } => sent,
            _ => 0,
        }
    }
}

/// Runs sessions for upgraded connections.
#[derive(Debug, Clone)]
pub struct Coordinator {
    config: Arc<SessionConfig>,
    shutdown: CancellationToken,
}

impl Coordinator {
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config: Arc::new(config),
            shutdown: CancellationToken::new(),
        }
    }

    /// Stop every session started by this coordinator when `token` is cancelled.
    #[must_use]
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Drive `socket` until both loops have ended, then close it.
    ///
    /// Never fails: errors and panics inside the loops are logged and
    /// recorded in the report, and the socket is dropped on every path.
    pub async fn run<T>(&self, socket: WebSocket<T>) -> SessionReport
    where
        T: AsyncRead + AsyncWrite + Send + 'static,
    {
        let id = ConnectionId::new();
        let span = info_span!("session", connection_id = %id);
        self.drive(id, socket).instrument(span).await
    }

    async fn drive<T>(&self, id: ConnectionId, socket: WebSocket<T>) -> SessionReport
    where
        T: AsyncRead + AsyncWrite + Send + 'static,
    {
        info!("connection opened");

        let signal = CancellationSignal::child_of(&self.shutdown);
        let (mut reader, mut writer) = socket.split();

        let monitor = tokio::spawn({
            let signal = signal.clone();
            async move {
                // Cancels even if the loop unwinds.
                let _guard = signal.drop_guard();
                let report = monitor::run(&mut reader, &signal).await;
                (reader, report)
            }
            .instrument(Span::current())
        });

        let interval = self.config.status_interval;
        let producer = tokio::spawn({
            let signal = signal.clone();
            async move {
                let result = producer::run(&mut writer, id, &signal, interval).await;
                (writer, result)
            }
            .instrument(Span::current())
        });

        let (monitor, producer) = tokio::join!(monitor, producer);

        let monitor = match monitor {
            Ok((_reader, report)) => Some(report),
            Err(join_error) => {
                error!(error = %join_error, "inbound monitor task failed");
                None
            }
        };

        let (writer, producer) = match producer {
            Ok((writer, Ok(sent))) => (Some(writer), ProducerExit::Stopped { sent }),
            Ok((writer, Err(error))) => {
                warn!(%error, "status send failed");
                (Some(writer), ProducerExit::SendFailed(error))
            }
            Err(join_error) => {
                error!(error = %join_error, "outbound producer task failed");
                (None, ProducerExit::Panicked)
            }
        };

        let close_sent = match writer {
            Some(mut writer) => self.close(&mut writer).await,
            None => false,
        };

        let report = SessionReport {
            id,
            monitor,
            producer,
            close_sent,
        };
        info!(
            frames_received = report.frames_received(),
            messages_sent = report.messages_sent(),
            close_sent,
            "session finished"
        );
        report
    }

    /// Best-effort Normal Closure. Returns whether the frame was written.
    async fn close<W: AsyncWrite + Unpin>(&self, writer: &mut WsWriter<W>) -> bool {
        if !writer.is_open() {
            debug!("write half already closed, skipping close frame");
            return false;
        }

        if let Err(error) = writer.close(CloseCode::Normal, &self.config.close_reason).await {
            warn!(%error, "failed to send close frame");
            return false;
        }
        if let Err(error) = writer.shutdown().await {
            debug!(%error, "shutdown after close failed");
        }
        true
    }
}
