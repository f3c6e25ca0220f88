use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::Instant;
use tracing::debug;

use crate::codec::{FrameReader, FrameWriter};
use crate::config::Config;
use crate::connection::ConnectionState;
use crate::error::{Error, Result};
use crate::message::{CloseCode, CloseFrame, DataFrame, DataKind, Message};
use crate::protocol::{Frame, MAX_CONTROL_FRAME_PAYLOAD, OpCode};

/// Longest close reason that still fits a control frame after the status code.
const MAX_CLOSE_REASON: usize = MAX_CONTROL_FRAME_PAYLOAD - 2;

/// Pings waiting for a Pong before further ones are dropped unanswered.
const PENDING_PINGS: usize = 8;

/// A server-side WebSocket over an already upgraded stream.
///
/// The handshake is not performed here; the HTTP layer answers it before the
/// stream is handed over.
pub struct WebSocket<T> {
    reader: WsReader<ReadHalf<T>>,
    writer: WsWriter<WriteHalf<T>>,
}

impl<T: AsyncRead + AsyncWrite> WebSocket<T> {
    /// Wrap an upgraded stream.
    pub fn from_upgraded(io: T, config: Config) -> Self {
        let (rd, wr) = tokio::io::split(io);
        let (ping_tx, ping_rx) = mpsc::channel(PENDING_PINGS);
        Self {
            reader: WsReader::new(rd, &config, ping_tx),
            writer: WsWriter::new(wr, &config, ping_rx),
        }
    }

    /// Separate the receive and send sides.
    ///
    /// Pings seen by the reader are handed to the writer, which answers them
    /// while it [idles](WsWriter::idle_until).
    pub fn split(self) -> (WsReader<ReadHalf<T>>, WsWriter<WriteHalf<T>>) {
        (self.reader, self.writer)
    }
}

/// Receive side of a [`WebSocket`].
pub struct WsReader<R> {
    frames: FrameReader<R>,
    state: ConnectionState,
    // Kind of the fragmented message in progress, if any.
    fragment: Option<DataKind>,
    pings: mpsc::Sender<Vec<u8>>,
}

impl<R> WsReader<R> {
    fn new(io: R, config: &Config, pings: mpsc::Sender<Vec<u8>>) -> Self {
        Self {
            frames: FrameReader::new(io, config),
            state: ConnectionState::Open,
            fragment: None,
            pings,
        }
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    fn queue_pong(&self, payload: Vec<u8>) {
        match self.pings.try_send(payload) {
            Ok(()) | Err(TrySendError::Closed(_)) => {}
            Err(TrySendError::Full(_)) => debug!("pong backlog full, ping dropped"),
        }
    }
}

impl<R: AsyncRead + Unpin> WsReader<R> {
    /// Receive the next data frame or Close.
    ///
    /// Fragments are returned one at a time. Pings are queued for the write
    /// half to answer and Pongs are discarded; neither is returned. After a
    /// Close has been returned, or after any error, every further call fails
    /// with `Error::ConnectionClosed`.
    ///
    /// # Errors
    ///
    /// - `Error::ConnectionClosed` if the stream ended or was already closed
    /// - `Error::Io` on a read failure
    /// - `Error::ProtocolViolation` for a continuation with nothing to
    ///   continue, or a new data frame inside a fragmented message
    /// - any frame validation error
    pub async fn receive(&mut self) -> Result<Message> {
        if !self.state.can_receive() {
            return Err(Error::ConnectionClosed(None));
        }

        loop {
            let decoded = match self.frames.read_frame().await {
                Ok(frame) => self.decode(frame),
                Err(e) => Err(e),
            };

            match decoded {
                Ok(Some(message)) => {
                    if message.is_close() {
                        self.state = ConnectionState::Closed;
                    }
                    return Ok(message);
                }
                Ok(None) => {}
                Err(e) => {
                    self.state = ConnectionState::Closed;
                    return Err(e);
                }
            }
        }
    }

    // `None` for control frames handled here.
    fn decode(&mut self, frame: Frame) -> Result<Option<Message>> {
        let kind = match frame.opcode {
            OpCode::Ping => {
                self.queue_pong(frame.into_payload());
                return Ok(None);
            }
            OpCode::Pong => return Ok(None),
            OpCode::Close => {
                return Ok(Some(Message::Close(CloseFrame::from_payload(
                    frame.payload(),
                ))));
            }
            OpCode::Text | OpCode::Binary => {
                if self.fragment.is_some() {
                    return Err(Error::ProtocolViolation(
                        "New data frame inside a fragmented message".into(),
                    ));
                }
                let kind = if frame.opcode == OpCode::Text {
                    DataKind::Text
                } else {
                    DataKind::Binary
                };
                if !frame.fin {
                    self.fragment = Some(kind);
                }
                kind
            }
            OpCode::Continuation => {
                let kind = self.fragment.ok_or_else(|| {
                    Error::ProtocolViolation("Continuation frame without a message to continue".into())
                })?;
                if frame.fin {
                    self.fragment = None;
                }
                kind
            }
        };

        let is_final = frame.fin;
        Ok(Some(Message::Data(DataFrame {
            kind,
            payload: frame.into_payload(),
            is_final,
        })))
    }
}

/// Send side of a [`WebSocket`]. The only path that writes to the stream.
pub struct WsWriter<W> {
    frames: FrameWriter<W>,
    state: ConnectionState,
    pings: mpsc::Receiver<Vec<u8>>,
}

impl<W> WsWriter<W> {
    fn new(io: W, config: &Config, pings: mpsc::Receiver<Vec<u8>>) -> Self {
        Self {
            frames: FrameWriter::new(io, config),
            state: ConnectionState::Open,
            pings,
        }
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }
}

impl<W: AsyncWrite + Unpin> WsWriter<W> {
    /// Send one message and flush.
    ///
    /// Sending a `Message::Close` moves the writer to `Closing`.
    ///
    /// # Errors
    ///
    /// - `Error::ConnectionClosed` if a Close was already sent or the stream failed
    /// - `Error::Io` if the write fails; the writer is closed afterwards
    pub async fn send(&mut self, message: Message) -> Result<()> {
        if !self.state.can_send() {
            return Err(Error::ConnectionClosed(None));
        }

        let closing = message.is_close();
        self.write(&Frame::from(message)).await?;
        if closing {
            self.state = ConnectionState::Closing;
        }
        Ok(())
    }

    /// Wait until `deadline`, answering each Ping the reader queued with a
    /// Pong carrying the same payload.
    ///
    /// The deadline is fixed; Pongs sent in between do not push it back.
    ///
    /// # Errors
    ///
    /// `Error::Io` if a Pong cannot be written; the writer is closed afterwards.
    pub async fn idle_until(&mut self, deadline: Instant) -> Result<()> {
        let sleep = tokio::time::sleep_until(deadline);
        tokio::pin!(sleep);

        loop {
            let payload = tokio::select! {
                () = &mut sleep => return Ok(()),
                Some(payload) = self.pings.recv() => payload,
            };
            if self.state.can_send() {
                self.write(&Frame::pong(payload)).await?;
            }
        }
    }

    /// Send a Close frame with `code` and `reason`.
    ///
    /// Does nothing if the writer is no longer open, so at most one Close is
    /// ever written. The stream itself is left to the owner to drop.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidCloseCode` for a code an endpoint may not send
    /// - `Error::ControlFrameTooLarge` if `reason` exceeds 123 bytes
    /// - `Error::Io` if the write fails
    pub async fn close(&mut self, code: CloseCode, reason: &str) -> Result<()> {
        if self.state != ConnectionState::Open {
            return Ok(());
        }

        if !code.is_valid() {
            return Err(Error::InvalidCloseCode(code.as_u16()));
        }
        if reason.len() > MAX_CLOSE_REASON {
            return Err(Error::ControlFrameTooLarge(reason.len() + 2));
        }

        self.state = ConnectionState::Closing;
        self.write(&Frame::close(Some(code.as_u16()), reason)).await
    }

    /// Shut down the write direction.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.frames.shutdown().await
    }

    async fn write(&mut self, frame: &Frame) -> Result<()> {
        let result = match self.frames.write_frame(frame).await {
            Ok(()) => self.frames.flush().await,
            Err(e) => Err(e),
        };
        if result.is_err() {
            self.state = ConnectionState::Closed;
        }
        result
    }
}
