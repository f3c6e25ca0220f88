//! Error types for the status WebSocket server.
//!
//! Every failure the server can hit, from a rejected upgrade request to a
//! protocol violation on an open connection, is one variant of [`Error`].

use thiserror::Error;

/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while upgrading or serving a connection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The HTTP request is not an acceptable WebSocket upgrade request.
    #[error("Invalid upgrade request: {0}")]
    InvalidUpgrade(String),

    /// Invalid frame structure or header.
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    /// Protocol violation detected.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// Frame size exceeds configured maximum.
    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge {
        /// Actual frame size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Payload length does not fit in this platform's address space.
    #[error("Payload too large for platform: {size} bytes (max: {max})")]
    PayloadTooLargeForPlatform {
        /// Declared payload length.
        size: u64,
        /// Largest representable length.
        max: u64,
    },

    /// Connection has been closed, by the peer or by dropping the stream.
    #[error("Connection closed: {0:?}")]
    ConnectionClosed(Option<u16>),

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(String),

    /// Close code that must not be sent on the wire.
    #[error("Invalid close code: {0}")]
    InvalidCloseCode(u16),

    /// Reserved opcode used.
    #[error("Reserved opcode: {0:#x}")]
    ReservedOpcode(u8),

    /// Invalid opcode value.
    #[error("Invalid opcode: {0:#x}")]
    InvalidOpcode(u8),

    /// Control frame fragmented (RFC violation).
    #[error("Control frames cannot be fragmented")]
    FragmentedControlFrame,

    /// Control frame payload too large (>125 bytes).
    #[error("Control frame payload too large: {0} bytes (max: 125)")]
    ControlFrameTooLarge(usize),

    /// Unmasked client frame (security violation).
    #[error("Client frame must be masked")]
    UnmaskedClientFrame,

    /// Reserved bits set without extension.
    #[error("Reserved bits set without negotiated extension")]
    ReservedBitsSet,

    /// Incomplete frame data.
    #[error("Incomplete frame: need {needed} more bytes")]
    IncompleteFrame {
        /// Number of additional bytes needed.
        needed: usize,
    },
}

impl Error {
    /// Returns `true` if the error means the peer went away rather than
    /// misbehaved (EOF or a reset socket).
    #[must_use]
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Error::ConnectionClosed(_) | Error::Io(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}
