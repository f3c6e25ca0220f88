//! Messages exchanged over an upgraded connection and RFC 6455 close codes.

use crate::protocol::{Frame, OpCode};

/// WebSocket close status code per RFC 6455 Section 7.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum CloseCode {
    /// Normal closure (1000).
    #[default]
    Normal,
    /// Going away (1001), e.g. server shutdown.
    GoingAway,
    /// Protocol error (1002).
    ProtocolError,
    /// Unsupported data (1003).
    UnsupportedData,
    /// Invalid payload (1007), e.g. a close reason that is not UTF-8.
    InvalidPayload,
    /// Policy violation (1008).
    PolicyViolation,
    /// Message too big (1009).
    MessageTooBig,
    /// Mandatory extension (1010).
    MandatoryExtension,
    /// Internal error (1011).
    InternalError,
    /// Any other code, registered (1012-1014) or application defined (3000-4999).
    Other(u16),
}

impl CloseCode {
    /// Create a `CloseCode` from its numeric value.
    #[must_use]
    pub const fn from_u16(code: u16) -> Self {
        match code {
            1000 => CloseCode::Normal,
            1001 => CloseCode::GoingAway,
            1002 => CloseCode::ProtocolError,
            1003 => CloseCode::UnsupportedData,
            1007 => CloseCode::InvalidPayload,
            1008 => CloseCode::PolicyViolation,
            1009 => CloseCode::MessageTooBig,
            1010 => CloseCode::MandatoryExtension,
            1011 => CloseCode::InternalError,
            other => CloseCode::Other(other),
        }
    }

    /// Numeric value of this close code.
    #[must_use]
    pub const fn as_u16(&self) -> u16 {
        match self {
            CloseCode::Normal => 1000,
            CloseCode::GoingAway => 1001,
            CloseCode::ProtocolError => 1002,
            CloseCode::UnsupportedData => 1003,
            CloseCode::InvalidPayload => 1007,
            CloseCode::PolicyViolation => 1008,
            CloseCode::MessageTooBig => 1009,
            CloseCode::MandatoryExtension => 1010,
            CloseCode::InternalError => 1011,
            CloseCode::Other(code) => *code,
        }
    }

    /// Whether an endpoint may send this code (RFC 6455 Section 7.4.1).
    ///
    /// Valid: 1000-1003, 1007-1014, 3000-4999. Everything else, including
    /// the reserved 1004-1006 and 1015, must never go on the wire.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self.as_u16(), 1000..=1003 | 1007..=1014 | 3000..=4999)
    }
}

impl std::fmt::Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}

/// Status code and reason carried by a Close frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseFrame {
    /// The close status code.
    pub code: CloseCode,
    /// Human-readable reason (UTF-8, at most 123 bytes on the wire).
    pub reason: String,
}

impl CloseFrame {
    /// Create a new close frame with the given code and reason.
    #[must_use]
    pub fn new(code: CloseCode, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// Decode the body of a received Close frame.
    ///
    /// An empty body yields `None`. Malformed bodies are mapped to a
    /// descriptive close frame instead of an error, since the peer is
    /// leaving either way.
    #[must_use]
    pub fn from_payload(payload: &[u8]) -> Option<Self> {
        match payload {
            [] => None,
            [_] => Some(Self::new(CloseCode::ProtocolError, "Invalid close frame")),
            [hi, lo, reason @ ..] => {
                let code = CloseCode::from_u16(u16::from_be_bytes([*hi, *lo]));
                Some(match std::str::from_utf8(reason) {
                    Ok(reason) => Self::new(code, reason),
                    Err(_) => Self::new(CloseCode::InvalidPayload, ""),
                })
            }
        }
    }
}

/// Kind of a data message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    /// UTF-8 text.
    Text,
    /// Arbitrary bytes.
    Binary,
}

impl DataKind {
    fn opcode(self) -> OpCode {
        match self {
            DataKind::Text => OpCode::Text,
            DataKind::Binary => OpCode::Binary,
        }
    }
}

/// One data frame as received or sent.
///
/// Fragments are surfaced one by one; a continuation carries the kind of the
/// message it continues and `is_final` marks the last fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFrame {
    /// Text or binary.
    pub kind: DataKind,
    /// Frame payload, unmasked.
    pub payload: Vec<u8>,
    /// FIN bit.
    pub is_final: bool,
}

/// A unit of traffic on an upgraded connection.
///
/// Pings and Pongs never show up here: the channel answers Pings itself and
/// drops Pongs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Text or binary data.
    Data(DataFrame),
    /// A close frame, with status code and reason when the peer sent one.
    Close(Option<CloseFrame>),
}

impl Message {
    /// Create a final text message.
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Message::Data(DataFrame {
            kind: DataKind::Text,
            payload: s.into().into_bytes(),
            is_final: true,
        })
    }

    /// Create a close message with status code and reason.
    #[must_use]
    pub fn close(code: CloseCode, reason: impl Into<String>) -> Self {
        Message::Close(Some(CloseFrame::new(code, reason)))
    }

    /// Returns `true` for a close message.
    #[must_use]
    pub const fn is_close(&self) -> bool {
        matches!(self, Message::Close(_))
    }
}

impl From<Message> for Frame {
    fn from(message: Message) -> Self {
        match message {
            Message::Data(data) => Frame::new(data.is_final, data.kind.opcode(), data.payload),
            Message::Close(Some(close)) => Frame::close(Some(close.code.as_u16()), &close.reason),
            Message::Close(None) => Frame::close(None, ""),
        }
    }
}
