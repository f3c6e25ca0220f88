//! Frame opcodes (RFC 6455 Section 5.2).

use crate::error::{Error, Result};

/// The 4-bit opcode carried in the first header byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    /// Continues a fragmented Text or Binary message (0x0).
    Continuation = 0x0,
    /// UTF-8 text data (0x1).
    Text = 0x1,
    /// Arbitrary binary data (0x2).
    Binary = 0x2,
    /// Close handshake (0x8).
    Close = 0x8,
    /// Keepalive request (0x9).
    Ping = 0x9,
    /// Keepalive response or unsolicited heartbeat (0xA).
    Pong = 0xA,
}

impl OpCode {
    /// Decode the low nibble of a header byte.
    ///
    /// # Errors
    ///
    /// Returns `Error::ReservedOpcode` for 0x3-0x7 and 0xB-0xF, and
    /// `Error::InvalidOpcode` for anything wider than 4 bits.
    pub fn from_u8(byte: u8) -> Result<Self> {
        match byte {
            0x0 => Ok(OpCode::Continuation),
            0x1 => Ok(OpCode::Text),
            0x2 => Ok(OpCode::Binary),
            0x8 => Ok(OpCode::Close),
            0x9 => Ok(OpCode::Ping),
            0xA => Ok(OpCode::Pong),
            0x3..=0x7 | 0xB..=0xF => Err(Error::ReservedOpcode(byte)),
            _ => Err(Error::InvalidOpcode(byte)),
        }
    }

    /// Raw wire value.
    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Close, Ping and Pong are control opcodes.
    #[inline]
    #[must_use]
    pub const fn is_control(self) -> bool {
        matches!(self, OpCode::Close | OpCode::Ping | OpCode::Pong)
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}
