//! Frame parsing and serialization (RFC 6455 Section 5.2).
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |F|R|R|R| opcode|M| Payload len |    Extended payload length    |
//! |I|S|S|S|  (4)  |A|     (7)     |             (16/64)           |
//! |N|V|V|V|       |S|             |   (if payload len==126/127)   |
//! | |1|2|3|       |K|             |                               |
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |                  Masking key (if MASK is set)                 |
//! +---------------------------------------------------------------+
//! |                          Payload data                         |
//! +---------------------------------------------------------------+
//! ```

use bytes::{BufMut, BytesMut};

use crate::error::{Error, Result};
use crate::protocol::OpCode;
use crate::protocol::mask::apply_mask;

/// Maximum payload size for control frames.
pub const MAX_CONTROL_FRAME_PAYLOAD: usize = 125;

/// Decoded frame header, available before the payload has fully arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    /// Final fragment flag.
    pub fin: bool,
    /// Reserved bit 1.
    pub rsv1: bool,
    /// Reserved bit 2.
    pub rsv2: bool,
    /// Reserved bit 3.
    pub rsv3: bool,
    /// Frame opcode.
    pub opcode: OpCode,
    /// Masking key, present on every client-to-server frame.
    pub mask: Option<[u8; 4]>,
    /// Declared payload length.
    pub payload_len: usize,
    /// Header length including the extended length and masking key.
    pub header_len: usize,
}

impl FrameHeader {
    /// Decode a header from the start of `buf`.
    ///
    /// # Errors
    ///
    /// - `Error::IncompleteFrame` if `buf` ends inside the header
    /// - `Error::ReservedOpcode` / `Error::InvalidOpcode` for unknown opcodes
    /// - `Error::PayloadTooLargeForPlatform` if the 64-bit length overflows `usize`
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < 2 {
            return Err(Error::IncompleteFrame {
                needed: 2 - buf.len(),
            });
        }

        let (byte0, byte1) = (buf[0], buf[1]);
        let opcode = OpCode::from_u8(byte0 & 0x0F)?;
        let masked = byte1 & 0x80 != 0;

        let (payload_len, mut header_len) = match byte1 & 0x7F {
            126 => {
                require(buf, 4)?;
                (u16::from_be_bytes([buf[2], buf[3]]) as usize, 4)
            }
            127 => {
                require(buf, 10)?;
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&buf[2..10]);
                let len = u64::from_be_bytes(raw);
                let len = usize::try_from(len).map_err(|_| Error::PayloadTooLargeForPlatform {
                    size: len,
                    max: usize::MAX as u64,
                })?;
                (len, 10)
            }
            short => (short as usize, 2),
        };

        let mask = if masked {
            require(buf, header_len + 4)?;
            let key = [
                buf[header_len],
                buf[header_len + 1],
                buf[header_len + 2],
                buf[header_len + 3],
            ];
            header_len += 4;
            Some(key)
        } else {
            None
        };

        Ok(Self {
            fin: byte0 & 0x80 != 0,
            rsv1: byte0 & 0x40 != 0,
            rsv2: byte0 & 0x20 != 0,
            rsv3: byte0 & 0x10 != 0,
            opcode,
            mask,
            payload_len,
            header_len,
        })
    }

    /// Whether the MASK bit was set.
    #[inline]
    #[must_use]
    pub const fn is_masked(&self) -> bool {
        self.mask.is_some()
    }

    /// Total length of the frame on the wire.
    ///
    /// # Errors
    ///
    /// Returns `Error::PayloadTooLargeForPlatform` if the sum overflows.
    pub fn frame_len(&self) -> Result<usize> {
        self.header_len
            .checked_add(self.payload_len)
            .ok_or(Error::PayloadTooLargeForPlatform {
                size: self.payload_len as u64,
                max: usize::MAX as u64,
            })
    }
}

fn require(buf: &[u8], len: usize) -> Result<()> {
    if buf.len() < len {
        Err(Error::IncompleteFrame {
            needed: len - buf.len(),
        })
    } else {
        Ok(())
    }
}

/// A single frame, with its payload already unmasked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Final fragment flag. True if this is the last fragment of a message.
    pub fin: bool,
    /// Reserved bit 1. Must be 0 unless an extension is negotiated.
    pub rsv1: bool,
    /// Reserved bit 2. Must be 0 unless an extension is negotiated.
    pub rsv2: bool,
    /// Reserved bit 3. Must be 0 unless an extension is negotiated.
    pub rsv3: bool,
    /// Frame opcode.
    pub opcode: OpCode,
    payload: Vec<u8>,
}

impl Frame {
    /// Create a frame with clear reserved bits.
    #[must_use]
    pub fn new(fin: bool, opcode: OpCode, payload: Vec<u8>) -> Self {
        Self {
            fin,
            rsv1: false,
            rsv2: false,
            rsv3: false,
            opcode,
            payload,
        }
    }

    /// Create a final text frame.
    #[must_use]
    pub fn text(data: impl Into<Vec<u8>>) -> Self {
        Self::new(true, OpCode::Text, data.into())
    }

    /// Create a final binary frame.
    #[must_use]
    pub fn binary(data: impl Into<Vec<u8>>) -> Self {
        Self::new(true, OpCode::Binary, data.into())
    }

    /// Create a close frame. `None` sends an empty body.
    #[must_use]
    pub fn close(code: Option<u16>, reason: &str) -> Self {
        let payload = match code {
            Some(code) => {
                let mut data = Vec::with_capacity(2 + reason.len());
                data.extend_from_slice(&code.to_be_bytes());
                data.extend_from_slice(reason.as_bytes());
                data
            }
            None => Vec::new(),
        };
        Self::new(true, OpCode::Close, payload)
    }

    /// Create a ping frame.
    #[must_use]
    pub fn ping(data: impl Into<Vec<u8>>) -> Self {
        Self::new(true, OpCode::Ping, data.into())
    }

    /// Create a pong frame.
    #[must_use]
    pub fn pong(data: impl Into<Vec<u8>>) -> Self {
        Self::new(true, OpCode::Pong, data.into())
    }

    /// Get the payload bytes.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Take ownership of the payload.
    #[must_use]
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Build a frame from a parsed header and the complete wire bytes
    /// (`buf.len() >= header.frame_len()`), unmasking the payload.
    #[must_use]
    pub fn from_header(header: &FrameHeader, buf: &[u8]) -> Self {
        let start = header.header_len;
        let mut payload = buf[start..start + header.payload_len].to_vec();
        if let Some(mask) = header.mask {
            apply_mask(&mut payload, mask);
        }

        Self {
            fin: header.fin,
            rsv1: header.rsv1,
            rsv2: header.rsv2,
            rsv3: header.rsv3,
            opcode: header.opcode,
            payload,
        }
    }

    /// Parse one frame from the start of `buf`.
    ///
    /// Returns the frame and the number of bytes consumed.
    ///
    /// # Errors
    ///
    /// - `Error::IncompleteFrame` if not enough data is available
    /// - any header error from [`FrameHeader::parse`]
    pub fn parse(buf: &[u8]) -> Result<(Self, usize)> {
        let header = FrameHeader::parse(buf)?;
        let total = header.frame_len()?;
        require(buf, total)?;
        Ok((Self::from_header(&header, buf), total))
    }

    /// Append the wire encoding of this frame to `dst`.
    ///
    /// Servers pass `None`; a `Some` key masks the payload as a client would.
    /// Returns the number of bytes appended.
    pub fn write(&self, dst: &mut BytesMut, mask: Option<[u8; 4]>) -> usize {
        let start = dst.len();
        dst.reserve(self.wire_size(mask.is_some()));

        let mut byte0 = self.opcode.as_u8();
        if self.fin {
            byte0 |= 0x80;
        }
        if self.rsv1 {
            byte0 |= 0x40;
        }
        if self.rsv2 {
            byte0 |= 0x20;
        }
        if self.rsv3 {
            byte0 |= 0x10;
        }
        dst.put_u8(byte0);

        let mask_bit = if mask.is_some() { 0x80 } else { 0x00 };
        let len = self.payload.len();
        if len <= 125 {
            dst.put_u8(mask_bit | len as u8);
        } else if len <= usize::from(u16::MAX) {
            dst.put_u8(mask_bit | 126);
            dst.put_u16(len as u16);
        } else {
            dst.put_u8(mask_bit | 127);
            dst.put_u64(len as u64);
        }

        match mask {
            Some(key) => {
                dst.put_slice(&key);
                let payload_start = dst.len();
                dst.put_slice(&self.payload);
                apply_mask(&mut dst[payload_start..], key);
            }
            None => dst.put_slice(&self.payload),
        }

        dst.len() - start
    }

    /// Size of the wire encoding.
    #[must_use]
    pub fn wire_size(&self, masked: bool) -> usize {
        let len = self.payload.len();
        let extended = if len <= 125 {
            0
        } else if len <= usize::from(u16::MAX) {
            2
        } else {
            8
        };
        let mask = if masked { 4 } else { 0 };
        2 + extended + mask + len
    }
}
