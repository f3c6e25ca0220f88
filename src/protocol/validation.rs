//! Inbound frame validation for the server end of a connection.
//!
//! Runs on the header alone, so oversized or malformed frames are rejected
//! before their payload is buffered.

use crate::config::Limits;
use crate::error::{Error, Result};
use crate::protocol::frame::{FrameHeader, MAX_CONTROL_FRAME_PAYLOAD};

/// Validator for frames arriving from a client.
#[derive(Debug, Clone)]
pub struct FrameValidator {
    limits: Limits,
    accept_unmasked_frames: bool,
}

impl FrameValidator {
    /// Create a validator enforcing `limits`.
    #[must_use]
    pub fn new(limits: Limits) -> Self {
        Self {
            limits,
            accept_unmasked_frames: false,
        }
    }

    /// Accept unmasked client frames (non-RFC compliant, for testing).
    #[must_use]
    pub fn with_accept_unmasked(mut self, accept: bool) -> Self {
        self.accept_unmasked_frames = accept;
        self
    }

    /// Validate a client frame header.
    ///
    /// # Errors
    ///
    /// - `Error::UnmaskedClientFrame` if the frame is not masked
    /// - `Error::ReservedBitsSet` if any RSV bit is set
    /// - `Error::FragmentedControlFrame` for a control frame with FIN=0
    /// - `Error::ControlFrameTooLarge` for a control payload over 125 bytes
    /// - `Error::FrameTooLarge` if the payload exceeds `limits.max_frame_size`
    pub fn validate(&self, header: &FrameHeader) -> Result<()> {
        // RFC 6455 Section 5.1
        if !header.is_masked() && !self.accept_unmasked_frames {
            return Err(Error::UnmaskedClientFrame);
        }

        // No extensions are ever negotiated.
        if header.rsv1 || header.rsv2 || header.rsv3 {
            return Err(Error::ReservedBitsSet);
        }

        if header.opcode.is_control() {
            if !header.fin {
                return Err(Error::FragmentedControlFrame);
            }
            if header.payload_len > MAX_CONTROL_FRAME_PAYLOAD {
                return Err(Error::ControlFrameTooLarge(header.payload_len));
            }
        }

        self.limits.check_frame_size(header.payload_len)
    }
}
