//! Per-direction connection state (RFC 6455 Section 7).

/// State of one direction of an upgraded connection.
///
/// Both halves start `Open`. The write half moves to `Closing` once it has
/// sent a Close frame; either half moves to `Closed` when the peer's Close
/// arrives or the stream fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum ConnectionState {
    /// Ready for data transfer.
    #[default]
    Open,
    /// Close frame sent, nothing else may be written.
    Closing,
    /// Done. No further frames in this direction.
    Closed,
}

impl ConnectionState {
    /// Only an `Open` connection may send.
    #[must_use]
    #[inline]
    pub const fn can_send(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }

    /// Frames are still read while our own Close is in flight.
    #[must_use]
    #[inline]
    pub const fn can_receive(&self) -> bool {
        matches!(self, ConnectionState::Open | ConnectionState::Closing)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Open => write!(f, "Open"),
            ConnectionState::Closing => write!(f, "Closing"),
            ConnectionState::Closed => write!(f, "Closed"),
        }
    }
}
