//! Configuration for the frame channel, the per-connection session and the
//! HTTP server.

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{Error, Result};

/// Reason sent with the server's final Normal Closure frame.
pub const DEFAULT_CLOSE_REASON: &str = "The WebSocket connection has been closed";

/// Resource limits for inbound frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum payload size of a single inbound frame in bytes.
    ///
    /// Default: 16 MB (16 * 1024 * 1024)
    pub max_frame_size: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_frame_size: 16 * 1024 * 1024,
        }
    }
}

impl Limits {
    /// Create limits with a custom frame size.
    #[must_use]
    pub const fn new(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    /// Validate that frame size is within limits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FrameTooLarge`] if `size` exceeds the configured maximum.
    pub const fn check_frame_size(&self, size: usize) -> Result<()> {
        if size > self.max_frame_size {
            Err(Error::FrameTooLarge {
                size,
                max: self.max_frame_size,
            })
        } else {
            Ok(())
        }
    }
}

/// Frame channel configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Resource limits.
    pub limits: Limits,

    /// Accept unmasked frames from clients.
    ///
    /// RFC 6455 requires clients to mask all frames. Setting this to `true`
    /// violates the RFC but may be useful for testing.
    ///
    /// Default: false
    pub accept_unmasked_frames: bool,

    /// Read buffer size (in bytes).
    ///
    /// Default: 8 KB (8192)
    pub read_buffer_size: usize,

    /// Write buffer size (in bytes).
    ///
    /// Default: 8 KB (8192)
    pub write_buffer_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            accept_unmasked_frames: false,
            read_buffer_size: 8192,
            write_buffer_size: 8192,
        }
    }
}

impl Config {
    /// Create a new configuration with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration for the server end of a connection.
    #[must_use]
    pub fn server() -> Self {
        Self::default()
    }

    /// Set custom limits.
    #[must_use]
    pub const fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Set read buffer size.
    #[must_use]
    pub const fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    /// Set write buffer size.
    #[must_use]
    pub const fn with_write_buffer_size(mut self, size: usize) -> Self {
        self.write_buffer_size = size;
        self
    }

    /// Accept unmasked client frames.
    #[must_use]
    pub const fn with_accept_unmasked(mut self, accept: bool) -> Self {
        self.accept_unmasked_frames = accept;
        self
    }
}

/// Per-connection session settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Pause between two status messages.
    ///
    /// Default: 1 second
    pub status_interval: Duration,

    /// Reason sent with the final Normal Closure frame.
    pub close_reason: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            status_interval: Duration::from_secs(1),
            close_reason: DEFAULT_CLOSE_REASON.to_string(),
        }
    }
}

impl SessionConfig {
    /// Set the pause between status messages.
    #[must_use]
    pub const fn with_status_interval(mut self, interval: Duration) -> Self {
        self.status_interval = interval;
        self
    }

    /// Set the reason sent with the final close frame.
    #[must_use]
    pub fn with_close_reason(mut self, reason: impl Into<String>) -> Self {
        self.close_reason = reason.into();
        self
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the listener binds to.
    ///
    /// Default: 127.0.0.1:5000
    pub bind: SocketAddr,

    /// Route that accepts WebSocket upgrades.
    ///
    /// Default: "/ws"
    pub path: String,

    /// Frame channel settings applied to every upgraded connection.
    pub websocket: Config,

    /// Session settings applied to every upgraded connection.
    pub session: SessionConfig,

    /// How long shutdown waits for running sessions before giving up.
    ///
    /// Default: 5 seconds
    pub shutdown_grace: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 5000)),
            path: "/ws".to_string(),
            websocket: Config::server(),
            session: SessionConfig::default(),
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

impl ServerConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bind address.
    #[must_use]
    pub const fn with_bind(mut self, bind: SocketAddr) -> Self {
        self.bind = bind;
        self
    }

    /// Set the upgrade route.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set the frame channel configuration.
    #[must_use]
    pub fn with_websocket(mut self, websocket: Config) -> Self {
        self.websocket = websocket;
        self
    }

    /// Set the session configuration.
    #[must_use]
    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    /// Set the shutdown grace period.
    #[must_use]
    pub const fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }
}
