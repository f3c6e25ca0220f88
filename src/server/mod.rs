//! HTTP surface: routing, the upgrade endpoint and server lifecycle.

mod upgrade;

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

use crate::config::{Config, ServerConfig};
use crate::error::{Error, Result};
use crate::session::Coordinator;

pub use upgrade::ws_handler;

/// Session counters shared by every handler.
#[derive(Debug, Default)]
pub struct SessionStats {
    opened: AtomicUsize,
    active: AtomicUsize,
    completed: AtomicUsize,
}

/// Point-in-time copy of [`SessionStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub opened: usize,
    pub active: usize,
    pub completed: usize,
}

impl SessionStats {
    fn session_opened(&self) {
        self.opened.fetch_add(1, Ordering::Relaxed);
        self.active.fetch_add(1, Ordering::Relaxed);
    }

    fn session_completed(&self) {
        self.active.fetch_sub(1, Ordering::Relaxed);
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            opened: self.opened.load(Ordering::Relaxed),
            active: self.active.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
        }
    }
}

/// State handed to the upgrade handler.
#[derive(Debug, Clone)]
pub struct AppState {
    websocket: Arc<Config>,
    coordinator: Coordinator,
    shutdown: CancellationToken,
    tracker: TaskTracker,
    stats: Arc<SessionStats>,
}

impl AppState {
    #[must_use]
    pub fn new(config: &ServerConfig) -> Self {
        let shutdown = CancellationToken::new();
        Self {
            websocket: Arc::new(config.websocket.clone()),
            coordinator: Coordinator::new(config.session.clone()).with_shutdown(shutdown.clone()),
            shutdown,
            tracker: TaskTracker::new(),
            stats: Arc::new(SessionStats::default()),
        }
    }

    /// Cancelled when the server stops; every session signal descends from it.
    #[must_use]
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Tracks running session tasks.
    #[must_use]
    pub fn tracker(&self) -> &TaskTracker {
        &self.tracker
    }

    #[must_use]
    pub fn stats(&self) -> &Arc<SessionStats> {
        &self.stats
    }
}

/// Route `path` to the upgrade handler.
pub fn router(state: AppState, path: &str) -> Router {
    Router::new()
        .route(path, get(ws_handler))
        .with_state(state)
}

/// Serve `router` on `listener` until `shutdown` is cancelled.
///
/// Upgraded connections are detached from the HTTP server, so this returns
/// without waiting for sessions; see [`ServerHandle::join`].
pub async fn serve(listener: TcpListener, router: Router, shutdown: CancellationToken) -> Result<()> {
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled_owned().await })
        .await?;
    Ok(())
}

/// A running server.
pub struct Server;

impl Server {
    /// Bind `config.bind` and start serving in the background.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the address cannot be bound.
    pub async fn bind(config: ServerConfig) -> Result<ServerHandle> {
        let listener = TcpListener::bind(config.bind).await?;
        let local_addr = listener.local_addr()?;

        let state = AppState::new(&config);
        let app = router(state.clone(), &config.path);
        let task = tokio::spawn(serve(listener, app, state.shutdown.clone()));

        info!(%local_addr, path = %config.path, "listening for WebSocket upgrades");

        Ok(ServerHandle {
            local_addr,
            state,
            grace: config.shutdown_grace,
            task,
        })
    }
}

/// Handle to a server started with [`Server::bind`].
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    state: AppState,
    grace: Duration,
    task: JoinHandle<Result<()>>,
}

impl ServerHandle {
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.state.stats.snapshot()
    }

    /// Stop accepting connections and tell every session to stop producing.
    pub fn shutdown(&self) {
        self.state.shutdown.cancel();
        self.state.tracker.close();
    }

    /// Wait for the HTTP server to stop, then up to the grace period for
    /// running sessions.
    ///
    /// # Errors
    ///
    /// Returns the server's I/O error, if it failed.
    pub async fn join(self) -> Result<()> {
        let served = match self.task.await {
            Ok(result) => result,
            Err(join_error) => Err(Error::Io(join_error.to_string())),
        };

        self.state.tracker.close();
        if tokio::time::timeout(self.grace, self.state.tracker.wait())
            .await
            .is_err()
        {
            warn!(
                remaining = self.state.tracker.len(),
                "sessions still running after shutdown grace period"
            );
        }

        info!(stats = ?self.state.stats.snapshot(), "server stopped");
        served
    }
}
