//! A server on an ephemeral port with a short status interval.

use std::net::SocketAddr;
use std::time::Duration;

use statusws::{Server, ServerConfig, ServerHandle, SessionConfig, StatsSnapshot};

pub struct TestServer {
    handle: ServerHandle,
}

impl TestServer {
    pub async fn spawn() -> (Self, SocketAddr) {
        Self::spawn_with_interval(Duration::from_millis(50)).await
    }

    pub async fn spawn_with_interval(interval: Duration) -> (Self, SocketAddr) {
        let config = ServerConfig::default()
            .with_bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .with_session(SessionConfig::default().with_status_interval(interval))
            .with_shutdown_grace(Duration::from_secs(2));
        let handle = Server::bind(config).await.expect("bind test server");
        let addr = handle.local_addr();
        (Self { handle }, addr)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.handle.stats()
    }

    /// Poll the counters until `done` holds, for at most two seconds.
    pub async fn wait_for_stats(&self, done: impl Fn(&StatsSnapshot) -> bool) -> StatsSnapshot {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            let stats = self.stats();
            if done(&stats) || tokio::time::Instant::now() >= deadline {
                return stats;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    pub fn begin_shutdown(&self) {
        self.handle.shutdown();
    }

    pub async fn shutdown(self) {
        self.handle.shutdown();
        self.handle.join().await.expect("server stopped cleanly");
    }
}
