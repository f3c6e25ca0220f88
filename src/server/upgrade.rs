//! The upgrade endpoint: answer the handshake, then hand the stream to a session.

use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use hyper_util::rt::TokioIo;
use tracing::{debug, warn};

use crate::connection::WebSocket;
use crate::protocol::UpgradeRequest;
use crate::server::AppState;

/// Handle `GET {path}`.
///
/// Anything that is not a WebSocket upgrade gets an empty 400. An upgrade is
/// answered with 101 right away; hyper only releases the raw stream after
/// that response is written, so the session runs in a task tracked by the
/// server and the handler does not wait for it.
pub async fn ws_handler(State(state): State<AppState>, mut req: Request) -> Response {
    let upgrade = match UpgradeRequest::from_parts(req.method(), req.headers()) {
        Ok(upgrade) => upgrade,
        Err(error) => {
            debug!(%error, uri = %req.uri(), "rejected non-upgrade request");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    debug!(origin = upgrade.origin.as_deref(), "accepting WebSocket upgrade");

    let on_upgrade = hyper::upgrade::on(&mut req);
    let session_state = state.clone();
    state.tracker.spawn(async move {
        let io = match on_upgrade.await {
            Ok(upgraded) => TokioIo::new(upgraded),
            Err(error) => {
                warn!(%error, "HTTP upgrade failed");
                return;
            }
        };

        session_state.stats.session_opened();
        let socket = WebSocket::from_upgraded(io, session_state.websocket.as_ref().clone());
        let report = session_state.coordinator.run(socket).await;
        session_state.stats.session_completed();

        debug!(connection_id = %report.id, close_sent = report.close_sent, "session released");
    });

    (
        StatusCode::SWITCHING_PROTOCOLS,
        [
            (header::UPGRADE, "websocket".to_string()),
            (header::CONNECTION, "Upgrade".to_string()),
            (header::SEC_WEBSOCKET_ACCEPT, upgrade.accept_key()),
        ],
    )
        .into_response()
}
