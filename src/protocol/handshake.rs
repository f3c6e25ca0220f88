//! Upgrade eligibility and the opening handshake (RFC 6455 Section 4.2).
//!
//! HTTP parsing is left to the server framework; this module only inspects
//! the method and headers it hands over and computes the accept key.

use axum::http::{HeaderMap, Method, header};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use sha1::{Digest, Sha1};

use crate::error::{Error, Result};

/// The WebSocket GUID used in the Sec-WebSocket-Accept calculation.
pub const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// The only protocol version this server speaks.
pub const WS_VERSION: &str = "13";

/// Computes the Sec-WebSocket-Accept value: Base64(SHA-1(key + GUID)).
///
/// # Example
///
/// ```
/// use statusws::protocol::compute_accept_key;
///
/// let accept = compute_accept_key("dGhlIHNhbXBsZSBub25jZQ==");
/// assert_eq!(accept, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
/// ```
#[must_use]
pub fn compute_accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    BASE64.encode(hasher.finalize())
}

/// A request that passed the upgrade checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeRequest {
    /// The Sec-WebSocket-Key header value.
    pub key: String,
    /// The Origin header value, if any. Informational only.
    pub origin: Option<String>,
}

impl UpgradeRequest {
    /// Check whether `method` and `headers` form a WebSocket upgrade request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUpgrade`] if:
    /// - The method is not `GET`.
    /// - `Upgrade` is missing or is not `websocket`.
    /// - `Connection` is missing or has no `upgrade` token.
    /// - `Sec-WebSocket-Version` is missing, duplicated, or not 13.
    /// - `Sec-WebSocket-Key` is missing, duplicated, or does not decode to 16 bytes.
    pub fn from_parts(method: &Method, headers: &HeaderMap) -> Result<Self> {
        if method != Method::GET {
            return Err(Error::InvalidUpgrade(format!(
                "Expected GET method, got {method}"
            )));
        }

        let upgrade = single_header(headers, header::UPGRADE)?
            .ok_or_else(|| Error::InvalidUpgrade("Missing Upgrade header".into()))?;
        if !has_token(upgrade, "websocket") {
            return Err(Error::InvalidUpgrade(format!(
                "Invalid Upgrade header: {upgrade}"
            )));
        }

        let connection_upgrade = headers
            .get_all(header::CONNECTION)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .any(|v| has_token(v, "upgrade"));
        if !connection_upgrade {
            return Err(Error::InvalidUpgrade(
                "Connection header does not request an upgrade".into(),
            ));
        }

        let version = single_header(headers, header::SEC_WEBSOCKET_VERSION)?
            .ok_or_else(|| Error::InvalidUpgrade("Missing Sec-WebSocket-Version header".into()))?;
        if version.trim() != WS_VERSION {
            return Err(Error::InvalidUpgrade(format!(
                "Unsupported WebSocket version: {version} (expected {WS_VERSION})"
            )));
        }

        let key = single_header(headers, header::SEC_WEBSOCKET_KEY)?
            .ok_or_else(|| Error::InvalidUpgrade("Missing Sec-WebSocket-Key header".into()))?
            .trim()
            .to_string();
        validate_key(&key)?;

        let origin = headers
            .get(header::ORIGIN)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Ok(Self { key, origin })
    }

    /// The Sec-WebSocket-Accept value answering this request.
    #[must_use]
    pub fn accept_key(&self) -> String {
        compute_accept_key(&self.key)
    }
}

/// Read a header that must appear at most once.
fn single_header(headers: &HeaderMap, name: header::HeaderName) -> Result<Option<&str>> {
    let mut values = headers.get_all(&name).iter();
    let Some(first) = values.next() else {
        return Ok(None);
    };
    if values.next().is_some() {
        return Err(Error::InvalidUpgrade(format!("Duplicate header: {name}")));
    }
    first
        .to_str()
        .map(Some)
        .map_err(|_| Error::InvalidUpgrade(format!("Non-ASCII value in header: {name}")))
}

/// Case-insensitive search in a comma-separated header value.
fn has_token(value: &str, token: &str) -> bool {
    value
        .split(',')
        .any(|part| part.trim().eq_ignore_ascii_case(token))
}

fn validate_key(key: &str) -> Result<()> {
    match BASE64.decode(key) {
        Ok(decoded) if decoded.len() == 16 => Ok(()),
        Ok(decoded) => Err(Error::InvalidUpgrade(format!(
            "Sec-WebSocket-Key must be 16 bytes, got {}",
            decoded.len()
        ))),
        Err(_) => Err(Error::InvalidUpgrade(
            "Invalid Sec-WebSocket-Key: not valid Base64".into(),
        )),
    }
}
