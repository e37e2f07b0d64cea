use thiserror::Error;

/// Top-level error type for the `ferrywatch-api` crate.
///
/// Covers every way the event stream transport can fail. `ferrywatch-core`
/// never surfaces these to callers directly: they feed the reconnect loop.
#[derive(Debug, Error)]
pub enum Error {
    // ── Connection ──────────────────────────────────────────────────
    /// The upgrade handshake could not be completed (refused, DNS, TLS, HTTP status).
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// The server closed the stream with a close frame.
    #[error("WebSocket closed (code {code}): {reason}")]
    WebSocketClosed { code: u16, reason: String },

    /// Reading a frame from an established connection failed.
    #[error("WebSocket transport error: {0}")]
    Transport(String),

    // ── Request building ────────────────────────────────────────────
    /// Endpoint URL could not be parsed or converted into a request URI.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

impl Error {
    /// Whether the connection was never established (as opposed to dropped later).
    pub fn is_connect(&self) -> bool {
        matches!(self, Self::WebSocketConnect(_) | Self::InvalidUrl(_))
    }
}
