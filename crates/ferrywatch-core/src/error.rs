// ── Core error types ──
//
// Everything the watch client can report. Stream-level failures never
// reach callers as errors (they drive the reconnect loop instead); the
// variants here are for decode drops, cache rejections, lifecycle misuse,
// and the one-shot probe. The `From<ferrywatch_api::Error>` impl
// translates transport-layer errors into domain-appropriate variants.

use thiserror::Error;

use crate::model::ResourceKind;

/// Why a frame was dropped instead of dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("malformed message: {reason}")]
    MalformedMessage { reason: String },

    #[error("unknown action '{tag}'")]
    UnknownAction { tag: String },

    #[error("unknown resource kind '{tag}'")]
    UnknownKind { tag: String },
}

impl DecodeError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedMessage {
            reason: reason.into(),
        }
    }
}

/// The cache collaborator refused an invalidation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidateError {
    #[error("cache rejected key {key}: {reason}")]
    Rejected { key: String, reason: String },

    #[error("cache is no longer accepting invalidations")]
    Closed,
}

/// Lifecycle misuse by the session owner. Reported synchronously.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("watch session is already running")]
    AlreadyStarted,

    #[error("watch session was stopped; open a new session to watch again")]
    StartAfterStop,

    #[error("watch session must be started from within a tokio runtime")]
    NoRuntime,

    #[error("endpoint {url} is not a WebSocket or HTTP URL")]
    InvalidEndpoint { url: String },
}

/// Invalid relation table declaration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelationError {
    #[error("relations cannot be declared for the wildcard kind")]
    WildcardSource,

    #[error("template for {source_kind} targets the wildcard kind")]
    WildcardTarget { source_kind: ResourceKind },

    #[error("template for {source_kind} has an empty field path")]
    EmptyField { source_kind: ResourceKind },
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to event stream at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Event stream closed by server (code {code}): {reason}")]
    StreamClosed { code: u16, reason: String },

    #[error("Event stream connection timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Data errors ──────────────────────────────────────────────────
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Invalidate(#[from] InvalidateError),

    // ── Lifecycle errors ─────────────────────────────────────────────
    #[error(transparent)]
    Session(#[from] SessionError),

    // ── Configuration errors ─────────────────────────────────────────
    #[error(transparent)]
    Relation(#[from] RelationError),

    #[error("Configuration error: {message}")]
    Config { message: String },
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<ferrywatch_api::Error> for CoreError {
    fn from(err: ferrywatch_api::Error) -> Self {
        match err {
            ferrywatch_api::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason,
            },
            ferrywatch_api::Error::WebSocketClosed { code, reason } => {
                CoreError::StreamClosed { code, reason }
            }
            ferrywatch_api::Error::Transport(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("stream read failed: {reason}"),
            },
            ferrywatch_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
        }
    }
}
