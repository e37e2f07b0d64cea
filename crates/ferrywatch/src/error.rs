//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use ferrywatch_config::ConfigError;
use ferrywatch_core::{CoreError, SessionError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to event stream at {url}")]
    #[diagnostic(
        code(ferrywatch::connection_failed),
        help(
            "Check that the controller is running and reachable.\n\
             URL: {url}\n\
             Try: ferrywatch check -v"
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Event stream closed by server (code {code}): {reason}")]
    #[diagnostic(code(ferrywatch::stream_closed))]
    StreamClosed { code: u16, reason: String },

    #[error("Gave up reconnecting to {url}")]
    #[diagnostic(
        code(ferrywatch::retries_exhausted),
        help("Raise --max-retries or drop it to retry forever.")
    )]
    RetriesExhausted { url: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(ferrywatch::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: ferrywatch config init --url <CONTROLLER>"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No controller configured")]
    #[diagnostic(
        code(ferrywatch::no_config),
        help(
            "Pass --controller <URL>, or create a config with:\n\
             ferrywatch config init --url <CONTROLLER>\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(ferrywatch::config))]
    Config(Box<ConfigError>),

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(ferrywatch::validation))]
    Validation { field: String, reason: String },

    // ── Session ──────────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(ferrywatch::session))]
    Session(#[from] SessionError),

    #[error("{message}")]
    #[diagnostic(code(ferrywatch::internal))]
    Internal { message: String },

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Connection timed out after {seconds}s")]
    #[diagnostic(
        code(ferrywatch::timeout),
        help("Increase timeout with --timeout or check controller responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(ferrywatch::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::StreamClosed { .. } | Self::RetriesExhausted { .. } => {
                exit_code::CONNECTION
            }
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::Json(_) => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::UnknownProfile { name } => CliError::ProfileNotFound {
                name,
                available: String::new(),
            },
            other => CliError::Config(Box::new(other)),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed {
                url,
                source: reason.into(),
            },

            CoreError::StreamClosed { code, reason } => CliError::StreamClosed { code, reason },

            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },

            CoreError::Decode(e) => CliError::Validation {
                field: "event".into(),
                reason: e.to_string(),
            },

            CoreError::Relation(e) => CliError::Validation {
                field: "relations".into(),
                reason: e.to_string(),
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Session(e) => CliError::Session(e),

            CoreError::Invalidate(e) => CliError::Internal {
                message: e.to_string(),
            },
        }
    }
}
