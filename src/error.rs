//! Error types for the Flight SQL adapter.
//!
//! Defines the error enum returned by every adapter operation.

use thiserror::Error;

/// Coarse classification of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// The endpoint could not be reached (refused, DNS failure, reset).
    Connect,
    /// The endpoint answered with a non-2xx status.
    Status,
    /// The response body was not valid JSON or had an unexpected shape.
    Decode,
    /// Any other request-level failure.
    Request,
}

/// Main error type for adapter operations.
#[derive(Error, Debug)]
pub enum AdapterError {
    /// Invalid or missing options, detected before any network I/O.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// HTTP-level failures: connection errors, non-2xx responses, malformed bodies.
    #[error("Transport error: {message}")]
    Transport {
        status: Option<u16>,
        kind: TransportKind,
        message: String,
    },

    /// The request exceeded the configured timeout.
    #[error("Timeout error: request exceeded {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Mock generator produced inconsistent data. Indicates a bug.
    #[error("Mock error: {0}")]
    Mock(String),
}

impl AdapterError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates a transport error with no HTTP status.
    pub fn transport(kind: TransportKind, msg: impl Into<String>) -> Self {
        Self::Transport {
            status: None,
            kind,
            message: msg.into(),
        }
    }

    /// Creates a transport error for a non-2xx HTTP response.
    pub fn http_status(status: u16, msg: impl Into<String>) -> Self {
        Self::Transport {
            status: Some(status),
            kind: TransportKind::Status,
            message: msg.into(),
        }
    }

    /// Creates a timeout error.
    pub fn timeout(timeout_ms: u64) -> Self {
        Self::Timeout { timeout_ms }
    }

    /// Creates a mock generator error with the given message.
    pub fn mock(msg: impl Into<String>) -> Self {
        Self::Mock(msg.into())
    }

    /// Returns the HTTP status attached to this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            _ => None,
        }
    }

    /// Returns true for timeouts, which count as a transport failure subtype.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns true for any network-side failure, timeouts included.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Timeout { .. })
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "Configuration Error",
            Self::Transport { .. } => "Transport Error",
            Self::Timeout { .. } => "Timeout Error",
            Self::Mock(_) => "Mock Error",
        }
    }
}

/// Result type alias using AdapterError.
pub type Result<T> = std::result::Result<T, AdapterError>;

/// Renders an error together with its `source()` chain, separated by `: `.
///
/// HTTP client errors keep the OS-level cause (e.g. "Connection refused")
/// in the chain rather than in their own `Display` output.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !out.contains(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
        source = cause.source();
    }
    out
}
