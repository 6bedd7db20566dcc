//! The single symbolic error-kind tag shared by every wire protocol the
//! bridge speaks, plus the crate-local error type that carries it.

use serde::{Deserialize, Serialize};

/// Result alias for fallible bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Symbolic error classification carried on every envelope.
///
/// This is the *only* vocabulary error kinds are allowed to use on the wire;
/// crate-local errors convert into one of these via [`BridgeError::kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ErrorKind {
    /// Config parse/validate failure at startup.
    ConfigInvalid,
    /// Bridge client not in the `Ready` state.
    NotConnected,
    /// Transport broken mid-call.
    ConnectionLost,
    /// Script exceeded `timeout_ms`.
    Timeout,
    /// Dispatcher queue full.
    Overloaded,
    /// Tool requires UI; UI not up.
    UIUnavailable,
    /// Script raised an exception.
    ScriptError,
    /// Malformed request/response frame.
    ProtocolError,
    /// Unexpected bridge bug.
    Internal,
}

impl ErrorKind {
    /// The tag as it appears on the wire (`error.type` / `error_kind`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ConfigInvalid => "ConfigInvalid",
            Self::NotConnected => "NotConnected",
            Self::ConnectionLost => "ConnectionLost",
            Self::Timeout => "Timeout",
            Self::Overloaded => "Overloaded",
            Self::UIUnavailable => "UIUnavailable",
            Self::ScriptError => "ScriptError",
            Self::ProtocolError => "ProtocolError",
            Self::Internal => "Internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Crate-local error type. Every bridge crate either uses this directly or
/// provides a `From` impl into it so the top-level envelope's `error_kind`
/// is always one of the nine [`ErrorKind`] tags, never a crate-specific
/// string.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("configuration invalid: {0}")]
    ConfigInvalid(String),

    #[error("bridge client not connected")]
    NotConnected,

    #[error("connection lost: {0}")]
    ConnectionLost(String),

    #[error("script timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("dispatcher queue full (capacity {capacity})")]
    Overloaded { capacity: usize },

    #[error("GUI not available — {feature}")]
    UiUnavailable { feature: String },

    #[error("script raised {exception_type}: {message}")]
    ScriptError {
        exception_type: String,
        message: String,
        traceback: Option<String>,
    },

    #[error("protocol error: {0}")]
    ProtocolError(String),

    #[error("internal bridge error: {0}")]
    Internal(String),
}

impl BridgeError {
    /// Map this error onto its wire-level [`ErrorKind`] tag.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConfigInvalid(_) => ErrorKind::ConfigInvalid,
            Self::NotConnected => ErrorKind::NotConnected,
            Self::ConnectionLost(_) => ErrorKind::ConnectionLost,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Overloaded { .. } => ErrorKind::Overloaded,
            Self::UiUnavailable { .. } => ErrorKind::UIUnavailable,
            Self::ScriptError { .. } => ErrorKind::ScriptError,
            Self::ProtocolError(_) => ErrorKind::ProtocolError,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// The traceback, if this error carries one.
    pub fn traceback(&self) -> Option<&str> {
        match self {
            Self::ScriptError { traceback, .. } => traceback.as_deref(),
            _ => None,
        }
    }
}
