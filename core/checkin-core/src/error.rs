//! Error types for checkin-core operations.
//! Keep CheckinFfiError small and stable to avoid breaking foreign hosts.

use std::path::PathBuf;

use checkin_protocol::{ErrorInfo, INVALID_ARGUMENT, NOT_IMPLEMENTED};

// ═══════════════════════════════════════════════════════════════════════════════
// FFI-Compatible Error (for Kotlin/Swift hosts)
// ═══════════════════════════════════════════════════════════════════════════════

/// FFI-safe error type for use across language boundaries.
///
/// Foreign implementations of the host traits return this as well, so the
/// variants stay coarse: the caller only needs to know whether the request
/// itself was wrong.
#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum CheckinFfiError {
    #[error("{message}")]
    InvalidArgument { message: String },

    #[error("method not implemented: {method}")]
    NotImplemented { method: String },

    #[error("{message}")]
    General { message: String },
}

impl CheckinFfiError {
    /// Boundary error code, matching what the method-channel bridge reports.
    pub fn code(&self) -> &'static str {
        match self {
            CheckinFfiError::InvalidArgument { .. } => INVALID_ARGUMENT,
            CheckinFfiError::NotImplemented { .. } => NOT_IMPLEMENTED,
            CheckinFfiError::General { .. } => "ERROR",
        }
    }
}

impl From<String> for CheckinFfiError {
    fn from(message: String) -> Self {
        CheckinFfiError::General { message }
    }
}

impl From<&str> for CheckinFfiError {
    fn from(message: &str) -> Self {
        CheckinFfiError::General {
            message: message.to_string(),
        }
    }
}

impl From<uniffi::UnexpectedUniFFICallbackError> for CheckinFfiError {
    fn from(err: uniffi::UnexpectedUniFFICallbackError) -> Self {
        CheckinFfiError::General { message: err.reason }
    }
}

impl From<CheckinError> for CheckinFfiError {
    fn from(err: CheckinError) -> Self {
        match err {
            CheckinError::InvalidRequest { code, message } if code == INVALID_ARGUMENT => {
                CheckinFfiError::InvalidArgument { message }
            }
            CheckinError::UnknownMethod(method) => CheckinFfiError::NotImplemented { method },
            other => CheckinFfiError::General {
                message: other.to_string(),
            },
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Internal Error (for Rust-only use)
// ═══════════════════════════════════════════════════════════════════════════════

/// All errors that can occur in checkin-core operations.
///
/// Most failure modes in this crate degrade to a default instead of surfacing
/// here; what remains is request validation, host failures and relay sends.
#[derive(Debug, thiserror::Error)]
pub enum CheckinError {
    // ─────────────────────────────────────────────────────────────────────
    // Request Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("{code}: {message}")]
    InvalidRequest { code: String, message: String },

    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    #[error("Prompt for alarm {alarm_id} has already been resolved")]
    AlreadyResolved { alarm_id: i32 },

    // ─────────────────────────────────────────────────────────────────────
    // Host Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Host operation failed: {operation}: {details}")]
    Host { operation: String, details: String },

    #[error("Relay to UI runtime failed: {method}: {details}")]
    Relay { method: String, details: String },

    #[error("Codec error: {context}: {source}")]
    Codec {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl CheckinError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        CheckinError::InvalidRequest {
            code: INVALID_ARGUMENT.to_string(),
            message: message.into(),
        }
    }

    pub fn host(operation: &str, err: CheckinFfiError) -> Self {
        CheckinError::Host {
            operation: operation.to_string(),
            details: err.to_string(),
        }
    }
}

impl From<ErrorInfo> for CheckinError {
    fn from(info: ErrorInfo) -> Self {
        CheckinError::InvalidRequest {
            code: info.code,
            message: info.message,
        }
    }
}

/// Convenience type alias for Results using CheckinError.
pub type Result<T> = std::result::Result<T, CheckinError>;
