//! Invocation error taxonomy

use serde::{Deserialize, Serialize};
use std::any::Any;
use thiserror::Error;

/// Result of a single invocation: the captured output text or a typed failure
pub type InvocationResult = std::result::Result<String, InvocationError>;

/// Error kind tag exposed to callers alongside the human-readable message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Unconfigured target or executable not resolvable on PATH
    TargetNotFound,
    /// Process exceeded the effective timeout
    Timeout,
    /// Non-zero exit or process-launch fault
    ExecutionFailed,
    /// Cancelled through the engine before it finished
    Cancelled,
    /// Malformed session identifier
    SessionValidation,
    /// Target's session strategy cannot resume
    UnsupportedSession,
    /// Anything outside the taxonomy above (panics, internal faults)
    Unexpected,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::TargetNotFound => "TargetNotFound",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::ExecutionFailed => "ExecutionFailed",
            ErrorKind::Cancelled => "Cancelled",
            ErrorKind::SessionValidation => "SessionValidation",
            ErrorKind::UnsupportedSession => "UnsupportedSession",
            ErrorKind::Unexpected => "Unexpected",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Invocation failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvocationError {
    #[error("{0}")]
    TargetNotFound(String),

    #[error("CLI execution timed out after {secs}s ({target})")]
    Timeout { target: String, secs: u64 },

    #[error("{0}")]
    ExecutionFailed(String),

    #[error("{0}")]
    Cancelled(String),

    #[error("{0}")]
    SessionValidation(String),

    #[error("Session strategy '{strategy}' of {target} does not support resuming")]
    UnsupportedSession { target: String, strategy: String },

    #[error("{0}")]
    Unexpected(String),
}

impl InvocationError {
    /// Kind tag for this failure
    pub fn kind(&self) -> ErrorKind {
        match self {
            InvocationError::TargetNotFound(_) => ErrorKind::TargetNotFound,
            InvocationError::Timeout { .. } => ErrorKind::Timeout,
            InvocationError::ExecutionFailed(_) => ErrorKind::ExecutionFailed,
            InvocationError::Cancelled(_) => ErrorKind::Cancelled,
            InvocationError::SessionValidation(_) => ErrorKind::SessionValidation,
            InvocationError::UnsupportedSession { .. } => ErrorKind::UnsupportedSession,
            InvocationError::Unexpected(_) => ErrorKind::Unexpected,
        }
    }

    /// Build an `Unexpected` error from a caught panic payload
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        InvocationError::Unexpected(panic_message(payload.as_ref()))
    }
}

impl From<relay_foundation::Error> for InvocationError {
    fn from(err: relay_foundation::Error) -> Self {
        match err {
            relay_foundation::Error::TargetNotFound(name) => {
                InvocationError::TargetNotFound(format!("Unknown target: {}", name))
            }
            relay_foundation::Error::SessionValidation(msg) => {
                InvocationError::SessionValidation(msg)
            }
            other => InvocationError::Unexpected(other.to_string()),
        }
    }
}

/// Extract a readable message from a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}
