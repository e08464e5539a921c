//! # Security Error Types
//!
//! Detection itself never fails: insufficient data is "no signal" and
//! internal faults become `SYSTEM_ERROR` evidence. Errors only surface at
//! configuration time and at the service boundary.

use thiserror::Error;

/// Errors raised by the detection core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SecurityError {
    /// Configuration rejected by validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The service has been shut down and accepts no more work.
    #[error("detection service is shut down")]
    ServiceShutdown,

    /// A worker mailbox is gone (worker thread exited).
    #[error("worker {0} unavailable")]
    WorkerUnavailable(usize),

    /// A worker dropped a job without answering.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for security operations.
pub type SecurityResult<T> = Result<T, SecurityError>;
