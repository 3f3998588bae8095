//! Error types for tasktrack
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (validation, unknown task, bad arguments or config)
//! - 3: Store unreachable at startup
//! - 4: Operation failed (store failure, I/O)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the tasktrack CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const CONNECTION_FAILED: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for tasktrack operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // Startup failure (exit code 3)
    #[error("Store connection failed: {0}")]
    Connection(String),

    // Operation failures (exit code 4)
    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Validation(_)
            | Error::MissingField(_)
            | Error::NotFound(_)
            | Error::InvalidConfig(_)
            | Error::InvalidArgument(_) => exit_codes::USER_ERROR,

            Error::Connection(_) => exit_codes::CONNECTION_FAILED,

            Error::Store(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::LockFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Coarse classification used in JSON output and by the shell.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) | Error::MissingField(_) | Error::InvalidArgument(_) => {
                "validation"
            }
            Error::NotFound(_) => "not_found",
            Error::Store(_) => "store",
            Error::Connection(_) => "connection",
            Error::InvalidConfig(_) => "config",
            Error::Io(_) | Error::Json(_) | Error::LockFailed(_) => "internal",
        }
    }

    /// Whether an interactive session can report this error and keep going.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Validation(_)
                | Error::MissingField(_)
                | Error::NotFound(_)
                | Error::InvalidArgument(_)
                | Error::Store(_)
        )
    }
}

/// Result type alias for tasktrack operations
pub type Result<T> = std::result::Result<T, Error>;
