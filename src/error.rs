//! Error types for taskhub
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (validation failure, unknown task or user)
//! - 3: Blocked by policy (role or ownership check refused the operation)
//! - 4: Operation failed (storage, IO, lock contention)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the taskhub CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const POLICY_BLOCKED: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for taskhub operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid value: {0}")]
    Validation(String),

    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("Unknown user: {0}")]
    UnknownUser(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Policy blocks (exit code 3)
    #[error("Permission denied: {0}")]
    Permission(String),

    // Operation failures (exit code 4)
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            // User errors
            Error::Validation(_)
            | Error::NotFound(_)
            | Error::UnknownUser(_)
            | Error::InvalidConfig(_) => exit_codes::USER_ERROR,

            // Policy blocks
            Error::Permission(_) => exit_codes::POLICY_BLOCKED,

            // Operation failures
            Error::Storage(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::LockFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }
}

/// Result type alias for taskhub operations
pub type Result<T> = std::result::Result<T, Error>;
