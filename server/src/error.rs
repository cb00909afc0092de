//! Error types for the nexus-memd front end.

use nexus_memory::MemoryError;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Process exit code for this error.
    ///
    /// 2 for bad input, 3 for a missing memory, 1 for everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgument(_) => 2,
            CliError::Memory(MemoryError::Validation(_)) => 2,
            CliError::Memory(MemoryError::Uuid(_)) => 2,
            CliError::Memory(MemoryError::NotFound(_)) => 3,
            _ => 1,
        }
    }
}

impl From<tokio::task::JoinError> for CliError {
    fn from(err: tokio::task::JoinError) -> Self {
        CliError::Task(err.to_string())
    }
}

/// Result type alias for command execution.
pub type CliResult<T> = Result<T, CliError>;
