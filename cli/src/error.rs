//! Unified error handling for the CLI.

use crate::config::ConfigError;

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Engine(#[from] shelfkeep_engine::Error),

    #[error("Library store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Config(_) => 2,
            AppError::Engine(shelfkeep_engine::Error::CorruptBackup(_)) => 3,
            AppError::Engine(shelfkeep_engine::Error::InvariantViolation(_)) => 70,
            AppError::Engine(_) | AppError::Store(_) | AppError::Io(_) => 1,
        }
    }
}

/// Result type alias for commands.
pub type Result<T> = std::result::Result<T, AppError>;
