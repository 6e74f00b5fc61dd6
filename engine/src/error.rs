//! Error types for the shelfkeep engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The entity family a repository call was operating on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Item,
    Unit,
    Category,
    ItemCategory,
    Track,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Item => "item",
            EntityKind::Unit => "unit",
            EntityKind::Category => "category",
            EntityKind::ItemCategory => "item_category",
            EntityKind::Track => "track",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by a repository collaborator.
///
/// Collaborators know nothing about which restore step called them, so the
/// engine attaches an [`EntityKind`] when converting this into [`Error`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct RepositoryError {
    pub message: String,
}

impl RepositoryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// All possible errors from the shelfkeep engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Input errors
    #[error("corrupt backup: {0}")]
    CorruptBackup(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    // Collaborator errors
    #[error("{entity} repository failure: {message}")]
    Repository { entity: EntityKind, message: String },

    #[error("io error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    // Logic defects
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl Error {
    /// Build a closure that tags a [`RepositoryError`] with its entity kind,
    /// for use with `map_err`.
    pub fn repository(entity: EntityKind) -> impl FnOnce(RepositoryError) -> Error {
        move |err| Error::Repository {
            entity,
            message: err.message,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
