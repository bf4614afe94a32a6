//! Error types for vectorcore.

use std::fmt;

/// Errors that can occur anywhere in the core: index operations, orchestration,
/// and the embedding boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreError {
    /// The requested library, document, chunk, or index does not exist.
    NotFound(String),
    /// Creating something that already exists (e.g. a second index for a library).
    AlreadyExists(String),
    /// Caller-supplied data failed validation (dimension mismatch, empty text, bad filter).
    Validation(String),
    /// An index-internal failure (build before search, corrupt state).
    Index(String),
    /// The embedding provider failed or returned something unusable.
    Embedding(String),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::NotFound(msg) => write!(f, "not found: {}", msg),
            CoreError::AlreadyExists(msg) => write!(f, "already exists: {}", msg),
            CoreError::Validation(msg) => write!(f, "validation error: {}", msg),
            CoreError::Index(msg) => write!(f, "index error: {}", msg),
            CoreError::Embedding(msg) => write!(f, "embedding error: {}", msg),
        }
    }
}

impl std::error::Error for CoreError {}

pub type CoreResult<T> = Result<T, CoreError>;
