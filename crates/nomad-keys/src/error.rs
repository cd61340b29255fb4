//! Error types for key operations.

use nomad_types::ContentId;
use thiserror::Error;

/// Errors that can occur during key operations.
#[derive(Debug, Error)]
pub enum KeyError {
    /// No key with this name exists.
    #[error("key not found: {name}")]
    NotFound { name: String },

    /// No key with this id exists.
    #[error("no key with id {0}")]
    UnknownId(ContentId),

    /// A key with this name already exists.
    #[error("key already exists: {name}")]
    AlreadyExists { name: String },

    /// The key name is invalid.
    #[error("invalid key name: {name}: {reason}")]
    InvalidName { name: String, reason: String },

    /// The name system could not be reached.
    #[error("key store unavailable: {0}")]
    Unavailable(String),
}

/// Convenience type alias for key operations.
pub type KeyResult<T> = std::result::Result<T, KeyError>;
