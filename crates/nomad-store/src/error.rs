use nomad_types::ContentId;

/// Errors from content store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested object was not found.
    #[error("object not found: {0}")]
    NotFound(ContentId),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The object data is malformed or of an unexpected kind.
    #[error("corrupt object {id}: {reason}")]
    CorruptObject { id: ContentId, reason: String },

    /// Attempted to write an object whose id is null.
    #[error("cannot store object with null ID")]
    NullObjectId,

    /// The backend refused a new object because it is full.
    #[error("store capacity of {capacity} objects exceeded")]
    CapacityExceeded { capacity: usize },

    /// The backend is unreachable or failed transiently.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
