use nomad_store::StoreError;
use nomad_types::ContentId;

/// Errors produced by event log operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("broken link: entry {entry} (expected seq {seq}) is missing from the store")]
    BrokenLink { entry: ContentId, seq: u64 },

    #[error("position entry {entry} is not on the stream")]
    PositionNotFound { entry: ContentId },

    #[error("integrity violation at seq {seq}: {reason}")]
    IntegrityViolation { seq: u64, reason: String },

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result alias for event log operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
