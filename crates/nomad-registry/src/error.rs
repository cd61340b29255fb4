use nomad_types::ContentId;
use thiserror::Error;

use crate::events::EventCodecError;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("store error: {0}")]
    Store(#[from] nomad_store::StoreError),

    #[error("key error: {0}")]
    Keys(#[from] nomad_keys::KeyError),

    #[error("ledger error: {0}")]
    Ledger(#[from] nomad_ledger::LedgerError),

    #[error("event codec error: {0}")]
    Codec(#[from] EventCodecError),

    /// A required construction input is missing or inconsistent.
    #[error("invalid handler config: {0}")]
    Validation(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    /// An event reached a registry kind that does not own it.
    #[error("{kind} cannot apply event {event_id}")]
    UnhandledEvent {
        kind: &'static str,
        event_id: String,
    },

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: ContentId },

    #[error("operation cancelled")]
    Cancelled,

    /// Another live handle already writes with this local key.
    #[error("local key {local} already has a live writer")]
    WriterBusy { local: ContentId },

    /// One or both halves of a flush failed. Retry the whole flush.
    #[error("flush failed (local: {}, roaming: {})", describe(.local), describe(.roaming))]
    Flush {
        local: Option<Box<RegistryError>>,
        roaming: Option<Box<RegistryError>>,
    },
}

fn describe(outcome: &Option<Box<RegistryError>>) -> String {
    match outcome {
        Some(err) => err.to_string(),
        None => "ok".to_string(),
    }
}

pub type RegistryResult<T> = Result<T, RegistryError>;
