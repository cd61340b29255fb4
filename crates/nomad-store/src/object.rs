use nomad_types::ContentId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::hasher::ContentHasher;

/// The kind of object stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    /// An immutable event record.
    Event,
    /// A node of a local event log (linked list entry).
    Entry,
    /// The head of a local event stream, published under a local key.
    Stream,
    /// A roaming snapshot, published under a roaming key.
    Snapshot,
    /// Any other value (addresses, ad hoc data).
    Value,
}

impl ObjectKind {
    fn hasher(&self) -> &'static ContentHasher {
        match self {
            Self::Event => &ContentHasher::EVENT,
            Self::Entry => &ContentHasher::ENTRY,
            Self::Stream => &ContentHasher::STREAM,
            Self::Snapshot => &ContentHasher::SNAPSHOT,
            Self::Value => &ContentHasher::VALUE,
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Event => write!(f, "event"),
            Self::Entry => write!(f, "entry"),
            Self::Stream => write!(f, "stream"),
            Self::Snapshot => write!(f, "snapshot"),
            Self::Value => write!(f, "value"),
        }
    }
}

/// A stored object: kind tag + serialized data + cached size.
///
/// `StoredObject` is the unit of storage. Data is JSON for every typed value
/// written through [`crate::ContentStoreExt`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    /// The type of this object.
    pub kind: ObjectKind,
    /// The serialized bytes of the object.
    pub data: Vec<u8>,
    /// The size of `data` in bytes.
    pub size: u64,
}

impl StoredObject {
    /// Create a new stored object from kind and data.
    pub fn new(kind: ObjectKind, data: Vec<u8>) -> Self {
        let size = data.len() as u64;
        Self { kind, data, size }
    }

    /// Encode a serializable value as a JSON object of the given kind.
    pub fn encode<T: Serialize + ?Sized>(kind: ObjectKind, value: &T) -> StoreResult<Self> {
        let data =
            serde_json::to_vec(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(Self::new(kind, data))
    }

    /// Decode the JSON payload, checking the object kind first.
    pub fn decode<T: DeserializeOwned>(&self, expected: ObjectKind) -> StoreResult<T> {
        if self.kind != expected {
            return Err(StoreError::CorruptObject {
                id: self.compute_id(),
                reason: format!("expected {expected}, got {}", self.kind),
            });
        }
        serde_json::from_slice(&self.data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Compute the content-addressed id for this object.
    pub fn compute_id(&self) -> ContentId {
        self.kind.hasher().hash(&self.data)
    }
}
