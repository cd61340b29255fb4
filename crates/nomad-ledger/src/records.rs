use nomad_types::{ContentId, TemporalAnchor};
use serde::{Deserialize, Serialize};

/// A writer's event stream, as published under its local key.
///
/// `head` is the newest entry. An empty stream has no head and length 0.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LocalEventStream {
    /// Human-readable label.
    pub label: String,
    /// Newest entry, if any.
    pub head: Option<ContentId>,
    /// Number of entries reachable from `head`.
    pub length: u64,
}

impl LocalEventStream {
    /// An empty stream with the given label.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            head: None,
            length: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }
}

/// One node of a local event stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EventStreamEntry {
    /// The registry this event mutates.
    pub target_id: ContentId,
    /// Event discriminator, e.g. `AddressAdd`.
    pub event_id: String,
    /// Id of the stored event record.
    pub content: ContentId,
    /// 1-based position in the stream.
    pub seq: u64,
    /// The previous (older) entry.
    pub prev: Option<ContentId>,
    pub timestamp: TemporalAnchor,
}

/// The last entry of a stream that has been folded into live state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EventStreamPosition {
    pub entry: ContentId,
    pub seq: u64,
}

/// An entry together with its own id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredEntry {
    pub id: ContentId,
    pub entry: EventStreamEntry,
}

impl StoredEntry {
    /// The position that marks this entry as folded.
    pub fn position(&self) -> EventStreamPosition {
        EventStreamPosition {
            entry: self.id,
            seq: self.entry.seq,
        }
    }
}
