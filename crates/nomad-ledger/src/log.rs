use std::sync::{Arc, Mutex};

use nomad_store::{ContentStore, ContentStoreExt, ObjectKind, StoreError};
use nomad_types::{ContentId, TemporalAnchor};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{LedgerError, LedgerResult};
use crate::records::{EventStreamEntry, EventStreamPosition, LocalEventStream, StoredEntry};

/// Appender and reader for local event streams over a shared content store.
///
/// Append order is content, then entry, then the stream head. The head and
/// length of the caller's [`LocalEventStream`] only move once both writes
/// have succeeded, so a rejected write leaves the stream exactly as it was.
pub struct EventLog {
    store: Arc<dyn ContentStore>,
    should_pin: bool,
    node_id: u16,
    clock: Mutex<TemporalAnchor>,
}

impl EventLog {
    pub fn new(store: Arc<dyn ContentStore>, should_pin: bool) -> Self {
        Self::with_node_id(store, should_pin, 0)
    }

    /// An appender whose entry stamps carry `node_id`.
    pub fn with_node_id(store: Arc<dyn ContentStore>, should_pin: bool, node_id: u16) -> Self {
        Self {
            store,
            should_pin,
            node_id,
            clock: Mutex::new(TemporalAnchor::zero()),
        }
    }

    /// The store this log writes to.
    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    /// Append one event to `stream` and return the new position.
    pub async fn append<T>(
        &self,
        stream: &mut LocalEventStream,
        target_id: ContentId,
        event_id: &str,
        event: &T,
    ) -> LedgerResult<EventStreamPosition>
    where
        T: Serialize + Sync + ?Sized,
    {
        let content = self
            .store
            .put_value(ObjectKind::Event, event, self.should_pin)
            .await?;

        let entry = EventStreamEntry {
            target_id,
            event_id: event_id.to_string(),
            content,
            seq: stream.length + 1,
            prev: stream.head,
            timestamp: self.next_stamp(),
        };
        let entry_id = self
            .store
            .put_value(ObjectKind::Entry, &entry, self.should_pin)
            .await?;

        stream.head = Some(entry_id);
        stream.length = entry.seq;
        tracing::debug!(
            label = %stream.label,
            event_id,
            seq = entry.seq,
            entry = %entry_id.short_hex(),
            "appended event"
        );
        Ok(EventStreamPosition {
            entry: entry_id,
            seq: entry.seq,
        })
    }

    /// Read one entry by id.
    pub async fn read_entry(&self, id: &ContentId, seq: u64) -> LedgerResult<StoredEntry> {
        match self.store.get_value(ObjectKind::Entry, id).await {
            Ok(entry) => Ok(StoredEntry { id: *id, entry }),
            Err(StoreError::NotFound(_)) => Err(LedgerError::BrokenLink { entry: *id, seq }),
            Err(e) => Err(e.into()),
        }
    }

    /// All entries of `stream`, oldest first.
    pub async fn entries(&self, stream: &LocalEventStream) -> LedgerResult<Vec<StoredEntry>> {
        self.entries_after(stream, None).await
    }

    /// Entries newer than `position`, oldest first.
    ///
    /// With no position this is the whole stream. A position that is not on
    /// the stream fails with `PositionNotFound`.
    pub async fn entries_after(
        &self,
        stream: &LocalEventStream,
        position: Option<&EventStreamPosition>,
    ) -> LedgerResult<Vec<StoredEntry>> {
        let mut newest_first = Vec::new();
        let mut cursor = stream.head;
        let mut expected_seq = stream.length;

        while let Some(id) = cursor {
            if position.is_some_and(|p| p.entry == id) {
                newest_first.reverse();
                return Ok(newest_first);
            }
            let stored = self.read_entry(&id, expected_seq).await?;
            if stored.entry.seq != expected_seq {
                return Err(LedgerError::IntegrityViolation {
                    seq: stored.entry.seq,
                    reason: format!("expected seq {expected_seq}"),
                });
            }
            cursor = stored.entry.prev;
            expected_seq = expected_seq.saturating_sub(1);
            newest_first.push(stored);
        }

        if let Some(p) = position {
            return Err(LedgerError::PositionNotFound { entry: p.entry });
        }
        newest_first.reverse();
        Ok(newest_first)
    }

    /// Read the event record an entry points to.
    pub async fn read_event<T>(&self, entry: &StoredEntry) -> LedgerResult<T>
    where
        T: DeserializeOwned + Send,
    {
        match self
            .store
            .get_value(ObjectKind::Event, &entry.entry.content)
            .await
        {
            Ok(event) => Ok(event),
            Err(StoreError::NotFound(id)) => Err(LedgerError::BrokenLink {
                entry: id,
                seq: entry.entry.seq,
            }),
            Err(StoreError::Serialization(reason)) => Err(LedgerError::Serialization(reason)),
            Err(e) => Err(e.into()),
        }
    }

    fn next_stamp(&self) -> TemporalAnchor {
        let mut clock = self.clock.lock().expect("lock poisoned");
        *clock = clock.tick(self.node_id);
        *clock
    }
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog")
            .field("should_pin", &self.should_pin)
            .field("node_id", &self.node_id)
            .finish()
    }
}
