use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use nomad_keys::{InMemoryKeyStore, Key, KeyStore};
use nomad_store::{ContentStore, ContentStoreExt, InMemoryContentStore, ObjectKind};
use nomad_types::ContentId;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::RegistryResult;

/// The shared capabilities every registry and repository works through.
///
/// Cloning is cheap; clones share the same store, key store and writer
/// leases.
#[derive(Clone)]
pub struct NomadClient {
    pub store: Arc<dyn ContentStore>,
    pub keys: Arc<dyn KeyStore>,
    leases: Arc<Mutex<HashSet<ContentId>>>,
}

/// Exclusive right to append to one local key's stream. Released on drop.
pub struct WriterLease {
    local_id: ContentId,
    leases: Arc<Mutex<HashSet<ContentId>>>,
}

impl WriterLease {
    pub fn local_id(&self) -> ContentId {
        self.local_id
    }
}

impl Drop for WriterLease {
    fn drop(&mut self) {
        self.leases
            .lock()
            .expect("lock poisoned")
            .remove(&self.local_id);
        tracing::debug!(local = %self.local_id.short_hex(), "released writer lease");
    }
}

impl std::fmt::Debug for WriterLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriterLease")
            .field("local_id", &self.local_id)
            .finish()
    }
}

impl NomadClient {
    pub fn new(store: Arc<dyn ContentStore>, keys: Arc<dyn KeyStore>) -> Self {
        Self {
            store,
            keys,
            leases: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Take the writer lease for `local_id`, or `None` if a live writer
    /// already holds it.
    pub fn try_lease(&self, local_id: ContentId) -> Option<WriterLease> {
        let mut held = self.leases.lock().expect("lock poisoned");
        if !held.insert(local_id) {
            return None;
        }
        Some(WriterLease {
            local_id,
            leases: self.leases.clone(),
        })
    }

    pub fn is_leased(&self, local_id: &ContentId) -> bool {
        self.leases.lock().expect("lock poisoned").contains(local_id)
    }

    /// A client over fresh in-memory backends.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryContentStore::new()),
            Arc::new(InMemoryKeyStore::new()),
        )
    }

    /// Store `value` and point `key` at it.
    pub async fn publish_value<T>(
        &self,
        key: &Key,
        kind: ObjectKind,
        value: &T,
        pin: bool,
    ) -> RegistryResult<ContentId>
    where
        T: Serialize + Sync + ?Sized,
    {
        let id = self.store.put_value(kind, value, pin).await?;
        self.keys.publish(key, id).await?;
        Ok(id)
    }

    /// Follow a key id to the value published under it.
    ///
    /// Returns `Ok(None)` if nothing is published. `nocache` bypasses the key
    /// store's resolve cache.
    pub async fn resolve_value<T>(
        &self,
        key_id: &ContentId,
        kind: ObjectKind,
        nocache: bool,
    ) -> RegistryResult<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        match self.keys.resolve(key_id, nocache).await? {
            Some(value_id) => Ok(Some(self.store.get_value(kind, &value_id).await?)),
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for NomadClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NomadClient")
            .field("leases", &self.leases.lock().expect("lock poisoned").len())
            .finish_non_exhaustive()
    }
}
