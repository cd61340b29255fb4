use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use nomad_types::ContentId;

use crate::error::{StoreError, StoreResult};
use crate::object::StoredObject;
use crate::traits::ContentStore;

const UNLIMITED: usize = usize::MAX;

/// In-memory, HashMap-based content store.
///
/// Intended for tests and embedding. Objects and pins are held behind
/// `RwLock`s for safe concurrent access. An optional capacity limit makes
/// writes of new objects fail once the store holds that many objects, which
/// is how tests provoke a failed append.
pub struct InMemoryContentStore {
    objects: RwLock<HashMap<ContentId, StoredObject>>,
    pins: RwLock<HashSet<ContentId>>,
    capacity: AtomicUsize,
}

impl InMemoryContentStore {
    /// Create a new empty, unbounded store.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            pins: RwLock::new(HashSet::new()),
            capacity: AtomicUsize::new(UNLIMITED),
        }
    }

    /// Create a store that refuses new objects beyond `capacity`.
    pub fn with_capacity_limit(capacity: usize) -> Self {
        let store = Self::new();
        store.set_capacity_limit(Some(capacity));
        store
    }

    /// Change (or clear) the capacity limit. Objects already stored are kept.
    pub fn set_capacity_limit(&self, capacity: Option<usize>) {
        self.capacity
            .store(capacity.unwrap_or(UNLIMITED), Ordering::SeqCst);
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// Number of pinned objects.
    pub fn pinned_count(&self) -> usize {
        self.pins.read().expect("lock poisoned").len()
    }

    /// Total bytes across all stored objects.
    pub fn total_bytes(&self) -> u64 {
        self.objects
            .read()
            .expect("lock poisoned")
            .values()
            .map(|obj| obj.size)
            .sum()
    }

    /// Return a sorted list of all object ids in the store.
    pub fn all_ids(&self) -> Vec<ContentId> {
        let map = self.objects.read().expect("lock poisoned");
        let mut ids: Vec<ContentId> = map.keys().copied().collect();
        ids.sort();
        ids
    }
}

impl Default for InMemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn put(&self, object: &StoredObject, pin: bool) -> StoreResult<ContentId> {
        let id = object.compute_id();
        if id.is_null() {
            return Err(StoreError::NullObjectId);
        }
        {
            let mut map = self.objects.write().expect("lock poisoned");
            if !map.contains_key(&id) {
                let capacity = self.capacity.load(Ordering::SeqCst);
                if map.len() >= capacity {
                    tracing::debug!(%id, capacity, "store full, rejecting object");
                    return Err(StoreError::CapacityExceeded { capacity });
                }
                map.insert(id, object.clone());
            }
        }
        if pin {
            self.pins.write().expect("lock poisoned").insert(id);
        }
        Ok(id)
    }

    async fn get(&self, id: &ContentId) -> StoreResult<Option<StoredObject>> {
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.get(id).cloned())
    }

    async fn exists(&self, id: &ContentId) -> StoreResult<bool> {
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.contains_key(id))
    }

    async fn pin(&self, id: &ContentId) -> StoreResult<()> {
        if !self.objects.read().expect("lock poisoned").contains_key(id) {
            return Err(StoreError::NotFound(*id));
        }
        self.pins.write().expect("lock poisoned").insert(*id);
        Ok(())
    }

    async fn unpin(&self, id: &ContentId) -> StoreResult<bool> {
        Ok(self.pins.write().expect("lock poisoned").remove(id))
    }

    async fn is_pinned(&self, id: &ContentId) -> StoreResult<bool> {
        Ok(self.pins.read().expect("lock poisoned").contains(id))
    }
}

impl std::fmt::Debug for InMemoryContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryContentStore")
            .field("object_count", &self.len())
            .field("pinned_count", &self.pinned_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectKind;
    use crate::traits::ContentStoreExt;
    use serde::{Deserialize, Serialize};
    use std::sync::Arc;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Record {
        id: String,
        members: Vec<String>,
    }

    fn make_record(id: &str) -> Record {
        Record {
            id: id.to_string(),
            members: vec!["a".into(), "b".into()],
        }
    }

    // -----------------------------------------------------------------------
    // Core operations
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn put_and_get_object() {
        let store = InMemoryContentStore::new();
        let obj = StoredObject::new(ObjectKind::Value, b"hello world".to_vec());
        let id = store.put(&obj, false).await.unwrap();
        assert!(!id.is_null());

        let read_back = store.get(&id).await.unwrap().expect("should exist");
        assert_eq!(read_back, obj);
    }

    #[tokio::test]
    async fn get_missing_returns_none() {
        let store = InMemoryContentStore::new();
        let id = ContentId::from_bytes(b"nothing");
        assert!(store.get(&id).await.unwrap().is_none());
        assert!(!store.exists(&id).await.unwrap());
    }

    #[tokio::test]
    async fn put_is_idempotent() {
        let store = InMemoryContentStore::new();
        let obj = StoredObject::new(ObjectKind::Event, b"same".to_vec());
        let id1 = store.put(&obj, false).await.unwrap();
        let id2 = store.put(&obj, false).await.unwrap();
        assert_eq!(id1, id2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.total_bytes(), 4);
    }

    #[tokio::test]
    async fn typed_value_roundtrip() {
        let store = InMemoryContentStore::new();
        let record = make_record("r1");
        let id = store
            .put_value(ObjectKind::Snapshot, &record, false)
            .await
            .unwrap();
        let back: Record = store.get_value(ObjectKind::Snapshot, &id).await.unwrap();
        assert_eq!(back, record);
    }

    #[tokio::test]
    async fn get_value_missing_is_not_found() {
        let store = InMemoryContentStore::new();
        let id = ContentId::from_bytes(b"ghost");
        let err = store
            .get_value::<Record>(ObjectKind::Value, &id)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(missing) if missing == id));
    }

    #[tokio::test]
    async fn get_value_wrong_kind_is_corrupt() {
        let store = InMemoryContentStore::new();
        let id = store
            .put_value(ObjectKind::Stream, &make_record("r"), false)
            .await
            .unwrap();
        let err = store
            .get_value::<Record>(ObjectKind::Snapshot, &id)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::CorruptObject { .. }));
    }

    #[tokio::test]
    async fn batch_get_preserves_order_and_gaps() {
        let store = InMemoryContentStore::new();
        let a = store
            .put(&StoredObject::new(ObjectKind::Value, b"a".to_vec()), false)
            .await
            .unwrap();
        let missing = ContentId::from_bytes(b"missing");
        let results = store.get_batch(&[a, missing]).await.unwrap();
        assert!(results[0].is_some());
        assert!(results[1].is_none());
    }

    // -----------------------------------------------------------------------
    // Pinning
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn put_with_pin_pins_object() {
        let store = InMemoryContentStore::new();
        let id = store
            .put(&StoredObject::new(ObjectKind::Value, b"p".to_vec()), true)
            .await
            .unwrap();
        assert!(store.is_pinned(&id).await.unwrap());
        assert!(store.unpin(&id).await.unwrap());
        assert!(!store.is_pinned(&id).await.unwrap());
        assert!(!store.unpin(&id).await.unwrap());
    }

    #[tokio::test]
    async fn pin_missing_object_fails() {
        let store = InMemoryContentStore::new();
        let id = ContentId::from_bytes(b"absent");
        assert!(matches!(
            store.pin(&id).await,
            Err(StoreError::NotFound(_))
        ));
        assert_eq!(store.pinned_count(), 0);
    }

    // -----------------------------------------------------------------------
    // Capacity
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn capacity_limit_rejects_new_objects_only() {
        let store = InMemoryContentStore::with_capacity_limit(1);
        let first = StoredObject::new(ObjectKind::Value, b"first".to_vec());
        store.put(&first, false).await.unwrap();

        // Rewriting an existing object is still allowed.
        store.put(&first, false).await.unwrap();

        let second = StoredObject::new(ObjectKind::Value, b"second".to_vec());
        let err = store.put(&second, false).await.unwrap_err();
        assert!(matches!(err, StoreError::CapacityExceeded { capacity: 1 }));

        store.set_capacity_limit(None);
        store.put(&second, false).await.unwrap();
        assert_eq!(store.len(), 2);
    }

    // -----------------------------------------------------------------------
    // Concurrency
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn concurrent_puts_deduplicate() {
        let store = Arc::new(InMemoryContentStore::new());
        let mut handles = Vec::new();
        for i in 0..16u8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let data = vec![i % 4];
                store
                    .put(&StoredObject::new(ObjectKind::Value, data), false)
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(store.len(), 4);
    }

    #[tokio::test]
    async fn usable_as_trait_object() {
        let store: Arc<dyn ContentStore> = Arc::new(InMemoryContentStore::new());
        let id = store
            .put_value(ObjectKind::Value, &vec![1u32, 2, 3], false)
            .await
            .unwrap();
        let back: Vec<u32> = store.get_value(ObjectKind::Value, &id).await.unwrap();
        assert_eq!(back, vec![1, 2, 3]);
    }
}
