use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use nomad_types::ContentId;

use crate::error::{KeyError, KeyResult};
use crate::names::validate_key_name;
use crate::traits::KeyStore;
use crate::types::Key;

/// In-memory key store with a published-record table and a resolve cache.
///
/// Publishing writes only the record table. A resolve without `nocache`
/// answers from the cache when it has an entry, so it can return a value
/// that has since been superseded, like a name system resolving through a
/// local cache.
pub struct InMemoryKeyStore {
    keys: RwLock<BTreeMap<String, Key>>,
    records: RwLock<HashMap<ContentId, ContentId>>,
    cache: RwLock<HashMap<ContentId, ContentId>>,
}

impl InMemoryKeyStore {
    /// Create an empty key store.
    pub fn new() -> Self {
        Self {
            keys: RwLock::new(BTreeMap::new()),
            records: RwLock::new(HashMap::new()),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.keys.read().expect("lock poisoned").len()
    }

    /// Returns `true` if no keys exist.
    pub fn is_empty(&self) -> bool {
        self.keys.read().expect("lock poisoned").is_empty()
    }
}

impl Default for InMemoryKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyStore for InMemoryKeyStore {
    async fn create_key(&self, name: &str) -> KeyResult<Key> {
        validate_key_name(name)?;
        let mut keys = self.keys.write().expect("lock poisoned");
        if keys.contains_key(name) {
            return Err(KeyError::AlreadyExists {
                name: name.to_string(),
            });
        }
        let material: [u8; 32] = rand::random();
        let key = Key::derive(name, &material);
        keys.insert(name.to_string(), key.clone());
        tracing::debug!(name, id = %key.id.short_hex(), "created key");
        Ok(key)
    }

    async fn find_key(&self, name: &str) -> KeyResult<Option<Key>> {
        Ok(self.keys.read().expect("lock poisoned").get(name).cloned())
    }

    async fn key_by_id(&self, id: &ContentId) -> KeyResult<Option<Key>> {
        let keys = self.keys.read().expect("lock poisoned");
        Ok(keys.values().find(|k| k.id == *id).cloned())
    }

    async fn list_keys(&self) -> KeyResult<Vec<Key>> {
        Ok(self
            .keys
            .read()
            .expect("lock poisoned")
            .values()
            .cloned()
            .collect())
    }

    async fn remove_key(&self, name: &str) -> KeyResult<bool> {
        let removed = self.keys.write().expect("lock poisoned").remove(name);
        match removed {
            Some(key) => {
                self.records.write().expect("lock poisoned").remove(&key.id);
                self.cache.write().expect("lock poisoned").remove(&key.id);
                tracing::debug!(name, "removed key");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn publish(&self, key: &Key, value: ContentId) -> KeyResult<()> {
        let known = self
            .keys
            .read()
            .expect("lock poisoned")
            .get(&key.name)
            .is_some_and(|k| k.id == key.id);
        if !known {
            return Err(KeyError::NotFound {
                name: key.name.clone(),
            });
        }
        self.records
            .write()
            .expect("lock poisoned")
            .insert(key.id, value);
        Ok(())
    }

    async fn resolve(&self, id: &ContentId, nocache: bool) -> KeyResult<Option<ContentId>> {
        if !nocache {
            if let Some(cached) = self.cache.read().expect("lock poisoned").get(id) {
                return Ok(Some(*cached));
            }
        }
        let current = self.records.read().expect("lock poisoned").get(id).copied();
        let mut cache = self.cache.write().expect("lock poisoned");
        match current {
            Some(value) => {
                cache.insert(*id, value);
            }
            None => {
                cache.remove(id);
            }
        }
        Ok(current)
    }
}

impl std::fmt::Debug for InMemoryKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryKeyStore")
            .field("key_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(tag: &[u8]) -> ContentId {
        ContentId::from_bytes(tag)
    }

    // -----------------------------------------------------------------------
    // Key lifecycle
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn create_and_find_key() {
        let store = InMemoryKeyStore::new();
        let key = store.create_key("Nomad.Peer.0.Local").await.unwrap();
        assert_eq!(key.name, "Nomad.Peer.0.Local");

        let found = store.find_key("Nomad.Peer.0.Local").await.unwrap();
        assert_eq!(found, Some(key.clone()));
        assert_eq!(store.key_by_id(&key.id).await.unwrap(), Some(key));
    }

    #[tokio::test]
    async fn duplicate_name_is_rejected() {
        let store = InMemoryKeyStore::new();
        store.create_key("dup").await.unwrap();
        let err = store.create_key("dup").await.unwrap_err();
        assert!(matches!(err, KeyError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn invalid_name_is_rejected() {
        let store = InMemoryKeyStore::new();
        let err = store.create_key("bad name").await.unwrap_err();
        assert!(matches!(err, KeyError::InvalidName { .. }));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn list_keys_is_sorted_by_name() {
        let store = InMemoryKeyStore::new();
        for name in ["c", "a", "b"] {
            store.create_key(name).await.unwrap();
        }
        let names: Vec<String> = store
            .list_keys()
            .await
            .unwrap()
            .into_iter()
            .map(|k| k.name)
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn recreated_key_gets_new_id() {
        let store = InMemoryKeyStore::new();
        let first = store.create_key("k").await.unwrap();
        assert!(store.remove_key("k").await.unwrap());
        let second = store.create_key("k").await.unwrap();
        assert_ne!(first.id, second.id);
    }

    // -----------------------------------------------------------------------
    // Publish / resolve
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn publish_then_resolve() {
        let store = InMemoryKeyStore::new();
        let key = store.create_key("k").await.unwrap();
        assert_eq!(store.resolve(&key.id, false).await.unwrap(), None);

        store.publish(&key, value(b"v1")).await.unwrap();
        assert_eq!(store.resolve(&key.id, false).await.unwrap(), Some(value(b"v1")));
    }

    #[tokio::test]
    async fn cached_resolve_can_be_stale_until_nocache() {
        let store = InMemoryKeyStore::new();
        let key = store.create_key("k").await.unwrap();
        store.publish(&key, value(b"v1")).await.unwrap();
        store.resolve(&key.id, false).await.unwrap();

        store.publish(&key, value(b"v2")).await.unwrap();
        assert_eq!(store.resolve(&key.id, false).await.unwrap(), Some(value(b"v1")));
        assert_eq!(store.resolve(&key.id, true).await.unwrap(), Some(value(b"v2")));
        // The nocache read refreshed the cache.
        assert_eq!(store.resolve(&key.id, false).await.unwrap(), Some(value(b"v2")));
    }

    #[tokio::test]
    async fn publish_with_unknown_key_fails() {
        let store = InMemoryKeyStore::new();
        let stranger = Key::derive("ghost", &[9u8; 32]);
        let err = store.publish(&stranger, value(b"v")).await.unwrap_err();
        assert!(matches!(err, KeyError::NotFound { .. }));
    }

    #[tokio::test]
    async fn remove_key_withdraws_record() {
        let store = InMemoryKeyStore::new();
        let key = store.create_key("k").await.unwrap();
        store.publish(&key, value(b"v")).await.unwrap();
        store.resolve(&key.id, false).await.unwrap();

        assert!(store.remove_key("k").await.unwrap());
        assert!(!store.remove_key("k").await.unwrap());
        assert_eq!(store.resolve(&key.id, false).await.unwrap(), None);
        assert_eq!(store.key_by_id(&key.id).await.unwrap(), None);
    }
}
