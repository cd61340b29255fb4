use async_trait::async_trait;
use nomad_types::ContentId;

use crate::error::KeyResult;
use crate::types::Key;

/// Key management plus name publishing.
///
/// A key id can be pointed at a stored value with [`KeyStore::publish`] and
/// followed with [`KeyStore::resolve`]. Implementations may cache resolved
/// values: a cached resolve can lag behind the latest publish until a
/// `nocache` resolve refreshes it.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Create a new key. Fails with `AlreadyExists` if the name is taken.
    async fn create_key(&self, name: &str) -> KeyResult<Key>;

    /// Look up a key by name.
    async fn find_key(&self, name: &str) -> KeyResult<Option<Key>>;

    /// Look up a key by id.
    async fn key_by_id(&self, id: &ContentId) -> KeyResult<Option<Key>>;

    /// All keys, sorted by name.
    async fn list_keys(&self) -> KeyResult<Vec<Key>>;

    /// Remove a key and withdraw its published record. Returns `true` if the
    /// key existed.
    async fn remove_key(&self, name: &str) -> KeyResult<bool>;

    /// Point `key` at `value`.
    async fn publish(&self, key: &Key, value: ContentId) -> KeyResult<()>;

    /// Follow a published key id.
    ///
    /// Returns `Ok(None)` if nothing is published under `id`. With `nocache`
    /// the latest published value is read and the cache refreshed.
    async fn resolve(&self, id: &ContentId, nocache: bool) -> KeyResult<Option<ContentId>>;
}
