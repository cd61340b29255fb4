use async_trait::async_trait;
use nomad_types::ContentId;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{StoreError, StoreResult};
use crate::object::{ObjectKind, StoredObject};

/// Content-addressed value store.
///
/// All implementations must satisfy these invariants:
/// - Objects are immutable once written. The same kind and data always
///   produce the same id.
/// - Writing an object that already exists is a no-op returning its id.
/// - Concurrent reads are always safe (objects are immutable).
/// - The store never interprets object contents.
/// - Pinning only affects retention. It never changes what `get` returns.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store an object and return its content-addressed id. When `pin` is
    /// set the object is also pinned.
    async fn put(&self, object: &StoredObject, pin: bool) -> StoreResult<ContentId>;

    /// Fetch an object by id.
    ///
    /// Returns `Ok(None)` if the object does not exist.
    async fn get(&self, id: &ContentId) -> StoreResult<Option<StoredObject>>;

    /// Check whether an object exists in the store.
    async fn exists(&self, id: &ContentId) -> StoreResult<bool>;

    /// Pin an existing object. Fails with `NotFound` if it is absent.
    async fn pin(&self, id: &ContentId) -> StoreResult<()>;

    /// Unpin an object. Returns `true` if it was pinned.
    async fn unpin(&self, id: &ContentId) -> StoreResult<bool>;

    /// Whether the object is currently pinned.
    async fn is_pinned(&self, id: &ContentId) -> StoreResult<bool>;

    /// Fetch multiple objects.
    ///
    /// Default implementation calls `get()` for each id.
    async fn get_batch(&self, ids: &[ContentId]) -> StoreResult<Vec<Option<StoredObject>>> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            out.push(self.get(id).await?);
        }
        Ok(out)
    }
}

/// Typed JSON access on top of any [`ContentStore`].
#[async_trait]
pub trait ContentStoreExt: ContentStore {
    /// Serialize `value` as an object of `kind` and store it.
    async fn put_value<T>(&self, kind: ObjectKind, value: &T, pin: bool) -> StoreResult<ContentId>
    where
        T: Serialize + Sync + ?Sized,
    {
        let object = StoredObject::encode(kind, value)?;
        self.put(&object, pin).await
    }

    /// Fetch and decode an object of `kind`.
    ///
    /// A missing object is `NotFound`. An object of another kind is
    /// `CorruptObject`.
    async fn get_value<T>(&self, kind: ObjectKind, id: &ContentId) -> StoreResult<T>
    where
        T: DeserializeOwned + Send,
    {
        let object = self.get(id).await?.ok_or(StoreError::NotFound(*id))?;
        object.decode(kind)
    }
}

impl<S: ContentStore + ?Sized> ContentStoreExt for S {}
