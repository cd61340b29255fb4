use std::sync::Arc;

use futures::stream::{self, Stream, StreamExt};
use nomad_store::ObjectKind;
use nomad_types::{ContentId, Multiaddr};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use super::{check_cancelled, ChangeStream, Member, RegistryRead};
use crate::client::NomadClient;
use crate::config::{HandlerConfig, RegistryOptions};
use crate::error::{RegistryError, RegistryResult};
use crate::kinds::{MembershipChange, PeerKind, RegistryKind};
use crate::models::Snapshot;
use crate::repository::Repository;

/// A registry this process can only observe: a published roaming snapshot.
pub struct ReadOnlyRegistry<K: RegistryKind> {
    inner: K::Snapshot,
    nested: Option<K::Nested>,
    client: NomadClient,
    options: RegistryOptions,
    notifier: broadcast::Sender<MembershipChange<K::Item>>,
}

impl<K: RegistryKind> ReadOnlyRegistry<K> {
    /// Bind to a roaming id and value. The id may come from either
    /// `roaming_id` or `roaming_key`.
    pub fn from_handler_config(
        config: HandlerConfig<K>,
        nested: Option<K::Nested>,
        client: NomadClient,
        options: RegistryOptions,
    ) -> RegistryResult<Self> {
        let roaming_id = config
            .roaming_id
            .or(config.roaming_key.as_ref().map(|key| key.id))
            .ok_or_else(|| RegistryError::Validation("roaming id is required".into()))?;
        let roaming_value = config
            .roaming_value
            .ok_or_else(|| RegistryError::Validation("roaming value is required".into()))?;
        if roaming_value.id() != roaming_id {
            return Err(RegistryError::Validation(format!(
                "roaming value {} does not belong to {}",
                roaming_value.id(),
                roaming_id
            )));
        }
        Ok(Self::from_snapshot(roaming_value, nested, client, options))
    }

    pub fn from_snapshot(
        snapshot: K::Snapshot,
        nested: Option<K::Nested>,
        client: NomadClient,
        options: RegistryOptions,
    ) -> Self {
        let (notifier, _) = broadcast::channel(options.channel_capacity.max(1));
        Self {
            inner: snapshot,
            nested,
            client,
            options,
            notifier,
        }
    }

    pub fn snapshot(&self) -> &K::Snapshot {
        &self.inner
    }

    /// Re-resolve the published snapshot and notify what changed since the
    /// last read, removals first.
    pub async fn refresh(
        &mut self,
        cancel: &CancellationToken,
    ) -> RegistryResult<Vec<MembershipChange<K::Item>>> {
        check_cancelled(cancel)?;
        let id = self.inner.id();
        let latest: K::Snapshot = self
            .client
            .resolve_value(&id, ObjectKind::Snapshot, !self.options.use_cache)
            .await?
            .ok_or(RegistryError::NotFound { kind: K::LABEL, id })?;
        check_cancelled(cancel)?;

        let removed: Vec<K::Item> = self
            .inner
            .items()
            .iter()
            .filter(|item| !latest.items().contains(item))
            .cloned()
            .collect();
        let added: Vec<K::Item> = latest
            .items()
            .iter()
            .filter(|item| !self.inner.items().contains(item))
            .cloned()
            .collect();
        self.inner = latest;

        let mut changes = Vec::new();
        if !removed.is_empty() {
            changes.push(MembershipChange::Removed(removed));
        }
        if !added.is_empty() {
            changes.push(MembershipChange::Added(added));
        }
        for change in &changes {
            let _ = self.notifier.send(change.clone());
        }
        Ok(changes)
    }
}

impl<K: RegistryKind> RegistryRead for ReadOnlyRegistry<K> {
    type Item = K::Item;

    fn id(&self) -> ContentId {
        self.inner.id()
    }

    fn items(&self) -> &[K::Item] {
        self.inner.items()
    }

    fn sources(&self) -> &[ContentId] {
        self.inner.sources()
    }

    fn subscribe(&self) -> ChangeStream<K::Item> {
        self.notifier.subscribe()
    }
}

impl ReadOnlyRegistry<PeerKind> {
    pub fn addresses(&self) -> &[Multiaddr] {
        self.inner.items()
    }
}

impl<K, M> ReadOnlyRegistry<K>
where
    K: RegistryKind<Item = ContentId, Nested = Arc<Repository<M>>>,
    M: RegistryKind,
{
    /// Resolve a member. Without a member repository the member is always
    /// read-only.
    pub async fn get(&self, id: &ContentId, cancel: &CancellationToken) -> RegistryResult<Member<M>> {
        check_cancelled(cancel)?;
        if let Some(repository) = &self.nested {
            return repository.get(id, cancel).await;
        }
        let snapshot: M::Snapshot = self
            .client
            .resolve_value(id, ObjectKind::Snapshot, !self.options.use_cache)
            .await?
            .ok_or(RegistryError::NotFound {
                kind: M::LABEL,
                id: *id,
            })?;
        Ok(Member::ReadOnly(ReadOnlyRegistry::from_snapshot(
            snapshot,
            None,
            self.client.clone(),
            self.options,
        )))
    }

    /// Lazily resolve every current member, in membership order.
    pub fn get_all<'a>(
        &'a self,
        cancel: &'a CancellationToken,
    ) -> impl Stream<Item = RegistryResult<Member<M>>> + 'a {
        stream::iter(self.inner.items().to_vec())
            .then(move |id| async move { self.get(&id, cancel).await })
    }
}

impl<K: RegistryKind> std::fmt::Debug for ReadOnlyRegistry<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadOnlyRegistry")
            .field("kind", &K::LABEL)
            .field("id", &self.inner.id())
            .field("items", &self.inner.items().len())
            .field("sources", &self.inner.sources().len())
            .finish()
    }
}
