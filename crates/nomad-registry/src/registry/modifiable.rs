use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};
use nomad_keys::Key;
use nomad_ledger::{EventLog, EventStreamPosition, LedgerError, LocalEventStream};
use nomad_store::ObjectKind;
use nomad_types::{ContentId, Multiaddr};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use super::{check_cancelled, ChangeStream, Member, RegistryRead, RegistryWrite};
use crate::client::{NomadClient, WriterLease};
use crate::config::{HandlerConfig, RegistryOptions};
use crate::error::{RegistryError, RegistryResult};
use crate::events::UpdateEvent;
use crate::kinds::{MembershipChange, PeerKind, RegistryKind};
use crate::models::Snapshot;
use crate::projection::Projector;
use crate::repository::{fold_sources, Repository};

/// A registry this process can write to.
///
/// Mutations are applied to the live snapshot first, which fires the
/// notification, and then appended to the local event stream. If the append
/// fails the applied state is kept and the event waits in a pending queue
/// until the next mutation or [`RegistryWrite::flush`] appends it.
pub struct ModifiableRegistry<K: RegistryKind> {
    inner: K::Snapshot,
    roaming_key: Key,
    local_key: Key,
    local_stream: LocalEventStream,
    /// Last folded entry per source, including our own stream.
    positions: HashMap<ContentId, EventStreamPosition>,
    pending: VecDeque<UpdateEvent>,
    nested: K::Nested,
    client: NomadClient,
    options: RegistryOptions,
    log: EventLog,
    notifier: broadcast::Sender<MembershipChange<K::Item>>,
    /// Held for the handle's lifetime; one writer per local key.
    _lease: WriterLease,
}

fn missing(what: &str) -> RegistryError {
    RegistryError::Validation(format!("{what} is required"))
}

impl<K: RegistryKind> ModifiableRegistry<K> {
    /// Bind a registry to its keys and values. Fails before any I/O if a
    /// key or value is missing, or if the roaming value belongs to another
    /// registry.
    ///
    /// Membership starts empty; [`ModifiableRegistry::advance`] folds the
    /// source logs in. Fails with [`RegistryError::WriterBusy`] while
    /// another handle on the same client writes with the local key.
    pub fn from_handler_config(
        config: HandlerConfig<K>,
        nested: K::Nested,
        client: NomadClient,
        options: RegistryOptions,
    ) -> RegistryResult<Self> {
        Self::build(config, None, nested, client, options)
    }

    /// As [`ModifiableRegistry::from_handler_config`] with the local key's
    /// lease already taken.
    pub(crate) fn from_leased(
        config: HandlerConfig<K>,
        lease: WriterLease,
        nested: K::Nested,
        client: NomadClient,
        options: RegistryOptions,
    ) -> RegistryResult<Self> {
        Self::build(config, Some(lease), nested, client, options)
    }

    fn build(
        config: HandlerConfig<K>,
        lease: Option<WriterLease>,
        nested: K::Nested,
        client: NomadClient,
        options: RegistryOptions,
    ) -> RegistryResult<Self> {
        let roaming_key = config.roaming_key.ok_or_else(|| missing("roaming key"))?;
        let roaming_value = config
            .roaming_value
            .ok_or_else(|| missing("roaming value"))?;
        let local_key = config.local_key.ok_or_else(|| missing("local key"))?;
        let local_stream = config.local_value.ok_or_else(|| missing("local value"))?;

        if roaming_value.id() != roaming_key.id {
            return Err(RegistryError::Validation(format!(
                "roaming value {} does not belong to key {}",
                roaming_value.id(),
                roaming_key
            )));
        }

        let lease = match lease {
            Some(lease) if lease.local_id() == local_key.id => lease,
            Some(lease) => {
                return Err(RegistryError::Validation(format!(
                    "lease for {} does not cover local key {}",
                    lease.local_id(),
                    local_key
                )))
            }
            None => client
                .try_lease(local_key.id)
                .ok_or(RegistryError::WriterBusy { local: local_key.id })?,
        };

        let mut inner = K::Snapshot::empty(roaming_key.id);
        for source in roaming_value.sources() {
            inner.add_source(*source);
        }
        inner.add_source(local_key.id);

        let id_bytes = local_key.id.as_bytes();
        let node_id = u16::from_le_bytes([id_bytes[0], id_bytes[1]]);
        let log = EventLog::with_node_id(client.store.clone(), options.should_pin, node_id);
        let (notifier, _) = broadcast::channel(options.channel_capacity.max(1));

        Ok(Self {
            inner,
            roaming_key,
            local_key,
            local_stream,
            positions: HashMap::new(),
            pending: VecDeque::new(),
            nested,
            client,
            options,
            log,
            notifier,
            _lease: lease,
        })
    }

    pub fn snapshot(&self) -> &K::Snapshot {
        &self.inner
    }

    pub fn roaming_key(&self) -> &Key {
        &self.roaming_key
    }

    pub fn local_key(&self) -> &Key {
        &self.local_key
    }

    pub fn local_stream(&self) -> &LocalEventStream {
        &self.local_stream
    }

    /// Last folded entry of our own stream. `None` until the first append
    /// and after a reset.
    pub fn event_stream_position(&self) -> Option<&EventStreamPosition> {
        self.positions.get(&self.local_key.id)
    }

    pub fn source_position(&self, source: &ContentId) -> Option<&EventStreamPosition> {
        self.positions.get(source)
    }

    /// Events applied locally but not yet appended.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn options(&self) -> RegistryOptions {
        self.options
    }

    fn apply_local(&mut self, event: &UpdateEvent) -> RegistryResult<()> {
        if let Some(change) = Projector::<K>::apply(&mut self.inner, event)? {
            tracing::debug!(
                kind = K::LABEL,
                id = %self.inner.id().short_hex(),
                event = %event,
                "applied event"
            );
            // No subscribers is fine.
            let _ = self.notifier.send(change);
        }
        Ok(())
    }

    async fn commit(&mut self, event: UpdateEvent, cancel: &CancellationToken) -> RegistryResult<()> {
        check_cancelled(cancel)?;
        self.apply_local(&event)?;
        self.pending.push_back(event);
        self.append_pending(cancel).await
    }

    /// Append queued events in order. Stops at the first failure, leaving it
    /// and everything after it queued.
    async fn append_pending(&mut self, cancel: &CancellationToken) -> RegistryResult<()> {
        let target = self.inner.id();
        while let Some(event) = self.pending.front() {
            let appended = self
                .log
                .append(&mut self.local_stream, target, event.event_id(), event)
                .await;
            let position = match appended {
                Ok(position) => position,
                Err(e) => {
                    tracing::warn!(
                        kind = K::LABEL,
                        id = %target.short_hex(),
                        pending = self.pending.len(),
                        error = %e,
                        "append failed, event kept pending"
                    );
                    return Err(e.into());
                }
            };
            self.pending.pop_front();
            // The entry is durable; cancellation only skips the position update.
            check_cancelled(cancel)?;
            self.positions.insert(self.local_key.id, position);
        }
        Ok(())
    }

    /// Clear membership and forget every source position, so the next
    /// [`advance`](Self::advance) rebuilds from the start of each log.
    pub async fn reset_event_stream_position(
        &mut self,
        cancel: &CancellationToken,
    ) -> RegistryResult<()> {
        check_cancelled(cancel)?;
        Projector::<K>::reset(&mut self.inner);
        self.positions.clear();
        Ok(())
    }

    /// Fold every source's unseen entries into live state, with
    /// notifications. Returns how many events were applied.
    ///
    /// Our own stream is read from memory; other sources are resolved
    /// through the key store. A source with nothing published is skipped.
    pub async fn advance(&mut self, cancel: &CancellationToken) -> RegistryResult<usize> {
        check_cancelled(cancel)?;
        let id = self.inner.id();
        let mut applied = 0;

        for source in self.inner.sources().to_vec() {
            let stream = if source == self.local_key.id {
                self.local_stream.clone()
            } else {
                let resolved = self
                    .client
                    .resolve_value::<LocalEventStream>(
                        &source,
                        ObjectKind::Stream,
                        !self.options.use_cache,
                    )
                    .await?;
                match resolved {
                    Some(stream) => stream,
                    None => {
                        tracing::warn!(
                            kind = K::LABEL,
                            id = %id.short_hex(),
                            source = %source.short_hex(),
                            "source has no published stream, skipping"
                        );
                        continue;
                    }
                }
            };

            let entries = match self
                .log
                .entries_after(&stream, self.positions.get(&source))
                .await
            {
                Ok(entries) => entries,
                Err(LedgerError::PositionNotFound { .. }) => {
                    tracing::warn!(
                        kind = K::LABEL,
                        source = %source.short_hex(),
                        "resolved stream is behind our position, skipping"
                    );
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            for entry in entries {
                check_cancelled(cancel)?;
                if entry.entry.target_id == id {
                    let event: UpdateEvent = self.log.read_event(&entry).await?;
                    self.apply_local(&event)?;
                    applied += 1;
                } else {
                    tracing::debug!(
                        kind = K::LABEL,
                        seq = entry.entry.seq,
                        "skipping entry for another registry"
                    );
                }
                self.positions.insert(source, entry.position());
            }
        }

        Ok(applied)
    }

    /// Record another writer's local key as a source.
    pub fn add_source(&mut self, source: ContentId) -> bool {
        let added = self.inner.add_source(source);
        if added {
            tracing::debug!(
                kind = K::LABEL,
                source = %source.short_hex(),
                "added source"
            );
        }
        added
    }

    /// Merge the sources listed in the published roaming value. Returns how
    /// many were new.
    pub async fn refresh_sources(&mut self, cancel: &CancellationToken) -> RegistryResult<usize> {
        check_cancelled(cancel)?;
        let published: Option<K::Snapshot> = self
            .client
            .resolve_value(
                &self.roaming_key.id,
                ObjectKind::Snapshot,
                !self.options.use_cache,
            )
            .await?;
        let mut added = 0;
        if let Some(published) = published {
            for source in published.sources() {
                if self.add_source(*source) {
                    added += 1;
                }
            }
        }
        Ok(added)
    }

    /// Publish our local stream under the local key.
    pub async fn publish_local(&self, cancel: &CancellationToken) -> RegistryResult<ContentId> {
        check_cancelled(cancel)?;
        let id = self
            .client
            .publish_value(
                &self.local_key,
                ObjectKind::Stream,
                &self.local_stream,
                self.options.should_pin,
            )
            .await?;
        tracing::debug!(
            kind = K::LABEL,
            length = self.local_stream.length,
            value = %id.short_hex(),
            "published local stream"
        );
        Ok(id)
    }

    /// Rebuild the roaming snapshot from every known source and publish it
    /// under the roaming key.
    ///
    /// Sources already listed in the published value are kept, so two
    /// writers flushing in turn never drop each other.
    pub async fn publish_roaming(&self, cancel: &CancellationToken) -> RegistryResult<ContentId> {
        check_cancelled(cancel)?;
        let mut sources = self.inner.sources().to_vec();
        let published: Option<K::Snapshot> = self
            .client
            .resolve_value(&self.roaming_key.id, ObjectKind::Snapshot, true)
            .await?;
        if let Some(published) = published {
            for source in published.sources() {
                if !sources.contains(source) {
                    sources.push(*source);
                }
            }
        }

        let snapshot = fold_sources::<K>(
            &self.client,
            self.inner.id(),
            &sources,
            Some((self.local_key.id, &self.local_stream)),
            !self.options.use_cache,
        )
        .await?;
        check_cancelled(cancel)?;

        let id = self
            .client
            .publish_value(
                &self.roaming_key,
                ObjectKind::Snapshot,
                &snapshot,
                self.options.should_pin,
            )
            .await?;
        tracing::debug!(
            kind = K::LABEL,
            items = snapshot.items().len(),
            sources = snapshot.sources().len(),
            value = %id.short_hex(),
            "published roaming snapshot"
        );
        Ok(id)
    }
}

impl<K: RegistryKind> RegistryRead for ModifiableRegistry<K> {
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

#[async_trait]
impl<K: RegistryKind> RegistryWrite for ModifiableRegistry<K> {
    async fn add(&mut self, item: K::Item, cancel: &CancellationToken) -> RegistryResult<()> {
        let event = K::add_event(self.inner.id(), item);
        self.commit(event, cancel).await
    }

    async fn remove(&mut self, item: K::Item, cancel: &CancellationToken) -> RegistryResult<()> {
        let event = K::remove_event(self.inner.id(), item);
        self.commit(event, cancel).await
    }

    /// Append anything pending, then publish local and roaming together.
    /// Both publishes are always attempted; if either fails the flush fails
    /// and can be retried as a whole.
    async fn flush(&mut self, cancel: &CancellationToken) -> RegistryResult<()> {
        check_cancelled(cancel)?;
        self.append_pending(cancel).await?;

        let this = &*self;
        let (local, roaming) = tokio::join!(this.publish_local(cancel), this.publish_roaming(cancel));
        match (local, roaming) {
            (Ok(_), Ok(roaming)) => {
                tracing::info!(
                    kind = K::LABEL,
                    id = %self.id().short_hex(),
                    roaming = %roaming.short_hex(),
                    "flushed"
                );
                Ok(())
            }
            (local, roaming) => {
                let err = RegistryError::Flush {
                    local: local.err().map(Box::new),
                    roaming: roaming.err().map(Box::new),
                };
                tracing::warn!(kind = K::LABEL, error = %err, "flush failed");
                Err(err)
            }
        }
    }
}

impl ModifiableRegistry<PeerKind> {
    pub fn addresses(&self) -> &[Multiaddr] {
        self.inner.items()
    }

    pub async fn add_address(
        &mut self,
        address: Multiaddr,
        cancel: &CancellationToken,
    ) -> RegistryResult<()> {
        self.add(address, cancel).await
    }

    pub async fn remove_address(
        &mut self,
        address: Multiaddr,
        cancel: &CancellationToken,
    ) -> RegistryResult<()> {
        self.remove(address, cancel).await
    }
}

impl<K, M> ModifiableRegistry<K>
where
    K: RegistryKind<Item = ContentId, Nested = Arc<Repository<M>>>,
    M: RegistryKind,
{
    /// The repository members are created in and resolved through.
    pub fn members(&self) -> &Arc<Repository<M>> {
        &self.nested
    }

    /// Create a new member and add it.
    pub async fn create(&mut self, cancel: &CancellationToken) -> RegistryResult<ModifiableRegistry<M>> {
        check_cancelled(cancel)?;
        let created = self.nested.create(cancel).await?;
        self.add(created.id(), cancel).await?;
        Ok(created)
    }

    /// Remove a member, then delete it from the member repository.
    pub async fn delete(
        &mut self,
        member: &ModifiableRegistry<M>,
        cancel: &CancellationToken,
    ) -> RegistryResult<()> {
        check_cancelled(cancel)?;
        self.remove(member.id(), cancel).await?;
        self.nested.delete(member, cancel).await
    }

    /// Resolve a member through the member repository, which decides
    /// between read-only and modifiable access.
    pub async fn get(&self, id: &ContentId, cancel: &CancellationToken) -> RegistryResult<Member<M>> {
        check_cancelled(cancel)?;
        self.nested.get(id, cancel).await
    }

    /// Lazily resolve every current member, in membership order.
    ///
    /// Each call starts from the current member ids and resolves them again.
    pub fn get_all<'a>(
        &'a self,
        cancel: &'a CancellationToken,
    ) -> impl Stream<Item = RegistryResult<Member<M>>> + 'a {
        stream::iter(self.inner.items().to_vec())
            .then(move |id| async move { self.get(&id, cancel).await })
    }
}

impl<K: RegistryKind> Drop for ModifiableRegistry<K> {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            tracing::warn!(
                kind = K::LABEL,
                id = %self.inner.id().short_hex(),
                pending = self.pending.len(),
                "dropped with events never appended"
            );
        }
    }
}

impl<K: RegistryKind> std::fmt::Debug for ModifiableRegistry<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModifiableRegistry")
            .field("kind", &K::LABEL)
            .field("id", &self.inner.id())
            .field("items", &self.inner.items().len())
            .field("sources", &self.inner.sources().len())
            .field("pending", &self.pending.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures::TryStreamExt;
    use nomad_store::InMemoryContentStore;
    use tokio::sync::broadcast::error::TryRecvError;

    use super::*;
    use crate::config::RepositoryConfig;
    use crate::kinds::PeerSwarmKind;
    use crate::repository::PeerRepository;

    fn addr(s: &str) -> Multiaddr {
        Multiaddr::parse(s).unwrap()
    }

    async fn new_peer(client: &NomadClient) -> ModifiableRegistry<PeerKind> {
        let repo = PeerRepository::new(client.clone(), RepositoryConfig::default(), ()).unwrap();
        repo.create(&CancellationToken::new()).await.unwrap()
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    #[test]
    fn missing_inputs_fail_validation() {
        let client = NomadClient::in_memory();
        let err = ModifiableRegistry::<PeerKind>::from_handler_config(
            HandlerConfig::default(),
            (),
            client,
            RegistryOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, RegistryError::Validation(msg) if msg.contains("roaming key")));
    }

    #[test]
    fn mismatched_roaming_value_fails_validation() {
        let roaming = Key::derive("R.Roaming", &[1u8; 32]);
        let local = Key::derive("R.Local", &[2u8; 32]);
        let config = HandlerConfig::<PeerKind> {
            roaming_id: Some(roaming.id),
            roaming_key: Some(roaming),
            roaming_value: Some(crate::models::Peer::empty(ContentId::from_bytes(b"other"))),
            local_key: Some(local),
            local_value: Some(LocalEventStream::new("Peer")),
        };
        let err = ModifiableRegistry::from_handler_config(
            config,
            (),
            NomadClient::in_memory(),
            RegistryOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, RegistryError::Validation(_)));
    }

    // -----------------------------------------------------------------------
    // Mutation and notification
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn add_fires_once_and_advances_position() {
        let client = NomadClient::in_memory();
        let mut peer = new_peer(&client).await;
        let mut changes = peer.subscribe();
        let cancel = CancellationToken::new();
        assert!(peer.event_stream_position().is_none());

        let address = addr("/ip4/127.0.0.1/tcp/4001");
        peer.add_address(address.clone(), &cancel).await.unwrap();
        peer.add_address(address.clone(), &cancel).await.unwrap();

        assert_eq!(peer.addresses(), &[address.clone()]);
        assert_eq!(changes.try_recv().unwrap(), MembershipChange::Added(vec![address]));
        assert!(matches!(changes.try_recv(), Err(TryRecvError::Empty)));
        assert_eq!(peer.event_stream_position().map(|p| p.seq), Some(2));
        assert_eq!(peer.local_stream().length, 2);
    }

    #[tokio::test]
    async fn cancelled_before_apply_changes_nothing() {
        let client = NomadClient::in_memory();
        let mut peer = new_peer(&client).await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = peer
            .add_address(addr("/ip4/10.0.0.1/tcp/1"), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Cancelled));
        assert!(peer.addresses().is_empty());
        assert_eq!(peer.local_stream().length, 0);
    }

    #[tokio::test]
    async fn failed_append_keeps_state_and_queues_event() {
        let store = Arc::new(InMemoryContentStore::new());
        let client = NomadClient::new(store.clone(), Arc::new(nomad_keys::InMemoryKeyStore::new()));
        let mut peer = new_peer(&client).await;
        let cancel = CancellationToken::new();

        store.set_capacity_limit(Some(store.len()));
        let address = addr("/ip4/10.0.0.2/tcp/2");
        let err = peer.add_address(address.clone(), &cancel).await.unwrap_err();
        assert!(matches!(err, RegistryError::Ledger(_)));
        assert_eq!(peer.addresses(), &[address]);
        assert_eq!(peer.pending_len(), 1);
        assert_eq!(peer.local_stream().length, 0);

        let err = peer.flush(&cancel).await.unwrap_err();
        assert!(matches!(err, RegistryError::Ledger(_)));

        store.set_capacity_limit(None);
        peer.flush(&cancel).await.unwrap();
        assert_eq!(peer.pending_len(), 0);
        assert_eq!(peer.local_stream().length, 1);
    }

    // -----------------------------------------------------------------------
    // Rebuild
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn reset_then_advance_rebuilds_from_log() {
        let client = NomadClient::in_memory();
        let mut peer = new_peer(&client).await;
        let cancel = CancellationToken::new();
        let a = addr("/ip4/10.0.0.1/tcp/1");
        let b = addr("/ip4/10.0.0.2/tcp/2");
        peer.add_address(a.clone(), &cancel).await.unwrap();
        peer.add_address(b.clone(), &cancel).await.unwrap();
        peer.remove_address(a.clone(), &cancel).await.unwrap();

        peer.reset_event_stream_position(&cancel).await.unwrap();
        assert!(peer.addresses().is_empty());
        assert!(peer.event_stream_position().is_none());

        let mut changes = peer.subscribe();
        assert_eq!(peer.advance(&cancel).await.unwrap(), 3);
        assert_eq!(peer.addresses(), &[b]);
        assert_eq!(peer.event_stream_position().map(|p| p.seq), Some(3));
        assert!(changes.try_recv().unwrap().is_added());

        // Nothing new to fold.
        assert_eq!(peer.advance(&cancel).await.unwrap(), 0);
    }

    // -----------------------------------------------------------------------
    // Flush
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn flush_publishes_local_and_roaming() {
        let client = NomadClient::in_memory();
        let mut peer = new_peer(&client).await;
        let cancel = CancellationToken::new();
        let address = addr("/dns4/relay.example/tcp/443/wss");
        peer.add_address(address.clone(), &cancel).await.unwrap();
        peer.flush(&cancel).await.unwrap();

        let local: LocalEventStream = client
            .resolve_value(&peer.local_key().id, ObjectKind::Stream, true)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&local, peer.local_stream());

        let roaming: crate::models::Peer = client
            .resolve_value(&peer.id(), ObjectKind::Snapshot, true)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(roaming.addresses, vec![address]);
        assert_eq!(roaming.sources, vec![peer.local_key().id]);
    }

    #[tokio::test]
    async fn flush_reports_both_halves() {
        let client = NomadClient::in_memory();
        let mut peer = new_peer(&client).await;
        let cancel = CancellationToken::new();

        // Withdrawing the local key makes the local publish fail.
        client.keys.remove_key(&peer.local_key().name).await.unwrap();
        peer.add_address(addr("/ip4/10.0.0.3/tcp/3"), &cancel).await.unwrap();
        let err = peer.flush(&cancel).await.unwrap_err();
        match err {
            RegistryError::Flush { local, roaming } => {
                assert!(local.is_some());
                assert!(roaming.is_none());
            }
            other => panic!("expected flush error, got {other:?}"),
        }
    }

    // -----------------------------------------------------------------------
    // Composite members
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn swarm_create_get_and_delete() {
        let client = NomadClient::in_memory();
        let peers = Arc::new(
            PeerRepository::new(client.clone(), RepositoryConfig::default(), ()).unwrap(),
        );
        let swarms = Repository::<PeerSwarmKind>::new(
            client.clone(),
            RepositoryConfig::default(),
            peers.clone(),
        )
        .unwrap();
        let cancel = CancellationToken::new();
        let mut swarm = swarms.create(&cancel).await.unwrap();

        let first = swarm.create(&cancel).await.unwrap();
        let second = swarm.create(&cancel).await.unwrap();
        assert_eq!(swarm.items(), &[first.id(), second.id()]);

        // `first` still holds the writer lease.
        let member = swarm.get(&first.id(), &cancel).await.unwrap();
        assert!(!member.is_modifiable());

        swarm.delete(&first, &cancel).await.unwrap();
        let remaining: Vec<ContentId> = swarm
            .get_all(&cancel)
            .map_ok(|m| m.id())
            .try_collect()
            .await
            .unwrap();
        assert_eq!(remaining, vec![second.id()]);
        assert!(matches!(
            swarm.get(&first.id(), &cancel).await,
            Err(RegistryError::NotFound { .. })
        ));
    }
}
