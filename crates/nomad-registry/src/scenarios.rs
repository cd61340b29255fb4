//! End-to-end flows across repositories, registries and writers.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::TryStreamExt;
use nomad_keys::InMemoryKeyStore;
use nomad_store::{ContentStore, InMemoryContentStore, ObjectKind, StoreResult, StoredObject};
use nomad_types::{ContentId, Multiaddr};
use tokio::sync::broadcast::error::TryRecvError;
use tokio_util::sync::CancellationToken;

use crate::config::RepositoryConfig;
use crate::error::RegistryError;
use crate::factory::RepoFactory;
use crate::kinds::{MembershipChange, PeerSwarmTrackerKind};
use crate::models::PeerSwarmTracker;
use crate::registry::{RegistryRead, RegistryWrite};
use crate::repository::{fold_sources, PeerSwarmTrackerRepository};
use crate::NomadClient;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn addr(s: &str) -> Multiaddr {
    Multiaddr::parse(s).unwrap()
}

/// Store that fires a cancellation token once an entry has been written.
struct CancelAfterEntry {
    inner: InMemoryContentStore,
    armed: Mutex<Option<CancellationToken>>,
}

#[async_trait]
impl ContentStore for CancelAfterEntry {
    async fn put(&self, object: &StoredObject, pin: bool) -> StoreResult<ContentId> {
        let id = self.inner.put(object, pin).await?;
        if object.kind == ObjectKind::Entry {
            if let Some(token) = self.armed.lock().unwrap().take() {
                token.cancel();
            }
        }
        Ok(id)
    }

    async fn get(&self, id: &ContentId) -> StoreResult<Option<StoredObject>> {
        self.inner.get(id).await
    }

    async fn exists(&self, id: &ContentId) -> StoreResult<bool> {
        self.inner.exists(id).await
    }

    async fn pin(&self, id: &ContentId) -> StoreResult<()> {
        self.inner.pin(id).await
    }

    async fn unpin(&self, id: &ContentId) -> StoreResult<bool> {
        self.inner.unpin(id).await
    }

    async fn is_pinned(&self, id: &ContentId) -> StoreResult<bool> {
        self.inner.is_pinned(id).await
    }
}

// ---------------------------------------------------------------------------
// Peers
// ---------------------------------------------------------------------------

#[tokio::test]
async fn peer_address_lifecycle_notifies_exactly_once() {
    init_tracing();
    let factory = RepoFactory::in_memory().unwrap();
    let cancel = CancellationToken::new();
    let mut peer = factory.peers.create(&cancel).await.unwrap();
    let mut changes = peer.subscribe();

    let address = addr("/ip4/127.0.0.1/tcp/4001");
    peer.add_address(address.clone(), &cancel).await.unwrap();
    assert_eq!(peer.addresses(), &[address.clone()]);
    assert_eq!(changes.try_recv().unwrap(), MembershipChange::Added(vec![address.clone()]));
    assert!(matches!(changes.try_recv(), Err(TryRecvError::Empty)));

    peer.remove_address(address.clone(), &cancel).await.unwrap();
    assert!(peer.addresses().is_empty());
    assert_eq!(changes.try_recv().unwrap(), MembershipChange::Removed(vec![address]));
    assert!(matches!(changes.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn cancellation_after_append_keeps_the_entry() {
    init_tracing();
    let store = Arc::new(CancelAfterEntry {
        inner: InMemoryContentStore::new(),
        armed: Mutex::new(None),
    });
    let client = NomadClient::new(store.clone(), Arc::new(InMemoryKeyStore::new()));
    let factory = RepoFactory::new(client, Default::default()).unwrap();
    let mut peer = factory.peers.create(&CancellationToken::new()).await.unwrap();

    let cancel = CancellationToken::new();
    *store.armed.lock().unwrap() = Some(cancel.clone());
    let first = addr("/ip4/10.0.0.1/tcp/1");
    let err = peer.add_address(first.clone(), &cancel).await.unwrap_err();
    assert!(matches!(err, RegistryError::Cancelled));
    assert_eq!(peer.addresses(), &[first.clone()]);
    assert_eq!(peer.local_stream().length, 1);
    assert_eq!(peer.pending_len(), 0);
    assert!(peer.event_stream_position().is_none());

    let cancel = CancellationToken::new();
    let second = addr("/ip4/10.0.0.2/tcp/2");
    peer.add_address(second.clone(), &cancel).await.unwrap();
    assert_eq!(peer.event_stream_position().map(|p| p.seq), Some(2));
    peer.flush(&cancel).await.unwrap();

    let id = peer.id();
    drop(peer);
    let reopened = factory
        .peers
        .get(&id, &cancel)
        .await
        .unwrap()
        .into_modifiable()
        .unwrap();
    assert_eq!(reopened.addresses(), &[first, second]);
}

#[tokio::test]
async fn cached_reads_lag_until_nocache() {
    init_tracing();
    let client = NomadClient::in_memory();
    let mut config = crate::config::NomadConfig::default();
    config.peer_swarms.use_cache = true;
    let factory = RepoFactory::new(client.clone(), config).unwrap();
    let cancel = CancellationToken::new();

    let swarm = factory.peer_swarms.create(&cancel).await.unwrap();
    let stale: Option<crate::models::PeerSwarm> = client
        .resolve_value(&swarm.id(), ObjectKind::Snapshot, false)
        .await
        .unwrap();
    assert!(stale.unwrap().peers.is_empty());

    // A second writer updates the registry behind the first reader's cache.
    let mut writer = factory.peer_swarms.join(&swarm.id(), &cancel).await.unwrap();
    let peer = factory.peers.create(&cancel).await.unwrap();
    writer.add(peer.id(), &cancel).await.unwrap();
    writer.flush(&cancel).await.unwrap();

    let cached: crate::models::PeerSwarm = client
        .resolve_value(&swarm.id(), ObjectKind::Snapshot, false)
        .await
        .unwrap()
        .unwrap();
    assert!(cached.peers.is_empty());
    let fresh: crate::models::PeerSwarm = client
        .resolve_value(&swarm.id(), ObjectKind::Snapshot, true)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fresh.peers, vec![peer.id()]);
}

// ---------------------------------------------------------------------------
// Swarms
// ---------------------------------------------------------------------------

#[tokio::test]
async fn swarm_members_in_insertion_order_and_delete() {
    init_tracing();
    let factory = RepoFactory::in_memory().unwrap();
    let cancel = CancellationToken::new();
    let mut swarm = factory.peer_swarms.create(&cancel).await.unwrap();

    let a = swarm.create(&cancel).await.unwrap();
    let b = swarm.create(&cancel).await.unwrap();
    swarm.flush(&cancel).await.unwrap();

    let ids: Vec<ContentId> = swarm
        .get_all(&cancel)
        .map_ok(|member| member.id())
        .try_collect()
        .await
        .unwrap();
    assert_eq!(ids, vec![a.id(), b.id()]);

    swarm.delete(&a, &cancel).await.unwrap();
    let ids: Vec<ContentId> = swarm
        .get_all(&cancel)
        .map_ok(|member| member.id())
        .try_collect()
        .await
        .unwrap();
    assert_eq!(ids, vec![b.id()]);
    assert!(matches!(
        swarm.members().get(&a.id(), &cancel).await,
        Err(RegistryError::NotFound { .. })
    ));
}

#[tokio::test]
async fn member_handles_never_fork_the_log() {
    init_tracing();
    let factory = RepoFactory::in_memory().unwrap();
    let cancel = CancellationToken::new();
    let mut swarm = factory.peer_swarms.create(&cancel).await.unwrap();
    let mut first = swarm.create(&cancel).await.unwrap();
    swarm.flush(&cancel).await.unwrap();

    let second = swarm.get(&first.id(), &cancel).await.unwrap();
    assert!(second.into_modifiable().is_err());

    let a = addr("/ip4/10.0.0.1/tcp/1");
    first.add_address(a.clone(), &cancel).await.unwrap();
    first.flush(&cancel).await.unwrap();
    let id = first.id();
    drop(first);

    let mut second = swarm
        .get(&id, &cancel)
        .await
        .unwrap()
        .into_modifiable()
        .unwrap();
    assert_eq!(second.addresses(), &[a.clone()]);
    let b = addr("/ip4/10.0.0.2/tcp/2");
    second.add_address(b.clone(), &cancel).await.unwrap();
    second.flush(&cancel).await.unwrap();
    drop(second);

    let published: crate::models::Peer = factory
        .client
        .resolve_value(&id, ObjectKind::Snapshot, true)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(published.addresses, vec![a.clone(), b.clone()]);
    let reopened = factory.peers.get(&id, &cancel).await.unwrap().into_modifiable().unwrap();
    assert_eq!(reopened.addresses(), &[a, b]);
}

// ---------------------------------------------------------------------------
// Trackers and multiple writers
// ---------------------------------------------------------------------------

#[tokio::test]
async fn two_writers_converge_regardless_of_source_order() {
    init_tracing();
    let factory = RepoFactory::in_memory().unwrap();
    let cancel = CancellationToken::new();

    let mut tracker_a = factory.trackers.create(&cancel).await.unwrap();
    let s1 = tracker_a.create(&cancel).await.unwrap();
    tracker_a.flush(&cancel).await.unwrap();

    let repo_b = PeerSwarmTrackerRepository::new(
        factory.client.clone(),
        RepositoryConfig::default(),
        factory.peer_swarms.clone(),
    )
    .unwrap();
    let mut tracker_b = repo_b.join(&tracker_a.id(), &cancel).await.unwrap();
    assert_eq!(tracker_b.items(), &[s1.id()]);
    let s2 = factory.peer_swarms.create(&cancel).await.unwrap();
    tracker_b.add(s2.id(), &cancel).await.unwrap();
    tracker_b.flush(&cancel).await.unwrap();
    tracker_a.flush(&cancel).await.unwrap();

    let published: PeerSwarmTracker = factory
        .client
        .resolve_value(&tracker_a.id(), ObjectKind::Snapshot, true)
        .await
        .unwrap()
        .unwrap();
    let expected: BTreeSet<ContentId> = [s1.id(), s2.id()].into_iter().collect();
    assert_eq!(published.peer_swarms.iter().copied().collect::<BTreeSet<_>>(), expected);

    let la = tracker_a.local_key().id;
    let lb = tracker_b.local_key().id;
    for order in [[la, lb], [lb, la]] {
        let folded = fold_sources::<PeerSwarmTrackerKind>(
            &factory.client,
            tracker_a.id(),
            &order,
            None,
            true,
        )
        .await
        .unwrap();
        assert_eq!(folded.peer_swarms.iter().copied().collect::<BTreeSet<_>>(), expected);
    }
}

#[tokio::test]
async fn registry_without_local_key_opens_read_only() {
    init_tracing();
    let factory = RepoFactory::in_memory().unwrap();
    let cancel = CancellationToken::new();
    let mut swarm = factory.peer_swarms.create(&cancel).await.unwrap();
    let peer = swarm.create(&cancel).await.unwrap();
    swarm.flush(&cancel).await.unwrap();

    factory
        .client
        .keys
        .remove_key(&swarm.local_key().name)
        .await
        .unwrap();
    let peer_id = peer.id();
    drop(peer);
    let member = factory.peer_swarms.get(&swarm.id(), &cancel).await.unwrap();
    assert!(!member.is_modifiable());
    assert_eq!(member.items(), &[peer_id]);

    let crate::registry::Member::ReadOnly(reader) = member else {
        unreachable!()
    };
    let peers: Vec<_> = reader.get_all(&cancel).try_collect().await.unwrap();
    assert_eq!(peers.len(), 1);
    // Peer keys are still held, so the member itself is writable.
    assert!(peers[0].is_modifiable());
}
