//! The three registry kinds and what distinguishes them.
//!
//! Peers, swarms and trackers share one generic implementation; a
//! [`RegistryKind`] supplies the snapshot model, the member type, the event
//! variants the kind owns, and the nested member repository.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use nomad_types::{ContentId, Multiaddr};

use crate::events::UpdateEvent;
use crate::models::{self, Snapshot};
use crate::repository::Repository;

/// Whether an event adds or removes its member.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    Add,
    Remove,
}

/// Notification payload: the exact batch of members a change touched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MembershipChange<T> {
    Added(Vec<T>),
    Removed(Vec<T>),
}

impl<T> MembershipChange<T> {
    pub fn items(&self) -> &[T] {
        match self {
            Self::Added(items) | Self::Removed(items) => items,
        }
    }

    pub fn is_added(&self) -> bool {
        matches!(self, Self::Added(_))
    }
}

pub trait RegistryKind: Clone + Debug + Default + Send + Sync + 'static {
    /// Published roaming model.
    type Snapshot: Snapshot<Item = Self::Item>;

    /// Member type.
    type Item: Clone + Eq + Hash + Debug + Send + Sync + 'static;

    /// Repository for members, or `()` for leaf kinds.
    type Nested: Clone + Send + Sync + 'static;

    /// Human-readable label, also the default event stream label.
    const LABEL: &'static str;

    /// Default key name prefix.
    const DEFAULT_PREFIX: &'static str;

    fn add_event(target_id: ContentId, item: Self::Item) -> UpdateEvent;

    fn remove_event(target_id: ContentId, item: Self::Item) -> UpdateEvent;

    /// The change and member carried by `event`, or `None` if this kind
    /// does not own the variant.
    fn classify(event: &UpdateEvent) -> Option<(ChangeKind, Self::Item)>;
}

/// A peer: a registry of network addresses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PeerKind;

/// A peer swarm: a registry of peers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PeerSwarmKind;

/// A peer swarm tracker: a registry of peer swarms.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PeerSwarmTrackerKind;

impl RegistryKind for PeerKind {
    type Snapshot = models::Peer;
    type Item = Multiaddr;
    type Nested = ();

    const LABEL: &'static str = "Peer";
    const DEFAULT_PREFIX: &'static str = "Nomad.Kubo.PeerSwarm.Peer";

    fn add_event(target_id: ContentId, address: Multiaddr) -> UpdateEvent {
        UpdateEvent::AddressAdd { target_id, address }
    }

    fn remove_event(target_id: ContentId, address: Multiaddr) -> UpdateEvent {
        UpdateEvent::AddressRemove { target_id, address }
    }

    fn classify(event: &UpdateEvent) -> Option<(ChangeKind, Multiaddr)> {
        match event {
            UpdateEvent::AddressAdd { address, .. } => Some((ChangeKind::Add, address.clone())),
            UpdateEvent::AddressRemove { address, .. } => {
                Some((ChangeKind::Remove, address.clone()))
            }
            _ => None,
        }
    }
}

impl RegistryKind for PeerSwarmKind {
    type Snapshot = models::PeerSwarm;
    type Item = ContentId;
    type Nested = Arc<Repository<PeerKind>>;

    const LABEL: &'static str = "Peer Swarm";
    const DEFAULT_PREFIX: &'static str = "Nomad.Kubo.PeerSwarm";

    fn add_event(target_id: ContentId, peer_id: ContentId) -> UpdateEvent {
        UpdateEvent::PeerAdd { target_id, peer_id }
    }

    fn remove_event(target_id: ContentId, peer_id: ContentId) -> UpdateEvent {
        UpdateEvent::PeerRemove { target_id, peer_id }
    }

    fn classify(event: &UpdateEvent) -> Option<(ChangeKind, ContentId)> {
        match event {
            UpdateEvent::PeerAdd { peer_id, .. } => Some((ChangeKind::Add, *peer_id)),
            UpdateEvent::PeerRemove { peer_id, .. } => Some((ChangeKind::Remove, *peer_id)),
            _ => None,
        }
    }
}

impl RegistryKind for PeerSwarmTrackerKind {
    type Snapshot = models::PeerSwarmTracker;
    type Item = ContentId;
    type Nested = Arc<Repository<PeerSwarmKind>>;

    const LABEL: &'static str = "Peer Swarm Tracker";
    const DEFAULT_PREFIX: &'static str = "Nomad.Kubo.PeerSwarm.Tracker";

    fn add_event(target_id: ContentId, peer_swarm_id: ContentId) -> UpdateEvent {
        UpdateEvent::PeerSwarmAdd {
            target_id,
            peer_swarm_id,
        }
    }

    fn remove_event(target_id: ContentId, peer_swarm_id: ContentId) -> UpdateEvent {
        UpdateEvent::PeerSwarmRemove {
            target_id,
            peer_swarm_id,
        }
    }

    fn classify(event: &UpdateEvent) -> Option<(ChangeKind, ContentId)> {
        match event {
            UpdateEvent::PeerSwarmAdd { peer_swarm_id, .. } => {
                Some((ChangeKind::Add, *peer_swarm_id))
            }
            UpdateEvent::PeerSwarmRemove { peer_swarm_id, .. } => {
                Some((ChangeKind::Remove, *peer_swarm_id))
            }
            _ => None,
        }
    }
}
