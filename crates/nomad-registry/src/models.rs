//! Roaming snapshot models.
//!
//! A snapshot is what a registry publishes under its roaming key: its id,
//! the ordered member list, and the sources (local key ids) whose event
//! logs were folded to produce it.

use std::fmt::Debug;

use nomad_types::{ContentId, Multiaddr};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Common shape of every roaming snapshot.
///
/// Invariants: no item appears twice, no source appears twice, and sources
/// never influence item order.
pub trait Snapshot:
    Clone + Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    type Item;

    /// An empty snapshot for `id`.
    fn empty(id: ContentId) -> Self;

    fn id(&self) -> ContentId;

    fn items(&self) -> &[Self::Item];

    fn items_mut(&mut self) -> &mut Vec<Self::Item>;

    fn sources(&self) -> &[ContentId];

    fn sources_mut(&mut self) -> &mut Vec<ContentId>;

    /// Record a source. Returns `false` if it was already known.
    fn add_source(&mut self, source: ContentId) -> bool {
        let sources = self.sources_mut();
        if sources.contains(&source) {
            return false;
        }
        sources.push(source);
        true
    }
}

/// A peer and the network addresses it can be reached at.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Peer {
    pub id: ContentId,
    pub addresses: Vec<Multiaddr>,
    pub sources: Vec<ContentId>,
}

/// A set of peers, by peer roaming id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PeerSwarm {
    pub id: ContentId,
    pub peers: Vec<ContentId>,
    pub sources: Vec<ContentId>,
}

/// A set of peer swarms, by swarm roaming id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PeerSwarmTracker {
    pub id: ContentId,
    pub peer_swarms: Vec<ContentId>,
    pub sources: Vec<ContentId>,
}

macro_rules! impl_snapshot {
    ($ty:ty, $items:ident, $item:ty) => {
        impl Snapshot for $ty {
            type Item = $item;

            fn empty(id: ContentId) -> Self {
                Self {
                    id,
                    $items: Vec::new(),
                    sources: Vec::new(),
                }
            }

            fn id(&self) -> ContentId {
                self.id
            }

            fn items(&self) -> &[$item] {
                &self.$items
            }

            fn items_mut(&mut self) -> &mut Vec<$item> {
                &mut self.$items
            }

            fn sources(&self) -> &[ContentId] {
                &self.sources
            }

            fn sources_mut(&mut self) -> &mut Vec<ContentId> {
                &mut self.sources
            }
        }
    };
}

impl_snapshot!(Peer, addresses, Multiaddr);
impl_snapshot!(PeerSwarm, peers, ContentId);
impl_snapshot!(PeerSwarmTracker, peer_swarms, ContentId);
