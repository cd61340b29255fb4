//! Read-only and modifiable registry views.
//!
//! [`RegistryRead`] is what every view offers: its id, current members,
//! sources, and a notification channel. [`RegistryWrite`] adds mutation and
//! is only implemented by [`ModifiableRegistry`], which holds the keys.

mod modifiable;
mod read_only;

use async_trait::async_trait;
use nomad_types::ContentId;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::error::{RegistryError, RegistryResult};
use crate::kinds::{MembershipChange, PeerKind, PeerSwarmKind, PeerSwarmTrackerKind, RegistryKind};

pub use modifiable::ModifiableRegistry;
pub use read_only::ReadOnlyRegistry;

/// Receiver of membership notifications.
pub type ChangeStream<T> = broadcast::Receiver<MembershipChange<T>>;

pub trait RegistryRead: Send + Sync {
    type Item: Clone + Send + Sync + 'static;

    /// The roaming id.
    fn id(&self) -> ContentId;

    fn items(&self) -> &[Self::Item];

    /// Local key ids whose logs contribute to this registry.
    fn sources(&self) -> &[ContentId];

    /// Subscribe to membership changes from now on.
    fn subscribe(&self) -> ChangeStream<Self::Item>;
}

#[async_trait]
pub trait RegistryWrite: RegistryRead {
    async fn add(&mut self, item: Self::Item, cancel: &CancellationToken) -> RegistryResult<()>;

    async fn remove(&mut self, item: Self::Item, cancel: &CancellationToken)
        -> RegistryResult<()>;

    /// Publish the local stream and the roaming snapshot.
    async fn flush(&mut self, cancel: &CancellationToken) -> RegistryResult<()>;
}

/// A registry as handed out by a repository: modifiable when this process
/// holds its keys, read-only otherwise.
pub enum Member<K: RegistryKind> {
    ReadOnly(ReadOnlyRegistry<K>),
    Modifiable(ModifiableRegistry<K>),
}

impl<K: RegistryKind> Member<K> {
    pub fn is_modifiable(&self) -> bool {
        matches!(self, Self::Modifiable(_))
    }

    pub fn as_modifiable(&self) -> Option<&ModifiableRegistry<K>> {
        match self {
            Self::Modifiable(registry) => Some(registry),
            Self::ReadOnly(_) => None,
        }
    }

    pub fn as_modifiable_mut(&mut self) -> Option<&mut ModifiableRegistry<K>> {
        match self {
            Self::Modifiable(registry) => Some(registry),
            Self::ReadOnly(_) => None,
        }
    }

    /// The modifiable registry, or `Validation` if only read access is held.
    pub fn into_modifiable(self) -> RegistryResult<ModifiableRegistry<K>> {
        match self {
            Self::Modifiable(registry) => Ok(registry),
            Self::ReadOnly(registry) => Err(RegistryError::Validation(format!(
                "{} {} is read-only here",
                K::LABEL,
                registry.id()
            ))),
        }
    }
}

impl<K: RegistryKind> RegistryRead for Member<K> {
    type Item = K::Item;

    fn id(&self) -> ContentId {
        match self {
            Self::ReadOnly(r) => r.id(),
            Self::Modifiable(m) => m.id(),
        }
    }

    fn items(&self) -> &[K::Item] {
        match self {
            Self::ReadOnly(r) => r.items(),
            Self::Modifiable(m) => m.items(),
        }
    }

    fn sources(&self) -> &[ContentId] {
        match self {
            Self::ReadOnly(r) => r.sources(),
            Self::Modifiable(m) => m.sources(),
        }
    }

    fn subscribe(&self) -> ChangeStream<K::Item> {
        match self {
            Self::ReadOnly(r) => r.subscribe(),
            Self::Modifiable(m) => m.subscribe(),
        }
    }
}

impl<K: RegistryKind> std::fmt::Debug for Member<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReadOnly(r) => f.debug_tuple("ReadOnly").field(r).finish(),
            Self::Modifiable(m) => f.debug_tuple("Modifiable").field(m).finish(),
        }
    }
}

pub type ModifiablePeer = ModifiableRegistry<PeerKind>;
pub type ModifiablePeerSwarm = ModifiableRegistry<PeerSwarmKind>;
pub type ModifiablePeerSwarmTracker = ModifiableRegistry<PeerSwarmTrackerKind>;

pub type ReadOnlyPeer = ReadOnlyRegistry<PeerKind>;
pub type ReadOnlyPeerSwarm = ReadOnlyRegistry<PeerSwarmKind>;
pub type ReadOnlyPeerSwarmTracker = ReadOnlyRegistry<PeerSwarmTrackerKind>;

/// Fail with `Cancelled` if `cancel` has fired.
pub(crate) fn check_cancelled(cancel: &CancellationToken) -> RegistryResult<()> {
    if cancel.is_cancelled() {
        return Err(RegistryError::Cancelled);
    }
    Ok(())
}
