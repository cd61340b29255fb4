//! Event-sourced replicated registries for Nomad.
//!
//! Three registry kinds share one implementation:
//! - **Peer**: the network addresses a peer can be reached at
//! - **Peer swarm**: a set of peers
//! - **Peer swarm tracker**: a set of peer swarms
//!
//! Every writer appends update events to its own local event stream and
//! publishes it under a local key. The registry's public state, the roaming
//! snapshot, is folded from all writers' streams and published under the
//! roaming key. Repositories hand out [`ModifiableRegistry`] views when this
//! process holds the keys and [`ReadOnlyRegistry`] views otherwise.
//!
//! ```no_run
//! # async fn demo() -> nomad_registry::RegistryResult<()> {
//! use nomad_registry::{RegistryWrite, RepoFactory};
//! use nomad_types::Multiaddr;
//! use tokio_util::sync::CancellationToken;
//!
//! let factory = RepoFactory::in_memory()?;
//! let cancel = CancellationToken::new();
//! let mut peer = factory.peers.create(&cancel).await?;
//! let address = Multiaddr::parse("/ip4/127.0.0.1/tcp/4001").expect("valid address");
//! peer.add_address(address, &cancel).await?;
//! peer.flush(&cancel).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod factory;
pub mod kinds;
pub mod models;
pub mod projection;
pub mod registry;
pub mod repository;

#[cfg(test)]
mod scenarios;

pub use client::{NomadClient, WriterLease};
pub use config::{HandlerConfig, NomadConfig, RegistryOptions, RepositoryConfig};
pub use error::{RegistryError, RegistryResult};
pub use events::{EventCodec, EventCodecError, UpdateEvent};
pub use factory::RepoFactory;
pub use kinds::{ChangeKind, MembershipChange, PeerKind, PeerSwarmKind, PeerSwarmTrackerKind, RegistryKind};
pub use models::{Peer, PeerSwarm, PeerSwarmTracker, Snapshot};
pub use projection::Projector;
pub use registry::{
    ChangeStream, Member, ModifiablePeer, ModifiablePeerSwarm, ModifiablePeerSwarmTracker,
    ModifiableRegistry, ReadOnlyPeer, ReadOnlyPeerSwarm, ReadOnlyPeerSwarmTracker,
    ReadOnlyRegistry, RegistryRead, RegistryWrite,
};
pub use repository::{
    fold_sources, ManagedKeys, PeerRepository, PeerSwarmRepository, PeerSwarmTrackerRepository,
    Repository,
};

pub use nomad_keys::{Key, KeyNames};
pub use nomad_ledger::{EventStreamPosition, LocalEventStream};
pub use nomad_types::{ContentId, Multiaddr};
