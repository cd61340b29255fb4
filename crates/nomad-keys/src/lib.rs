//! Key management and name publishing for Nomad registries.
//!
//! A [`Key`] is a named identity whose id can be pointed at a stored value.
//! Registries use two kinds of keys:
//!
//! - **Roaming** keys carry the public snapshot of a registry. The roaming
//!   key id is the registry's stable identity.
//! - **Local** keys carry one writer's private event stream. The local key
//!   id is recorded as a source in the roaming snapshot.
//!
//! Key names follow a dotted convention (`Nomad.Kubo.PeerSwarm.0.Roaming`)
//! and are validated by [`names::validate_key_name`].

pub mod error;
pub mod memory;
pub mod names;
pub mod traits;
pub mod types;

pub use error::{KeyError, KeyResult};
pub use memory::InMemoryKeyStore;
pub use traits::KeyStore;
pub use types::{Key, KeyNames};
