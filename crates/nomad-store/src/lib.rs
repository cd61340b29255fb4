//! Content-addressed value storage for Nomad registries.
//!
//! Every durable piece of registry data (event records, event log entries,
//! local event streams, roaming snapshots) is stored as an immutable object
//! identified by its BLAKE3 hash, domain-separated by object kind.
//!
//! # Storage Backends
//!
//! All backends implement the async [`ContentStore`] trait:
//!
//! - [`InMemoryContentStore`] -- `HashMap`-based store for tests and embedding
//!
//! Typed values are written and read through [`ContentStoreExt`], which is
//! implemented for every store.
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written (content-addressing guarantees this).
//! 2. Writing identical content twice is a no-op that returns the same id.
//! 3. The store never interprets object contents.
//! 4. All backend errors are propagated, never silently ignored.

pub mod error;
pub mod hasher;
pub mod memory;
pub mod object;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use hasher::ContentHasher;
pub use memory::InMemoryContentStore;
pub use object::{ObjectKind, StoredObject};
pub use traits::{ContentStore, ContentStoreExt};
