//! Foundation types for Nomad replicated registries.
//!
//! Every other Nomad crate depends on `nomad-types`.
//!
//! # Key Types
//!
//! - [`ContentId`] -- Content-addressed identifier (BLAKE3 hash) for stored
//!   values, event log entries, and key identities
//! - [`Multiaddr`] -- Validated, normalized network address
//! - [`TemporalAnchor`] -- Wall-clock plus logical counter timestamp used to
//!   stamp event log entries

pub mod content_id;
pub mod error;
pub mod multiaddr;
pub mod temporal;

pub use content_id::ContentId;
pub use error::TypeError;
pub use multiaddr::{Multiaddr, Protocol};
pub use temporal::TemporalAnchor;
