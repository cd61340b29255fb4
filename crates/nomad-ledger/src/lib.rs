//! Append-only event logs for Nomad registries.
//!
//! Every writer of a registry owns one local event stream: a singly linked
//! list of content-addressed entries, newest first. This crate provides:
//! - The record types ([`LocalEventStream`], [`EventStreamEntry`],
//!   [`EventStreamPosition`])
//! - [`EventLog`], which appends events atomically and reads a stream back
//!   oldest-first, in full or from a position
//! - Stream validation (sequence, links, length, single target)

pub mod error;
pub mod log;
pub mod records;
pub mod validation;

pub use error::{LedgerError, LedgerResult};
pub use log::EventLog;
pub use records::{EventStreamEntry, EventStreamPosition, LocalEventStream, StoredEntry};
pub use validation::{StreamValidator, ValidationReport, Violation, ViolationKind};
