//! Folding update events into a roaming snapshot.
//!
//! Adds and removes are idempotent and absence tolerant: adding a member
//! that is already present and removing one that is absent are both no-ops
//! that produce no notification. Replaying a log twice therefore leaves the
//! snapshot unchanged, and logs from different writers can be folded in any
//! order as long as they do not touch the same member.

use std::marker::PhantomData;

use crate::error::{RegistryError, RegistryResult};
use crate::events::UpdateEvent;
use crate::kinds::{ChangeKind, MembershipChange, RegistryKind};
use crate::models::Snapshot;

/// Pure projection functions for registry kind `K`.
pub struct Projector<K>(PhantomData<K>);

impl<K: RegistryKind> Projector<K> {
    /// Apply one event and return the membership change it caused, if any.
    ///
    /// A variant that `K` does not own is `UnhandledEvent`.
    pub fn apply(
        snapshot: &mut K::Snapshot,
        event: &UpdateEvent,
    ) -> RegistryResult<Option<MembershipChange<K::Item>>> {
        match K::classify(event) {
            Some((ChangeKind::Add, item)) => Ok(Self::apply_add(snapshot, item)),
            Some((ChangeKind::Remove, item)) => Ok(Self::apply_remove(snapshot, &item)),
            None => Err(RegistryError::UnhandledEvent {
                kind: K::LABEL,
                event_id: event.event_id().to_string(),
            }),
        }
    }

    pub fn apply_add(
        snapshot: &mut K::Snapshot,
        item: K::Item,
    ) -> Option<MembershipChange<K::Item>> {
        let items = snapshot.items_mut();
        if items.contains(&item) {
            return None;
        }
        items.push(item.clone());
        Some(MembershipChange::Added(vec![item]))
    }

    pub fn apply_remove(
        snapshot: &mut K::Snapshot,
        item: &K::Item,
    ) -> Option<MembershipChange<K::Item>> {
        let items = snapshot.items_mut();
        let index = items.iter().position(|existing| existing == item)?;
        let removed = items.remove(index);
        Some(MembershipChange::Removed(vec![removed]))
    }

    /// Clear membership. Sources are kept.
    pub fn reset(snapshot: &mut K::Snapshot) {
        snapshot.items_mut().clear();
    }

    /// Apply a sequence of events, skipping those aimed at another registry.
    pub fn fold_events<'a, I>(
        snapshot: &mut K::Snapshot,
        events: I,
    ) -> RegistryResult<Vec<MembershipChange<K::Item>>>
    where
        I: IntoIterator<Item = &'a UpdateEvent>,
    {
        let id = snapshot.id();
        let mut changes = Vec::new();
        for event in events {
            if event.target_id() != id {
                tracing::debug!(
                    kind = K::LABEL,
                    event = %event,
                    "skipping event for another registry"
                );
                continue;
            }
            changes.extend(Self::apply(snapshot, event)?);
        }
        Ok(changes)
    }
}
