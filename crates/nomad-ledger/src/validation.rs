use std::collections::BTreeSet;

use nomad_types::ContentId;

use crate::records::{LocalEventStream, StoredEntry};

/// Result of stream validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationReport {
    pub label: String,
    pub entry_count: u64,
    pub sequence_continuous: bool,
    pub links_intact: bool,
    pub single_target: bool,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    /// Returns `true` if all checks passed.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// A specific integrity violation detected during validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    pub seq: u64,
    pub kind: ViolationKind,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViolationKind {
    SequenceGap,
    PrevLinkBreak,
    HeadMismatch,
    LengthMismatch,
    MixedTargets,
}

/// Stream integrity validator.
///
/// Checks an oldest-first entry list (as returned by
/// [`crate::EventLog::entries`]) against the stream it was read from.
/// Registries run it on every source before folding a full rebuild.
pub struct StreamValidator;

impl StreamValidator {
    pub fn validate(stream: &LocalEventStream, entries: &[StoredEntry]) -> ValidationReport {
        let mut violations = Vec::new();
        let mut sequence_continuous = true;
        let mut links_intact = true;
        let mut targets = BTreeSet::new();

        for (index, stored) in entries.iter().enumerate() {
            let entry = &stored.entry;
            let expected_seq = (index + 1) as u64;
            if entry.seq != expected_seq {
                sequence_continuous = false;
                violations.push(Violation {
                    seq: entry.seq,
                    kind: ViolationKind::SequenceGap,
                    description: format!("expected seq {expected_seq}, got {}", entry.seq),
                });
            }

            let expected_prev = index.checked_sub(1).map(|i| entries[i].id);
            if entry.prev != expected_prev {
                links_intact = false;
                violations.push(Violation {
                    seq: entry.seq,
                    kind: ViolationKind::PrevLinkBreak,
                    description: "previous entry link mismatch".into(),
                });
            }

            targets.insert(entry.target_id);
        }

        let last_id = entries.last().map(|e| e.id);
        if stream.head != last_id {
            links_intact = false;
            violations.push(Violation {
                seq: stream.length,
                kind: ViolationKind::HeadMismatch,
                description: "stream head is not the newest entry".into(),
            });
        }

        if stream.length != entries.len() as u64 {
            violations.push(Violation {
                seq: stream.length,
                kind: ViolationKind::LengthMismatch,
                description: format!(
                    "stream length {} but {} entries",
                    stream.length,
                    entries.len()
                ),
            });
        }

        let single_target = targets.len() <= 1;
        if !single_target {
            violations.push(Violation {
                seq: 0,
                kind: ViolationKind::MixedTargets,
                description: format!("entries target {} registries", targets.len()),
            });
        }

        ValidationReport {
            label: stream.label.clone(),
            entry_count: entries.len() as u64,
            sequence_continuous,
            links_intact,
            single_target,
            violations,
        }
    }

    /// The distinct targets of a stream's entries.
    pub fn targets(entries: &[StoredEntry]) -> BTreeSet<ContentId> {
        entries.iter().map(|e| e.entry.target_id).collect()
    }
}
