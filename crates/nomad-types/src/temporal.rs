use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Wall-clock timestamp with a logical counter, used to stamp event log
/// entries.
///
/// Entries appended in quick succession by one writer can share a
/// millisecond; [`TemporalAnchor::tick`] keeps stamps strictly increasing
/// within a stream. Stamps are informational: they never decide fold order,
/// which follows the log links.
///
/// Ordering: `physical_ms` → `logical` → `node_id` (total order).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemporalAnchor {
    /// Wall-clock milliseconds since UNIX epoch.
    pub physical_ms: u64,
    /// Logical counter for stamps at the same physical time.
    pub logical: u32,
    /// Writer identifier to break ties between writers.
    pub node_id: u16,
}

impl TemporalAnchor {
    /// Create a new anchor with explicit values.
    pub fn new(physical_ms: u64, logical: u32, node_id: u16) -> Self {
        Self {
            physical_ms,
            logical,
            node_id,
        }
    }

    /// Create an anchor for the current wall-clock time.
    pub fn now(node_id: u16) -> Self {
        Self {
            physical_ms: wall_clock_ms(),
            logical: 0,
            node_id,
        }
    }

    /// The zero anchor.
    pub const fn zero() -> Self {
        Self {
            physical_ms: 0,
            logical: 0,
            node_id: 0,
        }
    }

    /// The next stamp after `self`: the current wall-clock time if it moved
    /// forward, otherwise the same millisecond with the logical counter
    /// bumped.
    pub fn tick(&self, node_id: u16) -> Self {
        let now_ms = wall_clock_ms();
        if now_ms > self.physical_ms {
            Self::new(now_ms, 0, node_id)
        } else {
            Self::new(self.physical_ms, self.logical + 1, node_id)
        }
    }

    /// Returns `true` if this anchor is after `other`.
    pub fn is_after(&self, other: &Self) -> bool {
        self > other
    }
}

fn wall_clock_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

impl PartialOrd for TemporalAnchor {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TemporalAnchor {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.physical_ms
            .cmp(&other.physical_ms)
            .then(self.logical.cmp(&other.logical))
            .then(self.node_id.cmp(&other.node_id))
    }
}

impl fmt::Debug for TemporalAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TemporalAnchor({}ms.{}.n{})",
            self.physical_ms, self.logical, self.node_id
        )
    }
}

impl fmt::Display for TemporalAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.n{}", self.physical_ms, self.logical, self.node_id)
    }
}
