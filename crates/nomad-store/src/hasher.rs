use nomad_types::ContentId;

/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag (e.g. `"nomad-event-v1"`) that is
/// prepended to every hash computation, so an event record and a log entry
/// with identical bytes never share an id.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for event records.
    pub const EVENT: Self = Self {
        domain: "nomad-event-v1",
    };
    /// Hasher for event log entries.
    pub const ENTRY: Self = Self {
        domain: "nomad-entry-v1",
    };
    /// Hasher for local event stream heads.
    pub const STREAM: Self = Self {
        domain: "nomad-stream-v1",
    };
    /// Hasher for roaming snapshots.
    pub const SNAPSHOT: Self = Self {
        domain: "nomad-snapshot-v1",
    };
    /// Hasher for arbitrary values.
    pub const VALUE: Self = Self {
        domain: "nomad-value-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> ContentId {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        ContentId::from_hash(*hasher.finalize().as_bytes())
    }

    /// Verify that data produces the expected id.
    pub fn verify(&self, data: &[u8], expected: &ContentId) -> bool {
        self.hash(data) == *expected
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}
