//! Key identity types.

use nomad_types::ContentId;
use serde::{Deserialize, Serialize};

/// Domain tag for key id derivation.
const KEY_DOMAIN: &[u8] = b"nomad-key-v1";

/// A named key. Its id is the address under which the key publishes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Key {
    /// Human-readable key name, unique within a key store.
    pub name: String,
    /// Key identity, derived from the name and the key material.
    pub id: ContentId,
}

impl Key {
    /// Derive a key from its name and secret material.
    ///
    /// Two keys with the same name but different material get different ids,
    /// so recreating a removed key never revives the old identity.
    pub fn derive(name: &str, material: &[u8; 32]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(KEY_DOMAIN);
        hasher.update(b":");
        hasher.update(name.as_bytes());
        hasher.update(b":");
        hasher.update(material);
        Self {
            name: name.to_string(),
            id: ContentId::from_hash(*hasher.finalize().as_bytes()),
        }
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.id.short_hex())
    }
}

/// The names of a registry's local and roaming keys.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyNames {
    pub local: String,
    pub roaming: String,
}
