use std::path::Path;

use nomad_keys::names::validate_key_name;
use nomad_keys::Key;
use nomad_ledger::LocalEventStream;
use nomad_types::ContentId;
use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, RegistryResult};
use crate::kinds::RegistryKind;

/// Settings for one repository.
///
/// Unset names fall back to the registry kind's defaults, so one section of
/// a config file only needs to mention what it changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Prefix for generated key names (`{prefix}.{n}.Local`).
    pub key_name_prefix: Option<String>,
    /// Fixed roaming key name. Must be set together with `local_key_name`.
    pub roaming_key_name: Option<String>,
    /// Fixed local key name. Must be set together with `roaming_key_name`.
    pub local_key_name: Option<String>,
    /// Label given to new local event streams.
    pub default_event_stream_label: Option<String>,
    /// Allow resolving other writers' published values from the key store
    /// cache. When off, every resolve reads the latest published value.
    pub use_cache: bool,
    /// Pin everything this repository writes.
    pub should_pin: bool,
    /// Buffered notifications per subscriber before slow receivers lag.
    pub channel_capacity: usize,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            key_name_prefix: None,
            roaming_key_name: None,
            local_key_name: None,
            default_event_stream_label: None,
            use_cache: false,
            should_pin: true,
            channel_capacity: 64,
        }
    }
}

impl RepositoryConfig {
    pub fn key_name_prefix<K: RegistryKind>(&self) -> &str {
        self.key_name_prefix.as_deref().unwrap_or(K::DEFAULT_PREFIX)
    }

    pub fn event_stream_label<K: RegistryKind>(&self) -> &str {
        self.default_event_stream_label
            .as_deref()
            .unwrap_or(K::LABEL)
    }

    pub fn options(&self) -> RegistryOptions {
        RegistryOptions {
            use_cache: self.use_cache,
            should_pin: self.should_pin,
            channel_capacity: self.channel_capacity,
        }
    }

    pub fn validate(&self) -> RegistryResult<()> {
        if self.channel_capacity == 0 {
            return Err(RegistryError::Config(
                "channel_capacity must be at least 1".into(),
            ));
        }
        if self.roaming_key_name.is_some() != self.local_key_name.is_some() {
            return Err(RegistryError::Config(
                "roaming_key_name and local_key_name must be set together".into(),
            ));
        }
        let names = [
            &self.key_name_prefix,
            &self.roaming_key_name,
            &self.local_key_name,
        ];
        for name in names.into_iter().flatten() {
            validate_key_name(name)?;
        }
        Ok(())
    }
}

/// The subset of [`RepositoryConfig`] a registry instance needs at runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegistryOptions {
    pub use_cache: bool,
    pub should_pin: bool,
    pub channel_capacity: usize,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        RepositoryConfig::default().options()
    }
}

/// Configuration for the peer, swarm and tracker repositories.
///
/// ```toml
/// [peers]
/// key_name_prefix = "Lab.Peer"
///
/// [trackers]
/// use_cache = true
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NomadConfig {
    pub peers: RepositoryConfig,
    pub peer_swarms: RepositoryConfig,
    pub trackers: RepositoryConfig,
}

impl NomadConfig {
    pub fn from_toml_str(s: &str) -> RegistryResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| RegistryError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> RegistryResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| RegistryError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> RegistryResult<String> {
        toml::to_string(self).map_err(|e| RegistryError::Config(e.to_string()))
    }

    pub fn validate(&self) -> RegistryResult<()> {
        self.peers.validate()?;
        self.peer_swarms.validate()?;
        self.trackers.validate()
    }
}

/// Everything needed to bind a registry instance to its keys and values.
///
/// Modifiable registries need both keys and both values. Read-only ones
/// need a roaming id (or key) and the roaming value.
#[derive(Clone, Debug)]
pub struct HandlerConfig<K: RegistryKind> {
    pub roaming_id: Option<ContentId>,
    pub roaming_key: Option<Key>,
    pub roaming_value: Option<K::Snapshot>,
    pub local_key: Option<Key>,
    pub local_value: Option<LocalEventStream>,
}

// Written out so snapshots need not implement `Default`.
impl<K: RegistryKind> Default for HandlerConfig<K> {
    fn default() -> Self {
        Self {
            roaming_id: None,
            roaming_key: None,
            roaming_value: None,
            local_key: None,
            local_value: None,
        }
    }
}
