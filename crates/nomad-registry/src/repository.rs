//! Creating, finding, joining and deleting registries of one kind.
//!
//! A repository decides whether this process may write to a registry by
//! checking whether it holds the registry's keys. Keys it created or joined
//! with are remembered; anything else is looked up in the key store by the
//! naming convention `{stem}.Roaming` / `{stem}.Local`.

use std::collections::HashSet;
use std::sync::RwLock;

use nomad_keys::names::{self, LOCAL_SUFFIX, ROAMING_SUFFIX};
use nomad_keys::{Key, KeyError, KeyNames};
use nomad_ledger::{EventLog, LocalEventStream, StreamValidator};
use nomad_store::ObjectKind;
use nomad_types::ContentId;
use tokio_util::sync::CancellationToken;

use crate::client::NomadClient;
use crate::config::{HandlerConfig, RepositoryConfig};
use crate::error::{RegistryError, RegistryResult};
use crate::events::UpdateEvent;
use crate::kinds::{PeerKind, PeerSwarmKind, PeerSwarmTrackerKind, RegistryKind};
use crate::models::Snapshot;
use crate::projection::Projector;
use crate::registry::{check_cancelled, Member, ModifiableRegistry, ReadOnlyRegistry, RegistryRead, RegistryWrite};

pub type PeerRepository = Repository<PeerKind>;
pub type PeerSwarmRepository = Repository<PeerSwarmKind>;
pub type PeerSwarmTrackerRepository = Repository<PeerSwarmTrackerKind>;

/// A roaming/local key pair this repository can write with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManagedKeys {
    pub roaming: Key,
    pub local: Key,
}

pub struct Repository<K: RegistryKind> {
    client: NomadClient,
    config: RepositoryConfig,
    nested: K::Nested,
    managed_keys: RwLock<Vec<ManagedKeys>>,
}

impl<K: RegistryKind> Repository<K> {
    pub fn new(client: NomadClient, config: RepositoryConfig, nested: K::Nested) -> RegistryResult<Self> {
        config.validate()?;
        Ok(Self {
            client,
            config,
            nested,
            managed_keys: RwLock::new(Vec::new()),
        })
    }

    pub fn client(&self) -> &NomadClient {
        &self.client
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// Repository members are resolved through.
    pub fn nested(&self) -> &K::Nested {
        &self.nested
    }

    /// Key pairs created or joined through this repository.
    pub fn managed_keys(&self) -> Vec<ManagedKeys> {
        self.managed_keys.read().expect("lock poisoned").clone()
    }

    fn remember(&self, keys: ManagedKeys) {
        let mut managed = self.managed_keys.write().expect("lock poisoned");
        if !managed.contains(&keys) {
            managed.push(keys);
        }
    }

    /// Names of the key pair that lets this process write to `roaming_id`,
    /// or `None` if it only has read access.
    pub async fn get_existing_key_names(&self, roaming_id: &ContentId) -> RegistryResult<Option<KeyNames>> {
        let Some(roaming) = self.client.keys.key_by_id(roaming_id).await? else {
            return Ok(None);
        };

        let cached = self
            .managed_keys
            .read()
            .expect("lock poisoned")
            .iter()
            .find(|managed| managed.roaming.id == *roaming_id)
            .cloned();
        if let Some(managed) = cached {
            let local = self.client.keys.find_key(&managed.local.name).await?;
            if local.is_some_and(|key| key.id == managed.local.id) {
                return Ok(Some(KeyNames {
                    local: managed.local.name,
                    roaming: managed.roaming.name,
                }));
            }
        }

        let Some(local_name) = names::local_name_for_roaming(&roaming.name) else {
            return Ok(None);
        };
        if self.client.keys.find_key(&local_name).await?.is_none() {
            return Ok(None);
        }
        Ok(Some(KeyNames {
            local: local_name,
            roaming: roaming.name,
        }))
    }

    /// Names for a new registry: the configured pair, or the first free
    /// `{prefix}.{n}` pair counting from zero.
    pub async fn get_new_key_names(&self) -> RegistryResult<KeyNames> {
        if let (Some(local), Some(roaming)) = (&self.config.local_key_name, &self.config.roaming_key_name) {
            return Ok(KeyNames {
                local: local.clone(),
                roaming: roaming.clone(),
            });
        }
        let taken = self.taken_names().await?;
        let prefix = self.config.key_name_prefix::<K>();
        let mut n = 0;
        loop {
            let names = names::ordinal_key_names(prefix, n);
            if !taken.contains(&names.local) && !taken.contains(&names.roaming) {
                return Ok(names);
            }
            n += 1;
        }
    }

    pub fn get_new_event_stream_label(&self) -> String {
        self.config.event_stream_label::<K>().to_string()
    }

    /// An empty snapshot whose only source is `local`.
    pub fn get_initial_roaming_value(&self, roaming: &Key, local: &Key) -> K::Snapshot {
        let mut value = K::Snapshot::empty(roaming.id);
        value.add_source(local.id);
        value
    }

    async fn taken_names(&self) -> RegistryResult<HashSet<String>> {
        Ok(self
            .client
            .keys
            .list_keys()
            .await?
            .into_iter()
            .map(|key| key.name)
            .collect())
    }

    fn modifiable(&self, config: HandlerConfig<K>) -> RegistryResult<ModifiableRegistry<K>> {
        ModifiableRegistry::from_handler_config(
            config,
            self.nested.clone(),
            self.client.clone(),
            self.config.options(),
        )
    }

    /// Create keys for a new registry and publish its empty state.
    pub async fn create(&self, cancel: &CancellationToken) -> RegistryResult<ModifiableRegistry<K>> {
        check_cancelled(cancel)?;
        let names = self.get_new_key_names().await?;
        let roaming = self.client.keys.create_key(&names.roaming).await?;
        let local = match self.client.keys.create_key(&names.local).await {
            Ok(local) => local,
            Err(e) => {
                self.client.keys.remove_key(&roaming.name).await?;
                return Err(e.into());
            }
        };
        let managed = ManagedKeys {
            roaming: roaming.clone(),
            local: local.clone(),
        };

        let mut registry = self.modifiable(HandlerConfig {
            roaming_id: Some(roaming.id),
            roaming_value: Some(self.get_initial_roaming_value(&roaming, &local)),
            roaming_key: Some(roaming),
            local_value: Some(LocalEventStream::new(self.get_new_event_stream_label())),
            local_key: Some(local),
        })?;
        if let Err(e) = registry.flush(cancel).await {
            drop(registry);
            tracing::warn!(
                kind = K::LABEL,
                roaming = %names.roaming,
                error = %e,
                "initial publish failed, removing keys"
            );
            self.client.keys.remove_key(&names.local).await?;
            self.client.keys.remove_key(&names.roaming).await?;
            return Err(e);
        }
        self.remember(managed);

        tracing::info!(
            kind = K::LABEL,
            id = %registry.id().short_hex(),
            roaming = %registry.roaming_key().name,
            "created registry"
        );
        Ok(registry)
    }

    /// Look up a registry by roaming id. Modifiable when this process holds
    /// its keys and no other handle is writing with them, read-only
    /// otherwise.
    pub async fn get(&self, id: &ContentId, cancel: &CancellationToken) -> RegistryResult<Member<K>> {
        check_cancelled(cancel)?;
        if let Some(names) = self.get_existing_key_names(id).await? {
            if let Some(registry) = self.open(names, cancel).await? {
                return Ok(Member::Modifiable(registry));
            }
        }

        let snapshot: K::Snapshot = self
            .client
            .resolve_value(id, ObjectKind::Snapshot, !self.config.use_cache)
            .await?
            .ok_or(RegistryError::NotFound { kind: K::LABEL, id: *id })?;
        let registry = ReadOnlyRegistry::from_handler_config(
            HandlerConfig {
                roaming_id: Some(*id),
                roaming_value: Some(snapshot),
                ..HandlerConfig::default()
            },
            Some(self.nested.clone()),
            self.client.clone(),
            self.config.options(),
        )?;
        tracing::debug!(kind = K::LABEL, id = %id.short_hex(), "opened read-only");
        Ok(Member::ReadOnly(registry))
    }

    /// `None` when a live handle already writes with the local key.
    async fn open(&self, names: KeyNames, cancel: &CancellationToken) -> RegistryResult<Option<ModifiableRegistry<K>>> {
        let keys = &self.client.keys;
        let roaming = keys
            .find_key(&names.roaming)
            .await?
            .ok_or(KeyError::NotFound { name: names.roaming })?;
        let local = keys
            .find_key(&names.local)
            .await?
            .ok_or(KeyError::NotFound { name: names.local })?;
        let Some(lease) = self.client.try_lease(local.id) else {
            tracing::debug!(
                kind = K::LABEL,
                id = %roaming.id.short_hex(),
                local = %local.name,
                "local key busy, opening read-only"
            );
            return Ok(None);
        };

        let local_value = self
            .client
            .resolve_value::<LocalEventStream>(&local.id, ObjectKind::Stream, true)
            .await?
            .unwrap_or_else(|| LocalEventStream::new(self.get_new_event_stream_label()));
        let roaming_value = self
            .client
            .resolve_value::<K::Snapshot>(&roaming.id, ObjectKind::Snapshot, true)
            .await?
            .unwrap_or_else(|| self.get_initial_roaming_value(&roaming, &local));
        self.remember(ManagedKeys {
            roaming: roaming.clone(),
            local: local.clone(),
        });

        let mut registry = ModifiableRegistry::from_leased(
            HandlerConfig {
                roaming_id: Some(roaming.id),
                roaming_key: Some(roaming),
                roaming_value: Some(roaming_value),
                local_key: Some(local),
                local_value: Some(local_value),
            },
            lease,
            self.nested.clone(),
            self.client.clone(),
            self.config.options(),
        )?;
        registry.advance(cancel).await?;
        Ok(Some(registry))
    }

    /// Become an additional writer of an existing registry.
    ///
    /// The roaming key must be available to this process. A fresh local key
    /// named `{stem}.{n}.Local` is created and registered as a source.
    pub async fn join(&self, roaming_id: &ContentId, cancel: &CancellationToken) -> RegistryResult<ModifiableRegistry<K>> {
        check_cancelled(cancel)?;
        let not_found = || RegistryError::NotFound {
            kind: K::LABEL,
            id: *roaming_id,
        };
        let roaming = self
            .client
            .keys
            .key_by_id(roaming_id)
            .await?
            .ok_or_else(not_found)?;
        let roaming_value: K::Snapshot = self
            .client
            .resolve_value(roaming_id, ObjectKind::Snapshot, true)
            .await?
            .ok_or_else(not_found)?;

        let stem = roaming
            .name
            .strip_suffix(ROAMING_SUFFIX)
            .unwrap_or(&roaming.name);
        let taken = self.taken_names().await?;
        let mut n = 1;
        let local_name = loop {
            let candidate = format!("{stem}.{n}{LOCAL_SUFFIX}");
            if !taken.contains(&candidate) {
                break candidate;
            }
            n += 1;
        };
        let local = self.client.keys.create_key(&local_name).await?;
        self.remember(ManagedKeys {
            roaming: roaming.clone(),
            local: local.clone(),
        });

        let mut registry = self.modifiable(HandlerConfig {
            roaming_id: Some(roaming.id),
            roaming_key: Some(roaming),
            roaming_value: Some(roaming_value),
            local_key: Some(local),
            local_value: Some(LocalEventStream::new(self.get_new_event_stream_label())),
        })?;
        registry.advance(cancel).await?;
        registry.flush(cancel).await?;

        tracing::info!(
            kind = K::LABEL,
            id = %registry.id().short_hex(),
            local = %registry.local_key().name,
            "joined registry"
        );
        Ok(registry)
    }

    /// Withdraw both keys of a registry. Published content is left in place.
    pub async fn delete(&self, registry: &ModifiableRegistry<K>, cancel: &CancellationToken) -> RegistryResult<()> {
        check_cancelled(cancel)?;
        let keys = &self.client.keys;
        keys.remove_key(&registry.local_key().name).await?;
        keys.remove_key(&registry.roaming_key().name).await?;
        tracing::info!(
            kind = K::LABEL,
            id = %registry.id().short_hex(),
            "deleted registry"
        );
        Ok(())
    }
}

impl<K: RegistryKind> std::fmt::Debug for Repository<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("kind", &K::LABEL)
            .field("config", &self.config)
            .field("managed", &self.managed_keys.read().expect("lock poisoned").len())
            .finish()
    }
}

/// Rebuild the snapshot of registry `id` from scratch by folding each
/// source's full log, in the order given.
///
/// `own` supplies an in-memory stream for one source, which is used instead
/// of its published value. Sources with nothing published are skipped, as
/// are streams that fail [`StreamValidator`] or carry events for another
/// registry.
pub async fn fold_sources<K: RegistryKind>(
    client: &NomadClient,
    id: ContentId,
    sources: &[ContentId],
    own: Option<(ContentId, &LocalEventStream)>,
    nocache: bool,
) -> RegistryResult<K::Snapshot> {
    let log = EventLog::new(client.store.clone(), false);
    let mut snapshot = K::Snapshot::empty(id);

    for &source in sources {
        if !snapshot.add_source(source) {
            continue;
        }
        let stream = match own {
            Some((own_id, stream)) if own_id == source => stream.clone(),
            _ => match client
                .resolve_value::<LocalEventStream>(&source, ObjectKind::Stream, nocache)
                .await?
            {
                Some(stream) => stream,
                None => {
                    tracing::warn!(
                        kind = K::LABEL,
                        id = %id.short_hex(),
                        source = %source.short_hex(),
                        "source has no published stream, skipping"
                    );
                    continue;
                }
            },
        };

        let entries = log.entries(&stream).await?;
        let report = StreamValidator::validate(&stream, &entries);
        let foreign = StreamValidator::targets(&entries)
            .iter()
            .any(|target| *target != id);
        if !report.is_valid() || foreign {
            tracing::warn!(
                kind = K::LABEL,
                id = %id.short_hex(),
                source = %source.short_hex(),
                violations = report.violations.len(),
                foreign,
                "source stream failed validation, skipping"
            );
            continue;
        }

        let mut events = Vec::with_capacity(entries.len());
        for entry in &entries {
            events.push(log.read_event::<UpdateEvent>(entry).await?);
        }
        Projector::<K>::fold_events(&mut snapshot, &events)?;
    }

    Ok(snapshot)
}
