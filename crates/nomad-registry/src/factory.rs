use std::sync::Arc;

use crate::client::NomadClient;
use crate::config::NomadConfig;
use crate::error::RegistryResult;
use crate::repository::{PeerRepository, PeerSwarmRepository, PeerSwarmTrackerRepository};

/// The three repositories wired together: trackers resolve swarms through
/// `peer_swarms`, and swarms resolve peers through `peers`.
#[derive(Clone, Debug)]
pub struct RepoFactory {
    pub client: NomadClient,
    pub peers: Arc<PeerRepository>,
    pub peer_swarms: Arc<PeerSwarmRepository>,
    pub trackers: Arc<PeerSwarmTrackerRepository>,
}

impl RepoFactory {
    pub fn new(client: NomadClient, config: NomadConfig) -> RegistryResult<Self> {
        config.validate()?;
        let peers = Arc::new(PeerRepository::new(client.clone(), config.peers, ())?);
        let peer_swarms = Arc::new(PeerSwarmRepository::new(
            client.clone(),
            config.peer_swarms,
            peers.clone(),
        )?);
        let trackers = Arc::new(PeerSwarmTrackerRepository::new(
            client.clone(),
            config.trackers,
            peer_swarms.clone(),
        )?);
        tracing::debug!("repositories ready");
        Ok(Self {
            client,
            peers,
            peer_swarms,
            trackers,
        })
    }

    /// Default configuration over fresh in-memory backends.
    pub fn in_memory() -> RegistryResult<Self> {
        Self::new(NomadClient::in_memory(), NomadConfig::default())
    }
}
