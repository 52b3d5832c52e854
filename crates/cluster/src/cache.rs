//! The endpoint cache: one shared connection per cluster member, kept behind
//! a single mutex, with a cold-connect path that races every candidate
//! address for a member and keeps whichever dials and proves itself first.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use ahash::RandomState;
use btrdb_client_wire::Status;
use parking_lot::Mutex;
use tokio::task::JoinSet;

use crate::endpoint::Transport;
use crate::routing::NodeIdentity;

/// Shared, mutex-guarded map from cluster member to its live connection.
///
/// There is exactly one live `Transport` per member at a time: concurrent
/// cold-connects for the same member will each run their own race, but
/// whichever finishes first wins the cache slot and the later ones simply
/// overwrite it with an equivalent connection rather than being rejected.
pub struct EndpointCache<T: Transport> {
    entries: Mutex<HashMap<NodeIdentity, Arc<T>, RandomState>>,
    probe_timeout: Duration,
}

impl<T: Transport> EndpointCache<T> {
    pub fn new(probe_timeout: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::default()),
            probe_timeout,
        }
    }

    /// Look up an already-connected member without attempting to connect.
    pub fn get(&self, identity: NodeIdentity) -> Option<Arc<T>> {
        self.entries.lock().get(&identity).cloned()
    }

    /// Any single cached connection, used to bootstrap a request that does
    /// not care which member serves it.
    pub fn any(&self) -> Option<(NodeIdentity, Arc<T>)> {
        self.entries
            .lock()
            .iter()
            .next()
            .map(|(id, ep)| (*id, ep.clone()))
    }

    pub fn evict(&self, identity: NodeIdentity) {
        self.entries.lock().remove(&identity);
    }

    fn insert(&self, identity: NodeIdentity, transport: Arc<T>) {
        self.entries.lock().insert(identity, transport);
    }

    /// Return the cached connection for `identity`, or connect to one of
    /// `addresses` and cache the winner.
    pub async fn get_or_connect(
        &self,
        identity: NodeIdentity,
        addresses: &[String],
    ) -> Result<Arc<T>, Status> {
        if let Some(existing) = self.get(identity) {
            return Ok(existing);
        }

        let transport = Arc::new(race_connect::<T>(addresses, self.probe_timeout).await?);
        self.insert(identity, transport.clone());
        Ok(transport)
    }
}

/// Dial every candidate address concurrently and keep whichever connects and
/// proves itself first; the rest are dropped once a winner is found.
async fn race_connect<T: Transport>(addresses: &[String], timeout: Duration) -> Result<T, Status> {
    if addresses.is_empty() {
        return Err(Status::disconnected());
    }

    let mut attempts: JoinSet<Result<T, Status>> = JoinSet::new();
    for address in addresses.iter().cloned() {
        attempts.spawn(async move {
            let connected = tokio::time::timeout(timeout, T::dial(&address))
                .await
                .map_err(|_| Status::disconnected())??;
            tokio::time::timeout(timeout, connected.probe())
                .await
                .map_err(|_| Status::disconnected())??;
            Ok(connected)
        });
    }

    let mut last_err = Status::disconnected();
    while let Some(joined) = attempts.join_next().await {
        match joined {
            Ok(Ok(transport)) => return Ok(transport),
            Ok(Err(status)) => {
                log::debug!("candidate address failed to dial or probe: {status}");
                last_err = status;
            }
            Err(_join_error) => continue,
        }
    }
    // `attempts` is dropped here, aborting any probes that hadn't finished.
    log::warn!("all {} candidate address(es) failed", addresses.len());
    Err(last_err)
}
