//! The sharded endpoint index.
//!
//! Endpoints are stored per (service, namespace), sharded by the origin
//! cluster that reported them. Shards from different clusters update
//! independently; a push merges them back together for one proxy's view.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use tracing::{debug, info};

use eds_core::{ClusterId, WorkloadEndpoint};

use crate::stats::IndexStats;

/// Contents of one (service, namespace) entry.
///
/// Both fields are guarded together by the owning [`EndpointShards`] mutex:
/// the service-account set is derived from the shard lists and the two must
/// never be observed out of sync.
#[derive(Debug, Default)]
pub struct ShardData {
    /// Endpoint lists keyed by origin cluster.
    pub shards: HashMap<ClusterId, Vec<WorkloadEndpoint>>,
    /// Union of non-empty service accounts across all shards.
    pub service_accounts: HashSet<String>,
}

impl ShardData {
    /// Recompute the service-account union from the current shard lists.
    fn recompute_service_accounts(&mut self) -> bool {
        let accounts: HashSet<String> = self
            .shards
            .values()
            .flatten()
            .filter_map(|ep| ep.service_account.clone())
            .filter(|sa| !sa.is_empty())
            .collect();
        let changed = accounts != self.service_accounts;
        self.service_accounts = accounts;
        changed
    }

    /// Total endpoints across all shards.
    #[must_use]
    pub fn endpoint_count(&self) -> usize {
        self.shards.values().map(Vec::len).sum()
    }
}

/// Endpoint shards for one (service, namespace).
///
/// Handed out as an `Arc` so readers drop the index lock before touching
/// the contents.
#[derive(Debug, Default)]
pub struct EndpointShards {
    inner: Mutex<ShardData>,
}

impl EndpointShards {
    fn new() -> Self {
        Self::default()
    }

    /// Lock the shard contents.
    ///
    /// Never call with the index lock still wanted afterwards; the lock
    /// order is index first, shard second.
    pub fn lock(&self) -> MutexGuard<'_, ShardData> {
        self.inner.lock().expect("shard mutex poisoned")
    }

    /// Snapshot of the observed service accounts.
    #[must_use]
    pub fn service_accounts(&self) -> HashSet<String> {
        self.lock().service_accounts.clone()
    }
}

/// The sharded, hostname/namespace-keyed endpoint store.
///
/// Registries call the mutation API as endpoints come and go; builders read
/// a shard snapshot per push. See the crate docs for the lock discipline.
#[derive(Debug, Default)]
pub struct EndpointIndex {
    by_service: RwLock<HashMap<String, HashMap<String, Arc<EndpointShards>>>>,
    stats: IndexStats,
}

impl EndpointIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Index statistics.
    #[inline]
    #[must_use]
    pub fn stats(&self) -> &IndexStats {
        &self.stats
    }

    /// Replace one cluster's shard for (service, namespace).
    ///
    /// Returns whether the change warrants a full push: the entry was
    /// freshly created (first sight of the service) or the observed
    /// service-account set changed. An empty `endpoints` list removes the
    /// cluster's shard but keeps the (service, namespace) entry, so a
    /// crash-looping workload flapping between zero and one endpoint does
    /// not churn full pushes.
    pub fn upsert_shard(
        &self,
        cluster_id: &ClusterId,
        service: &str,
        namespace: &str,
        endpoints: Vec<WorkloadEndpoint>,
    ) -> bool {
        self.stats.record_upsert();

        if endpoints.is_empty() {
            self.delete_shard(cluster_id, service, namespace);
            info!(service = %service, namespace = %namespace, cluster = %cluster_id,
                "incremental push, service has no endpoints");
            return false;
        }

        let (shards, created) = self.get_or_create(service, namespace);
        if created {
            info!(service = %service, namespace = %namespace, "full push, new service");
        }

        let mut full_push = created;
        {
            let mut data = shards.lock();
            data.shards.insert(cluster_id.clone(), endpoints);
            let accounts_changed = data.recompute_service_accounts();
            if !full_push && accounts_changed {
                info!(service = %service, namespace = %namespace,
                    "full push, service accounts changed");
                full_push = true;
            }
        }

        if full_push {
            self.stats.record_full_push_trigger();
        }
        full_push
    }

    /// Remove one cluster's shard, preserving the (service, namespace)
    /// entry. Called when a cluster's endpoints drop to zero.
    pub fn delete_shard(&self, cluster_id: &ClusterId, service: &str, namespace: &str) {
        let shards = self.shards_for(service, namespace);
        if let Some(shards) = shards {
            let mut data = shards.lock();
            if data.shards.remove(cluster_id).is_some() {
                data.recompute_service_accounts();
                self.stats.record_shard_removal();
                debug!(service = %service, namespace = %namespace, cluster = %cluster_id,
                    "removed endpoint shard");
            }
        }
    }

    /// Remove one cluster's shard and drop the (service, namespace) entry
    /// when no shards remain. Called by the service catalog on service
    /// deletion.
    pub fn delete_service(&self, cluster_id: &ClusterId, service: &str, namespace: &str) {
        let mut by_service = self.by_service.write().expect("index lock poisoned");

        let Some(namespaces) = by_service.get_mut(service) else {
            return;
        };
        let Some(shards) = namespaces.get(namespace) else {
            return;
        };

        let remaining = {
            let mut data = shards.lock();
            data.shards.remove(cluster_id);
            data.recompute_service_accounts();
            data.shards.len()
        };

        if remaining == 0 {
            namespaces.remove(namespace);
        }
        if namespaces.is_empty() {
            by_service.remove(service);
        }
        self.stats.record_service_removal();
        debug!(service = %service, namespace = %namespace, cluster = %cluster_id,
            remaining_shards = remaining, "service deleted from index");
    }

    /// The shard entry for (service, namespace), if one exists.
    ///
    /// The returned `Arc` is a consistent handle; the shard mutex governs
    /// access to the contents.
    #[must_use]
    pub fn shards_for(&self, service: &str, namespace: &str) -> Option<Arc<EndpointShards>> {
        let by_service = self.by_service.read().expect("index lock poisoned");
        by_service
            .get(service)
            .and_then(|namespaces| namespaces.get(namespace))
            .map(Arc::clone)
    }

    /// Whether an entry exists for (service, namespace).
    #[must_use]
    pub fn contains(&self, service: &str, namespace: &str) -> bool {
        self.shards_for(service, namespace).is_some()
    }

    /// Number of (service, namespace) entries.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        let by_service = self.by_service.read().expect("index lock poisoned");
        by_service.values().map(HashMap::len).sum()
    }

    fn get_or_create(&self, service: &str, namespace: &str) -> (Arc<EndpointShards>, bool) {
        // Fast path: the entry usually exists.
        if let Some(shards) = self.shards_for(service, namespace) {
            return (shards, false);
        }

        let mut by_service = self.by_service.write().expect("index lock poisoned");
        let namespaces = by_service.entry(service.to_string()).or_default();
        // Re-check under the write lock; a racing upsert may have created it.
        if let Some(shards) = namespaces.get(namespace) {
            return (Arc::clone(shards), false);
        }
        let shards = Arc::new(EndpointShards::new());
        namespaces.insert(namespace.to_string(), Arc::clone(&shards));
        (shards, true)
    }
}
