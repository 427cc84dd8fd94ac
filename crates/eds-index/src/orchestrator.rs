//! Update classification and push intents.
//!
//! Registries report endpoint and service events here. Each endpoint change
//! is applied to the index and classified: a brand-new service or a changed
//! service-account set needs a full configuration recomputation, anything
//! else gets a cheap incremental push scoped to the one service. The
//! resulting intent goes to the outer push scheduler, which owns
//! debouncing and fan-out.

use std::collections::HashSet;
use std::sync::Arc;

use metrics::counter;
use tracing::{debug, trace};

use eds_core::{ClusterId, WorkloadEndpoint};

use crate::index::EndpointIndex;

/// Kinds of configuration entities a push intent can reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConfigKind {
    /// A service entry (hostname within a namespace).
    ServiceEntry,
}

/// Identifies one configuration entity touched by an update.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConfigKey {
    /// Entity kind.
    pub kind: ConfigKind,
    /// Entity name (the service hostname).
    pub name: String,
    /// Entity namespace.
    pub namespace: String,
}

impl ConfigKey {
    /// Key for a service entry.
    #[must_use]
    pub fn service_entry(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            kind: ConfigKind::ServiceEntry,
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}

/// Why a push was requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerReason {
    /// Endpoints of a service changed.
    EndpointUpdate,
}

/// A push intent handed to the outer scheduler.
#[derive(Clone, Debug)]
pub struct PushRequest {
    /// Whether dependent resources must be fully recomputed.
    pub full: bool,
    /// Configuration entities whose endpoints changed.
    pub configs_updated: HashSet<ConfigKey>,
    /// Reason tag for observability.
    pub reason: TriggerReason,
}

impl PushRequest {
    /// Hostnames of the updated service entries.
    #[must_use]
    pub fn updated_hostnames(&self) -> HashSet<&str> {
        self.configs_updated
            .iter()
            .filter(|k| k.kind == ConfigKind::ServiceEntry)
            .map(|k| k.name.as_str())
            .collect()
    }
}

/// Receiver of push intents; implemented by the outer push scheduler.
pub trait PushScheduler: Send + Sync {
    /// Enqueue a push. Must not block; the scheduler coalesces.
    fn schedule(&self, request: PushRequest);
}

/// Service lifecycle events from the registry callback surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceEvent {
    /// Service appeared.
    Add,
    /// Service metadata changed.
    Update,
    /// Service removed.
    Delete,
}

/// Applies registry reports to the index and emits push intents.
///
/// The endpoint-update counter increments on every report, including
/// no-op updates; consumers treating it as a change indicator must
/// de-duplicate externally.
pub struct UpdateOrchestrator {
    index: Arc<EndpointIndex>,
    scheduler: Arc<dyn PushScheduler>,
}

impl UpdateOrchestrator {
    /// Create an orchestrator over an index and a scheduler.
    pub fn new(index: Arc<EndpointIndex>, scheduler: Arc<dyn PushScheduler>) -> Self {
        Self { index, scheduler }
    }

    /// The index this orchestrator mutates.
    #[inline]
    #[must_use]
    pub fn index(&self) -> &Arc<EndpointIndex> {
        &self.index
    }

    /// Apply an endpoint change and emit a push intent.
    pub fn on_endpoints_changed(
        &self,
        cluster_id: &ClusterId,
        hostname: &str,
        namespace: &str,
        endpoints: Vec<WorkloadEndpoint>,
    ) {
        counter!("eds_endpoint_updates_total").increment(1);
        let full = self
            .index
            .upsert_shard(cluster_id, hostname, namespace, endpoints);

        let request = PushRequest {
            full,
            configs_updated: HashSet::from([ConfigKey::service_entry(hostname, namespace)]),
            reason: TriggerReason::EndpointUpdate,
        };
        trace!(service = %hostname, namespace = %namespace, full = full, "push intent");
        self.scheduler.schedule(request);
    }

    /// Apply an endpoint change without emitting a push intent.
    ///
    /// Used by reconciliation scans, which batch their own pushes.
    pub fn on_endpoints_changed_cache_only(
        &self,
        cluster_id: &ClusterId,
        hostname: &str,
        namespace: &str,
        endpoints: Vec<WorkloadEndpoint>,
    ) {
        counter!("eds_endpoint_updates_total").increment(1);
        self.index
            .upsert_shard(cluster_id, hostname, namespace, endpoints);
    }

    /// Handle a service lifecycle event.
    ///
    /// Deletion cleans the index up; other events only count, the
    /// corresponding endpoint reports carry the data.
    pub fn on_service_event(
        &self,
        cluster_id: &ClusterId,
        hostname: &str,
        namespace: &str,
        event: ServiceEvent,
    ) {
        match event {
            ServiceEvent::Delete => {
                counter!("eds_service_deletes_total").increment(1);
                self.index.delete_service(cluster_id, hostname, namespace);
            }
            ServiceEvent::Add | ServiceEvent::Update => {
                counter!("eds_service_updates_total").increment(1);
                debug!(service = %hostname, namespace = %namespace, event = ?event,
                    "service event");
            }
        }
    }
}
