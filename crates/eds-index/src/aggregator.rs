//! Registry reconciliation.
//!
//! Most registries push endpoint changes inline through the orchestrator.
//! The ones that cannot are reconciled here: a pass walks every service in
//! the push snapshot, queries the owning registry port by port, and applies
//! the accumulated endpoints cache-only. The caller batches the follow-up
//! push itself.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use eds_core::{ClusterId, EdsError, PushContext, Service, WorkloadEndpoint};

use crate::orchestrator::UpdateOrchestrator;

/// A pull-style service registry.
///
/// Each registry acts as one shard; their endpoints are kept apart in the
/// index so an individual registry can still update incrementally.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Provider name; services carry the provider that owns them.
    fn provider(&self) -> &str;

    /// Origin cluster this registry reports for.
    fn cluster_id(&self) -> &ClusterId;

    /// Instances of `service` bound to `port`.
    ///
    /// May block on external I/O; the aggregator never calls this with an
    /// index lock held.
    async fn instances_by_port(
        &self,
        service: &Service,
        port: u16,
    ) -> Result<Vec<WorkloadEndpoint>, EdsError>;
}

/// Periodic reconciliation pull over non-primary registries.
pub struct RegistryAggregator {
    registries: Vec<Arc<dyn Registry>>,
    orchestrator: Arc<UpdateOrchestrator>,
}

impl RegistryAggregator {
    /// Create an aggregator with no registries.
    pub fn new(orchestrator: Arc<UpdateOrchestrator>) -> Self {
        Self {
            registries: Vec::new(),
            orchestrator,
        }
    }

    /// Register a registry to reconcile.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<dyn Registry>) -> Self {
        self.registries.push(registry);
        self
    }

    /// Number of registered registries.
    #[must_use]
    pub fn registry_count(&self) -> usize {
        self.registries.len()
    }

    /// Run one reconciliation pass against a push snapshot.
    ///
    /// For every service owned by one of the registries, endpoints are
    /// gathered across all non-UDP ports and applied cache-only. The first
    /// registry error aborts the pass; shards applied before the failure
    /// stay applied.
    pub async fn update_service_shards(&self, push: &PushContext) -> Result<(), EdsError> {
        if self.registries.is_empty() {
            return Ok(());
        }

        for service in push.services() {
            for registry in &self.registries {
                // Skip services this registry does not own.
                if service.registry != registry.provider() {
                    continue;
                }

                let mut endpoints = Vec::new();
                for port in &service.ports {
                    if port.protocol.is_connectionless() {
                        continue;
                    }
                    let instances = registry.instances_by_port(service, port.number).await?;
                    endpoints.extend(instances);
                }

                debug!(service = %service.hostname, registry = %registry.provider(),
                    endpoints = endpoints.len(), "reconciled service shard");
                self.orchestrator.on_endpoints_changed_cache_only(
                    registry.cluster_id(),
                    &service.hostname,
                    &service.namespace,
                    endpoints,
                );
            }
        }

        Ok(())
    }

    /// Reconcile on a fixed period until the task is dropped.
    ///
    /// `snapshot` yields the current push context each tick. A failed pass
    /// is logged and retried at the next tick.
    pub async fn run<F>(&self, period: Duration, snapshot: F)
    where
        F: Fn() -> Arc<PushContext>,
    {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(period = ?period, registries = self.registries.len(),
            "registry reconciliation started");

        loop {
            interval.tick().await;
            let push = snapshot();
            if let Err(err) = self.update_service_shards(&push).await {
                warn!(error = %err, "reconciliation pass failed");
            }
        }
    }
}
