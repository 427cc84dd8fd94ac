//! Per-push configuration snapshot.
//!
//! A [`PushContext`] is the immutable view of mesh configuration a push
//! operates against: services, destination rules and mesh config, frozen at
//! a version. Builders and push loops borrow it; nothing mutates it.

use std::collections::HashMap;

use crate::{DestinationRule, MeshConfig, MeshNetworks, Service};

/// Immutable configuration snapshot for one push generation.
#[derive(Clone, Debug, Default)]
pub struct PushContext {
    version: String,
    services: HashMap<String, Service>,
    destination_rules: HashMap<String, DestinationRule>,
    mesh: MeshConfig,
}

impl PushContext {
    /// Create a snapshot builder.
    #[must_use]
    pub fn builder() -> PushContextBuilder {
        PushContextBuilder::default()
    }

    /// Snapshot version; nonces are derived from it.
    #[inline]
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Resolve a hostname to its service.
    #[must_use]
    pub fn service_for_hostname(&self, hostname: &str) -> Option<&Service> {
        self.services.get(hostname)
    }

    /// The destination rule attached to a hostname, if any.
    #[must_use]
    pub fn destination_rule(&self, hostname: &str) -> Option<&DestinationRule> {
        self.destination_rules.get(hostname)
    }

    /// Whether traffic for `service` must stay in the caller's cluster.
    #[must_use]
    pub fn is_cluster_local(&self, service: &Service) -> bool {
        self.mesh.is_cluster_local(&service.hostname)
    }

    /// Mesh configuration.
    #[inline]
    #[must_use]
    pub fn mesh(&self) -> &MeshConfig {
        &self.mesh
    }

    /// Network topology.
    #[inline]
    #[must_use]
    pub fn networks(&self) -> &MeshNetworks {
        &self.mesh.networks
    }

    /// All services in the snapshot, in no particular order.
    pub fn services(&self) -> impl Iterator<Item = &Service> {
        self.services.values()
    }

    /// Number of services in the snapshot.
    #[must_use]
    pub fn service_count(&self) -> usize {
        self.services.len()
    }
}

/// Builder for [`PushContext`].
#[derive(Debug, Default)]
pub struct PushContextBuilder {
    version: String,
    services: HashMap<String, Service>,
    destination_rules: HashMap<String, DestinationRule>,
    mesh: MeshConfig,
}

impl PushContextBuilder {
    /// Set the snapshot version.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Add a service, keyed by its hostname.
    #[must_use]
    pub fn service(mut self, service: Service) -> Self {
        self.services.insert(service.hostname.clone(), service);
        self
    }

    /// Add a destination rule, keyed by its host.
    #[must_use]
    pub fn destination_rule(mut self, rule: DestinationRule) -> Self {
        self.destination_rules.insert(rule.host.clone(), rule);
        self
    }

    /// Set the mesh configuration.
    #[must_use]
    pub fn mesh(mut self, mesh: MeshConfig) -> Self {
        self.mesh = mesh;
        self
    }

    /// Freeze the snapshot.
    #[must_use]
    pub fn build(self) -> PushContext {
        PushContext {
            version: self.version,
            services: self.services,
            destination_rules: self.destination_rules,
            mesh: self.mesh,
        }
    }
}
