//! Mesh-wide configuration.
//!
//! The knobs the EDS subsystem reads from mesh configuration: the default
//! locality LB setting, the cluster-local host policy, and the network
//! topology for split-horizon filtering. An outer loader deserializes these
//! from the mesh configuration file.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::LocalityLbSetting;

/// Mesh-wide configuration slice consumed by EDS.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    /// Mesh-default locality load balancing; used when no destination rule
    /// overrides it and `enabled` is set.
    pub locality_lb_setting: Option<LocalityLbSetting>,
    /// Hosts whose traffic must stay in the caller's cluster. Entries are
    /// exact hostnames or `*.`-prefixed suffix wildcards.
    pub cluster_local_hosts: Vec<String>,
    /// Network topology.
    pub networks: MeshNetworks,
}

impl MeshConfig {
    /// Whether `hostname` is declared cluster-local.
    #[must_use]
    pub fn is_cluster_local(&self, hostname: &str) -> bool {
        self.cluster_local_hosts.iter().any(|entry| {
            if let Some(suffix) = entry.strip_prefix("*.") {
                hostname.len() > suffix.len() && hostname.ends_with(suffix)
            } else {
                entry == hostname
            }
        })
    }
}

/// The mesh's networks and their ingress gateways.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeshNetworks {
    networks: HashMap<String, MeshNetwork>,
}

impl MeshNetworks {
    /// Create an empty topology.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a network.
    #[must_use]
    pub fn with_network(mut self, name: impl Into<String>, network: MeshNetwork) -> Self {
        self.networks.insert(name.into(), network);
        self
    }

    /// Number of declared networks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.networks.len()
    }

    /// Whether no networks are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }

    /// Whether split-horizon filtering applies: more than one network.
    #[must_use]
    pub fn is_multi_network(&self) -> bool {
        self.networks.len() > 1
    }

    /// Gateways fronting `network`; empty when the network is unknown or
    /// has none registered.
    #[must_use]
    pub fn gateways_for(&self, network: &str) -> &[NetworkGateway] {
        self.networks
            .get(network)
            .map(|n| n.gateways.as_slice())
            .unwrap_or(&[])
    }
}

/// One mesh network.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshNetwork {
    /// Gateways that admit cross-network traffic into this network.
    pub gateways: Vec<NetworkGateway>,
}

impl MeshNetwork {
    /// Create a network with no gateways.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a gateway.
    #[must_use]
    pub fn with_gateway(mut self, address: impl Into<String>, port: u16) -> Self {
        self.gateways.push(NetworkGateway {
            address: address.into(),
            port,
        });
        self
    }
}

/// Ingress gateway address for a network.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkGateway {
    /// Gateway address reachable from other networks.
    pub address: String,
    /// Gateway port.
    pub port: u16,
}
