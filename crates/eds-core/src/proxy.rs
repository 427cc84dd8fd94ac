//! Connected proxy identity.

use std::collections::HashMap;

use crate::{ClusterId, Locality};

/// Identity of a connected data-plane proxy.
///
/// Captured once per subscription; the builder reads locality, cluster id
/// and network from here when materializing a per-proxy view.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Proxy {
    /// Unique proxy id, as presented on the transport.
    pub id: String,
    /// Placement of the proxy.
    pub locality: Locality,
    /// Origin cluster the proxy runs in.
    pub cluster_id: ClusterId,
    /// Network the proxy is attached to.
    pub network: String,
    /// Workload labels.
    pub labels: HashMap<String, String>,
}

impl Proxy {
    /// Create a proxy identity.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Set the locality from a `region/zone/subzone` label.
    #[must_use]
    pub fn with_locality(mut self, label: &str) -> Self {
        self.locality = Locality::parse(label);
        self
    }

    /// Set the origin cluster.
    #[must_use]
    pub fn with_cluster_id(mut self, cluster_id: impl Into<ClusterId>) -> Self {
        self.cluster_id = cluster_id.into();
        self
    }

    /// Set the network.
    #[must_use]
    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = network.into();
        self
    }

    /// Add a workload label.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proxy_builder() {
        let proxy = Proxy::new("sidecar~10.1.2.3~reviews-v1.bookinfo")
            .with_locality("us-east/1a")
            .with_cluster_id("c1")
            .with_network("east");

        assert_eq!(proxy.locality.region, "us-east");
        assert_eq!(proxy.cluster_id.as_str(), "c1");
        assert_eq!(proxy.network, "east");
    }
}
