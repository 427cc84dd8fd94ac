//! Destination rules and traffic policy.
//!
//! A destination rule attaches subsets and traffic policy to a hostname.
//! Policies merge in three layers: mesh default, rule top-level, then the
//! matching subset, each refined by port-level overrides; the last layer to
//! set a field wins.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Configuration attached to a hostname: subsets and traffic policy.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DestinationRule {
    /// Hostname this rule applies to.
    pub host: String,
    /// Rule-wide traffic policy.
    pub traffic_policy: Option<TrafficPolicy>,
    /// Labeled slices of the service's endpoints.
    pub subsets: Vec<Subset>,
}

impl DestinationRule {
    /// Create a rule for a hostname.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }

    /// Set the rule-wide traffic policy.
    #[must_use]
    pub fn with_traffic_policy(mut self, policy: TrafficPolicy) -> Self {
        self.traffic_policy = Some(policy);
        self
    }

    /// Add a subset.
    #[must_use]
    pub fn with_subset(mut self, subset: Subset) -> Self {
        self.subsets.push(subset);
        self
    }

    /// Find a subset by name.
    #[must_use]
    pub fn subset(&self, name: &str) -> Option<&Subset> {
        self.subsets.iter().find(|s| s.name == name)
    }

    /// Label filter for a subset name; empty when the subset is unknown
    /// or the name is empty.
    #[must_use]
    pub fn subset_labels(&self, name: &str) -> HashMap<String, String> {
        if name.is_empty() {
            return HashMap::new();
        }
        self.subset(name)
            .map(|s| s.labels.clone())
            .unwrap_or_default()
    }
}

/// A labeled slice of a service's endpoints.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Subset {
    /// Subset name, referenced by cluster names.
    pub name: String,
    /// Labels an endpoint must carry to belong to the subset.
    pub labels: HashMap<String, String>,
    /// Subset-specific traffic policy, overriding the rule-wide one.
    pub traffic_policy: Option<TrafficPolicy>,
}

impl Subset {
    /// Create a subset.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a required label.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Set the subset traffic policy.
    #[must_use]
    pub fn with_traffic_policy(mut self, policy: TrafficPolicy) -> Self {
        self.traffic_policy = Some(policy);
        self
    }
}

/// Traffic policy for a destination.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrafficPolicy {
    /// Load-balancer settings.
    pub load_balancer: Option<LoadBalancerSettings>,
    /// Outlier detection; its presence enables locality failover.
    pub outlier_detection: Option<OutlierDetection>,
    /// Per-port overrides.
    pub port_level_settings: Vec<PortTrafficPolicy>,
}

impl TrafficPolicy {
    /// The port override for `port`, if one is configured.
    #[must_use]
    pub fn port_settings(&self, port: u16) -> Option<&PortTrafficPolicy> {
        self.port_level_settings.iter().find(|p| p.port == port)
    }
}

/// Traffic policy scoped to one port.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PortTrafficPolicy {
    /// Port number the override applies to.
    pub port: u16,
    /// Load-balancer settings for this port.
    pub load_balancer: Option<LoadBalancerSettings>,
    /// Outlier detection for this port.
    pub outlier_detection: Option<OutlierDetection>,
}

/// Load-balancer settings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadBalancerSettings {
    /// Locality-aware load balancing.
    pub locality_lb_setting: Option<LocalityLbSetting>,
}

/// Outlier detection knobs.
///
/// Only presence matters to EDS (it gates failover); the knobs themselves
/// are consumed by cluster generation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutlierDetection {
    /// Consecutive errors before ejection.
    pub consecutive_errors: u32,
    /// Ejection sweep interval in seconds.
    pub interval_secs: u64,
}

impl Default for OutlierDetection {
    fn default() -> Self {
        Self {
            consecutive_errors: 5,
            interval_secs: 10,
        }
    }
}

/// Locality-aware load-balancing configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalityLbSetting {
    /// Explicit weight distribution over localities.
    pub distribute: Vec<LocalityDistribute>,
    /// Region-to-region failover overrides.
    pub failover: Vec<LocalityFailover>,
    /// Whether the mesh-wide setting is active.
    pub enabled: bool,
}

/// Weight distribution for traffic originating in `from`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalityDistribute {
    /// Originating locality; segments may be `*`.
    pub from: String,
    /// Destination locality pattern to relative weight.
    pub to: HashMap<String, u32>,
}

/// Failover target for traffic originating in region `from`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalityFailover {
    /// Originating region.
    pub from: String,
    /// Region to fail over to.
    pub to: String,
}

/// Merge an overlay policy onto a base, port-aware.
///
/// The overlay's top-level fields win where set; a port-level override in
/// the overlay matching `port` wins over both. Returns the base unchanged
/// when the overlay is absent.
#[must_use]
pub fn merge_traffic_policy(
    base: Option<&TrafficPolicy>,
    overlay: Option<&TrafficPolicy>,
    port: u16,
) -> Option<TrafficPolicy> {
    let overlay = match overlay {
        Some(o) => o,
        None => return base.cloned(),
    };

    let mut merged = base.cloned().unwrap_or_default();
    if overlay.load_balancer.is_some() {
        merged.load_balancer = overlay.load_balancer.clone();
    }
    if overlay.outlier_detection.is_some() {
        merged.outlier_detection = overlay.outlier_detection.clone();
    }
    if let Some(port_policy) = overlay.port_settings(port) {
        if port_policy.load_balancer.is_some() {
            merged.load_balancer = port_policy.load_balancer.clone();
        }
        if port_policy.outlier_detection.is_some() {
            merged.outlier_detection = port_policy.outlier_detection.clone();
        }
    }
    merged.port_level_settings.clear();
    Some(merged)
}
