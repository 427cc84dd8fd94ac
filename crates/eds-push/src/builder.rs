//! Per-cluster assignment building.
//!
//! An [`EndpointBuilder`] is constructed per (cluster name, proxy, push
//! snapshot) and is stateless beyond those inputs. It resolves the watched
//! cluster name against the snapshot, merges the index's shards into
//! locality groups for this proxy, and applies the network filter and
//! locality load-balancer policy on top.

use std::collections::HashMap;

use metrics::counter;
use tracing::{debug, info};

use eds_core::{
    ClusterId, DestinationRule, Locality, Proxy, PushContext, Resolution, Service, ServicePort,
    SubsetKey,
};
use eds_index::{EndpointIndex, EndpointShards};
use eds_types::envoy::config::endpoint::v3::{ClusterLoadAssignment, LocalityLbEndpoints};

use crate::{loadbalancer, split_horizon};

/// Builds one proxy's view of one watched cluster.
pub struct EndpointBuilder<'a> {
    cluster_name: &'a str,
    key: Option<SubsetKey>,
    service: Option<&'a Service>,
    destination_rule: Option<&'a DestinationRule>,
    locality: &'a Locality,
    cluster_id: &'a ClusterId,
    network: &'a str,
    push: &'a PushContext,
}

impl<'a> EndpointBuilder<'a> {
    /// Resolve a watched cluster name against the push snapshot for a proxy.
    ///
    /// An unparseable name is tolerated here; [`build`](Self::build) turns
    /// it into an empty assignment so the proxy clears stale endpoints.
    #[must_use]
    pub fn new(cluster_name: &'a str, proxy: &'a Proxy, push: &'a PushContext) -> Self {
        let key = match SubsetKey::parse(cluster_name) {
            Ok(key) => Some(key),
            Err(_) => {
                debug!(cluster = %cluster_name, "invalid cluster name");
                None
            }
        };
        let service = key
            .as_ref()
            .and_then(|k| push.service_for_hostname(&k.hostname));
        let destination_rule = service.and_then(|s| push.destination_rule(&s.hostname));

        Self {
            cluster_name,
            key,
            service,
            destination_rule,
            locality: &proxy.locality,
            cluster_id: &proxy.cluster_id,
            network: &proxy.network,
            push,
        }
    }

    /// The watched cluster name this builder serves.
    #[inline]
    #[must_use]
    pub fn cluster_name(&self) -> &str {
        self.cluster_name
    }

    /// Materialize the assignment for this cluster.
    ///
    /// Returns `None` when the service now resolves via DNS: the cluster is
    /// no longer EDS-typed and the caller must skip it entirely (the proxy
    /// self-heals after cluster warm-up). Missing services, ports or shards
    /// yield an assignment with the cluster name and no endpoints, which
    /// tells the proxy to drop what it has.
    #[must_use]
    pub fn build(&self, index: &EndpointIndex) -> Option<ClusterLoadAssignment> {
        let Some(key) = &self.key else {
            return Some(self.empty_assignment());
        };

        let Some(service) = self.service else {
            debug!(cluster = %self.cluster_name, "no service for cluster");
            return Some(self.empty_assignment());
        };

        // The service may have flipped to DNS resolution while the proxy's
        // watch list still names this cluster; sending endpoints for a
        // non-EDS cluster would be rejected.
        if service.resolution == Resolution::Dns {
            info!(cluster = %self.cluster_name,
                "cluster watched but service resolution is now DNS, skipping");
            return None;
        }

        let Some(svc_port) = service.port_by_number(key.port) else {
            debug!(cluster = %self.cluster_name, port = key.port, "port not found on service");
            return Some(self.empty_assignment());
        };

        let Some(shards) = index.shards_for(&key.hostname, &service.namespace) else {
            debug!(cluster = %self.cluster_name, "no endpoint shards");
            return Some(self.empty_assignment());
        };

        let groups = self.locality_groups(&shards, svc_port, key, service);
        let mut assignment = ClusterLoadAssignment {
            cluster_name: self.cluster_name.to_string(),
            endpoints: groups,
        };

        if self.push.networks().is_multi_network() {
            assignment.endpoints =
                split_horizon::filter_by_network(self.push, self.network, assignment.endpoints);
        }

        let (failover_enabled, lb) =
            loadbalancer::effective_policy(self.destination_rule, key.port, &key.subset);
        let setting = loadbalancer::resolve_locality_lb_setting(
            self.push.mesh().locality_lb_setting.as_ref(),
            lb.as_ref().and_then(|l| l.locality_lb_setting.as_ref()),
        );
        if let Some(setting) = setting {
            // The ungrouped assignment is shared across proxies; the policy
            // works on a clone relative to this proxy's locality.
            assignment =
                loadbalancer::apply_locality_policy(&assignment, self.locality, setting, failover_enabled);
        }

        Some(assignment)
    }

    /// Merge the shards into locality groups for this proxy.
    fn locality_groups(
        &self,
        shards: &EndpointShards,
        svc_port: &ServicePort,
        key: &SubsetKey,
        service: &Service,
    ) -> Vec<LocalityLbEndpoints> {
        let subset_labels = self
            .destination_rule
            .map(|dr| dr.subset_labels(&key.subset))
            .unwrap_or_default();
        let cluster_local = self.push.is_cluster_local(service);

        let mut by_locality: HashMap<String, LocalityLbEndpoints> = HashMap::new();
        {
            let mut data = shards.lock();
            for (cluster_id, endpoints) in data.shards.iter_mut() {
                // A cluster-local service is only served from the proxy's
                // own cluster.
                if cluster_local && cluster_id != self.cluster_id {
                    continue;
                }

                for ep in endpoints.iter_mut() {
                    if ep.service_port_name != svc_port.name {
                        continue;
                    }
                    if !labels_match(&subset_labels, &ep.labels) {
                        continue;
                    }

                    let group = by_locality
                        .entry(ep.locality.to_string())
                        .or_insert_with(|| locality_group(&ep.locality));
                    group.lb_endpoints.push(ep.materialize().clone());
                }
            }
        }

        let mut groups: Vec<LocalityLbEndpoints> = by_locality.into_values().collect();
        for group in &mut groups {
            let weight: u32 = group
                .lb_endpoints
                .iter()
                .map(|ep| ep.load_balancing_weight.unwrap_or(1))
                .sum();
            group.load_balancing_weight = Some(weight);
        }

        if groups.is_empty() {
            counter!("eds_cluster_no_instances_total", "cluster" => self.cluster_name.to_string())
                .increment(1);
        }

        groups
    }

    fn empty_assignment(&self) -> ClusterLoadAssignment {
        ClusterLoadAssignment {
            cluster_name: self.cluster_name.to_string(),
            endpoints: vec![],
        }
    }
}

fn locality_group(locality: &Locality) -> LocalityLbEndpoints {
    LocalityLbEndpoints {
        locality: if locality.is_empty() {
            None
        } else {
            Some(locality.to_wire())
        },
        lb_endpoints: vec![],
        load_balancing_weight: None,
        priority: 0,
    }
}

/// Whether an endpoint's labels satisfy the subset filter. An empty filter
/// matches everything.
fn labels_match(filter: &HashMap<String, String>, labels: &HashMap<String, String>) -> bool {
    filter
        .iter()
        .all(|(k, v)| labels.get(k).is_some_and(|lv| lv == v))
}
