//! Locality-aware load-balancer policy.
//!
//! Settings merge in three layers (mesh default, destination-rule
//! top-level, subset) before being applied to an assignment relative to the
//! calling proxy's locality. Failover is only enabled when outlier
//! detection is configured; without it the proxy would never eject the
//! unhealthy hosts the priorities steer away from.

use std::collections::HashMap;

use eds_core::{
    merge_traffic_policy, DestinationRule, LoadBalancerSettings, Locality, LocalityDistribute,
    LocalityFailover, LocalityLbSetting,
};
use eds_types::envoy::config::endpoint::v3::ClusterLoadAssignment;

/// Merge the destination rule's policy layers for one (port, subset).
///
/// Returns whether failover may be enabled (outlier detection configured on
/// the effective policy) and the effective load-balancer settings.
#[must_use]
pub fn effective_policy(
    rule: Option<&DestinationRule>,
    port: u16,
    subset: &str,
) -> (bool, Option<LoadBalancerSettings>) {
    let Some(rule) = rule else {
        return (false, None);
    };

    let mut policy = merge_traffic_policy(None, rule.traffic_policy.as_ref(), port);
    if let Some(sub) = rule.subset(subset) {
        policy = merge_traffic_policy(policy.as_ref(), sub.traffic_policy.as_ref(), port);
    }

    match policy {
        Some(p) => (p.outlier_detection.is_some(), p.load_balancer),
        None => (false, None),
    }
}

/// Pick the locality LB setting in effect: the destination rule's wins;
/// the mesh default applies only when explicitly enabled.
#[must_use]
pub fn resolve_locality_lb_setting<'a>(
    mesh: Option<&'a LocalityLbSetting>,
    rule: Option<&'a LocalityLbSetting>,
) -> Option<&'a LocalityLbSetting> {
    if rule.is_some() {
        return rule;
    }
    mesh.filter(|s| s.enabled)
}

/// Apply a locality LB setting to an assignment, relative to the calling
/// proxy.
///
/// The input assignment is shared across every proxy consuming the same
/// cluster; priorities and weights are proxy-relative, so the mutation
/// happens on a clone and the original is left untouched.
#[must_use]
pub fn apply_locality_policy(
    assignment: &ClusterLoadAssignment,
    proxy_locality: &Locality,
    setting: &LocalityLbSetting,
    failover_enabled: bool,
) -> ClusterLoadAssignment {
    let mut cloned = assignment.clone();
    if !setting.distribute.is_empty() {
        apply_distribute(&mut cloned, proxy_locality, &setting.distribute);
    } else if failover_enabled {
        apply_failover(&mut cloned, proxy_locality, &setting.failover);
    }
    cloned
}

/// Redistribute locality-group weights per the first rule matching the
/// proxy's locality. Groups the rule does not route to are removed.
fn apply_distribute(
    assignment: &mut ClusterLoadAssignment,
    proxy_locality: &Locality,
    rules: &[LocalityDistribute],
) {
    let Some(rule) = rules
        .iter()
        .find(|r| pattern_matches(&r.from, proxy_locality))
    else {
        return;
    };

    assignment.endpoints.retain_mut(|group| {
        let label = group
            .locality
            .as_ref()
            .map(|l| format!("{}/{}/{}", l.region, l.zone, l.sub_zone))
            .unwrap_or_default();
        match lookup_weight(&rule.to, &label) {
            Some(weight) => {
                group.load_balancing_weight = Some(weight);
                true
            }
            None => false,
        }
    });
}

/// Assign failover priorities by locality affinity with the proxy:
/// full match, zone match, region match, explicit failover target, rest.
/// Priorities are then renumbered to be dense starting at zero.
fn apply_failover(
    assignment: &mut ClusterLoadAssignment,
    proxy_locality: &Locality,
    failover: &[LocalityFailover],
) {
    for group in &mut assignment.endpoints {
        let group_locality = group
            .locality
            .as_ref()
            .map(|l| Locality::new(l.region.clone(), l.zone.clone(), l.sub_zone.clone()))
            .unwrap_or_default();

        group.priority = match proxy_locality.shared_prefix(&group_locality) {
            3 => 0,
            2 => 1,
            1 => 2,
            _ => {
                let is_failover_target = failover
                    .iter()
                    .any(|f| f.from == proxy_locality.region && f.to == group_locality.region);
                if is_failover_target {
                    3
                } else {
                    4
                }
            }
        };
    }

    // Envoy requires priorities to be contiguous from zero.
    let mut present: Vec<u32> = assignment.endpoints.iter().map(|g| g.priority).collect();
    present.sort_unstable();
    present.dedup();
    for group in &mut assignment.endpoints {
        let dense = present
            .iter()
            .position(|p| *p == group.priority)
            .unwrap_or_default();
        group.priority = dense as u32;
    }
}

/// Match a locality against a `region/zone/subzone` pattern where segments
/// may be `*` and missing trailing segments match anything.
fn pattern_matches(pattern: &str, locality: &Locality) -> bool {
    let mut segments = pattern.splitn(3, '/');
    let matches = |pat: Option<&str>, value: &str| match pat {
        None | Some("*") => true,
        Some(p) => p == value,
    };
    matches(segments.next(), &locality.region)
        && matches(segments.next(), &locality.zone)
        && matches(segments.next(), &locality.sub_zone)
}

/// Resolve a group's weight from a distribute rule's `to` map, trying the
/// exact label first and then progressively wider wildcards.
fn lookup_weight(to: &HashMap<String, u32>, label: &str) -> Option<u32> {
    if let Some(w) = to.get(label) {
        return Some(*w);
    }
    let locality = Locality::parse(label);
    for candidate in [
        format!("{}/{}/*", locality.region, locality.zone),
        format!("{}/*", locality.region),
        "*".to_string(),
    ] {
        if let Some(w) = to.get(&candidate) {
            return Some(*w);
        }
    }
    None
}
