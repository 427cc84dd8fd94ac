//! Cross-network endpoint filtering.
//!
//! In a multi-network mesh a proxy cannot reach endpoints on a foreign
//! network directly; traffic crosses through that network's ingress
//! gateway. This filter rewrites each locality group so that same-network
//! endpoints pass through unchanged and foreign-network endpoints are
//! replaced by their network's gateway addresses, weighted by the endpoints
//! they front. Networks with no registered gateway are unreachable and
//! their endpoints are dropped.
//!
//! Runs before locality load-balancer policy.

use std::collections::BTreeMap;

use tracing::debug;

use eds_core::{build_endpoint_metadata, endpoint_network, NetworkGateway, PushContext, TlsMode};
use eds_types::envoy::config::core::v3::Address;
use eds_types::envoy::config::endpoint::v3::{Endpoint, LbEndpoint, LocalityLbEndpoints};

/// Rewrite locality groups for the proxy's network view.
///
/// Group weights are recomputed; groups left with no endpoints are removed.
#[must_use]
pub fn filter_by_network(
    push: &PushContext,
    proxy_network: &str,
    groups: Vec<LocalityLbEndpoints>,
) -> Vec<LocalityLbEndpoints> {
    let mut filtered = Vec::with_capacity(groups.len());

    for mut group in groups {
        let mut kept = Vec::with_capacity(group.lb_endpoints.len());
        // Summed weight of foreign endpoints per network, ordered for
        // deterministic gateway emission.
        let mut foreign: BTreeMap<String, u32> = BTreeMap::new();

        for ep in group.lb_endpoints {
            let network = endpoint_network(&ep).map(str::to_owned);
            match network.as_deref() {
                // Endpoints without a network label are assumed reachable.
                None => kept.push(ep),
                Some(network) if network == proxy_network => kept.push(ep),
                Some(network) => {
                    *foreign.entry(network.to_string()).or_default() +=
                        ep.load_balancing_weight.unwrap_or(1);
                }
            }
        }

        for (network, weight) in foreign {
            let gateways = push.networks().gateways_for(&network);
            if gateways.is_empty() {
                debug!(network = %network, weight = weight,
                    "no gateway for network, dropping endpoints");
                continue;
            }
            for gateway in gateways {
                kept.push(gateway_endpoint(gateway, &network, weight));
            }
        }

        if kept.is_empty() {
            continue;
        }
        let weight: u32 = kept
            .iter()
            .map(|ep| ep.load_balancing_weight.unwrap_or(1))
            .sum();
        group.lb_endpoints = kept;
        group.load_balancing_weight = Some(weight);
        filtered.push(group);
    }

    filtered
}

/// A gateway standing in for `weight` worth of endpoints on `network`.
/// Cross-network traffic always rides mesh mutual TLS.
fn gateway_endpoint(gateway: &NetworkGateway, network: &str, weight: u32) -> LbEndpoint {
    LbEndpoint {
        endpoint: Some(Endpoint {
            address: Some(Address::socket(gateway.address.clone(), gateway.port)),
        }),
        metadata: Some(build_endpoint_metadata(network, TlsMode::Mutual)),
        load_balancing_weight: Some(weight),
    }
}
