//! Index-to-proxy push flow tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mesh_eds::prelude::*;
use mesh_eds::types::envoy::config::endpoint::v3::ClusterLoadAssignment;
use prost::Message;

const REVIEWS: &str = "reviews.bookinfo.svc.cluster.local";
const REVIEWS_CLUSTER: &str = "outbound|9080||reviews.bookinfo.svc.cluster.local";

#[derive(Default)]
struct CaptureSink {
    responses: Mutex<Vec<DiscoveryResponse>>,
}

#[async_trait]
impl EndpointSink for CaptureSink {
    async fn send(&self, response: DiscoveryResponse) -> Result<(), tonic::Status> {
        self.responses.lock().unwrap().push(response);
        Ok(())
    }
}

fn http_service(hostname: &str) -> Service {
    Service::new(hostname, "bookinfo").with_port(ServicePort::new("http", 9080, Protocol::Http))
}

fn endpoint(address: &str, cluster_locality: &str) -> WorkloadEndpoint {
    WorkloadEndpoint::new(address, 9080)
        .with_service_port_name("http")
        .with_locality(cluster_locality)
}

fn decode(response: &DiscoveryResponse) -> Vec<ClusterLoadAssignment> {
    response
        .resources
        .iter()
        .map(|any| ClusterLoadAssignment::decode(any.value.as_slice()).unwrap())
        .collect()
}

#[test]
fn cluster_local_filter_end_to_end() {
    let index = Arc::new(EndpointIndex::new());
    index.upsert_shard(&ClusterId::from("c1"), REVIEWS, "bookinfo", vec![endpoint("10.0.0.1", "")]);
    index.upsert_shard(&ClusterId::from("c2"), REVIEWS, "bookinfo", vec![endpoint("10.1.0.1", "")]);

    let proxy = Proxy::new("sidecar~local").with_cluster_id("c1");

    // Cluster-local: only c1's endpoint is visible.
    let local_push = PushContext::builder()
        .service(http_service(REVIEWS))
        .mesh(MeshConfig {
            cluster_local_hosts: vec![REVIEWS.to_string()],
            ..Default::default()
        })
        .build();
    let assignment = EndpointBuilder::new(REVIEWS_CLUSTER, &proxy, &local_push)
        .build(&index)
        .unwrap();
    let total: usize = assignment.endpoints.iter().map(|g| g.lb_endpoints.len()).sum();
    assert_eq!(total, 1);

    // Same state, policy disabled: both shards merge.
    let open_push = PushContext::builder().service(http_service(REVIEWS)).build();
    let assignment = EndpointBuilder::new(REVIEWS_CLUSTER, &proxy, &open_push)
        .build(&index)
        .unwrap();
    let total: usize = assignment.endpoints.iter().map(|g| g.lb_endpoints.len()).sum();
    assert_eq!(total, 2);
}

#[test]
fn weights_aggregate_per_locality_group() {
    let index = Arc::new(EndpointIndex::new());
    index.upsert_shard(
        &ClusterId::from("c1"),
        REVIEWS,
        "bookinfo",
        vec![
            endpoint("10.0.0.1", "us-east/1a").with_weight(3),
            endpoint("10.0.0.2", "us-east/1a"), // weight 0 counts as 1
            endpoint("10.0.0.3", "us-east/1b").with_weight(2),
        ],
    );

    let push = PushContext::builder().service(http_service(REVIEWS)).build();
    let proxy = Proxy::new("sidecar~w").with_cluster_id("c1");
    let assignment = EndpointBuilder::new(REVIEWS_CLUSTER, &proxy, &push)
        .build(&index)
        .unwrap();

    let weights: HashMap<String, u32> = assignment
        .endpoints
        .iter()
        .map(|g| {
            let locality = g.locality.as_ref().unwrap();
            (
                format!("{}/{}", locality.region, locality.zone),
                g.load_balancing_weight.unwrap(),
            )
        })
        .collect();
    assert_eq!(weights["us-east/1a"], 4);
    assert_eq!(weights["us-east/1b"], 2);

    // Every group weight equals the sum of its endpoint weights.
    for group in &assignment.endpoints {
        let sum: u32 = group
            .lb_endpoints
            .iter()
            .map(|e| e.load_balancing_weight.unwrap_or(1))
            .sum();
        assert_eq!(group.load_balancing_weight, Some(sum));
    }
}

#[tokio::test]
async fn full_then_incremental_push_flow() {
    let index = Arc::new(EndpointIndex::new());
    index.upsert_shard(&ClusterId::from("c1"), REVIEWS, "bookinfo", vec![endpoint("10.0.0.1", "")]);
    index.upsert_shard(
        &ClusterId::from("c1"),
        "ratings.bookinfo.svc.cluster.local",
        "bookinfo",
        vec![endpoint("10.0.0.2", "")],
    );

    let push = PushContext::builder()
        .version("gen-1")
        .service(http_service(REVIEWS))
        .service(http_service("ratings.bookinfo.svc.cluster.local"))
        .build();

    let subscription = Subscription::new("conn-9", Proxy::new("sidecar~flow").with_cluster_id("c1"))
        .with_watched(vec![
            REVIEWS_CLUSTER.to_string(),
            "outbound|9080||ratings.bookinfo.svc.cluster.local".to_string(),
        ]);
    let sink = CaptureSink::default();
    let push_loop = PushLoop::new(Arc::clone(&index));

    // Connect-time full push covers both clusters.
    push_loop
        .push_endpoints(&subscription, &sink, &push, "v1", None)
        .await
        .unwrap();

    // An endpoint change to reviews drives an incremental push.
    let updated = HashSet::from([REVIEWS.to_string()]);
    push_loop
        .push_endpoints(&subscription, &sink, &push, "v2", Some(&updated))
        .await
        .unwrap();

    let responses = sink.responses.lock().unwrap();
    assert_eq!(decode(&responses[0]).len(), 2);
    let incremental = decode(&responses[1]);
    assert_eq!(incremental.len(), 1);
    assert_eq!(incremental[0].cluster_name, REVIEWS_CLUSTER);
    assert_eq!(subscription.last_version(), "v2");
}

#[test]
fn generator_and_push_loop_split_the_update_set() {
    let index = Arc::new(EndpointIndex::new());
    index.upsert_shard(&ClusterId::from("c1"), REVIEWS, "bookinfo", vec![endpoint("10.0.0.1", "")]);
    index.upsert_shard(
        &ClusterId::from("c1"),
        "ratings.bookinfo.svc.cluster.local",
        "bookinfo",
        vec![endpoint("10.0.0.2", "")],
    );

    let push = PushContext::builder()
        .version("gen-2")
        .service(http_service(REVIEWS))
        .service(http_service("ratings.bookinfo.svc.cluster.local"))
        .build();
    let proxy = Proxy::new("sidecar~split").with_cluster_id("c1");

    let watched = WatchedResource::new(
        mesh_eds::types::type_url::ENDPOINT,
        vec![
            REVIEWS_CLUSTER.to_string(),
            "outbound|9080||ratings.bookinfo.svc.cluster.local".to_string(),
        ],
    );
    let updates = HashSet::from([ConfigKey::service_entry(REVIEWS, "bookinfo")]);

    // The generator skips the updated hostname...
    let generator = EdsGenerator::new(Arc::clone(&index));
    let generated = generator.generate(&proxy, &push, &watched, Some(&updates));
    let generated_names: HashSet<String> = generated
        .iter()
        .map(|any| ClusterLoadAssignment::decode(any.value.as_slice()).unwrap().cluster_name)
        .collect();
    assert!(!generated_names.contains(REVIEWS_CLUSTER));
    assert_eq!(generated_names.len(), 1);

    // ...which is exactly the hostname the push loop selects. Together they
    // cover the watch list with no overlap.
    let update_hostnames: HashSet<String> = HashSet::from([REVIEWS.to_string()]);
    let selected: HashSet<String> = watched
        .resource_names
        .iter()
        .filter(|name| {
            SubsetKey::hostname_of(name)
                .map(|h| update_hostnames.contains(h))
                .unwrap_or(false)
        })
        .cloned()
        .collect();
    assert_eq!(selected, HashSet::from([REVIEWS_CLUSTER.to_string()]));
    assert!(generated_names.is_disjoint(&selected));
}

#[test]
fn split_horizon_and_locality_policy_compose() {
    let index = Arc::new(EndpointIndex::new());
    index.upsert_shard(
        &ClusterId::from("c1"),
        REVIEWS,
        "bookinfo",
        vec![
            endpoint("10.0.0.1", "us-east/1a").with_network("east"),
            endpoint("10.1.0.1", "eu-west/2b").with_network("west").with_weight(2),
        ],
    );

    let push = PushContext::builder()
        .service(http_service(REVIEWS))
        .destination_rule(DestinationRule::new(REVIEWS).with_traffic_policy(TrafficPolicy {
            outlier_detection: Some(Default::default()),
            load_balancer: Some(locality_lb_settings()),
            ..Default::default()
        }))
        .mesh(MeshConfig {
            networks: MeshNetworks::new()
                .with_network("east", MeshNetwork::new())
                .with_network("west", MeshNetwork::new().with_gateway("34.9.0.1", 15443)),
            ..Default::default()
        })
        .build();

    let proxy = Proxy::new("sidecar~east")
        .with_cluster_id("c1")
        .with_network("east")
        .with_locality("us-east/1a");

    let assignment = EndpointBuilder::new(REVIEWS_CLUSTER, &proxy, &push)
        .build(&index)
        .unwrap();

    // The west endpoint was replaced by the gateway, keeping its weight.
    let mut addresses: Vec<(String, u32)> = assignment
        .endpoints
        .iter()
        .flat_map(|g| &g.lb_endpoints)
        .map(|ep| {
            let socket = ep
                .endpoint
                .as_ref()
                .and_then(|e| e.address.as_ref())
                .and_then(|a| a.as_socket())
                .unwrap();
            (socket.address.clone(), ep.load_balancing_weight.unwrap())
        })
        .collect();
    addresses.sort();
    assert_eq!(
        addresses,
        vec![("10.0.0.1".to_string(), 1), ("34.9.0.1".to_string(), 2)]
    );

    // Failover priorities favor the proxy's locality.
    let priorities: HashMap<String, u32> = assignment
        .endpoints
        .iter()
        .map(|g| {
            let region = g.locality.as_ref().map(|l| l.region.clone()).unwrap_or_default();
            (region, g.priority)
        })
        .collect();
    assert_eq!(priorities["us-east"], 0);
    assert!(priorities["eu-west"] > 0);
}

fn locality_lb_settings() -> mesh_eds::core::LoadBalancerSettings {
    mesh_eds::core::LoadBalancerSettings {
        locality_lb_setting: Some(mesh_eds::core::LocalityLbSetting::default()),
    }
}
