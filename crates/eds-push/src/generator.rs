//! Pull-style subscription refresh.
//!
//! [`EdsGenerator`] mirrors the push loop's inner loop but returns the
//! serialized resources to the caller instead of sending them. Selection is
//! inverted relative to the push loop: clusters whose hostname *is* in the
//! updated set are skipped here, because the external update pipeline
//! delivers that subset through the push path. The two must never both
//! produce the same cluster; this division of labor is a contract.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::trace;

use eds_core::{Proxy, PushContext, SubsetKey};
use eds_index::{ConfigKey, ConfigKind, EndpointIndex};

use crate::builder::EndpointBuilder;

/// A subscription's watched resources, as tracked by the transport.
#[derive(Clone, Debug, Default)]
pub struct WatchedResource {
    /// Type URL the subscription asked for.
    pub type_url: String,
    /// Watched resource (cluster) names.
    pub resource_names: Vec<String>,
}

impl WatchedResource {
    /// Create a watched-resource record.
    #[must_use]
    pub fn new(type_url: impl Into<String>, resource_names: Vec<String>) -> Self {
        Self {
            type_url: type_url.into(),
            resource_names,
        }
    }
}

/// Stateless adapter producing a resource bundle for a subscription update.
pub struct EdsGenerator {
    index: Arc<EndpointIndex>,
}

impl EdsGenerator {
    /// Create a generator over an index.
    #[must_use]
    pub fn new(index: Arc<EndpointIndex>) -> Self {
        Self { index }
    }

    /// Generate resources for the watched clusters.
    ///
    /// `updates` carries the configuration keys the update pipeline already
    /// handles; their hostnames are skipped (inverse of the push loop's
    /// selection). `None` generates everything.
    #[must_use]
    pub fn generate(
        &self,
        proxy: &Proxy,
        push: &PushContext,
        watched: &WatchedResource,
        updates: Option<&HashSet<ConfigKey>>,
    ) -> Vec<prost_types::Any> {
        let updated_hostnames: Option<HashSet<&str>> = updates.map(|keys| {
            keys.iter()
                .filter(|k| k.kind == ConfigKind::ServiceEntry)
                .map(|k| k.name.as_str())
                .collect()
        });

        let mut resources = Vec::with_capacity(watched.resource_names.len());
        for cluster_name in &watched.resource_names {
            if let Some(updated) = &updated_hostnames {
                if let Some(hostname) = SubsetKey::hostname_of(cluster_name) {
                    if updated.contains(hostname) {
                        trace!(cluster = %cluster_name, "handled by update pipeline, skipping");
                        continue;
                    }
                }
            }

            let builder = EndpointBuilder::new(cluster_name, proxy, push);
            let Some(assignment) = builder.build(&self.index) else {
                continue;
            };

            let mut resource = assignment.to_any();
            if !watched.type_url.is_empty() {
                resource.type_url = watched.type_url.clone();
            }
            resources.push(resource);
        }

        resources
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use eds_core::{ClusterId, Protocol, Service, ServicePort, WorkloadEndpoint};
    use eds_types::envoy::config::endpoint::v3::ClusterLoadAssignment;
    use prost::Message;

    const REVIEWS: &str = "reviews.bookinfo.svc.cluster.local";
    const RATINGS: &str = "ratings.bookinfo.svc.cluster.local";

    fn setup() -> (EdsGenerator, PushContext, Proxy, WatchedResource) {
        let index = Arc::new(EndpointIndex::new());
        for (host, addr) in [(REVIEWS, "10.0.0.1"), (RATINGS, "10.0.0.2")] {
            index.upsert_shard(
                &ClusterId::from("c1"),
                host,
                "bookinfo",
                vec![WorkloadEndpoint::new(addr, 9080).with_service_port_name("http")],
            );
        }

        let push = PushContext::builder()
            .version("snap-1")
            .service(
                Service::new(REVIEWS, "bookinfo")
                    .with_port(ServicePort::new("http", 9080, Protocol::Http)),
            )
            .service(
                Service::new(RATINGS, "bookinfo")
                    .with_port(ServicePort::new("http", 9080, Protocol::Http)),
            )
            .build();

        let watched = WatchedResource::new(
            eds_types::type_url::ENDPOINT,
            vec![
                format!("outbound|9080||{REVIEWS}"),
                format!("outbound|9080||{RATINGS}"),
            ],
        );

        (
            EdsGenerator::new(index),
            push,
            Proxy::new("sidecar~gen").with_cluster_id("c1"),
            watched,
        )
    }

    fn names(resources: &[prost_types::Any]) -> Vec<String> {
        resources
            .iter()
            .map(|any| {
                ClusterLoadAssignment::decode(any.value.as_slice())
                    .unwrap()
                    .cluster_name
            })
            .collect()
    }

    #[test]
    fn generates_all_without_update_set() {
        let (generator, push, proxy, watched) = setup();
        let resources = generator.generate(&proxy, &push, &watched, None);
        assert_eq!(resources.len(), 2);
        assert!(resources.iter().all(|r| r.type_url == eds_types::type_url::ENDPOINT));
    }

    #[test]
    fn skips_hostnames_in_update_set() {
        let (generator, push, proxy, watched) = setup();
        let updates = HashSet::from([ConfigKey::service_entry(REVIEWS, "bookinfo")]);

        let resources = generator.generate(&proxy, &push, &watched, Some(&updates));
        // Inverse of the push loop: the updated hostname is the one skipped.
        assert_eq!(names(&resources), vec![format!("outbound|9080||{RATINGS}")]);
    }

    #[test]
    fn empty_update_set_generates_everything() {
        let (generator, push, proxy, watched) = setup();
        let updates = HashSet::new();
        let resources = generator.generate(&proxy, &push, &watched, Some(&updates));
        assert_eq!(resources.len(), 2);
    }

    #[test]
    fn caller_type_url_overrides_default() {
        let (generator, push, proxy, mut watched) = setup();
        watched.type_url = "type.googleapis.com/custom.Assignment".to_string();

        let resources = generator.generate(&proxy, &push, &watched, None);
        assert!(resources
            .iter()
            .all(|r| r.type_url == "type.googleapis.com/custom.Assignment"));
    }
}
