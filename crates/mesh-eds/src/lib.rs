//! # mesh-eds
//!
//! Endpoint discovery subsystem for the mesh control plane.
//!
//! This library maintains a live, sharded, in-memory index of service
//! endpoints gathered from heterogeneous registries and translates it, per
//! connected proxy, into the load-assignment resources the data plane
//! consumes:
//!
//! - Registries report endpoint and service events into the
//!   [`UpdateOrchestrator`](prelude::UpdateOrchestrator), which applies
//!   them to the [`EndpointIndex`](prelude::EndpointIndex) and classifies
//!   each change as a full or incremental push
//! - On push, the [`PushLoop`](prelude::PushLoop) materializes each watched
//!   cluster through an [`EndpointBuilder`](prelude::EndpointBuilder),
//!   applying split-horizon network filtering and locality load-balancer
//!   policy, and sends the response through the connection's sink
//! - The [`EdsGenerator`](prelude::EdsGenerator) serves pull-style refreshes
//!
//! ## Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use mesh_eds::prelude::*;
//!
//! // The shared endpoint index.
//! let index = Arc::new(EndpointIndex::new());
//!
//! // A registry reports endpoints for a service.
//! index.upsert_shard(
//!     &ClusterId::from("c1"),
//!     "reviews.bookinfo.svc.cluster.local",
//!     "bookinfo",
//!     vec![WorkloadEndpoint::new("10.0.0.1", 9080).with_service_port_name("http")],
//! );
//!
//! // A proxy's view of one watched cluster.
//! let push = PushContext::builder()
//!     .version("v1")
//!     .service(
//!         Service::new("reviews.bookinfo.svc.cluster.local", "bookinfo")
//!             .with_port(ServicePort::new("http", 9080, Protocol::Http)),
//!     )
//!     .build();
//! let proxy = Proxy::new("sidecar~demo").with_cluster_id("c1");
//! let builder = EndpointBuilder::new(
//!     "outbound|9080||reviews.bookinfo.svc.cluster.local",
//!     &proxy,
//!     &push,
//! );
//! let assignment = builder.build(&index).expect("EDS cluster");
//! assert_eq!(assignment.endpoints.len(), 1);
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several crates:
//!
//! - `eds-core` - domain model, cluster-name encoding, errors
//! - `eds-index` - sharded endpoint index and registry fan-in
//! - `eds-push` - per-proxy view materialization and push delivery
//! - `eds-types` - wire types for the endpoint API surface
//!
//! This crate (`mesh-eds`) re-exports the public APIs for convenience.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]
#![warn(missing_docs)]

// Re-export all sub-crates
pub use eds_core as core;
pub use eds_index as index;
pub use eds_push as push;
pub use eds_types as types;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use mesh_eds::prelude::*;
/// ```
pub mod prelude {
    // Domain model
    pub use eds_core::{
        ClusterId, DestinationRule, Direction, EdsError, Locality, MeshConfig, MeshNetwork,
        MeshNetworks, Protocol, Proxy, PushContext, Resolution, Service, ServicePort, Subset,
        SubsetKey, TlsMode, TrafficPolicy, WorkloadEndpoint,
    };

    // Index and orchestration
    pub use eds_index::{
        ConfigKey, ConfigKind, EndpointIndex, EndpointShards, PushRequest, PushScheduler,
        Registry, RegistryAggregator, ServiceEvent, TriggerReason, UpdateOrchestrator,
    };

    // Build and push
    pub use eds_push::{
        DiscoveryResponse, EdsGenerator, EndpointBuilder, EndpointSink, PushLoop, Subscription,
        WatchedResource,
    };
}

/// Version information for this crate.
pub mod version {
    /// Crate version.
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");

    /// Minimum supported Rust version.
    pub const MSRV: &str = "1.75";

    /// Get version info as a string.
    pub fn version_string() -> String {
        format!("mesh-eds {} (MSRV {})", VERSION, MSRV)
    }
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use std::sync::Arc;

    #[test]
    fn prelude_imports_work() {
        let index = Arc::new(EndpointIndex::new());
        index.upsert_shard(
            &ClusterId::from("c1"),
            "reviews.bookinfo.svc.cluster.local",
            "bookinfo",
            vec![WorkloadEndpoint::new("10.0.0.1", 9080).with_service_port_name("http")],
        );
        assert!(index.contains("reviews.bookinfo.svc.cluster.local", "bookinfo"));
    }

    #[test]
    fn version_info() {
        let version = super::version::version_string();
        assert!(version.contains("mesh-eds"));
    }
}
