//! # eds-core
//!
//! Domain model for the endpoint discovery subsystem of the mesh control
//! plane. This crate defines the entities every other EDS crate speaks in:
//!
//! - [`WorkloadEndpoint`] - one discovered network endpoint, with its lazily
//!   materialized wire representation
//! - [`SubsetKey`] - the cluster-name encoding shared with the data plane
//! - [`Service`], [`DestinationRule`], [`Proxy`] - read-only configuration
//!   snapshots owned by external layers
//! - [`PushContext`] - the immutable per-push view of mesh configuration
//! - [`EdsError`] - error type with gRPC status mapping
//!
//! Nothing in this crate performs I/O; it is pure data and lookup logic.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cluster_name;
mod destination_rule;
mod endpoint;
mod error;
mod locality;
mod mesh;
mod proxy;
mod push_context;
mod service;

pub use cluster_name::{Direction, SubsetKey};
pub use destination_rule::{
    merge_traffic_policy, DestinationRule, LoadBalancerSettings, LocalityDistribute,
    LocalityFailover, LocalityLbSetting, OutlierDetection, PortTrafficPolicy, Subset,
    TrafficPolicy,
};
pub use endpoint::{build_endpoint_metadata, endpoint_network, ClusterId, TlsMode, WorkloadEndpoint};
pub use error::EdsError;
pub use locality::Locality;
pub use mesh::{MeshConfig, MeshNetwork, MeshNetworks, NetworkGateway};
pub use proxy::Proxy;
pub use push_context::{PushContext, PushContextBuilder};
pub use service::{Protocol, Resolution, Service, ServicePort};

/// Result type alias using [`EdsError`].
pub type Result<T> = std::result::Result<T, EdsError>;
