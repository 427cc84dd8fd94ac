//! # eds-push
//!
//! Per-proxy view materialization and push delivery:
//!
//! - [`EndpointBuilder`] - turns one watched cluster name into a
//!   load assignment for one proxy, filtering and grouping the index's
//!   shards by locality
//! - [`loadbalancer`] - locality-aware priority and weight application
//! - [`split_horizon`] - cross-network endpoint filtering and gateway
//!   substitution
//! - [`PushLoop`] - pushes assignments to a subscribed connection
//! - [`EdsGenerator`] - pull-style counterpart returning resources to the
//!   caller instead of sending them
//!
//! Assignments are built to completion under the shard locks, the locks are
//! released, and only then does the send await the transport.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod builder;
mod generator;
pub mod loadbalancer;
mod metrics;
mod nonce;
mod push;
pub mod split_horizon;

pub use builder::EndpointBuilder;
pub use generator::{EdsGenerator, WatchedResource};
pub use self::metrics::{EdsMetrics, PushTimer};
pub use push::{DiscoveryResponse, EndpointSink, PushLoop, Subscription};
