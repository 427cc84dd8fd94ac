//! # eds-index
//!
//! The live, sharded, in-memory endpoint index of the control plane and the
//! machinery that feeds it:
//!
//! - [`EndpointIndex`] - hostname/namespace-keyed store of per-cluster
//!   endpoint shards, mutated by registries
//! - [`UpdateOrchestrator`] - classifies each mutation as a full or
//!   incremental push and hands the intent to the outer scheduler
//! - [`RegistryAggregator`] - periodic reconciliation pull from registries
//!   that do not push endpoints inline
//!
//! Registries are the source of truth; the index is memory-only and is
//! rebuilt from them on restart.
//!
//! ## Locking
//!
//! The index map is guarded by a reader-writer lock; each shard entry has
//! its own mutex over both the endpoint lists and the observed
//! service-account set. The index lock is always acquired before a shard
//! mutex, never the reverse, and neither is ever held across I/O.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod aggregator;
mod index;
mod orchestrator;
mod stats;

pub use aggregator::{Registry, RegistryAggregator};
pub use index::{EndpointIndex, EndpointShards, ShardData};
pub use orchestrator::{
    ConfigKey, ConfigKind, PushRequest, PushScheduler, ServiceEvent, TriggerReason,
    UpdateOrchestrator,
};
pub use stats::IndexStats;
