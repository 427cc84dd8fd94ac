//! Per-connection push delivery.
//!
//! A [`PushLoop`] walks the clusters a subscription watches, builds each
//! assignment against the index, and sends one discovery response through
//! the connection's sink. Assignments are built to completion with locks
//! released before the send awaits the transport; on failure the error is
//! counted and returned, retries belong to the transport layer.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{debug, info};

use eds_core::{EdsError, Proxy, PushContext, SubsetKey};
use eds_index::EndpointIndex;

use crate::builder::EndpointBuilder;
use crate::metrics::EdsMetrics;
use crate::nonce;

/// One discovery response, ready for the transport.
#[derive(Clone, Debug, Default)]
pub struct DiscoveryResponse {
    /// Version string; opaque to this layer, supplied by the caller.
    pub version_info: String,
    /// Serialized load-assignment resources.
    pub resources: Vec<prost_types::Any>,
    /// Type URL of the resources.
    pub type_url: String,
    /// Nonce derived from the push snapshot version.
    pub nonce: String,
}

/// Write half of a proxy connection.
///
/// Implemented by the transport layer; `send` may block on the peer and is
/// therefore async. It must never be called with index locks held.
#[async_trait]
pub trait EndpointSink: Send + Sync {
    /// Deliver one response to the proxy.
    async fn send(&self, response: DiscoveryResponse) -> Result<(), tonic::Status>;
}

/// Subscription state for one connected proxy.
#[derive(Debug)]
pub struct Subscription {
    conn_id: String,
    proxy: Proxy,
    watched: Vec<String>,
    last_version: Mutex<String>,
    nonce_seq: AtomicU64,
}

impl Subscription {
    /// Create a subscription for a connection.
    #[must_use]
    pub fn new(conn_id: impl Into<String>, proxy: Proxy) -> Self {
        Self {
            conn_id: conn_id.into(),
            proxy,
            watched: Vec::new(),
            last_version: Mutex::new(String::new()),
            nonce_seq: AtomicU64::new(0),
        }
    }

    /// Set the watched cluster names.
    #[must_use]
    pub fn with_watched(mut self, clusters: Vec<String>) -> Self {
        self.watched = clusters;
        self
    }

    /// Add a watched cluster name.
    pub fn watch(&mut self, cluster: impl Into<String>) {
        self.watched.push(cluster.into());
    }

    /// Connection identifier.
    #[inline]
    #[must_use]
    pub fn conn_id(&self) -> &str {
        &self.conn_id
    }

    /// The proxy behind the connection.
    #[inline]
    #[must_use]
    pub fn proxy(&self) -> &Proxy {
        &self.proxy
    }

    /// Cluster names this connection watches.
    #[inline]
    #[must_use]
    pub fn watched_clusters(&self) -> &[String] {
        &self.watched
    }

    /// Version of the last successfully sent response.
    #[must_use]
    pub fn last_version(&self) -> String {
        self.last_version
            .lock()
            .expect("subscription mutex poisoned")
            .clone()
    }

    /// Next nonce for this subscription, derived from the push version.
    #[must_use]
    pub fn next_nonce(&self, push_version: &str) -> String {
        let seq = self.nonce_seq.fetch_add(1, Ordering::Relaxed);
        nonce::derive(push_version, seq)
    }

    fn set_last_version(&self, version: &str) {
        let mut last = self
            .last_version
            .lock()
            .expect("subscription mutex poisoned");
        *last = version.to_string();
    }
}

/// Pushes endpoint assignments to subscribed connections.
#[derive(Clone)]
pub struct PushLoop {
    index: Arc<EndpointIndex>,
    metrics: EdsMetrics,
}

impl PushLoop {
    /// Create a push loop over an index.
    #[must_use]
    pub fn new(index: Arc<EndpointIndex>) -> Self {
        Self {
            index,
            metrics: EdsMetrics::new(),
        }
    }

    /// The index assignments are built from.
    #[inline]
    #[must_use]
    pub fn index(&self) -> &Arc<EndpointIndex> {
        &self.index
    }

    /// Push endpoints for one connection.
    ///
    /// With `updated_services` set this is an incremental push: only
    /// watched clusters whose hostname is in the set are recomputed. A
    /// `None` filter recomputes everything (connect and full pushes).
    pub async fn push_endpoints(
        &self,
        subscription: &Subscription,
        sink: &dyn EndpointSink,
        push: &PushContext,
        version: &str,
        updated_services: Option<&HashSet<String>>,
    ) -> Result<(), EdsError> {
        let timer = self.metrics.start_push();
        let mut assignments = Vec::new();
        let mut endpoint_total = 0usize;
        let mut empty = 0usize;

        for cluster_name in subscription.watched_clusters() {
            if let Some(updated) = updated_services {
                // Incremental push: recompute only the updated services.
                match SubsetKey::hostname_of(cluster_name) {
                    Some(hostname) if updated.contains(hostname) => {}
                    _ => continue,
                }
            }

            let builder = EndpointBuilder::new(cluster_name, subscription.proxy(), push);
            let Some(assignment) = builder.build(&self.index) else {
                continue;
            };

            endpoint_total += assignment
                .endpoints
                .iter()
                .map(|g| g.lb_endpoints.len())
                .sum::<usize>();
            if assignment.endpoints.is_empty() {
                empty += 1;
            }
            assignments.push(assignment);
        }

        let response = DiscoveryResponse {
            version_info: version.to_string(),
            resources: assignments.iter().map(|a| a.to_any()).collect(),
            type_url: eds_types::type_url::ENDPOINT.to_string(),
            nonce: subscription.next_nonce(push.version()),
        };
        let cluster_count = response.resources.len();

        // Locks were released in build; only now block on the peer.
        let sent = sink.send(response).await;
        timer.finish();

        if let Err(status) = sent {
            self.metrics.record_send_error(subscription.conn_id());
            return Err(EdsError::SendFailed {
                conn_id: subscription.conn_id().to_string(),
                source: status,
            });
        }

        self.metrics.record_push(endpoint_total, empty);
        subscription.set_last_version(version);
        if updated_services.is_none() {
            info!(conn = %subscription.conn_id(), clusters = cluster_count,
                endpoints = endpoint_total, empty = empty, "EDS push");
        } else {
            debug!(conn = %subscription.conn_id(), clusters = cluster_count,
                endpoints = endpoint_total, empty = empty, "EDS incremental push");
        }
        Ok(())
    }
}
