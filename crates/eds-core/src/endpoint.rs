//! Discovered workload endpoints.
//!
//! A [`WorkloadEndpoint`] is one network endpoint as reported by a service
//! registry. Conversion to the wire form happens once per endpoint and is
//! memoized; the memo is owned by whoever holds the shard mutex.

use std::collections::HashMap;
use std::fmt;

use eds_types::envoy::config::core::v3::{Address, Metadata};
use eds_types::envoy::config::endpoint::v3::{Endpoint, LbEndpoint};

use crate::Locality;

/// Filter-metadata key carrying mesh-level endpoint attributes.
const MESH_FILTER_KEY: &str = "mesh";

/// Filter-metadata key the proxy uses to pick a transport socket.
const TRANSPORT_SOCKET_MATCH_KEY: &str = "envoy.transport_socket_match";

/// Identifier of the origin cluster that contributed an endpoint shard.
///
/// This is a topology concept (which cluster of the multi-cluster mesh the
/// endpoint lives in), unrelated to data-plane cluster names.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ClusterId(String);

impl ClusterId {
    /// Create a cluster id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClusterId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ClusterId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// TLS transport mode advertised for an endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TlsMode {
    /// Plaintext.
    #[default]
    Disabled,
    /// One-way TLS.
    Simple,
    /// Mesh mutual TLS.
    Mutual,
}

impl TlsMode {
    /// The label written into endpoint metadata.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TlsMode::Disabled => "disabled",
            TlsMode::Simple => "simple",
            TlsMode::Mutual => "mutual",
        }
    }
}

impl fmt::Display for TlsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One network endpoint gathered from a registry.
///
/// The address, port, network and TLS mode feed the memoized wire
/// representation and are therefore only settable through methods that
/// drop the memo; everything else is plain data.
///
/// # Example
///
/// ```rust
/// use eds_core::{TlsMode, WorkloadEndpoint};
///
/// let ep = WorkloadEndpoint::new("10.1.1.1", 8080)
///     .with_service_port_name("http")
///     .with_locality("us-east/1a")
///     .with_service_account("spiffe://mesh/ns/bookinfo/sa/reviews")
///     .with_tls_mode(TlsMode::Mutual)
///     .with_weight(2);
/// assert_eq!(ep.address(), "10.1.1.1");
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WorkloadEndpoint {
    address: String,
    port: u16,
    network: String,
    tls_mode: TlsMode,
    /// Name of the service port this endpoint serves.
    pub service_port_name: String,
    /// Placement of the endpoint.
    pub locality: Locality,
    /// Workload identity, when the registry knows one.
    pub service_account: Option<String>,
    /// Workload labels, used for subset filtering.
    pub labels: HashMap<String, String>,
    /// Load-balancing weight; zero materializes as one.
    pub lb_weight: u32,
    materialized: Option<LbEndpoint>,
}

impl WorkloadEndpoint {
    /// Create an endpoint from its address and port.
    #[must_use]
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
            ..Default::default()
        }
    }

    /// Set the service port name.
    #[must_use]
    pub fn with_service_port_name(mut self, name: impl Into<String>) -> Self {
        self.service_port_name = name.into();
        self
    }

    /// Set the locality from a `region/zone/subzone` label.
    #[must_use]
    pub fn with_locality(mut self, label: &str) -> Self {
        self.locality = Locality::parse(label);
        self
    }

    /// Set the service-account identity.
    #[must_use]
    pub fn with_service_account(mut self, account: impl Into<String>) -> Self {
        self.service_account = Some(account.into());
        self
    }

    /// Set the network the endpoint lives in.
    #[must_use]
    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = network.into();
        self
    }

    /// Set the TLS mode.
    #[must_use]
    pub fn with_tls_mode(mut self, mode: TlsMode) -> Self {
        self.tls_mode = mode;
        self
    }

    /// Add a workload label.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Set the load-balancing weight.
    #[must_use]
    pub fn with_weight(mut self, weight: u32) -> Self {
        self.lb_weight = weight;
        self
    }

    /// Endpoint address.
    #[inline]
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Endpoint port.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Network the endpoint lives in; empty when single-network.
    #[inline]
    #[must_use]
    pub fn network(&self) -> &str {
        &self.network
    }

    /// TLS transport mode.
    #[inline]
    #[must_use]
    pub fn tls_mode(&self) -> TlsMode {
        self.tls_mode
    }

    /// Replace the address, dropping the memoized wire form.
    pub fn set_address(&mut self, address: impl Into<String>) {
        self.address = address.into();
        self.materialized = None;
    }

    /// Replace the port, dropping the memoized wire form.
    pub fn set_port(&mut self, port: u16) {
        self.port = port;
        self.materialized = None;
    }

    /// Replace the network, dropping the memoized wire form.
    pub fn set_network(&mut self, network: impl Into<String>) {
        self.network = network.into();
        self.materialized = None;
    }

    /// Replace the TLS mode, dropping the memoized wire form.
    pub fn set_tls_mode(&mut self, mode: TlsMode) {
        self.tls_mode = mode;
        self.materialized = None;
    }

    /// Whether the wire form has been built already.
    #[must_use]
    pub fn is_materialized(&self) -> bool {
        self.materialized.is_some()
    }

    /// The wire representation, built on first use.
    ///
    /// Callers must hold the shard mutex; the memo lives inside the shard
    /// and is shared by every proxy reading it.
    pub fn materialize(&mut self) -> &LbEndpoint {
        if self.materialized.is_none() {
            let weight = if self.lb_weight == 0 { 1 } else { self.lb_weight };
            self.materialized = Some(LbEndpoint {
                endpoint: Some(Endpoint {
                    address: Some(Address::socket(self.address.clone(), self.port)),
                }),
                metadata: Some(build_endpoint_metadata(&self.network, self.tls_mode)),
                load_balancing_weight: Some(weight),
            });
        }
        self.materialized.as_ref().expect("memo just filled")
    }
}

/// Build the filter metadata the mesh attaches to every endpoint: the
/// network it lives in and the transport-socket match label.
#[must_use]
pub fn build_endpoint_metadata(network: &str, tls_mode: TlsMode) -> Metadata {
    let mut filter_metadata = HashMap::new();

    if !network.is_empty() {
        filter_metadata.insert(
            MESH_FILTER_KEY.to_string(),
            string_struct("network", network),
        );
    }
    filter_metadata.insert(
        TRANSPORT_SOCKET_MATCH_KEY.to_string(),
        string_struct("tlsMode", tls_mode.as_str()),
    );

    Metadata { filter_metadata }
}

/// Read the network label back out of materialized endpoint metadata.
#[must_use]
pub fn endpoint_network(ep: &LbEndpoint) -> Option<&str> {
    let fields = &ep
        .metadata
        .as_ref()?
        .filter_metadata
        .get(MESH_FILTER_KEY)?
        .fields;
    match fields.get("network")?.kind.as_ref()? {
        prost_types::value::Kind::StringValue(s) => Some(s.as_str()),
        _ => None,
    }
}

fn string_struct(key: &str, value: &str) -> prost_types::Struct {
    let mut fields = std::collections::BTreeMap::new();
    fields.insert(
        key.to_string(),
        prost_types::Value {
            kind: Some(prost_types::value::Kind::StringValue(value.to_string())),
        },
    );
    prost_types::Struct { fields }
}
