//! Service catalog entities.
//!
//! Services are read-only snapshots owned by the service-catalog layer;
//! the EDS subsystem only looks hostnames and ports up.

use crate::EdsError;

/// Application protocol of a service port.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// Plain TCP.
    #[default]
    Tcp,
    /// HTTP/1.1.
    Http,
    /// HTTP/2.
    Http2,
    /// gRPC over HTTP/2.
    Grpc,
    /// Connectionless UDP.
    Udp,
}

impl Protocol {
    /// Whether the protocol is connectionless and therefore skipped by
    /// endpoint reconciliation.
    #[must_use]
    pub fn is_connectionless(&self) -> bool {
        matches!(self, Protocol::Udp)
    }
}

/// One named port of a service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServicePort {
    /// Port name; endpoints reference it via their service-port-name.
    pub name: String,
    /// Port number.
    pub number: u16,
    /// Application protocol.
    pub protocol: Protocol,
}

impl ServicePort {
    /// Create a service port.
    #[must_use]
    pub fn new(name: impl Into<String>, number: u16, protocol: Protocol) -> Self {
        Self {
            name: name.into(),
            number,
            protocol,
        }
    }
}

/// How the data plane resolves a service's endpoints.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Resolution {
    /// Endpoints are discovered and pushed by the control plane.
    #[default]
    Static,
    /// The proxy resolves the hostname itself; no endpoint push.
    Dns,
    /// Traffic passes through to the original destination.
    Passthrough,
}

/// A service known to the mesh.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Service {
    /// Fully qualified hostname.
    pub hostname: String,
    /// Namespace the service lives in.
    pub namespace: String,
    /// Named ports.
    pub ports: Vec<ServicePort>,
    /// Endpoint resolution mode.
    pub resolution: Resolution,
    /// Provider name of the registry that owns this service.
    pub registry: String,
}

impl Service {
    /// Create a service with no ports.
    #[must_use]
    pub fn new(hostname: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    /// Add a port.
    #[must_use]
    pub fn with_port(mut self, port: ServicePort) -> Self {
        self.ports.push(port);
        self
    }

    /// Set the resolution mode.
    #[must_use]
    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    /// Set the owning registry's provider name.
    #[must_use]
    pub fn with_registry(mut self, registry: impl Into<String>) -> Self {
        self.registry = registry.into();
        self
    }

    /// Look a port up by number.
    #[must_use]
    pub fn port_by_number(&self, number: u16) -> Option<&ServicePort> {
        self.ports.iter().find(|p| p.number == number)
    }
}

impl std::str::FromStr for Protocol {
    type Err = EdsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Ok(Protocol::Tcp),
            "http" => Ok(Protocol::Http),
            "http2" => Ok(Protocol::Http2),
            "grpc" => Ok(Protocol::Grpc),
            "udp" => Ok(Protocol::Udp),
            other => Err(EdsError::Internal {
                message: format!("unknown protocol {other:?}"),
                source: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_lookup() {
        let svc = Service::new("reviews.bookinfo.svc.cluster.local", "bookinfo")
            .with_port(ServicePort::new("http", 9080, Protocol::Http))
            .with_port(ServicePort::new("metrics", 15020, Protocol::Http));

        assert_eq!(svc.port_by_number(9080).map(|p| p.name.as_str()), Some("http"));
        assert!(svc.port_by_number(80).is_none());
    }

    #[test]
    fn udp_is_connectionless() {
        assert!(Protocol::Udp.is_connectionless());
        assert!(!Protocol::Tcp.is_connectionless());
        assert!(!Protocol::Grpc.is_connectionless());
    }

    #[test]
    fn protocol_parsing() {
        assert_eq!("GRPC".parse::<Protocol>().unwrap(), Protocol::Grpc);
        assert!("carrier-pigeon".parse::<Protocol>().is_err());
    }
}
