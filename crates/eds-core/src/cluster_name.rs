//! Cluster-name encoding shared with the data plane.
//!
//! A watched cluster name encodes `direction|port|subset|hostname`, for
//! example `outbound|8080|v2|reviews.bookinfo.svc.cluster.local`. The
//! delimiter and direction tags are part of the compatibility contract with
//! the proxy and must not change.

use std::fmt;

use crate::EdsError;

/// Traffic direction tag of a cluster name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Traffic leaving the proxy toward an upstream service.
    Outbound,
    /// Traffic arriving at the proxy's own workload.
    Inbound,
}

impl Direction {
    /// The tag as it appears in cluster names.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Outbound => "outbound",
            Direction::Inbound => "inbound",
        }
    }

    fn parse(tag: &str) -> Option<Self> {
        match tag {
            "outbound" => Some(Direction::Outbound),
            "inbound" => Some(Direction::Inbound),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed form of a watched cluster name.
///
/// # Example
///
/// ```rust
/// use eds_core::{Direction, SubsetKey};
///
/// let key = SubsetKey::parse("outbound|9080|v1|ratings.bookinfo.svc.cluster.local").unwrap();
/// assert_eq!(key.direction, Direction::Outbound);
/// assert_eq!(key.port, 9080);
/// assert_eq!(key.subset, "v1");
/// assert_eq!(key.hostname, "ratings.bookinfo.svc.cluster.local");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubsetKey {
    /// Traffic direction.
    pub direction: Direction,
    /// Subset name; empty when the cluster covers the whole service.
    pub subset: String,
    /// Service hostname.
    pub hostname: String,
    /// Service port number.
    pub port: u16,
}

impl SubsetKey {
    /// Parse a cluster name of the form `direction|port|subset|hostname`.
    pub fn parse(name: &str) -> Result<Self, EdsError> {
        let invalid = || EdsError::InvalidClusterName {
            name: name.to_string(),
        };

        let mut parts = name.split('|');
        let direction = parts
            .next()
            .and_then(Direction::parse)
            .ok_or_else(invalid)?;
        let port = parts
            .next()
            .and_then(|p| p.parse::<u16>().ok())
            .ok_or_else(invalid)?;
        let subset = parts.next().ok_or_else(invalid)?.to_string();
        let hostname = parts.next().ok_or_else(invalid)?.to_string();
        if hostname.is_empty() || parts.next().is_some() {
            return Err(invalid());
        }

        Ok(Self {
            direction,
            subset,
            hostname,
            port,
        })
    }

    /// Hostname of a cluster name, without a full parse.
    ///
    /// Returns `None` for names that do not carry four fields.
    #[must_use]
    pub fn hostname_of(name: &str) -> Option<&str> {
        let mut parts = name.split('|');
        let _direction = parts.next()?;
        let _port = parts.next()?;
        let _subset = parts.next()?;
        let hostname = parts.next()?;
        if hostname.is_empty() || parts.next().is_some() {
            return None;
        }
        Some(hostname)
    }
}

impl fmt::Display for SubsetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}",
            self.direction, self.port, self.subset, self.hostname
        )
    }
}
