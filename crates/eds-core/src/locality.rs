//! Locality labels.
//!
//! A locality places an endpoint or a proxy in the `region/zone/subzone`
//! hierarchy. The slash-separated label form is what registries report and
//! what endpoints are grouped by; the structured form is what goes on the
//! wire.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Hierarchical placement label `region/zone/subzone`.
///
/// Missing trailing segments are empty. An entirely empty locality is valid
/// and groups endpoints that carry no placement information.
///
/// # Example
///
/// ```rust
/// use eds_core::Locality;
///
/// let loc = Locality::parse("us-east/1a");
/// assert_eq!(loc.region, "us-east");
/// assert_eq!(loc.zone, "1a");
/// assert!(loc.sub_zone.is_empty());
/// assert_eq!(loc.to_string(), "us-east/1a/");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locality {
    /// Region, the coarsest tier.
    pub region: String,
    /// Zone within the region.
    pub zone: String,
    /// Sub-zone within the zone.
    pub sub_zone: String,
}

impl Locality {
    /// Create a locality from its three segments.
    #[must_use]
    pub fn new(
        region: impl Into<String>,
        zone: impl Into<String>,
        sub_zone: impl Into<String>,
    ) -> Self {
        Self {
            region: region.into(),
            zone: zone.into(),
            sub_zone: sub_zone.into(),
        }
    }

    /// Parse a slash-separated locality label.
    ///
    /// Segments beyond the third are ignored; missing segments are empty.
    #[must_use]
    pub fn parse(label: &str) -> Self {
        let mut parts = label.splitn(3, '/');
        Self {
            region: parts.next().unwrap_or_default().to_string(),
            zone: parts.next().unwrap_or_default().to_string(),
            sub_zone: parts.next().unwrap_or_default().to_string(),
        }
    }

    /// Whether all segments are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.region.is_empty() && self.zone.is_empty() && self.sub_zone.is_empty()
    }

    /// Number of leading segments shared with `other` (0 to 3).
    ///
    /// A shared empty segment does not count as a match.
    #[must_use]
    pub fn shared_prefix(&self, other: &Locality) -> u32 {
        if self.region.is_empty() || self.region != other.region {
            return 0;
        }
        if self.zone.is_empty() || self.zone != other.zone {
            return 1;
        }
        if self.sub_zone.is_empty() || self.sub_zone != other.sub_zone {
            return 2;
        }
        3
    }

    /// Convert to the wire representation.
    #[must_use]
    pub fn to_wire(&self) -> eds_types::envoy::config::core::v3::Locality {
        eds_types::envoy::config::core::v3::Locality {
            region: self.region.clone(),
            zone: self.zone.clone(),
            sub_zone: self.sub_zone.clone(),
        }
    }
}

impl fmt::Display for Locality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.region, self.zone, self.sub_zone)
    }
}

impl From<&str> for Locality {
    fn from(label: &str) -> Self {
        Self::parse(label)
    }
}
