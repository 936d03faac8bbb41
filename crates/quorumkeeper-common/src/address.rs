//! Bookie identity and network-location types
//!
//! A bookie is identified by its network address (`host:port`); nothing
//! else about it is assumed by this crate. Its region/rack is a separate,
//! resolver-supplied fact captured by [`NetworkLocation`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Region assigned to a bookie whose location could not be resolved.
pub const DEFAULT_REGION: &str = "/default-region";
/// Rack assigned to a bookie whose location could not be resolved.
pub const DEFAULT_RACK: &str = "/default-region/default-rack";

/// Network address of a storage node ("bookie"), e.g. `10.0.1.7:3181`.
///
/// Kept as a plain validated string rather than a parsed `SocketAddr` so
/// that hostnames (which a DNS-based resolver needs to see) survive
/// unchanged; nothing in this crate resolves or connects to the address.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BookieAddr(String);

impl BookieAddr {
    /// Wrap an address string. No format validation is performed: callers
    /// may pass `host:port`, a bare hostname, or an IP literal.
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    /// The address as a plain string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The host portion, i.e. everything before the last `:`.
    ///
    /// Falls back to the whole address when there is no `:` to split on.
    #[must_use]
    pub fn host(&self) -> &str {
        self.0.rsplit_once(':').map_or(self.0.as_str(), |(host, _)| host)
    }
}

impl fmt::Debug for BookieAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BookieAddr({})", self.0)
    }
}

impl fmt::Display for BookieAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BookieAddr {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for BookieAddr {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// A bookie's resolved position in the cluster's failure-domain hierarchy.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetworkLocation {
    /// Region label, e.g. `/r1`. The first path segment of `rack` by
    /// convention (see [`NetworkLocation::from_rack`]), but resolvers are
    /// free to supply it explicitly when they know it directly.
    pub region: String,
    /// Rack path, e.g. `/r1/rack2`. Includes the region as a prefix.
    pub rack: String,
}

impl NetworkLocation {
    /// Build a location from region and rack supplied separately.
    #[must_use]
    pub fn new(region: impl Into<String>, rack: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            rack: rack.into(),
        }
    }

    /// Derive a location from a rack path alone, taking the region to be
    /// the rack path's first `/`-delimited segment.
    ///
    /// `/r1/rack2` -> region `/r1`. A rack with no leading slash or no
    /// second segment is treated as already unresolved and maps to the
    /// default location.
    #[must_use]
    pub fn from_rack(rack: impl Into<String>) -> Self {
        let rack = rack.into();
        let region = rack
            .strip_prefix('/')
            .and_then(|rest| rest.split('/').next())
            .filter(|segment| !segment.is_empty())
            .map(|segment| format!("/{segment}"));

        match region {
            Some(region) => Self { region, rack },
            None => Self::default(),
        }
    }

    /// The location assigned when a resolver cannot place an address.
    #[must_use]
    pub fn default_location() -> Self {
        Self::new(DEFAULT_REGION, DEFAULT_RACK)
    }

    /// Whether this is the unresolved/default location.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.region == DEFAULT_REGION
    }
}

impl Default for NetworkLocation {
    fn default() -> Self {
        Self::default_location()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_splits_on_last_colon() {
        let addr = BookieAddr::new("10.0.1.7:3181");
        assert_eq!(addr.host(), "10.0.1.7");
    }

    #[test]
    fn host_falls_back_without_colon() {
        let addr = BookieAddr::new("bookie-1");
        assert_eq!(addr.host(), "bookie-1");
    }

    #[test]
    fn region_derived_from_rack_prefix() {
        let loc = NetworkLocation::from_rack("/r1/rack2");
        assert_eq!(loc.region, "/r1");
        assert_eq!(loc.rack, "/r1/rack2");
    }

    #[test]
    fn malformed_rack_falls_back_to_default() {
        let loc = NetworkLocation::from_rack("not-a-path");
        assert!(loc.is_default());
    }

    #[test]
    fn default_location_is_flagged_default() {
        assert!(NetworkLocation::default_location().is_default());
        assert!(!NetworkLocation::new("/r1", "/r1/rack2").is_default());
    }
}
