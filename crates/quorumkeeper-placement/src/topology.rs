//! Topology Index: address -> (region, rack) resolution and reverse indices
//!
//! Resolution is delegated to an injected [`Resolver`]; this module owns
//! only the caching and the rack/region reverse indices built on top of it.

use quorumkeeper_common::{BookieAddr, Error, NetworkLocation, Result};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// A DNS-style mapping from bookie address to network location.
///
/// Implementations must never fail at this boundary: a resolver that can't
/// determine a node's position returns [`NetworkLocation::default_location`]
/// rather than propagating an error (spec: "DNS resolution failures are
/// swallowed and translated to the default region; never fatal").
pub trait Resolver: Send + Sync {
    /// Resolve a bookie address to its region and rack.
    fn resolve(&self, addr: &BookieAddr) -> NetworkLocation;
}

/// Resolver used when `initialize` is given none.
///
/// Expects hostnames shaped `name.rack.region.rest...` (the convention used
/// by DNS-mapping test fixtures in rack-aware placement systems) and maps
/// anything else — including bare IP literals — to the default location.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultResolver;

impl Resolver for DefaultResolver {
    fn resolve(&self, addr: &BookieAddr) -> NetworkLocation {
        let host = addr.host();

        if host.parse::<std::net::IpAddr>().is_ok() {
            return NetworkLocation::default_location();
        }

        let labels: Vec<&str> = host.split('.').collect();
        if labels.len() >= 3 {
            let region = format!("/{}", labels[2]);
            let rack = format!("{region}/{}", labels[1]);
            NetworkLocation::new(region, rack)
        } else {
            NetworkLocation::default_location()
        }
    }
}

/// Reverse indices over every currently-known bookie address.
///
/// `nodes_by_rack` and `racks_by_region` are kept in sync with the union of
/// addresses ever passed to [`TopologyIndex::add_node`] without a matching
/// [`TopologyIndex::remove_node`]. `BTreeSet` gives the lexicographic
/// iteration order the placement selectors rely on as their stable
/// tie-break (spec §9(a)).
#[derive(Clone)]
pub struct TopologyIndex {
    resolver: Arc<dyn Resolver>,
    cache: HashMap<BookieAddr, NetworkLocation>,
    nodes_by_rack: HashMap<String, BTreeSet<BookieAddr>>,
    racks_by_region: HashMap<String, BTreeSet<String>>,
}

impl TopologyIndex {
    /// Create an empty index backed by the given resolver.
    #[must_use]
    pub fn new(resolver: Arc<dyn Resolver>) -> Self {
        Self {
            resolver,
            cache: HashMap::new(),
            nodes_by_rack: HashMap::new(),
            racks_by_region: HashMap::new(),
        }
    }

    /// Resolve an address, consulting and populating the cache.
    ///
    /// Never fails: an unresolvable address maps to the default location.
    pub fn resolve(&mut self, addr: &BookieAddr) -> NetworkLocation {
        if let Some(location) = self.cache.get(addr) {
            return location.clone();
        }
        let location = self.resolver.resolve(addr);
        self.cache.insert(addr.clone(), location.clone());
        location
    }

    /// Add (or re-add, idempotently) a node to the reverse indices.
    pub fn add_node(&mut self, addr: &BookieAddr) {
        let location = self.resolve(addr);
        self.nodes_by_rack
            .entry(location.rack.clone())
            .or_default()
            .insert(addr.clone());
        self.racks_by_region
            .entry(location.region.clone())
            .or_default()
            .insert(location.rack.clone());
    }

    /// Remove a node from the reverse indices. Idempotent; removes now-empty
    /// racks, and the region's rack entry along with them (spec: "empty
    /// racks are removed" — a region with no remaining racks is removed
    /// too, for the same reason, though the spec is silent on regions
    /// specifically).
    pub fn remove_node(&mut self, addr: &BookieAddr) {
        let Some(location) = self.cache.get(addr).cloned() else {
            return;
        };

        if let Some(nodes) = self.nodes_by_rack.get_mut(&location.rack) {
            nodes.remove(addr);
            if nodes.is_empty() {
                self.nodes_by_rack.remove(&location.rack);
                if let Some(racks) = self.racks_by_region.get_mut(&location.region) {
                    racks.remove(&location.rack);
                    if racks.is_empty() {
                        self.racks_by_region.remove(&location.region);
                    }
                }
            }
        }
    }

    /// All node addresses currently placed in `rack`.
    #[must_use]
    pub fn nodes_in_rack(&self, rack: &str) -> BTreeSet<BookieAddr> {
        self.nodes_by_rack.get(rack).cloned().unwrap_or_default()
    }

    /// All rack paths currently placed in `region`.
    #[must_use]
    pub fn racks_in_region(&self, region: &str) -> BTreeSet<String> {
        self.racks_by_region.get(region).cloned().unwrap_or_default()
    }

    /// All node addresses in `region`, across every rack in it.
    #[must_use]
    pub fn nodes_in_region(&self, region: &str) -> BTreeSet<BookieAddr> {
        self.racks_in_region(region)
            .into_iter()
            .flat_map(|rack| self.nodes_in_rack(&rack))
            .collect()
    }

    /// Every region currently known to the index, in canonical (lexical)
    /// order.
    #[must_use]
    pub fn known_regions(&self) -> Vec<String> {
        let mut regions: Vec<String> = self.racks_by_region.keys().cloned().collect();
        regions.sort();
        regions
    }

    /// The region `addr` resolved to.
    ///
    /// This is an inspection helper, not a selection-path lookup (spec §7):
    /// it raises [`Error::UnknownNode`] for an address this index has never
    /// observed rather than silently falling back to the default region.
    /// Selection paths that must tolerate unknown addresses use
    /// [`TopologyIndex::location_of_or_default`] instead.
    pub fn region_of(&self, addr: &BookieAddr) -> Result<String> {
        self.cache
            .get(addr)
            .map(|location| location.region.clone())
            .ok_or_else(|| Error::unknown_node(addr.to_string()))
    }

    /// The rack `addr` resolved to. See [`TopologyIndex::region_of`] for the
    /// same `UnknownNode` contract.
    pub fn rack_of(&self, addr: &BookieAddr) -> Result<String> {
        self.cache
            .get(addr)
            .map(|location| location.rack.clone())
            .ok_or_else(|| Error::unknown_node(addr.to_string()))
    }

    /// The cached location for `addr`, or the default location if never
    /// resolved — the tolerant variant selection paths use internally.
    #[must_use]
    pub fn location_of_or_default(&self, addr: &BookieAddr) -> NetworkLocation {
        self.cache
            .get(addr)
            .cloned()
            .unwrap_or_else(NetworkLocation::default_location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticResolver(HashMap<String, NetworkLocation>);

    impl Resolver for StaticResolver {
        fn resolve(&self, addr: &BookieAddr) -> NetworkLocation {
            self.0
                .get(addr.as_str())
                .cloned()
                .unwrap_or_else(NetworkLocation::default_location)
        }
    }

    fn fixture() -> TopologyIndex {
        let mut map = HashMap::new();
        map.insert(
            "10.0.0.1:3181".to_string(),
            NetworkLocation::new("/r1", "/r1/rack1"),
        );
        map.insert(
            "10.0.0.2:3181".to_string(),
            NetworkLocation::new("/r1", "/r1/rack2"),
        );
        TopologyIndex::new(Arc::new(StaticResolver(map)))
    }

    #[test]
    fn add_node_populates_reverse_indices() {
        let mut topology = fixture();
        let a = BookieAddr::new("10.0.0.1:3181");
        topology.add_node(&a);

        assert_eq!(topology.nodes_in_rack("/r1/rack1"), BTreeSet::from([a.clone()]));
        assert_eq!(topology.racks_in_region("/r1"), BTreeSet::from(["/r1/rack1".to_string()]));
        assert_eq!(topology.region_of(&a).unwrap(), "/r1");
    }

    #[test]
    fn add_node_is_idempotent() {
        let mut topology = fixture();
        let a = BookieAddr::new("10.0.0.1:3181");
        topology.add_node(&a);
        topology.add_node(&a);
        assert_eq!(topology.nodes_in_rack("/r1/rack1").len(), 1);
    }

    #[test]
    fn remove_node_cleans_up_empty_rack_and_region() {
        let mut topology = fixture();
        let a = BookieAddr::new("10.0.0.1:3181");
        topology.add_node(&a);
        topology.remove_node(&a);

        assert!(topology.nodes_in_rack("/r1/rack1").is_empty());
        assert!(topology.racks_in_region("/r1").is_empty());
    }

    #[test]
    fn remove_node_leaves_sibling_rack_untouched() {
        let mut topology = fixture();
        let a = BookieAddr::new("10.0.0.1:3181");
        let b = BookieAddr::new("10.0.0.2:3181");
        topology.add_node(&a);
        topology.add_node(&b);
        topology.remove_node(&a);

        assert!(topology.nodes_in_rack("/r1/rack1").is_empty());
        assert_eq!(topology.racks_in_region("/r1"), BTreeSet::from(["/r1/rack2".to_string()]));
    }

    #[test]
    fn unresolvable_address_maps_to_default_location() {
        let mut topology = fixture();
        let unknown = BookieAddr::new("10.9.9.9:3181");
        let location = topology.resolve(&unknown);
        assert!(location.is_default());
    }

    #[test]
    fn region_of_and_rack_of_raise_unknown_node_for_unobserved_address() {
        let topology = fixture();
        let never_seen = BookieAddr::new("10.9.9.9:3181");

        let region_err = topology.region_of(&never_seen).unwrap_err();
        assert!(matches!(region_err, Error::UnknownNode(_)));

        let rack_err = topology.rack_of(&never_seen).unwrap_err();
        assert!(matches!(rack_err, Error::UnknownNode(_)));
    }

    #[test]
    fn region_of_and_rack_of_succeed_once_resolved() {
        let mut topology = fixture();
        let a = BookieAddr::new("10.0.0.1:3181");
        topology.add_node(&a);

        assert_eq!(topology.region_of(&a).unwrap(), "/r1");
        assert_eq!(topology.rack_of(&a).unwrap(), "/r1/rack1");
    }

    #[test]
    fn default_resolver_splits_hostname_convention() {
        let resolver = DefaultResolver;
        let location = resolver.resolve(&BookieAddr::new("bookie1.rack2.r1.example.com:3181"));
        assert_eq!(location.region, "/r1");
        assert_eq!(location.rack, "/r1/rack2");
    }

    #[test]
    fn default_resolver_treats_ip_literal_as_unresolved() {
        let resolver = DefaultResolver;
        let location = resolver.resolve(&BookieAddr::new("10.0.0.5:3181"));
        assert!(location.is_default());
    }

    #[test]
    fn known_regions_are_lexicographically_canonical() {
        let mut topology = fixture();
        topology.add_node(&BookieAddr::new("10.0.0.2:3181"));
        topology.add_node(&BookieAddr::new("10.0.0.1:3181"));
        assert_eq!(topology.known_regions(), vec!["/r1".to_string()]);
    }
}
