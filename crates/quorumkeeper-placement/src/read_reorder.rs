//! Read Reorderer: locality- and health-aware read-sequence permutation
//!
//! Pure functions of their inputs plus a snapshot (spec §5, §4.6) — no
//! selection state is held here.

use crate::membership::{MembershipSnapshot, MembershipState};
use quorumkeeper_common::{BookieAddr, DEFAULT_REGION};

/// Reorder a write-set for reads: local entries first, then one remote
/// entry spliced in after the caller's `remoteNodeReorderThreshold`-th
/// local entry, then any remaining locals, then the remaining remotes
/// ordered writable before read-only before unavailable (spec §4.6).
///
/// Returns the input unchanged if `caller_region` is the default/unknown
/// region.
#[must_use]
pub fn reorder_read_sequence(
    snapshot: &MembershipSnapshot,
    caller_region: &str,
    write_set: &[BookieAddr],
    remote_node_reorder_threshold: usize,
) -> Vec<BookieAddr> {
    if caller_region == DEFAULT_REGION {
        return write_set.to_vec();
    }
    reorder(snapshot, caller_region, write_set, remote_node_reorder_threshold)
}

/// The long-average-confirmed (LAC) variant. Identical classification and
/// shape to [`reorder_read_sequence`], except it returns the input
/// unchanged when the caller's region has no presence at all in
/// `write_set` (spec §4.6, §9(b)).
#[must_use]
pub fn reorder_read_lac_sequence(
    snapshot: &MembershipSnapshot,
    caller_region: &str,
    write_set: &[BookieAddr],
    remote_node_reorder_threshold: usize,
) -> Vec<BookieAddr> {
    if caller_region == DEFAULT_REGION {
        return write_set.to_vec();
    }

    let has_local_region_member = write_set
        .iter()
        .any(|addr| snapshot.topology.location_of_or_default(addr).region == caller_region);
    if !has_local_region_member {
        return write_set.to_vec();
    }

    reorder(snapshot, caller_region, write_set, remote_node_reorder_threshold)
}

fn reorder(
    snapshot: &MembershipSnapshot,
    caller_region: &str,
    write_set: &[BookieAddr],
    remote_node_reorder_threshold: usize,
) -> Vec<BookieAddr> {
    let mut locals = Vec::new();
    let mut remote_writable = Vec::new();
    let mut read_only = Vec::new();
    let mut unavailable = Vec::new();

    for addr in write_set {
        let state = snapshot.state_of(addr);
        let region = snapshot.topology.location_of_or_default(addr).region;

        match state {
            MembershipState::Unavailable => unavailable.push(addr.clone()),
            MembershipState::ReadOnly => read_only.push(addr.clone()),
            MembershipState::Writable if region == caller_region => locals.push(addr.clone()),
            MembershipState::Writable => remote_writable.push(addr.clone()),
        }
    }

    let mut remotes = remote_writable;
    remotes.extend(read_only);
    remotes.extend(unavailable);

    let split = remote_node_reorder_threshold.min(locals.len());
    let mut result = Vec::with_capacity(write_set.len());
    result.extend_from_slice(&locals[..split]);

    let mut remotes = remotes.into_iter();
    if let Some(first_remote) = remotes.next() {
        result.push(first_remote);
        result.extend_from_slice(&locals[split..]);
        result.extend(remotes);
    } else {
        result.extend_from_slice(&locals[split..]);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::membership::MembershipView;
    use crate::topology::Resolver;
    use quorumkeeper_common::NetworkLocation;
    use std::collections::{BTreeSet, HashMap};
    use std::sync::Arc;

    struct MapResolver(HashMap<String, NetworkLocation>);

    impl Resolver for MapResolver {
        fn resolve(&self, addr: &BookieAddr) -> NetworkLocation {
            self.0
                .get(addr.as_str())
                .cloned()
                .unwrap_or_else(NetworkLocation::default_location)
        }
    }

    fn addrs(labels: &[&str]) -> Vec<BookieAddr> {
        labels.iter().map(|l| BookieAddr::new(*l)).collect()
    }

    fn topology_fixture() -> (MembershipView, Vec<BookieAddr>) {
        let mut map = HashMap::new();
        map.insert("n0".to_string(), NetworkLocation::from_rack("/r1/rack1"));
        map.insert("n1".to_string(), NetworkLocation::default_location());
        map.insert("n2".to_string(), NetworkLocation::default_location());
        map.insert("n3".to_string(), NetworkLocation::from_rack("/r1/rack2"));
        let view = MembershipView::new(Arc::new(MapResolver(map)));
        let ensemble = addrs(&["n0", "n1", "n2", "n3"]);
        (view, ensemble)
    }

    /// S1: local-region-first reorder with caller outside the ensemble's
    /// racks but inside region `/r1`.
    #[test]
    fn s1_local_rack_reorder() {
        let (view, ensemble) = topology_fixture();
        view.on_cluster_changed(ensemble.iter().cloned().collect(), BTreeSet::new());
        let snapshot = view.snapshot();

        let reordered = reorder_read_sequence(&snapshot, "/r1", &ensemble, 2);
        assert_eq!(reordered, addrs(&["n0", "n3", "n1", "n2"]));
    }

    /// S2: node 0 goes unavailable; it must land last, after the
    /// remote-writable nodes.
    #[test]
    fn s2_node_down_reorder() {
        let (view, ensemble) = topology_fixture();
        let writable: BTreeSet<BookieAddr> = ["n1", "n2", "n3"].iter().map(|a| BookieAddr::new(*a)).collect();
        view.on_cluster_changed(writable, BTreeSet::new());
        let snapshot = view.snapshot();

        let reordered = reorder_read_sequence(&snapshot, "/r1", &ensemble, 2);
        assert_eq!(reordered, addrs(&["n3", "n1", "n2", "n0"]));
    }

    /// S3: node 0 moved to read-only instead of unavailable; same shape as
    /// S2 (read-only sorts after remote-writable, same as unavailable).
    #[test]
    fn s3_node_read_only_reorder() {
        let (view, ensemble) = topology_fixture();
        let writable: BTreeSet<BookieAddr> = ["n1", "n2", "n3"].iter().map(|a| BookieAddr::new(*a)).collect();
        let read_only: BTreeSet<BookieAddr> = ["n0"].iter().map(|a| BookieAddr::new(*a)).collect();
        view.on_cluster_changed(writable, read_only);
        let snapshot = view.snapshot();

        let reordered = reorder_read_sequence(&snapshot, "/r1", &ensemble, 2);
        assert_eq!(reordered, addrs(&["n3", "n1", "n2", "n0"]));
    }

    #[test]
    fn default_region_caller_returns_input_unchanged() {
        let (view, ensemble) = topology_fixture();
        view.on_cluster_changed(ensemble.iter().cloned().collect(), BTreeSet::new());
        let snapshot = view.snapshot();

        let reordered = reorder_read_sequence(&snapshot, DEFAULT_REGION, &ensemble, 2);
        assert_eq!(reordered, ensemble);
    }

    #[test]
    fn reorder_is_a_permutation_of_the_input() {
        let (view, ensemble) = topology_fixture();
        view.on_cluster_changed(ensemble.iter().cloned().collect(), BTreeSet::new());
        let snapshot = view.snapshot();

        let mut reordered = reorder_read_sequence(&snapshot, "/r1", &ensemble, 2);
        let mut expected = ensemble.clone();
        reordered.sort();
        expected.sort();
        assert_eq!(reordered, expected);
    }

    #[test]
    fn lac_returns_unchanged_when_caller_region_absent_from_write_set() {
        let (view, ensemble) = topology_fixture();
        view.on_cluster_changed(ensemble.iter().cloned().collect(), BTreeSet::new());
        let snapshot = view.snapshot();

        let reordered = reorder_read_lac_sequence(&snapshot, "/r9", &ensemble, 2);
        assert_eq!(reordered, ensemble);
    }

    #[test]
    fn lac_matches_normal_reorder_when_caller_region_present() {
        let (view, ensemble) = topology_fixture();
        view.on_cluster_changed(ensemble.iter().cloned().collect(), BTreeSet::new());
        let snapshot = view.snapshot();

        let lac = reorder_read_lac_sequence(&snapshot, "/r1", &ensemble, 2);
        let normal = reorder_read_sequence(&snapshot, "/r1", &ensemble, 2);
        assert_eq!(lac, normal);
    }
}
