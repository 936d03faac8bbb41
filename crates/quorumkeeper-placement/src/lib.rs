//! QuorumKeeper Placement - region- and rack-aware ensemble placement core
//!
//! Given a cluster of storage nodes ("bookies") laid out across regions and
//! racks, this crate answers three questions: which nodes should form the
//! write ensemble for a new log, which node should replace one that has
//! failed, and in what order a reader should try the nodes holding a given
//! entry. It does no I/O, keeps no durable state, and elects no leaders —
//! collaborators (the log storage engine, the pub/sub layer, the
//! coordination-service client) own all of that.
//!
//! # Modules
//!
//! - [`topology`] — address -> (region, rack) resolution and reverse
//!   indices.
//! - [`membership`] — the live writable/read-only bookie sets and the
//!   snapshot a single selection call observes.
//! - [`ensemble`] — ensembles and the write-set windows over them.
//! - [`rack_selector`] — rack-diverse picks within one candidate pool.
//! - [`region_selector`] — composes one rack-aware selector per region.
//! - [`replacement`] — substitutes a failed node in an existing ensemble.
//! - [`read_reorder`] — locality-aware read-sequence permutation.
//!
//! [`PlacementCore`] ties these together behind the seven operations this
//! crate exposes as a library API.

pub mod ensemble;
pub mod membership;
pub mod rack_selector;
pub mod read_reorder;
pub mod region_selector;
pub mod replacement;
pub mod topology;

pub use ensemble::{all_write_sets, write_set, Ensemble};
pub use membership::{MembershipSnapshot, MembershipState, MembershipView};
pub use rack_selector::{PlacementRng, RackAwareSelector, SeededRng};
pub use region_selector::RegionAwareSelector;
pub use replacement::ReplacementPlanner;
pub use topology::{DefaultResolver, Resolver, TopologyIndex};

use parking_lot::Mutex;
use quorumkeeper_common::{BookieAddr, Error, PlacementConfig, Result};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;

/// Lifecycle facade wrapping the membership view, configuration, and RNG
/// the placement operations of spec §6 need.
///
/// `rng` is behind a `Mutex` rather than threaded through every call
/// signature: selections are CPU-bound and brief (spec §5), so lock
/// contention is not a concern, and this keeps `new_ensemble` et al. on the
/// same plain, synchronous signature the spec describes.
pub struct PlacementCore {
    config: PlacementConfig,
    membership: MembershipView,
    resolver: Arc<dyn Resolver>,
    rng: Mutex<SeededRng>,
}

impl PlacementCore {
    /// Start the placement core: validates `config`, installs `resolver`
    /// (or [`DefaultResolver`] when `None`), and seeds the deterministic
    /// RNG used for tie-breaking.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfiguration`] when `min_regions_for_durability` is
    /// zero. The region-list and quorum-size variants of spec §7's
    /// `InvalidConfiguration` depend on the cluster and per-call quorum
    /// sizes respectively, so they surface from [`Self::new_ensemble`]
    /// instead of here.
    pub fn initialize(config: PlacementConfig, resolver: Option<Arc<dyn Resolver>>, seed: u64) -> Result<Self> {
        if config.min_regions_for_durability == 0 {
            return Err(Error::invalid_configuration("minRegionsForDurability must be at least 1"));
        }

        let resolver: Arc<dyn Resolver> = resolver.unwrap_or_else(|| Arc::new(DefaultResolver));
        info!(
            min_regions_for_durability = config.min_regions_for_durability,
            regions_to_write = config.regions_to_write.len(),
            "placement core initialized"
        );

        Ok(Self {
            config,
            membership: MembershipView::new(Arc::clone(&resolver)),
            resolver,
            rng: Mutex::new(SeededRng::from_seed(seed)),
        })
    }

    /// Stop the placement core and release its caches (spec §6).
    pub fn uninitialize(&self) {
        self.membership.clear(Arc::clone(&self.resolver));
    }

    /// Replace the writable/read-only membership sets wholesale (spec
    /// §4.2).
    pub fn on_cluster_changed(&self, writable: BTreeSet<BookieAddr>, read_only: BTreeSet<BookieAddr>) {
        self.membership.on_cluster_changed(writable, read_only);
    }

    /// Build a new ensemble of `ensemble_size` nodes with the given
    /// write/ack quorum, excluding `excluded` (spec §4.4).
    ///
    /// # Errors
    ///
    /// See [`RegionAwareSelector::new_ensemble`].
    pub fn new_ensemble(
        &self,
        ensemble_size: usize,
        write_quorum: usize,
        ack_quorum: usize,
        excluded: &BTreeSet<BookieAddr>,
    ) -> Result<Ensemble> {
        let snapshot = self.membership.snapshot();
        let selector = RegionAwareSelector::new(&snapshot, &self.config);
        let mut rng = self.rng.lock();
        selector.new_ensemble(ensemble_size, write_quorum, ack_quorum, excluded, &mut *rng)
    }

    /// Replace `victim` within `current_ensemble` (spec §4.5/§6:
    /// `replaceBookie(E, W, A, ensemble, victim, excluded)`).
    ///
    /// # Errors
    ///
    /// See [`ReplacementPlanner::replace_bookie`].
    pub fn replace_bookie(
        &self,
        ensemble_size: usize,
        write_quorum: usize,
        ack_quorum: usize,
        current_ensemble: &[BookieAddr],
        victim: &BookieAddr,
        excluded: &BTreeSet<BookieAddr>,
    ) -> Result<BookieAddr> {
        let snapshot = self.membership.snapshot();
        let planner = ReplacementPlanner::new(&snapshot, &self.config);
        planner.replace_bookie(ensemble_size, write_quorum, ack_quorum, current_ensemble, victim, excluded)
    }

    /// Reorder `write_set` for reads given `caller_region` (spec §4.6).
    #[must_use]
    pub fn reorder_read_sequence(&self, caller_region: &str, write_set: &[BookieAddr]) -> Vec<BookieAddr> {
        let snapshot = self.membership.snapshot();
        read_reorder::reorder_read_sequence(
            &snapshot,
            caller_region,
            write_set,
            self.config.remote_node_reorder_threshold as usize,
        )
    }

    /// The LAC variant of [`PlacementCore::reorder_read_sequence`] (spec
    /// §4.6).
    #[must_use]
    pub fn reorder_read_lac_sequence(&self, caller_region: &str, write_set: &[BookieAddr]) -> Vec<BookieAddr> {
        let snapshot = self.membership.snapshot();
        read_reorder::reorder_read_lac_sequence(
            &snapshot,
            caller_region,
            write_set,
            self.config.remote_node_reorder_threshold as usize,
        )
    }

    /// The region a node currently resolves to (spec §4.1 inspection
    /// helpers).
    ///
    /// # Errors
    ///
    /// [`Error::UnknownNode`] if the core has never observed `addr` (spec
    /// §7: inspection helpers raise it; selection paths never do).
    pub fn region_of(&self, addr: &BookieAddr) -> Result<String> {
        self.membership.snapshot().topology.region_of(addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[traced_test]
    #[test]
    fn initialize_logs_at_info_level() {
        let core = PlacementCore::initialize(PlacementConfig::default(), None, 3).unwrap();
        let writable: BTreeSet<BookieAddr> = ["a", "b"].iter().map(|a| BookieAddr::new(*a)).collect();
        core.on_cluster_changed(writable, BTreeSet::new());

        assert!(logs_contain("placement core initialized"));
        assert!(logs_contain("membership view updated"));
    }

    #[test]
    fn region_of_raises_unknown_node_for_unobserved_address() {
        let core = PlacementCore::initialize(PlacementConfig::default(), None, 1).unwrap();
        let err = core.region_of(&BookieAddr::new("never-seen:3181")).unwrap_err();
        assert!(matches!(err, Error::UnknownNode(_)));
    }

    #[test]
    fn initialize_rejects_zero_min_regions() {
        let mut config = PlacementConfig::default();
        config.min_regions_for_durability = 0;
        let err = PlacementCore::initialize(config, None, 1).unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration(_)));
    }

    #[test]
    fn full_lifecycle_produces_an_ensemble_and_reorders_reads() {
        let core = PlacementCore::initialize(PlacementConfig::default(), None, 7).unwrap();

        let writable: BTreeSet<BookieAddr> = [
            "n1.rack1.r1.example.com:3181",
            "n2.rack1.r1.example.com:3181",
            "n3.rack2.r1.example.com:3181",
        ]
        .iter()
        .map(|a| BookieAddr::new(*a))
        .collect();
        core.on_cluster_changed(writable, BTreeSet::new());

        let ensemble = core.new_ensemble(3, 3, 2, &BTreeSet::new()).unwrap();
        assert_eq!(ensemble.len(), 3);

        let reordered = core.reorder_read_sequence("/r1", &ensemble);
        let mut sorted_reordered = reordered.clone();
        let mut sorted_ensemble = ensemble.clone();
        sorted_reordered.sort();
        sorted_ensemble.sort();
        assert_eq!(sorted_reordered, sorted_ensemble, "reorder is a permutation");

        core.uninitialize();
        assert!(
            matches!(core.region_of(&ensemble[0]), Err(Error::UnknownNode(_))),
            "uninitialize releases caches"
        );
    }
}
