//! Region-Aware Selector: composes one Rack-Aware Selector per region
//!
//! Owns no inheritance hierarchy over [`RackAwareSelector`] (spec §9): it
//! just runs one per active region and interleaves their picks so that
//! write-quorum windows, not just the whole ensemble, cover multiple
//! regions (spec §4.4).

use crate::ensemble::{all_write_sets, Ensemble};
use crate::membership::MembershipSnapshot;
use crate::rack_selector::{PlacementRng, RackAwareSelector};
use quorumkeeper_common::{BookieAddr, Error, PlacementConfig, Result};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

/// Picks diversity-aware ensembles across every configured region.
pub struct RegionAwareSelector<'a> {
    snapshot: &'a MembershipSnapshot,
    config: &'a PlacementConfig,
}

impl<'a> RegionAwareSelector<'a> {
    #[must_use]
    pub fn new(snapshot: &'a MembershipSnapshot, config: &'a PlacementConfig) -> Self {
        Self { snapshot, config }
    }

    /// The regions to place into, in priority order: `regionsToWrite` when
    /// configured, else every region known to the topology in
    /// lexicographic (canonical) order (spec §4.4, §9(a)).
    fn regions_to_write(&self) -> Vec<String> {
        if self.config.regions_to_write.is_empty() {
            self.snapshot.topology.known_regions()
        } else {
            self.config.regions_to_write.clone()
        }
    }

    /// Validate `write_quorum <= ensemble_size` and `ack_quorum <=
    /// write_quorum` (spec §7: `InvalidConfiguration`).
    fn validate_quorums(ensemble_size: usize, write_quorum: usize, ack_quorum: usize) -> Result<()> {
        if write_quorum == 0 || ensemble_size == 0 {
            return Err(Error::invalid_configuration("ensemble size and write quorum must be positive"));
        }
        if write_quorum > ensemble_size {
            return Err(Error::invalid_configuration(format!(
                "write quorum {write_quorum} exceeds ensemble size {ensemble_size}"
            )));
        }
        if ack_quorum > write_quorum {
            return Err(Error::invalid_configuration(format!(
                "ack quorum {ack_quorum} exceeds write quorum {write_quorum}"
            )));
        }
        Ok(())
    }

    /// Build a new `ensemble_size`-node ensemble satisfying the write- and
    /// ack-quorum constraints, excluding `excluded`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfiguration`] for a bad quorum combination;
    /// [`Error::NotEnoughBookies`] when the cluster cannot satisfy the
    /// requested size/diversity even after redistributing allocation
    /// across regions.
    pub fn new_ensemble(
        &self,
        ensemble_size: usize,
        write_quorum: usize,
        ack_quorum: usize,
        excluded: &BTreeSet<BookieAddr>,
        rng: &mut dyn PlacementRng,
    ) -> Result<Ensemble> {
        Self::validate_quorums(ensemble_size, write_quorum, ack_quorum)?;

        let regions = self.regions_to_write();
        if regions.is_empty() {
            if self.config.enable_validation {
                return Err(Error::invalid_configuration(
                    "no regions known to place into with validation enabled",
                ));
            }
            return Err(Error::not_enough_bookies(0, ensemble_size));
        }

        let alloc = self.allocate(&regions, ensemble_size, excluded)?;

        let rack_selector = RackAwareSelector::new(self.snapshot);
        let mut picks: HashMap<String, Vec<BookieAddr>> = HashMap::new();
        for region in &regions {
            let count = alloc[region];
            if count == 0 {
                picks.insert(region.clone(), Vec::new());
                continue;
            }
            let pool = self.snapshot.topology.nodes_in_region(region);
            let chosen = rack_selector.pick_n(&pool, count, excluded, false, None, rng)?;
            picks.insert(region.clone(), chosen);
        }

        let ensemble = interleave(&regions, &mut picks);

        if self.config.enable_validation && regions.len() > 1 {
            self.validate_coverage(&ensemble, write_quorum)?;
        }

        debug!(ensemble_size, write_quorum, regions = regions.len(), "built new ensemble");
        Ok(ensemble)
    }

    /// Per-region pick counts, redistributing shortfall from
    /// under-provisioned regions to regions with surplus candidates, in
    /// canonical region order (spec §4.4).
    fn allocate(
        &self,
        regions: &[String],
        ensemble_size: usize,
        excluded: &BTreeSet<BookieAddr>,
    ) -> Result<HashMap<String, usize>> {
        let region_count = regions.len();
        let base = ensemble_size / region_count;
        let remainder = ensemble_size % region_count;

        let mut alloc: HashMap<String, usize> = HashMap::new();
        for (i, region) in regions.iter().enumerate() {
            alloc.insert(region.clone(), base + usize::from(i < remainder));
        }

        let avail: HashMap<String, usize> = regions
            .iter()
            .map(|region| {
                let count = self
                    .snapshot
                    .topology
                    .nodes_in_region(region)
                    .iter()
                    .filter(|addr| self.snapshot.writable.contains(*addr) && !excluded.contains(*addr))
                    .count();
                (region.clone(), count)
            })
            .collect();

        let mut deficit = 0usize;
        for region in regions {
            let wanted = alloc[region];
            let have = avail[region];
            if have < wanted {
                deficit += wanted - have;
                alloc.insert(region.clone(), have);
            }
        }

        if deficit > 0 {
            warn!(deficit, "region allocation short, redistributing to regions with surplus candidates");
            for region in regions {
                if deficit == 0 {
                    break;
                }
                let assigned = alloc[region];
                let surplus = avail[region].saturating_sub(assigned);
                let take = surplus.min(deficit);
                if take > 0 {
                    alloc.insert(region.clone(), assigned + take);
                    deficit -= take;
                }
            }
        }

        let total: usize = alloc.values().sum();
        if total < ensemble_size {
            return Err(Error::not_enough_bookies(total, ensemble_size));
        }

        Ok(alloc)
    }

    /// Check every write-set window covers at least
    /// `minRegionsForDurability` distinct regions (spec §3, §4.4).
    fn validate_coverage(&self, ensemble: &Ensemble, write_quorum: usize) -> Result<()> {
        let min_regions = self.config.min_regions_for_durability as usize;
        for write_set in all_write_sets(ensemble, write_quorum) {
            let regions: BTreeSet<String> = write_set
                .iter()
                .map(|addr| self.snapshot.topology.location_of_or_default(addr).region)
                .collect();
            if regions.len() < min_regions {
                warn!(
                    covered = regions.len(),
                    required = min_regions,
                    "ensemble failed durability coverage validation"
                );
                return Err(Error::not_enough_bookies(regions.len(), min_regions));
            }
        }
        Ok(())
    }
}

/// Round-robin the per-region pick lists into one ensemble, so that
/// adjacent positions tend to come from different regions (spec §4.4:
/// "interleave the per-region picks ... keyed by region index").
fn interleave(regions: &[String], picks: &mut HashMap<String, Vec<BookieAddr>>) -> Ensemble {
    let mut queues: Vec<Vec<BookieAddr>> = regions
        .iter()
        .map(|region| {
            let mut v = picks.remove(region).unwrap_or_default();
            v.reverse();
            v
        })
        .collect();

    let mut ensemble = Vec::new();
    loop {
        let mut progressed = false;
        for queue in &mut queues {
            if let Some(addr) = queue.pop() {
                ensemble.push(addr);
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }
    ensemble
}
