//! Replacement Planner: substitutes a failed node within an ensemble
//!
//! Unlike [`crate::rack_selector::RackAwareSelector`] and
//! [`crate::region_selector::RegionAwareSelector`], this component looks at
//! one specific, already-placed ensemble and tries to keep as much of its
//! existing diversity as it can (spec §4.5).

use crate::ensemble::write_set;
use crate::membership::MembershipSnapshot;
use quorumkeeper_common::{BookieAddr, Error, PlacementConfig, Result};
use std::collections::BTreeSet;
use tracing::debug;

/// Chooses substitutes for a failed bookie in an existing ensemble.
pub struct ReplacementPlanner<'a> {
    snapshot: &'a MembershipSnapshot,
    config: &'a PlacementConfig,
}

impl<'a> ReplacementPlanner<'a> {
    #[must_use]
    pub fn new(snapshot: &'a MembershipSnapshot, config: &'a PlacementConfig) -> Self {
        Self { snapshot, config }
    }

    /// Pick a replacement for `victim` within `current_ensemble`, matching
    /// spec §6's `replaceBookie(E, W, A, ensemble, victim, excluded)`.
    ///
    /// Tries, in order: (1) another node in the victim's own rack, (2)
    /// another rack in the victim's region, (3) any region the
    /// configuration allows. Within each tier, prefers a candidate whose
    /// substitution keeps every write-set window that currently contains
    /// `victim` at or above `minRegionsForDurability` distinct regions;
    /// falls back to the first candidate found in the broadest tier if no
    /// such candidate exists (spec §4.5: "the weakest acceptable
    /// candidate").
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfiguration`] when `write_quorum`/`ack_quorum` are
    /// out of bounds for `ensemble_size`, or `current_ensemble` does not
    /// actually have `ensemble_size` members (spec §7: "`InvalidConfiguration`
    /// — ... surfaced at `initialize` or at the offending call").
    /// [`Error::NotEnoughBookies`] when no eligible candidate remains in
    /// any tier.
    pub fn replace_bookie(
        &self,
        ensemble_size: usize,
        write_quorum: usize,
        ack_quorum: usize,
        current_ensemble: &[BookieAddr],
        victim: &BookieAddr,
        excluded: &BTreeSet<BookieAddr>,
    ) -> Result<BookieAddr> {
        Self::validate_quorums(ensemble_size, write_quorum, ack_quorum, current_ensemble.len())?;

        let mut excluded_all: BTreeSet<BookieAddr> = excluded.clone();
        excluded_all.extend(current_ensemble.iter().cloned());
        excluded_all.insert(victim.clone());

        let victim_location = self.snapshot.topology.location_of_or_default(victim);

        let same_rack = self.writable_pool(&self.snapshot.topology.nodes_in_rack(&victim_location.rack), &excluded_all);
        let same_region = self.writable_pool(&self.snapshot.topology.nodes_in_region(&victim_location.region), &excluded_all);
        let any_region = self.writable_pool(&self.candidate_regions_pool(), &excluded_all);

        let mut first_seen: Option<BookieAddr> = None;
        for tier in [&same_rack, &same_region, &any_region] {
            for candidate in tier {
                if first_seen.is_none() {
                    first_seen = Some(candidate.clone());
                }
                if self.preserves_coverage(current_ensemble, victim, candidate, write_quorum) {
                    return Ok(candidate.clone());
                }
            }
        }

        if let Some(weakest) = first_seen {
            debug!(victim = %victim, replacement = %weakest, "no candidate preserved durability coverage, using weakest acceptable");
            return Ok(weakest);
        }

        Err(Error::not_enough_bookies(0, 1))
    }

    /// Validate `write_quorum <= ensemble_size`, `ack_quorum <=
    /// write_quorum`, and that `current_ensemble` actually has
    /// `ensemble_size` members (spec §7), mirroring
    /// [`crate::region_selector::RegionAwareSelector`]'s quorum validation.
    fn validate_quorums(ensemble_size: usize, write_quorum: usize, ack_quorum: usize, actual_size: usize) -> Result<()> {
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
        if actual_size != ensemble_size {
            return Err(Error::invalid_configuration(format!(
                "current ensemble has {actual_size} members, expected {ensemble_size}"
            )));
        }
        Ok(())
    }

    /// Writable candidates from `pool`, excluding `excluded`, in stable
    /// (lexicographic) address order.
    fn writable_pool(&self, pool: &BTreeSet<BookieAddr>, excluded: &BTreeSet<BookieAddr>) -> BTreeSet<BookieAddr> {
        pool.iter()
            .filter(|addr| self.snapshot.writable.contains(*addr) && !excluded.contains(*addr))
            .cloned()
            .collect()
    }

    /// The union of nodes across every region `regionsToWrite` allows, or
    /// every known region when unconfigured.
    fn candidate_regions_pool(&self) -> BTreeSet<BookieAddr> {
        let regions = if self.config.regions_to_write.is_empty() {
            self.snapshot.topology.known_regions()
        } else {
            self.config.regions_to_write.clone()
        };
        regions
            .iter()
            .flat_map(|region| self.snapshot.topology.nodes_in_region(region))
            .collect()
    }

    /// Whether substituting `candidate` for `victim` keeps every write-set
    /// window that currently contains `victim` at or above
    /// `minRegionsForDurability` distinct regions.
    fn preserves_coverage(
        &self,
        current_ensemble: &[BookieAddr],
        victim: &BookieAddr,
        candidate: &BookieAddr,
        write_quorum: usize,
    ) -> bool {
        let min_regions = self.config.min_regions_for_durability as usize;
        if min_regions <= 1 {
            return true;
        }

        let Some(victim_index) = current_ensemble.iter().position(|addr| addr == victim) else {
            return true;
        };

        let hypothetical: Vec<BookieAddr> = current_ensemble
            .iter()
            .map(|addr| if addr == victim { candidate.clone() } else { addr.clone() })
            .collect();

        let size = current_ensemble.len();
        let windows_containing_victim = (0..write_quorum).map(|offset| (victim_index + size - offset % size) % size);

        windows_containing_victim.all(|start| {
            #[allow(clippy::cast_possible_truncation)]
            let ws = write_set(&hypothetical, start as u64, write_quorum);
            let regions: BTreeSet<String> = ws
                .iter()
                .map(|addr| self.snapshot.topology.location_of_or_default(addr).region)
                .collect();
            regions.len() >= min_regions
        })
    }
}
