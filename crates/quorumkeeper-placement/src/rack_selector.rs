//! Rack-Aware Selector: greedy rack-diverse picks within a candidate pool
//!
//! The Region-Aware Selector owns one of these per active region rather than
//! this type holding any notion of region itself (spec §9: composition in
//! place of the source's inheritance hierarchy).

use crate::membership::MembershipSnapshot;
use quorumkeeper_common::{BookieAddr, Error, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::{BTreeSet, HashMap};
use tracing::trace;

/// A source of reproducible randomness for tie-breaking.
///
/// Selection calls sharing a seed are required to produce identical output
/// (spec §8 property 4); this trait is the injection point for that.
pub trait PlacementRng: Send + Sync {
    /// Shuffle `items` in place.
    fn shuffle<T>(&mut self, items: &mut [T]);
}

/// A [`PlacementRng`] seeded deterministically from a `u64`.
pub struct SeededRng(StdRng);

impl SeededRng {
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl PlacementRng for SeededRng {
    fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.0);
    }
}

/// Greedily selects rack-diverse bookies from a restricted candidate pool,
/// reading membership and topology from a single borrowed snapshot.
pub struct RackAwareSelector<'a> {
    snapshot: &'a MembershipSnapshot,
}

impl<'a> RackAwareSelector<'a> {
    #[must_use]
    pub fn new(snapshot: &'a MembershipSnapshot) -> Self {
        Self { snapshot }
    }

    /// Pick `count` distinct writable addresses from `pool`, excluding
    /// `excluded`, maximizing rack diversity before repeating a rack.
    ///
    /// `local_rack` is the caller's rack; when `prefer_local` is set and a
    /// candidate remains in it, it is chosen first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotEnoughBookies`] when fewer than `count` eligible
    /// candidates remain in `pool`.
    pub fn pick_n(
        &self,
        pool: &BTreeSet<BookieAddr>,
        count: usize,
        excluded: &BTreeSet<BookieAddr>,
        prefer_local: bool,
        local_rack: Option<&str>,
        rng: &mut dyn PlacementRng,
    ) -> Result<Vec<BookieAddr>> {
        let candidates: BTreeSet<BookieAddr> = pool
            .iter()
            .filter(|addr| self.snapshot.writable.contains(*addr) && !excluded.contains(*addr))
            .cloned()
            .collect();

        if candidates.len() < count {
            return Err(Error::not_enough_bookies(candidates.len(), count));
        }

        let mut by_rack: HashMap<String, Vec<BookieAddr>> = HashMap::new();
        for addr in &candidates {
            let rack = self.snapshot.topology.location_of_or_default(addr).rack;
            by_rack.entry(rack).or_default().push(addr.clone());
        }

        let mut rack_order: Vec<String> = by_rack.keys().cloned().collect();
        rack_order.sort();
        // Shuffle in `rack_order` (sorted, hence deterministic) order rather
        // than `by_rack`'s `HashMap` iteration order, so that which rack's
        // list consumes which slice of the shared RNG sequence is the same
        // every time for a given seed (spec §8 property 4).
        for rack in &rack_order {
            rng.shuffle(by_rack.get_mut(rack).expect("rack_order built from by_rack's own keys"));
        }

        if prefer_local {
            if let Some(rack) = local_rack {
                if let Some(pos) = rack_order.iter().position(|r| r == rack) {
                    let local = rack_order.remove(pos);
                    rack_order.insert(0, local);
                }
            }
        }

        let mut picked = Vec::with_capacity(count);
        let mut cursors: HashMap<String, usize> = HashMap::new();

        while picked.len() < count {
            let mut made_progress = false;
            for rack in &rack_order {
                if picked.len() == count {
                    break;
                }
                let members = &by_rack[rack];
                let cursor = cursors.entry(rack.clone()).or_insert(0);
                if *cursor < members.len() {
                    picked.push(members[*cursor].clone());
                    *cursor += 1;
                    made_progress = true;
                }
            }
            if !made_progress {
                break;
            }
        }

        trace!(picked = picked.len(), requested = count, "rack-aware selection complete");
        Ok(picked)
    }
}
