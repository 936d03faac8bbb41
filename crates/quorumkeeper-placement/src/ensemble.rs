//! Ensembles and write-set windows
//!
//! An ensemble is the ordered list of bookies a log segment is striped
//! across. Write quorums are contiguous, wrapping windows over that order;
//! this module has no notion of placement, only the shape of those windows.

use quorumkeeper_common::BookieAddr;

/// An ordered ensemble of bookie addresses.
pub type Ensemble = Vec<BookieAddr>;

/// The write-set starting at `entry_id mod ensemble.len()`: the `write_quorum`
/// bookies responsible for entry `entry_id`, in ensemble order, wrapping
/// around the end of the ensemble.
///
/// # Panics
///
/// Panics if `ensemble` is empty or `write_quorum` is zero; callers are
/// expected to have validated quorum bounds against ensemble size already.
#[must_use]
pub fn write_set(ensemble: &[BookieAddr], entry_id: u64, write_quorum: usize) -> Vec<BookieAddr> {
    assert!(!ensemble.is_empty(), "ensemble must be non-empty");
    assert!(write_quorum > 0, "write_quorum must be positive");

    let size = ensemble.len();
    #[allow(clippy::cast_possible_truncation)]
    let start = (entry_id % size as u64) as usize;
    (0..write_quorum)
        .map(|offset| ensemble[(start + offset) % size].clone())
        .collect()
}

/// Every distinct write-set window over the ensemble, one per starting
/// position `0..ensemble.len()`. Used by coverage checks that must hold for
/// every possible entry, not just one.
#[must_use]
pub fn all_write_sets(ensemble: &[BookieAddr], write_quorum: usize) -> Vec<Vec<BookieAddr>> {
    (0..ensemble.len() as u64)
        .map(|entry_id| write_set(ensemble, entry_id, write_quorum))
        .collect()
}
