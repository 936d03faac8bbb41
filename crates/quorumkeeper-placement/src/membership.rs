//! Membership View: the live writable/read-only bookie sets
//!
//! Cluster membership changes arrive asynchronously (`onClusterChanged`) and
//! are read from many call paths concurrently, so the current view is kept
//! behind a `parking_lot::RwLock` rather than threaded through call
//! signatures. Per spec §9 ("cycle-free ownership: Membership View owns the
//! Topology Index"), the [`TopologyIndex`] lives inside this type rather
//! than beside it; selectors borrow a [`MembershipSnapshot`] that carries
//! both pieces of state together so a single selection call sees one
//! consistent view of the world (spec §3, §5).

use crate::topology::{Resolver, TopologyIndex};
use parking_lot::RwLock;
use quorumkeeper_common::BookieAddr;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// A bookie's membership status at a point in time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MembershipState {
    /// Eligible to receive new ensemble placements and writes.
    Writable,
    /// Known to the cluster but not eligible for new placements; still a
    /// valid read target.
    ReadOnly,
    /// Not currently known to the cluster at all.
    Unavailable,
}

/// An immutable point-in-time copy of the membership view plus the topology
/// index it was derived from, used by exactly one selection call (spec §3:
/// "Owned exclusively by the call").
#[derive(Clone)]
pub struct MembershipSnapshot {
    pub writable: BTreeSet<BookieAddr>,
    pub read_only: BTreeSet<BookieAddr>,
    pub topology: TopologyIndex,
}

impl MembershipSnapshot {
    /// The membership state of `addr` under this snapshot.
    #[must_use]
    pub fn state_of(&self, addr: &BookieAddr) -> MembershipState {
        if self.writable.contains(addr) {
            MembershipState::Writable
        } else if self.read_only.contains(addr) {
            MembershipState::ReadOnly
        } else {
            MembershipState::Unavailable
        }
    }

    /// Every address considered part of the cluster, writable or not.
    #[must_use]
    pub fn known_addresses(&self) -> BTreeSet<BookieAddr> {
        self.writable.union(&self.read_only).cloned().collect()
    }
}

/// Shared, mutable view of cluster membership and its topology index.
///
/// Cheap to clone: clones share the same underlying lock, mirroring the
/// `Arc<RwLock<_>>` handle pattern used elsewhere for cluster state shared
/// across threads.
#[derive(Clone)]
pub struct MembershipView {
    inner: Arc<RwLock<MembershipSnapshot>>,
}

impl MembershipView {
    /// An empty view backed by `resolver`; every address is `Unavailable`
    /// until the first `on_cluster_changed` call.
    #[must_use]
    pub fn new(resolver: Arc<dyn Resolver>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(MembershipSnapshot {
                writable: BTreeSet::new(),
                read_only: BTreeSet::new(),
                topology: TopologyIndex::new(resolver),
            })),
        }
    }

    /// Replace the writable and read-only sets wholesale.
    ///
    /// Addresses new to the union (writable ∪ read-only) are added to the
    /// topology index; addresses that drop out of the union are removed
    /// from it (spec §4.2). Inputs are not required to be disjoint on
    /// entry: an address present in both is treated as read-only, per spec
    /// ("overlapping input is treated as read-only winning").
    pub fn on_cluster_changed(&self, writable: BTreeSet<BookieAddr>, read_only: BTreeSet<BookieAddr>) {
        let writable: BTreeSet<BookieAddr> = writable.difference(&read_only).cloned().collect();

        debug!(
            writable = writable.len(),
            read_only = read_only.len(),
            "membership view updated"
        );

        let mut guard = self.inner.write();
        let old_union = guard.known_addresses();
        let new_union: BTreeSet<BookieAddr> = writable.union(&read_only).cloned().collect();

        for addr in new_union.difference(&old_union) {
            guard.topology.add_node(addr);
        }
        for addr in old_union.difference(&new_union) {
            guard.topology.remove_node(addr);
        }

        guard.writable = writable;
        guard.read_only = read_only;
    }

    /// A consistent copy of the current view, for a single selection call.
    #[must_use]
    pub fn snapshot(&self) -> MembershipSnapshot {
        self.inner.read().clone()
    }

    /// Whether `addr` is currently writable.
    #[must_use]
    pub fn is_writable(&self, addr: &BookieAddr) -> bool {
        self.inner.read().writable.contains(addr)
    }

    /// Whether `addr` is currently read-only.
    #[must_use]
    pub fn is_read_only(&self, addr: &BookieAddr) -> bool {
        self.inner.read().read_only.contains(addr)
    }

    /// The membership state of `addr`.
    #[must_use]
    pub fn state_of(&self, addr: &BookieAddr) -> MembershipState {
        self.inner.read().state_of(addr)
    }

    /// Drop all cached membership and topology state, as `uninitialize`
    /// requires (spec §6: "releases caches").
    pub fn clear(&self, resolver: Arc<dyn Resolver>) {
        let mut guard = self.inner.write();
        *guard = MembershipSnapshot {
            writable: BTreeSet::new(),
            read_only: BTreeSet::new(),
            topology: TopologyIndex::new(resolver),
        };
    }
}
