//! Error types for the QuorumKeeper placement core
//!
//! This module defines the error taxonomy the core exposes to callers. It
//! is deliberately small: DNS resolution failures are swallowed and never
//! reach here (they resolve to the default region instead), and placement
//! calls never partially mutate state on failure.

use thiserror::Error;

/// Result type for placement-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the QuorumKeeper placement core.
#[derive(Debug, Error)]
pub enum Error {
    /// The requested ensemble size, diversity, or exclusion constraints
    /// could not be satisfied by the current membership.
    #[error("not enough bookies: have {available}, need {required}")]
    NotEnoughBookies { available: usize, required: usize },

    /// The supplied configuration or call parameters are contradictory,
    /// e.g. write-quorum greater than ensemble size.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// An inspection helper was asked about an address this process has
    /// never observed. Selection paths never raise this; they fold unknown
    /// addresses into the default region instead.
    #[error("unknown node: {0}")]
    UnknownNode(String),
}

impl Error {
    /// Build a [`Error::NotEnoughBookies`].
    #[must_use]
    pub fn not_enough_bookies(available: usize, required: usize) -> Self {
        Self::NotEnoughBookies { available, required }
    }

    /// Build a [`Error::InvalidConfiguration`].
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Build a [`Error::UnknownNode`].
    pub fn unknown_node(addr: impl Into<String>) -> Self {
        Self::UnknownNode(addr.into())
    }

    /// Whether this error reflects an exhausted candidate pool rather than
    /// a caller mistake; useful for callers deciding whether a retry after
    /// a membership change might succeed.
    #[must_use]
    pub fn is_not_enough_bookies(&self) -> bool {
        matches!(self, Self::NotEnoughBookies { .. })
    }
}
