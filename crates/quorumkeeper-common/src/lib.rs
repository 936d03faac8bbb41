//! QuorumKeeper Common - Shared types for the placement core
//!
//! This crate holds the small set of types the placement core and its
//! embedders need to agree on: bookie identity, the error taxonomy, and
//! the configuration shape. It intentionally does not carry the rest of a
//! log-storage system's vocabulary (objects, shards, erasure coding, S3) —
//! those belong to collaborators outside the placement core's boundary.

pub mod address;
pub mod config;
pub mod error;

pub use address::{BookieAddr, NetworkLocation, DEFAULT_RACK, DEFAULT_REGION};
pub use config::PlacementConfig;
pub use error::{Error, Result};
