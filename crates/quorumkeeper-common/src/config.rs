//! Configuration types for the placement core
//!
//! Mirrors the stable key names the core recognizes (`placement.*`); loading
//! these from a file or environment is the embedding application's concern,
//! not this crate's — only the shape and its defaults live here.

use serde::{Deserialize, Serialize};

/// Configuration accepted by the placement core's `initialize` call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementConfig {
    /// `placement.regionsToWrite` — ordered list of region labels to
    /// prefer. Empty means "all known regions, canonical order."
    #[serde(default)]
    pub regions_to_write: Vec<String>,

    /// `placement.minRegionsForDurability` — minimum distinct regions each
    /// write-quorum window must cover when validation can enforce it.
    #[serde(default = "default_min_regions_for_durability")]
    pub min_regions_for_durability: u32,

    /// `placement.enableValidation` — reject ensembles that fail the
    /// durability-coverage check instead of returning them anyway.
    #[serde(default = "default_enable_validation")]
    pub enable_validation: bool,

    /// `placement.dnsResolverClass` — identity of the injected resolver, as
    /// a free-form label for logging/diagnostics. The resolver instance
    /// itself is passed to `initialize` directly, not looked up from this
    /// string.
    #[serde(default)]
    pub dns_resolver_class: Option<String>,

    /// `placement.remoteNodeReorderThreshold` — number of local entries
    /// the read reorderer emits before interleaving one remote entry.
    #[serde(default = "default_remote_node_reorder_threshold")]
    pub remote_node_reorder_threshold: u32,
}

const fn default_min_regions_for_durability() -> u32 {
    1
}

const fn default_enable_validation() -> bool {
    true
}

const fn default_remote_node_reorder_threshold() -> u32 {
    2
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            regions_to_write: Vec::new(),
            min_regions_for_durability: default_min_regions_for_durability(),
            enable_validation: default_enable_validation(),
            dns_resolver_class: None,
            remote_node_reorder_threshold: default_remote_node_reorder_threshold(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = PlacementConfig::default();
        assert!(config.regions_to_write.is_empty());
        assert_eq!(config.min_regions_for_durability, 1);
        assert!(config.enable_validation);
        assert_eq!(config.remote_node_reorder_threshold, 2);
    }

    #[test]
    fn round_trips_through_json() {
        let config = PlacementConfig {
            regions_to_write: vec!["/r1".to_string(), "/r2".to_string()],
            min_regions_for_durability: 2,
            enable_validation: false,
            dns_resolver_class: Some("StaticResolver".to_string()),
            remote_node_reorder_threshold: 3,
        };

        let json = serde_json::to_string(&config).unwrap();
        let parsed: PlacementConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let parsed: PlacementConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, PlacementConfig::default());
    }
}
