//! # Inspection Configuration
//!
//! Tunable thresholds for detection and materialization. Every field has a
//! default from [`crate::primitives`], so partial configuration documents
//! deserialize cleanly.

use crate::primitives::{DEFAULT_MAGIC_MIN_LENGTH, DEFAULT_MAX_DEPTH, DEFAULT_MAX_NODES};
use serde::{Deserialize, Serialize};

/// Thresholds used by the format detector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectorConfig {
    /// Values must be strictly longer than this to be treated as an object
    /// stream. The floor is a heuristic, not a property of the format.
    pub magic_min_length: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            magic_min_length: DEFAULT_MAGIC_MIN_LENGTH,
        }
    }
}

/// Bounds applied to one materialization call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MaterializeOptions {
    /// Depth at which a `Truncated` node is emitted instead of recursing.
    pub max_depth: usize,
    /// Total nodes one call may emit.
    pub max_nodes: usize,
}

impl Default for MaterializeOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_nodes: DEFAULT_MAX_NODES,
        }
    }
}

impl MaterializeOptions {
    /// Default options with a different depth cap.
    #[must_use]
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth,
            ..Self::default()
        }
    }
}

/// Complete configuration of an [`crate::Inspector`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InspectConfig {
    pub detector: DetectorConfig,
    pub materializer: MaterializeOptions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_primitives() {
        let config = InspectConfig::default();
        assert_eq!(config.detector.magic_min_length, 32);
        assert_eq!(config.materializer.max_depth, 50);
        assert_eq!(config.materializer.max_nodes, 100_000);
    }

    #[test]
    fn partial_document_keeps_defaults() {
        let config: InspectConfig =
            serde_json::from_str(r#"{"materializer":{"max_depth":8}}"#).expect("parse");
        assert_eq!(config.materializer.max_depth, 8);
        assert_eq!(config.materializer.max_nodes, 100_000);
        assert_eq!(config.detector, DetectorConfig::default());
    }

    #[test]
    fn unknown_fields_rejected() {
        let result = serde_json::from_str::<InspectConfig>(r#"{"detector":{"magic":1}}"#);
        assert!(result.is_err());
    }
}
