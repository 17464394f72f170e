//! Configuration for a field computation.

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::block::{Block, GridResolution, LatticeMapping};
use crate::error::Result;

/// Everything needed to run one field computation.
///
/// Block values are kept raw here and validated by [`FieldConfig::block`], so
/// a config file with a bad size fails with a configuration error instead of
/// a parse error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    /// World-space corner of the block.
    pub origin: Vec3,

    /// Edge length of the block.
    pub size: f32,

    /// Samples per axis.
    pub resolution: GridResolution,

    /// Index-to-world convention handed to the evaluator.
    pub mapping: LatticeMapping,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            origin: Vec3::ZERO,
            size: 32.0,
            resolution: GridResolution::default(),
            mapping: LatticeMapping::Spanning,
        }
    }
}

impl FieldConfig {
    /// Parses a JSON config; missing keys take their default.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        log::debug!("loaded field config from {}", path.as_ref().display());
        Self::from_json(&text)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validated block described by this config.
    pub fn block(&self) -> Result<Block> {
        Block::new(self.origin, self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FieldError;

    #[test]
    fn test_default_matches_reference_block() {
        let config = FieldConfig::default();
        assert_eq!(config.resolution.samples(), 33);
        assert_eq!(config.block().unwrap(), Block::default());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = FieldConfig::from_json(r#"{ "resolution": 9, "mapping": "partitioned" }"#)
            .unwrap();
        assert_eq!(config.resolution.samples(), 9);
        assert_eq!(config.mapping, LatticeMapping::Partitioned);
        assert_eq!(config.size, 32.0);
    }

    #[test]
    fn test_zero_resolution_is_rejected() {
        let err = FieldConfig::from_json(r#"{ "resolution": 0 }"#).unwrap_err();
        assert!(matches!(err, FieldError::Json(_)));
    }

    #[test]
    fn test_bad_size_fails_on_block() {
        let config = FieldConfig::from_json(r#"{ "size": -1.0 }"#).unwrap();
        assert!(matches!(
            config.block(),
            Err(FieldError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_json_round_trip() {
        let config = FieldConfig {
            origin: Vec3::new(1.0, 2.0, 3.0),
            ..FieldConfig::default()
        };
        let parsed = FieldConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }
}
