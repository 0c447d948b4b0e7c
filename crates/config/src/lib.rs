//! Shared configuration for Stipple
//!
//! This crate provides the single source of truth for the tunable constants
//! of the surfel engine: store growth, EWA footprint filtering, brush painting
//! and surfel resampling. Every struct deserializes with `#[serde(default)]`, so
//! a partial JSON document only overrides the fields it names.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default fractional growth applied when the store runs out of capacity
pub const DEFAULT_GROWTH_FACTOR: f32 = 0.5;

/// Default number of surfel slots reserved up front
pub const DEFAULT_INITIAL_CAPACITY: usize = 0;

/// Default EWA cutoff radius, in standard deviations
pub const DEFAULT_CUTOFF_RADIUS: f32 = 3.0;

/// Default destination-space low-pass variance (one pixel reconstruction filter)
pub const DEFAULT_LOWPASS_VARIANCE: f32 = 1.0;

/// Default bound on the ratio of the conic's eigenvalues
pub const DEFAULT_MAX_ECCENTRICITY: f32 = 200.0;

/// Brush channel value at or above which a selection bit is set
pub const DEFAULT_SELECT_SET_THRESHOLD: f32 = 0.66;

/// Brush channel value at or below which a selection bit is cleared
pub const DEFAULT_SELECT_CLEAR_THRESHOLD: f32 = 0.33;

/// Grid-mode paint is rejected when a derived radius exceeds this multiple of the average
pub const DEFAULT_MAX_RADIUS_FACTOR: f32 = 4.0;

/// Object-space distance of a displacement value of 1.0
pub const DEFAULT_DISPLACEMENT_SCALE: f32 = 1.0;

/// Minimum accumulated weight for a resampled texel to produce a surfel
///
/// Splat weights are a density that sums to 1 over one footprint, so this is
/// a fraction of one surfel's contribution landing in the texel.
pub const DEFAULT_COVERAGE_THRESHOLD: f32 = 0.1;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid configuration value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Growth policy of a surfel store
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Capacity grows to `capacity * (1 + growth_factor) + 1` when full
    pub growth_factor: f32,
    /// Slots reserved when the store is created
    pub initial_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            growth_factor: DEFAULT_GROWTH_FACTOR,
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
        }
    }
}

impl StoreConfig {
    /// Capacity after one growth step from `capacity`
    pub fn grown_capacity(&self, capacity: usize) -> usize {
        (capacity as f32 * (1.0 + self.growth_factor.max(0.0))) as usize + 1
    }
}

/// Footprint filter parameters shared by painting and resampling
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EwaConfig {
    /// Footprint is truncated at this many standard deviations
    pub cutoff_radius: f32,
    /// Variance of the destination-space reconstruction filter
    pub lowpass_variance: f32,
    /// Splats whose conic eigenvalue ratio exceeds this are dropped
    pub max_eccentricity: f32,
}

impl Default for EwaConfig {
    fn default() -> Self {
        Self {
            cutoff_radius: DEFAULT_CUTOFF_RADIUS,
            lowpass_variance: DEFAULT_LOWPASS_VARIANCE,
            max_eccentricity: DEFAULT_MAX_ECCENTRICITY,
        }
    }
}

/// Brush painting parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaintConfig {
    pub ewa: EwaConfig,
    pub select_set_threshold: f32,
    pub select_clear_threshold: f32,
    pub max_radius_factor: f32,
    pub displacement_scale: f32,
}

impl Default for PaintConfig {
    fn default() -> Self {
        Self {
            ewa: EwaConfig::default(),
            select_set_threshold: DEFAULT_SELECT_SET_THRESHOLD,
            select_clear_threshold: DEFAULT_SELECT_CLEAR_THRESHOLD,
            max_radius_factor: DEFAULT_MAX_RADIUS_FACTOR,
            displacement_scale: DEFAULT_DISPLACEMENT_SCALE,
        }
    }
}

/// Surfel-to-surfel resampling parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResampleConfig {
    pub ewa: EwaConfig,
    pub coverage_threshold: f32,
}

impl Default for ResampleConfig {
    fn default() -> Self {
        Self {
            ewa: EwaConfig::default(),
            coverage_threshold: DEFAULT_COVERAGE_THRESHOLD,
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub store: StoreConfig,
    pub paint: PaintConfig,
    pub resample: ResampleConfig,
}

impl EngineConfig {
    /// Parse and validate a JSON configuration document
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check value ranges that would otherwise break the engine silently
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.store.growth_factor >= 0.0) {
            return Err(invalid("store.growth_factor", "must be non-negative"));
        }
        validate_ewa("paint.ewa", &self.paint.ewa)?;
        validate_ewa("resample.ewa", &self.resample.ewa)?;

        let paint = &self.paint;
        if !(paint.select_clear_threshold <= paint.select_set_threshold) {
            return Err(invalid(
                "paint.select_clear_threshold",
                "must not exceed select_set_threshold",
            ));
        }
        if !(paint.max_radius_factor > 0.0) {
            return Err(invalid("paint.max_radius_factor", "must be positive"));
        }
        if !(self.resample.coverage_threshold >= 0.0) {
            return Err(invalid("resample.coverage_threshold", "must be non-negative"));
        }
        Ok(())
    }
}

fn validate_ewa(field: &'static str, ewa: &EwaConfig) -> Result<(), ConfigError> {
    if !(ewa.cutoff_radius > 0.0) {
        return Err(invalid(field, "cutoff_radius must be positive"));
    }
    if !(ewa.lowpass_variance >= 0.0) {
        return Err(invalid(field, "lowpass_variance must be non-negative"));
    }
    if !(ewa.max_eccentricity >= 1.0) {
        return Err(invalid(field, "max_eccentricity must be at least 1"));
    }
    Ok(())
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.store.growth_factor, DEFAULT_GROWTH_FACTOR);
        assert_eq!(config.paint.ewa.cutoff_radius, DEFAULT_CUTOFF_RADIUS);
        assert_eq!(config.resample.coverage_threshold, DEFAULT_COVERAGE_THRESHOLD);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_grown_capacity() {
        let config = StoreConfig::default();
        assert_eq!(config.grown_capacity(0), 1);
        assert_eq!(config.grown_capacity(10), 16);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            EngineConfig::from_json_str(r#"{ "resample": { "coverage_threshold": 0.5 } }"#).unwrap();
        assert_eq!(config.resample.coverage_threshold, 0.5);
        assert_eq!(config.resample.ewa, EwaConfig::default());
        assert_eq!(config.paint, PaintConfig::default());
    }

    #[test]
    fn test_json_roundtrip() {
        let mut config = EngineConfig::default();
        config.paint.displacement_scale = 0.25;
        let json = config.to_json_string().unwrap();
        let parsed = EngineConfig::from_json_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        let result = EngineConfig::from_json_str(
            r#"{ "paint": { "select_set_threshold": 0.2, "select_clear_threshold": 0.8 } }"#,
        );
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(matches!(
            EngineConfig::from_json_str("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
