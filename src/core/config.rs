//! Engine configuration with documented constants
//!
//! Every tuning number used by the rate model lives here instead of in
//! module-wide constants, so simulations with different tuning can coexist.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::error::{EvError, Result};
use crate::core::types::EvType;

/// Tolerance for the gating weights summing to one
const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Configuration for the rate model
///
/// The defaults reproduce the illustrative Explain-Why formulas:
/// `g_S = sigmoid(6 * (S - 0.5))` and `g_W = 0.6 * ATP + 0.4 * (1 - ROS)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === ESCRT GATING ===
    /// Steepness `k` of the ESCRT routing sigmoid
    ///
    /// Larger values make `g_S` saturate faster around the midpoint.
    pub sigmoid_steepness: f64,

    /// Value of `S` at which `g_S` equals 0.5
    pub sigmoid_midpoint: f64,

    // === INTERNAL-STATE WEIGHTING ===
    /// Weight of the energy component (ATP) in `g_W`
    pub energy_weight: f64,

    /// Weight of the inverted stress component (1 - ROS) in `g_W`
    ///
    /// Must sum to 1 with `energy_weight` so `g_W` stays a convex combination.
    pub stress_weight: f64,

    /// Position of the energy scalar inside a cell's `I` vector
    pub energy_index: usize,

    /// Position of the stress scalar inside a cell's `I` vector
    pub stress_index: usize,

    // === PERTURBATION CHANNELS ===
    /// How strongly `ghost` damps `g_W`: factor `1 - ghost_damping * ghost`
    ///
    /// Kept in [0, 1] so the factor never goes negative.
    pub ghost_damping: f64,

    /// How strongly `fairy` boosts `g_W`: factor `1 + fairy_boost * fairy`
    pub fairy_boost: f64,

    // === BASELINE ===
    /// Baseline rate `r_T` used when no kinetics entry exists
    pub default_baseline: f64,

    /// EV types produced each step, in production order
    pub ev_types: Vec<EvType>,

    // === EXCHANGE ===
    /// Position of the "received EV" scalar inside a cell's `E` vector
    pub received_index: usize,

    /// Gain of the paracrine multiplier `1 + paracrine_gain * E[received_index]`
    ///
    /// At 0.0 received EVs only perturb `E` and leave the rate untouched.
    pub paracrine_gain: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sigmoid_steepness: 6.0,
            sigmoid_midpoint: 0.5,

            energy_weight: 0.6,
            stress_weight: 0.4,
            energy_index: 0,
            stress_index: 1,

            ghost_damping: 0.5,
            fairy_boost: 0.25,

            default_baseline: 1.0,
            ev_types: vec![EvType::Exosome, EvType::Microvesicle],

            received_index: 4,
            paracrine_gain: 0.0,
        }
    }
}

impl EngineConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML text and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if !self.sigmoid_steepness.is_finite() || self.sigmoid_steepness <= 0.0 {
            return Err(EvError::config(format!(
                "sigmoid_steepness ({}) must be positive",
                self.sigmoid_steepness
            )));
        }
        if !(0.0..=1.0).contains(&self.sigmoid_midpoint) {
            return Err(EvError::config(format!(
                "sigmoid_midpoint ({}) must lie in [0, 1]",
                self.sigmoid_midpoint
            )));
        }

        for (label, weight) in [
            ("energy_weight", self.energy_weight),
            ("stress_weight", self.stress_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(EvError::config(format!(
                    "{} ({}) must be finite and non-negative",
                    label, weight
                )));
            }
        }
        let weight_sum = self.energy_weight + self.stress_weight;
        if (weight_sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(EvError::config(format!(
                "energy_weight + stress_weight must equal 1, got {}",
                weight_sum
            )));
        }

        if !(0.0..=1.0).contains(&self.ghost_damping) {
            return Err(EvError::config(format!(
                "ghost_damping ({}) must lie in [0, 1]",
                self.ghost_damping
            )));
        }
        if !self.fairy_boost.is_finite() || self.fairy_boost < 0.0 {
            return Err(EvError::config(format!(
                "fairy_boost ({}) must be non-negative",
                self.fairy_boost
            )));
        }

        if !self.default_baseline.is_finite() || self.default_baseline <= 0.0 {
            return Err(EvError::config(format!(
                "default_baseline ({}) must be positive",
                self.default_baseline
            )));
        }

        if self.ev_types.is_empty() {
            return Err(EvError::config("ev_types must not be empty"));
        }
        for (i, ev) in self.ev_types.iter().enumerate() {
            if self.ev_types[..i].contains(ev) {
                return Err(EvError::config(format!("duplicate EV type '{}'", ev)));
            }
        }

        if !self.paracrine_gain.is_finite() || self.paracrine_gain < 0.0 {
            return Err(EvError::config(format!(
                "paracrine_gain ({}) must be non-negative",
                self.paracrine_gain
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let config = EngineConfig {
            energy_weight: 0.7,
            ..EngineConfig::default()
        };
        assert!(config.validate().unwrap_err().is_config());
    }

    #[test]
    fn test_rejects_duplicate_ev_types() {
        let config = EngineConfig {
            ev_types: vec![EvType::Exosome, EvType::Exosome],
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_ghost_damping_above_one() {
        let config = EngineConfig {
            ghost_damping: 1.5,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            sigmoid_steepness = 8.0
            ev_types = ["exosome"]
            "#,
        )
        .unwrap();
        assert_eq!(config.sigmoid_steepness, 8.0);
        assert_eq!(config.ev_types, vec![EvType::Exosome]);
        assert_eq!(config.energy_weight, 0.6);
    }

    #[test]
    fn test_nan_weights_rejected() {
        let err = EngineConfig::from_toml_str("energy_weight = nan").unwrap_err();
        assert!(err.is_config());

        let config = EngineConfig {
            stress_weight: f64::INFINITY,
            ..EngineConfig::default()
        };
        assert!(config.validate().unwrap_err().is_config());
    }

    #[test]
    fn test_invalid_toml_values_rejected() {
        let err = EngineConfig::from_toml_str("default_baseline = -1.0").unwrap_err();
        assert!(err.is_config());
    }
}
