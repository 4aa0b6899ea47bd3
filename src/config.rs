//! Engine configuration
//!
//! Every constant the calculation depends on lives here so a session can be
//! recomputed with a different offset or resolution without touching the
//! algorithms. The defaults reproduce the standard step-test analysis.

use crate::error::ComputeError;
use serde::{Deserialize, Serialize};

/// Minimum number of validated steps required for a calculation
pub const DEFAULT_MIN_POINTS: usize = 5;

/// Degree of the lactate, heart-rate and stroke-rate polynomials
pub const DEFAULT_POLYNOMIAL_ORDER: usize = 3;

/// LT1 target offset above the lowest observed lactate (mmol/L)
pub const DEFAULT_LT1_OFFSET_MMOL: f64 = 0.4;

/// Step-to-step lactate rise that marks the Modified Dmax start point (mmol/L)
pub const DEFAULT_DMAX_RISE_MMOL: f64 = 0.4;

/// Number of equal divisions of the observed speed range used by every search
pub const DEFAULT_SEARCH_STEPS: usize = 1000;

/// Number of evenly spaced samples exported per fitted curve
pub const DEFAULT_CURVE_SAMPLES: usize = 101;

/// Fixed blood-lactate concentrations reported alongside the thresholds (mmol/L)
pub const DEFAULT_FIXED_LACTATE_TARGETS: [f64; 3] = [2.0, 4.0, 6.0];

/// Largest supported `coefficient_precision`
pub const MAX_COEFFICIENT_PRECISION: u32 = 15;

/// Tunable parameters for a calculation pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Validated steps needed before anything is fitted
    pub min_points: usize,
    /// Polynomial degree for the per-axis regressions
    pub polynomial_order: usize,
    /// Offset added to the minimum lactate to obtain the LT1 target
    pub lt1_offset_mmol: f64,
    /// Consecutive-step rise that triggers the Modified Dmax start point
    pub dmax_rise_mmol: f64,
    /// Divisions of the observed speed range for the discretized searches
    pub search_steps: usize,
    /// Fixed lactate concentrations to interpolate
    pub fixed_lactate_targets: Vec<f64>,
    /// Samples per fitted curve in the result bundle
    pub curve_samples: usize,
    /// Round regression coefficients to this many decimals before predicting
    pub coefficient_precision: Option<u32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_points: DEFAULT_MIN_POINTS,
            polynomial_order: DEFAULT_POLYNOMIAL_ORDER,
            lt1_offset_mmol: DEFAULT_LT1_OFFSET_MMOL,
            dmax_rise_mmol: DEFAULT_DMAX_RISE_MMOL,
            search_steps: DEFAULT_SEARCH_STEPS,
            fixed_lactate_targets: DEFAULT_FIXED_LACTATE_TARGETS.to_vec(),
            curve_samples: DEFAULT_CURVE_SAMPLES,
            coefficient_precision: None,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: EngineConfig = serde_json::from_str(json)
            .map_err(|e| ComputeError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to pretty JSON
    pub fn to_json(&self) -> Result<String, ComputeError> {
        serde_json::to_string_pretty(self).map_err(|e| ComputeError::EncodingError(e.to_string()))
    }

    /// Reject values the algorithms cannot work with
    pub fn validate(&self) -> Result<(), ComputeError> {
        if self.polynomial_order == 0 {
            return Err(ComputeError::InvalidConfig(
                "polynomial_order must be at least 1".to_string(),
            ));
        }
        if self.min_points <= self.polynomial_order {
            return Err(ComputeError::InvalidConfig(format!(
                "min_points ({}) must exceed polynomial_order ({})",
                self.min_points, self.polynomial_order
            )));
        }
        if self.search_steps == 0 {
            return Err(ComputeError::InvalidConfig(
                "search_steps must be positive".to_string(),
            ));
        }
        if self.curve_samples < 2 {
            return Err(ComputeError::InvalidConfig(
                "curve_samples must be at least 2".to_string(),
            ));
        }
        if let Some(decimals) = self.coefficient_precision {
            if decimals > MAX_COEFFICIENT_PRECISION {
                return Err(ComputeError::InvalidConfig(format!(
                    "coefficient_precision ({decimals}) must not exceed {MAX_COEFFICIENT_PRECISION}"
                )));
            }
        }
        for (name, value) in [
            ("lt1_offset_mmol", self.lt1_offset_mmol),
            ("dmax_rise_mmol", self.dmax_rise_mmol),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ComputeError::InvalidConfig(format!(
                    "{name} must be a finite, non-negative number"
                )));
            }
        }
        if let Some(bad) = self
            .fixed_lactate_targets
            .iter()
            .find(|t| !t.is_finite() || **t <= 0.0)
        {
            return Err(ComputeError::InvalidConfig(format!(
                "fixed lactate target {bad} must be a positive number"
            )));
        }
        Ok(())
    }
}
