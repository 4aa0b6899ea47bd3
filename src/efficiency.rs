//! Step efficiency
//!
//! Efficiency is speed cubed (drag-limited power) over strokes per second,
//! reported with its change from the first step.

use crate::normalizer::has_stroke_rate;
use crate::precision;
use crate::types::{EfficiencyPoint, ValidatedPoint};

/// Efficiency scorer for sessions with stroke-rate data
pub struct EfficiencyScorer;

impl EfficiencyScorer {
    /// Score every step, or `None` when any step lacks a stroke rate
    pub fn score(points: &[ValidatedPoint]) -> Option<Vec<EfficiencyPoint>> {
        if !has_stroke_rate(points) {
            return None;
        }

        let raw: Vec<f64> = points.iter().map(efficiency).collect();
        let baseline = raw[0];

        Some(
            raw.iter()
                .enumerate()
                .map(|(i, &value)| {
                    let percent_change = if i == 0 {
                        0.0
                    } else {
                        (value - baseline) / baseline * 100.0
                    };
                    EfficiencyPoint {
                        step: i + 1,
                        efficiency: precision::efficiency(value),
                        percent_change: precision::percent(percent_change),
                    }
                })
                .collect(),
        )
    }
}

/// speed^3 / (stroke_rate / 60)
pub fn efficiency(point: &ValidatedPoint) -> f64 {
    point.speed.powi(3) / (point.stroke_rate / 60.0)
}
