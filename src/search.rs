//! Discretized speed search
//!
//! The fitted curves have no general analytic inverse, so thresholds are found
//! by walking the speed axis in equal steps. The step is a fixed fraction of the
//! full observed speed range, whatever sub-interval is being scanned. Every
//! search keeps the first sample that achieves its optimum, scanning by
//! increasing speed.

use crate::curve::FittedCurve;
use crate::error::ComputeError;
use crate::types::ValidatedPoint;

/// Equal-step grid over the observed speed range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchGrid {
    pub min_speed: f64,
    pub max_speed: f64,
    pub step: f64,
}

impl SearchGrid {
    /// Grid dividing the observed speed range of speed-sorted points into `steps`
    pub fn new(points: &[ValidatedPoint], steps: usize) -> Result<Self, ComputeError> {
        let (first, last) = match (points.first(), points.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => {
                return Err(ComputeError::InsufficientData {
                    found: 0,
                    required: 1,
                })
            }
        };
        let min_speed = first.speed;
        let max_speed = last.speed;
        Ok(Self {
            min_speed,
            max_speed,
            step: (max_speed - min_speed) / steps.max(1) as f64,
        })
    }

    /// Sample speeds from `from` up to and including `to`
    pub fn speeds(&self, from: f64, to: f64) -> impl Iterator<Item = f64> {
        let step = self.step;
        let count = if step > 0.0 && to >= from {
            ((to - from) / step + 1e-6).floor() as usize + 1
        } else {
            1
        };
        // min() keeps the last sample from overshooting `to` by rounding error
        (0..count).map(move |i| (from + step * i as f64).min(to.max(from)))
    }

    /// Speed in `[from, to]` whose predicted value is closest to `target`
    pub fn closest(
        &self,
        curve: &FittedCurve,
        from: f64,
        to: f64,
        target: f64,
    ) -> Result<f64, ComputeError> {
        let mut best: Option<(f64, f64)> = None;
        for speed in self.speeds(from, to) {
            let diff = (checked_predict(curve, speed)? - target).abs();
            match best {
                Some((_, best_diff)) if diff >= best_diff => {}
                _ => best = Some((speed, diff)),
            }
        }
        Ok(best.map(|(speed, _)| speed).unwrap_or(from))
    }
}

/// Predict, turning NaN or infinity into an error
pub fn checked_predict(curve: &FittedCurve, speed: f64) -> Result<f64, ComputeError> {
    let value = curve.predict(speed);
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ComputeError::NonFinite(format!(
            "{:?} curve evaluated to {} at speed {}",
            curve.axis, value, speed
        )))
    }
}
