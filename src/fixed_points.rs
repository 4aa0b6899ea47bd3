//! Fixed lactate concentrations
//!
//! Reads speed and heart rate where the fitted lactate curve comes closest to
//! each fixed concentration. The nearest sample is returned even when the curve
//! never reaches the target inside the observed range.

use crate::curve::FittedCurve;
use crate::error::ComputeError;
use crate::precision;
use crate::search::{checked_predict, SearchGrid};
use crate::types::FixedLactatePoint;

/// Interpolator over the whole observed speed range
pub struct FixedPointInterpolator;

impl FixedPointInterpolator {
    pub fn interpolate(
        targets: &[f64],
        lactate: &FittedCurve,
        heart_rate: &FittedCurve,
        grid: &SearchGrid,
    ) -> Result<Vec<FixedLactatePoint>, ComputeError> {
        targets
            .iter()
            .map(|&target_mmol| {
                let speed = grid.closest(lactate, grid.min_speed, grid.max_speed, target_mmol)?;
                let hr = checked_predict(heart_rate, speed)?;
                Ok(FixedLactatePoint {
                    target_mmol,
                    speed: precision::speed(speed),
                    heart_rate: precision::heart_rate(hr),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Axis;

    fn linear(axis: Axis, intercept: f64, slope: f64) -> FittedCurve {
        FittedCurve {
            axis,
            order: 1,
            coefficients: vec![intercept, slope],
            r2: 1.0,
        }
    }

    fn grid() -> SearchGrid {
        SearchGrid {
            min_speed: 2.0,
            max_speed: 4.0,
            step: 0.002,
        }
    }

    #[test]
    fn test_targets_inside_range() {
        // lactate = 2x - 3 reaches 2, 4 and 5 at 2.5, 3.5 and 4.0
        let lactate = linear(Axis::Lactate, -3.0, 2.0);
        let hr = linear(Axis::HeartRate, 100.0, 20.0);
        let points =
            FixedPointInterpolator::interpolate(&[2.0, 4.0], &lactate, &hr, &grid()).unwrap();

        assert_eq!(points[0].target_mmol, 2.0);
        assert_eq!(points[0].speed, 2.5);
        assert_eq!(points[0].heart_rate, 150);
        assert_eq!(points[1].speed, 3.5);
        assert_eq!(points[1].heart_rate, 170);
    }

    #[test]
    fn test_unreachable_target_returns_nearest_sample() {
        let lactate = linear(Axis::Lactate, -3.0, 2.0);
        let hr = linear(Axis::HeartRate, 100.0, 20.0);
        let points = FixedPointInterpolator::interpolate(&[6.0], &lactate, &hr, &grid()).unwrap();

        // Curve tops out at 5.0 at the maximum speed
        assert_eq!(points[0].speed, 4.0);
        assert_eq!(points[0].heart_rate, 180);
    }

    #[test]
    fn test_target_below_curve_returns_minimum_speed() {
        let lactate = linear(Axis::Lactate, 0.0, 1.0);
        let hr = linear(Axis::HeartRate, 100.0, 20.0);
        let points = FixedPointInterpolator::interpolate(&[1.0], &lactate, &hr, &grid()).unwrap();

        assert_eq!(points[0].speed, 2.0);
    }
}
