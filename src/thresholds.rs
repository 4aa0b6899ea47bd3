//! Threshold detection
//!
//! This module locates the two lactate thresholds on the fitted lactate curve:
//! - LT1: speed where the curve reaches the lowest observed lactate plus an offset
//! - LT2: Modified Dmax, the point of maximum perpendicular distance between the
//!   curve and a line from the first marked lactate rise to the final step

use crate::curve::FittedCurve;
use crate::error::ComputeError;
use crate::search::{checked_predict, SearchGrid};
use crate::types::{LinePoint, ModDmaxLine, ThresholdPoint, Thresholds, ValidatedPoint};
use tracing::debug;

/// Threshold detector over speed-sorted validated points
pub struct ThresholdDetector<'a> {
    points: &'a [ValidatedPoint],
    lactate: &'a FittedCurve,
    heart_rate: &'a FittedCurve,
    grid: SearchGrid,
}

impl<'a> ThresholdDetector<'a> {
    pub fn new(
        points: &'a [ValidatedPoint],
        lactate: &'a FittedCurve,
        heart_rate: &'a FittedCurve,
        grid: SearchGrid,
    ) -> Self {
        Self {
            points,
            lactate,
            heart_rate,
            grid,
        }
    }

    /// Find both thresholds
    pub fn detect(&self, lt1_offset: f64, dmax_rise: f64) -> Result<Thresholds, ComputeError> {
        let lt1 = self.lt1(lt1_offset)?;
        let (lt2, mod_dmax_line) = self.lt2(dmax_rise)?;
        Ok(Thresholds {
            lt1,
            lt2,
            mod_dmax_line,
        })
    }

    /// Lowest lactate plus `offset`.
    ///
    /// The reported lactate is the target concentration.
    pub fn lt1(&self, offset: f64) -> Result<ThresholdPoint, ComputeError> {
        let min_point = min_lactate_point(self.points).ok_or(ComputeError::InsufficientData {
            found: 0,
            required: 1,
        })?;
        let target = min_point.lactate + offset;

        let speed = self
            .grid
            .closest(self.lactate, min_point.speed, self.grid.max_speed, target)?;
        let heart_rate = checked_predict(self.heart_rate, speed)?;

        debug!(speed, target, heart_rate, "LT1 located");

        Ok(ThresholdPoint {
            speed,
            lactate: target,
            heart_rate,
        })
    }

    /// Modified Dmax
    pub fn lt2(&self, rise: f64) -> Result<(ThresholdPoint, ModDmaxLine), ComputeError> {
        let end = self.points.last().ok_or(ComputeError::InsufficientData {
            found: 0,
            required: 1,
        })?;
        let start_idx = dmax_start_index(self.points, rise);
        let start = &self.points[start_idx];

        let line = ModDmaxLine {
            start: LinePoint {
                x: start.speed,
                y: start.lactate,
            },
            end: LinePoint {
                x: end.speed,
                y: end.lactate,
            },
        };

        let mut best: Option<(f64, f64, f64)> = None;
        for speed in self.grid.speeds(line.start.x, line.end.x) {
            let lactate = checked_predict(self.lactate, speed)?;
            let distance = perpendicular_distance(LinePoint { x: speed, y: lactate }, &line)
                .ok_or_else(|| {
                    ComputeError::DegenerateGeometry(format!(
                        "reference line start ({}, {}) coincides with end point",
                        line.start.x, line.start.y
                    ))
                })?;
            match best {
                Some((_, _, best_distance)) if distance <= best_distance => {}
                _ => best = Some((speed, lactate, distance)),
            }
        }

        let (speed, lactate, distance) = best.ok_or_else(|| {
            ComputeError::DegenerateGeometry("empty Modified Dmax search interval".to_string())
        })?;
        let heart_rate = checked_predict(self.heart_rate, speed)?;

        debug!(
            start_step = start_idx + 1,
            speed, lactate, heart_rate, distance, "LT2 located"
        );

        Ok((
            ThresholdPoint {
                speed,
                lactate,
                heart_rate,
            },
            line,
        ))
    }
}

/// First point with the lowest lactate
pub fn min_lactate_point(points: &[ValidatedPoint]) -> Option<&ValidatedPoint> {
    points.iter().fold(None, |min: Option<&ValidatedPoint>, p| match min {
        Some(m) if p.lactate >= m.lactate => Some(m),
        _ => Some(p),
    })
}

/// Index of the point just before the first step-to-step lactate rise above
/// `rise`, or 0 when no such rise exists
pub fn dmax_start_index(points: &[ValidatedPoint], rise: f64) -> usize {
    points
        .windows(2)
        .position(|pair| pair[1].lactate - pair[0].lactate > rise)
        .unwrap_or(0)
}

/// Distance from `p` to the infinite line through the endpoints of `line`.
///
/// `None` when the endpoints coincide.
pub fn perpendicular_distance(p: LinePoint, line: &ModDmaxLine) -> Option<f64> {
    let LinePoint { x: x1, y: y1 } = line.start;
    let LinePoint { x: x2, y: y2 } = line.end;
    let a = y2 - y1;
    let b = x1 - x2;
    let norm = (a * a + b * b).sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return None;
    }
    let c = -a * x1 - b * y1;
    Some((a * p.x + b * p.y + c).abs() / norm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::CurveFitter;
    use crate::types::Axis;

    fn points(speeds: &[f64], lactates: &[f64]) -> Vec<ValidatedPoint> {
        speeds
            .iter()
            .zip(lactates)
            .map(|(&speed, &lactate)| ValidatedPoint {
                heart_rate: 120.0 + 15.0 * speed,
                speed,
                lactate,
                stroke_rate: 0.0,
            })
            .collect()
    }

    fn detector_parts(pts: &[ValidatedPoint]) -> (FittedCurve, FittedCurve, SearchGrid) {
        let lactate = CurveFitter::fit(pts, Axis::Lactate, 3, None).unwrap();
        let hr = CurveFitter::fit(pts, Axis::HeartRate, 3, None).unwrap();
        let grid = SearchGrid::new(pts, 1000).unwrap();
        (lactate, hr, grid)
    }

    #[test]
    fn test_dmax_start_after_first_jump() {
        // Scenario A: the 1.5 -> 2.2 rise is the first above 0.4
        let pts = points(&[2.0, 2.5, 3.0, 3.5, 4.0], &[1.0, 1.2, 1.5, 2.2, 4.0]);
        let idx = dmax_start_index(&pts, 0.4);

        assert_eq!(idx, 2);
        assert_eq!(pts[idx].speed, 3.0);
        assert_eq!(pts[idx].lactate, 1.5);
    }

    #[test]
    fn test_scenario_a_lt2_range() {
        let pts = points(&[2.0, 2.5, 3.0, 3.5, 4.0], &[1.0, 1.2, 1.5, 2.2, 4.0]);
        let (lactate, hr, grid) = detector_parts(&pts);
        let detector = ThresholdDetector::new(&pts, &lactate, &hr, grid);
        let (lt2, line) = detector.lt2(0.4).unwrap();

        assert_eq!(line.start, LinePoint { x: 3.0, y: 1.5 });
        assert_eq!(line.end, LinePoint { x: 4.0, y: 4.0 });
        assert!(lt2.speed >= 3.0 && lt2.speed <= 4.0);
        // A convex rise bulges below the chord, so LT2 is strictly inside
        assert!(lt2.speed > 3.0 && lt2.speed < 4.0);
        assert!((lt2.heart_rate - hr.predict(lt2.speed)).abs() < 1e-9);
    }

    #[test]
    fn test_dmax_start_defaults_to_first_point() {
        // Scenario D: no rise above 0.4 between consecutive steps
        let pts = points(&[2.0, 2.5, 3.0, 3.5, 4.0], &[1.0, 1.3, 1.6, 1.9, 2.2]);
        assert_eq!(dmax_start_index(&pts, 0.4), 0);
    }

    #[test]
    fn test_lt1_within_search_range() {
        let pts = points(
            &[2.0, 2.4, 2.8, 3.2, 3.6, 4.0],
            &[1.4, 1.1, 1.3, 1.9, 3.1, 5.6],
        );
        let (lactate, hr, grid) = detector_parts(&pts);
        let detector = ThresholdDetector::new(&pts, &lactate, &hr, grid);
        let lt1 = detector.lt1(0.4).unwrap();

        // Minimum lactate is the second step (speed 2.4)
        assert!(lt1.speed >= 2.4 && lt1.speed <= 4.0);
        assert!((lt1.lactate - 1.5).abs() < 1e-12);
        assert!((lactate.predict(lt1.speed) - 1.5).abs() < 0.05);
    }

    #[test]
    fn test_detect_orders_thresholds() {
        let pts = points(
            &[2.0, 2.4, 2.8, 3.2, 3.6, 4.0],
            &[1.2, 1.1, 1.3, 1.9, 3.1, 5.6],
        );
        let (lactate, hr, grid) = detector_parts(&pts);
        let thresholds = ThresholdDetector::new(&pts, &lactate, &hr, grid)
            .detect(0.4, 0.4)
            .unwrap();

        assert!(thresholds.lt1.speed < thresholds.lt2.speed);
        assert!(thresholds.lt1.heart_rate < thresholds.lt2.heart_rate);
    }

    #[test]
    fn test_min_lactate_first_on_ties() {
        let pts = points(&[2.0, 2.5, 3.0], &[1.2, 1.0, 1.0]);
        let min = min_lactate_point(&pts).unwrap();
        assert_eq!(min.speed, 2.5);
    }

    #[test]
    fn test_perpendicular_distance() {
        let line = ModDmaxLine {
            start: LinePoint { x: 0.0, y: 0.0 },
            end: LinePoint { x: 4.0, y: 0.0 },
        };
        let d = perpendicular_distance(LinePoint { x: 2.0, y: -3.0 }, &line).unwrap();
        assert!((d - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_line() {
        let line = ModDmaxLine {
            start: LinePoint { x: 3.0, y: 2.0 },
            end: LinePoint { x: 3.0, y: 2.0 },
        };
        assert!(perpendicular_distance(LinePoint { x: 1.0, y: 1.0 }, &line).is_none());
    }

    #[test]
    fn test_lt2_degenerate_geometry_error() {
        // Start and end of the reference line are the same measurement
        let pts = points(&[4.0, 4.0], &[4.0, 4.0]);
        let lactate = FittedCurve {
            axis: Axis::Lactate,
            order: 1,
            coefficients: vec![0.0, 1.0],
            r2: 1.0,
        };
        let hr = FittedCurve {
            axis: Axis::HeartRate,
            order: 1,
            coefficients: vec![120.0, 15.0],
            r2: 1.0,
        };
        let grid = SearchGrid::new(&pts, 1000).unwrap();
        let detector = ThresholdDetector::new(&pts, &lactate, &hr, grid);

        assert!(matches!(
            detector.lt2(0.4),
            Err(ComputeError::DegenerateGeometry(_))
        ));
    }
}
