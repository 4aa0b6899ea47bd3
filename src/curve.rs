//! Curve fitting
//!
//! Least-squares polynomial regression of a measurement against speed. Step
//! tests produce sigmoid-like lactate curves, and a cubic captures the
//! inflection without overfitting five to ten points.

use crate::error::ComputeError;
use crate::precision::round_to;
use crate::types::{Axis, LinePoint, ValidatedPoint};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use tracing::debug;

/// An immutable fitted polynomial `speed -> value`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedCurve {
    /// Measurement on the y axis
    pub axis: Axis,
    /// Polynomial degree
    pub order: usize,
    /// Coefficients in ascending power: `c0 + c1*x + c2*x^2 + ...`
    pub coefficients: Vec<f64>,
    /// Coefficient of determination
    pub r2: f64,
}

impl FittedCurve {
    /// Evaluate the polynomial at any speed (extrapolation included)
    pub fn predict(&self, speed: f64) -> f64 {
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, c| acc * speed + c)
    }

    /// `n` evenly spaced samples over `[from, to]`, endpoints included
    pub fn sample(&self, from: f64, to: f64, n: usize) -> Vec<LinePoint> {
        match n {
            0 => Vec::new(),
            1 => vec![LinePoint {
                x: from,
                y: self.predict(from),
            }],
            _ => {
                let step = (to - from) / (n - 1) as f64;
                (0..n)
                    .map(|i| {
                        let x = from + step * i as f64;
                        LinePoint {
                            x,
                            y: self.predict(x),
                        }
                    })
                    .collect()
            }
        }
    }

    /// Readable form of the polynomial, highest power first
    pub fn equation(&self) -> String {
        let mut out = String::from("y =");
        for (power, c) in self.coefficients.iter().enumerate().rev() {
            let sign = if *c < 0.0 { '-' } else { '+' };
            let first = power + 1 == self.coefficients.len();
            if first {
                let _ = write!(out, " {}{}", if *c < 0.0 { "-" } else { "" }, c.abs());
            } else {
                let _ = write!(out, " {} {}", sign, c.abs());
            }
            match power {
                0 => {}
                1 => out.push('x'),
                p => {
                    let _ = write!(out, "x^{p}");
                }
            }
        }
        out
    }
}

/// Curve fitter for validated points
pub struct CurveFitter;

impl CurveFitter {
    /// Fit a polynomial of `order` to `(speed, axis value)` pairs.
    ///
    /// When `precision` is set the coefficients are rounded to that many
    /// decimals before `predict` and `r2` use them.
    pub fn fit(
        points: &[ValidatedPoint],
        axis: Axis,
        order: usize,
        precision: Option<u32>,
    ) -> Result<FittedCurve, ComputeError> {
        let pairs: Vec<(f64, f64)> = points.iter().map(|p| (p.speed, axis.value(p))).collect();
        let mut coefficients = polyfit(&pairs, order)?;

        if let Some(decimals) = precision {
            for c in coefficients.iter_mut() {
                *c = round_to(*c, decimals);
            }
        }

        let mut curve = FittedCurve {
            axis,
            order,
            coefficients,
            r2: 0.0,
        };
        curve.r2 = determination(&pairs, &curve);

        debug!(axis = ?axis, order, r2 = curve.r2, "fitted curve");

        Ok(curve)
    }
}

/// Solve the least-squares normal equations for a polynomial of `order`.
///
/// Speeds are centred and scaled to `u = (x - mean) / range` before the system
/// is built, then the solution is expanded back to powers of `x`.
fn polyfit(pairs: &[(f64, f64)], order: usize) -> Result<Vec<f64>, ComputeError> {
    let size = order + 1;
    if pairs.len() < size {
        return Err(ComputeError::FitFailed(format!(
            "need at least {} points for an order {} polynomial, got {}",
            size,
            order,
            pairs.len()
        )));
    }

    let distinct = distinct_speeds(pairs);
    if distinct < size {
        return Err(ComputeError::FitFailed(format!(
            "singular system: {} distinct speeds for an order {} polynomial",
            distinct, order
        )));
    }

    let n = pairs.len() as f64;
    let mean = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let (lo, hi) = pairs
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (x, _)| {
            (lo.min(*x), hi.max(*x))
        });
    let range = if hi > lo { hi - lo } else { 1.0 };

    // Power sums: sum of u^k for k in 0..=2*order
    let mut power_sums = vec![0.0; 2 * order + 1];
    let mut rhs = vec![0.0; size];
    for &(x, y) in pairs {
        let u = (x - mean) / range;
        let mut up = 1.0;
        for (k, sum) in power_sums.iter_mut().enumerate() {
            *sum += up;
            if k < size {
                rhs[k] += up * y;
            }
            up *= u;
        }
    }

    // Augmented matrix [A | b]
    let mut matrix: Vec<Vec<f64>> = (0..size)
        .map(|row| {
            let mut r: Vec<f64> = (0..size).map(|col| power_sums[row + col]).collect();
            r.push(rhs[row]);
            r
        })
        .collect();

    for col in 0..size {
        let pivot_row = (col..size)
            .max_by(|&a, &b| matrix[a][col].abs().total_cmp(&matrix[b][col].abs()))
            .unwrap_or(col);

        if matrix[pivot_row][col] == 0.0 {
            return Err(ComputeError::FitFailed(
                "singular system: zero pivot in the normal equations".to_string(),
            ));
        }
        matrix.swap(col, pivot_row);

        for row in (col + 1)..size {
            let factor = matrix[row][col] / matrix[col][col];
            for k in col..=size {
                matrix[row][k] -= factor * matrix[col][k];
            }
        }
    }

    // Back substitution
    let mut scaled = vec![0.0; size];
    for row in (0..size).rev() {
        let tail: f64 = ((row + 1)..size)
            .map(|k| matrix[row][k] * scaled[k])
            .sum();
        scaled[row] = (matrix[row][size] - tail) / matrix[row][row];
    }

    let coefficients = expand_scaled(&scaled, mean, range);

    if coefficients.iter().any(|c| !c.is_finite()) {
        return Err(ComputeError::FitFailed(
            "regression produced non-finite coefficients".to_string(),
        ));
    }

    Ok(coefficients)
}

fn distinct_speeds(pairs: &[(f64, f64)]) -> usize {
    let mut speeds: Vec<f64> = pairs.iter().map(|(x, _)| *x).collect();
    speeds.sort_by(f64::total_cmp);
    speeds.dedup();
    speeds.len()
}

/// Rewrite `sum b_k * ((x - mean) / range)^k` as `sum a_j * x^j`
fn expand_scaled(scaled: &[f64], mean: f64, range: f64) -> Vec<f64> {
    let mut coefficients = vec![0.0; scaled.len()];
    for (k, b) in scaled.iter().enumerate() {
        let lead = b / range.powi(k as i32);
        // (x - mean)^k = sum_j C(k, j) x^j (-mean)^(k - j)
        let mut binomial = 1.0;
        for (j, a) in coefficients.iter_mut().enumerate().take(k + 1) {
            *a += lead * binomial * (-mean).powi((k - j) as i32);
            binomial = binomial * (k - j) as f64 / (j + 1) as f64;
        }
    }
    coefficients
}

/// R² = 1 - SSres / SStot
fn determination(pairs: &[(f64, f64)], curve: &FittedCurve) -> f64 {
    let n = pairs.len() as f64;
    let mean = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;
    let ss_tot: f64 = pairs.iter().map(|(_, y)| (y - mean).powi(2)).sum();
    let ss_res: f64 = pairs
        .iter()
        .map(|(x, y)| (y - curve.predict(*x)).powi(2))
        .sum();

    if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points_from(speeds: &[f64], values: &[f64]) -> Vec<ValidatedPoint> {
        speeds
            .iter()
            .zip(values)
            .map(|(&speed, &lactate)| ValidatedPoint {
                heart_rate: 100.0 + speed * 10.0,
                speed,
                lactate,
                stroke_rate: 0.0,
            })
            .collect()
    }

    #[test]
    fn test_recovers_exact_cubic() {
        // y = 0.5 - 0.2x + 0.1x^2 + 0.05x^3
        let speeds = [1.0, 1.5, 2.0, 2.5, 3.0, 3.5];
        let values: Vec<f64> = speeds
            .iter()
            .map(|x| 0.5 - 0.2 * x + 0.1 * x * x + 0.05 * x * x * x)
            .collect();
        let curve =
            CurveFitter::fit(&points_from(&speeds, &values), Axis::Lactate, 3, None).unwrap();

        let expected = [0.5, -0.2, 0.1, 0.05];
        for (c, e) in curve.coefficients.iter().zip(expected) {
            assert!((c - e).abs() < 1e-6, "coefficient {c} != {e}");
        }
        assert!((curve.r2 - 1.0).abs() < 1e-9);
        assert!((curve.predict(2.2) - (0.5 - 0.44 + 0.484 + 0.5324)).abs() < 1e-6);
    }

    #[test]
    fn test_linear_fit() {
        let speeds = [2.0, 2.5, 3.0, 3.5, 4.0];
        let values = [130.0, 140.0, 150.0, 160.0, 170.0];
        let curve =
            CurveFitter::fit(&points_from(&speeds, &values), Axis::Lactate, 1, None).unwrap();

        assert!((curve.coefficients[0] - 90.0).abs() < 1e-9);
        assert!((curve.coefficients[1] - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_noisy_fit_quality() {
        let speeds = [2.0, 2.5, 3.0, 3.5, 4.0, 4.5];
        let values = [1.1, 1.0, 1.4, 2.1, 3.9, 7.2];
        let curve =
            CurveFitter::fit(&points_from(&speeds, &values), Axis::Lactate, 3, None).unwrap();

        assert!(curve.r2 > 0.95 && curve.r2 <= 1.0);
    }

    #[test]
    fn test_singular_system_is_an_error() {
        let speeds = [3.0, 3.0, 3.5, 3.5, 4.0];
        let values = [1.0, 1.1, 1.5, 1.6, 3.0];
        let result = CurveFitter::fit(&points_from(&speeds, &values), Axis::Lactate, 3, None);

        assert!(matches!(result, Err(ComputeError::FitFailed(_))));
    }

    #[test]
    fn test_tightly_grouped_speeds() {
        let values = [1.1, 1.3, 1.8, 2.9, 5.0];
        for speeds in [
            [4.0, 4.1, 4.2, 4.3, 4.4],
            [4.0, 4.05, 4.1, 4.15, 4.2],
            [12.0, 12.5, 13.0, 13.5, 14.0],
        ] {
            let curve =
                CurveFitter::fit(&points_from(&speeds, &values), Axis::Lactate, 3, None).unwrap();

            assert!(curve.r2 > 0.99, "r2 {} for {:?}", curve.r2, speeds);
            for (x, y) in speeds.iter().zip(values) {
                assert!((curve.predict(*x) - y).abs() < 0.2);
            }
        }
    }

    #[test]
    fn test_expand_scaled() {
        // 2 + 3u + u^2 with u = (x - 4) / 0.5 is 42 - 26x + 4x^2
        let coefficients = expand_scaled(&[2.0, 3.0, 1.0], 4.0, 0.5);
        let expected = [42.0, -26.0, 4.0];
        for (c, e) in coefficients.iter().zip(expected) {
            assert!((c - e).abs() < 1e-9, "coefficient {c} != {e}");
        }
    }

    #[test]
    fn test_singular_system_counts_distinct_speeds() {
        let pairs = [(3.0, 1.0), (3.0, 1.1), (3.5, 1.5), (3.5, 1.6), (4.0, 3.0)];
        assert_eq!(distinct_speeds(&pairs), 3);
        assert!(polyfit(&pairs, 2).is_ok());
        assert!(matches!(polyfit(&pairs, 3), Err(ComputeError::FitFailed(_))));
    }

    #[test]
    fn test_too_few_points() {
        let result = CurveFitter::fit(
            &points_from(&[2.0, 3.0], &[1.0, 2.0]),
            Axis::Lactate,
            3,
            None,
        );
        assert!(matches!(result, Err(ComputeError::FitFailed(_))));
    }

    #[test]
    fn test_coefficient_precision() {
        let speeds = [2.0, 2.5, 3.0, 3.5, 4.0];
        let values = [1.0, 1.2, 1.5, 2.2, 4.0];
        let curve =
            CurveFitter::fit(&points_from(&speeds, &values), Axis::Lactate, 3, Some(2)).unwrap();

        for c in &curve.coefficients {
            assert!((c * 100.0 - (c * 100.0).round()).abs() < 1e-9);
        }
    }

    #[test]
    fn test_sample_endpoints() {
        let curve = FittedCurve {
            axis: Axis::HeartRate,
            order: 1,
            coefficients: vec![100.0, 10.0],
            r2: 1.0,
        };
        let samples = curve.sample(2.0, 4.0, 101);

        assert_eq!(samples.len(), 101);
        assert_eq!(samples[0].x, 2.0);
        assert!((samples[100].x - 4.0).abs() < 1e-12);
        assert!((samples[50].y - 130.0).abs() < 1e-9);
    }

    #[test]
    fn test_equation() {
        let curve = FittedCurve {
            axis: Axis::Lactate,
            order: 2,
            coefficients: vec![1.5, -0.25, 2.0],
            r2: 1.0,
        };
        assert_eq!(curve.equation(), "y = 2x^2 - 0.25x + 1.5");
    }
}
