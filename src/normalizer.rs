//! Step normalization
//!
//! This module maps raw table rows into canonical validated points.
//! - Columns are relabeled through the protocol mode's fixed column map
//! - Rows without a positive heart rate, speed and lactate are dropped
//! - Output is stably sorted by speed

use crate::schema::RawStep;
use crate::types::{ProtocolMode, ValidatedPoint};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Row counts from a normalization pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizationSummary {
    /// Rows in the input table
    pub total_rows: usize,
    /// Rows that became validated points
    pub retained_rows: usize,
    /// Whether every retained point carries a stroke rate
    pub has_stroke_rate: bool,
}

impl NormalizationSummary {
    pub fn rejected_rows(&self) -> usize {
        self.total_rows - self.retained_rows
    }
}

/// Normalizer for converting raw rows to validated points
pub struct Normalizer;

impl Normalizer {
    /// Relabel, filter and sort raw rows for the given protocol mode
    pub fn normalize(rows: &[RawStep], mode: ProtocolMode) -> Vec<ValidatedPoint> {
        let map = mode.column_map();

        let mut points: Vec<ValidatedPoint> = rows
            .iter()
            .filter_map(|row| {
                let heart_rate = positive(row.column(map.heart_rate))?;
                let speed = positive(row.column(map.speed))?;
                let lactate = positive(row.lactate)?;
                let stroke_rate = positive(row.column(map.stroke_rate)).unwrap_or(0.0);
                Some(ValidatedPoint {
                    heart_rate,
                    speed,
                    lactate,
                    stroke_rate,
                })
            })
            .collect();

        // sort_by is stable, so equal speeds keep their table order
        points.sort_by(|a, b| a.speed.total_cmp(&b.speed));

        debug!(
            mode = mode.as_str(),
            total = rows.len(),
            retained = points.len(),
            "normalized step table"
        );

        points
    }

    /// Normalize and report how many rows survived
    pub fn normalize_with_summary(
        rows: &[RawStep],
        mode: ProtocolMode,
    ) -> (Vec<ValidatedPoint>, NormalizationSummary) {
        let points = Self::normalize(rows, mode);
        let summary = NormalizationSummary {
            total_rows: rows.len(),
            retained_rows: points.len(),
            has_stroke_rate: has_stroke_rate(&points),
        };
        (points, summary)
    }
}

/// True when the set is non-empty and every point carries a stroke rate
pub fn has_stroke_rate(points: &[ValidatedPoint]) -> bool {
    !points.is_empty() && points.iter().all(ValidatedPoint::has_stroke_rate)
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}
