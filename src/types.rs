//! Core types for the threshold pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: validated points, threshold points, fixed-lactate points,
//! efficiency points and the final result bundle.

use crate::curve::FittedCurve;
use crate::precision;
use crate::zones::TrainingZones;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Protocol a step test was run under.
///
/// The mode decides which raw column holds heart rate, speed and stroke rate.
/// It is fixed for a whole session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolMode {
    /// Steps are prescribed by heart rate
    #[default]
    #[serde(rename = "hr")]
    HeartRate,
    /// Steps are prescribed by boat speed
    #[serde(rename = "speed")]
    Speed,
    /// Steps are prescribed by stroke rate
    #[serde(rename = "sr")]
    StrokeRate,
}

impl ProtocolMode {
    pub const ALL: [ProtocolMode; 3] = [
        ProtocolMode::HeartRate,
        ProtocolMode::Speed,
        ProtocolMode::StrokeRate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolMode::HeartRate => "hr",
            ProtocolMode::Speed => "speed",
            ProtocolMode::StrokeRate => "sr",
        }
    }

    /// Human readable protocol label
    pub fn label(&self) -> &'static str {
        match self {
            ProtocolMode::HeartRate => "HR Based",
            ProtocolMode::Speed => "Speed Based",
            ProtocolMode::StrokeRate => "Stroke Rate Based",
        }
    }

    /// Which raw column carries each canonical measurement
    pub const fn column_map(self) -> ColumnMap {
        match self {
            ProtocolMode::HeartRate => ColumnMap {
                heart_rate: Column::Achieved,
                speed: Column::Secondary,
                stroke_rate: Column::StrokeRate,
            },
            ProtocolMode::Speed => ColumnMap {
                heart_rate: Column::Secondary,
                speed: Column::Achieved,
                stroke_rate: Column::StrokeRate,
            },
            ProtocolMode::StrokeRate => ColumnMap {
                heart_rate: Column::StrokeRate,
                speed: Column::Secondary,
                stroke_rate: Column::Achieved,
            },
        }
    }

    /// Column headers of the input table for this mode
    pub fn column_headers(&self) -> [&'static str; 6] {
        match self {
            ProtocolMode::HeartRate => [
                "Step",
                "HR Planned (BPM)",
                "HR Achieved (BPM)",
                "Speed (m/s)",
                "Lactate (mmol)",
                "Stroke Rate (spm)",
            ],
            ProtocolMode::Speed => [
                "Step",
                "Speed Planned (m/s)",
                "Speed Achieved (m/s)",
                "Heart Rate (BPM)",
                "Lactate (mmol)",
                "Stroke Rate (spm)",
            ],
            ProtocolMode::StrokeRate => [
                "Step",
                "SR Planned (spm)",
                "SR Achieved (spm)",
                "Speed (m/s)",
                "Lactate (mmol)",
                "Heart Rate (BPM)",
            ],
        }
    }
}

impl fmt::Display for ProtocolMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProtocolMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hr" | "heart_rate" | "heart-rate" => Ok(ProtocolMode::HeartRate),
            "speed" => Ok(ProtocolMode::Speed),
            "sr" | "stroke_rate" | "stroke-rate" => Ok(ProtocolMode::StrokeRate),
            other => Err(format!("unknown protocol mode: {other}")),
        }
    }
}

/// Raw table columns that carry a measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    /// The "achieved" column (third in the table)
    Achieved,
    /// The secondary measurement column (fourth)
    Secondary,
    /// The last column, nominally stroke rate
    StrokeRate,
}

/// Mapping from canonical measurements to raw columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub heart_rate: Column,
    pub speed: Column,
    pub stroke_rate: Column,
}

/// Canonical step measurement the engine computes on
///
/// Heart rate, speed and lactate are strictly positive. A stroke rate of zero
/// means the step carries no stroke data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidatedPoint {
    /// Heart rate (bpm)
    pub heart_rate: f64,
    /// Speed (m/s)
    pub speed: f64,
    /// Blood lactate (mmol/L)
    pub lactate: f64,
    /// Stroke rate (spm), 0 when absent
    pub stroke_rate: f64,
}

impl ValidatedPoint {
    pub fn has_stroke_rate(&self) -> bool {
        self.stroke_rate > 0.0
    }
}

/// Measurement fitted against speed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Lactate,
    HeartRate,
    StrokeRate,
}

impl Axis {
    /// Read this axis from a validated point
    pub fn value(&self, point: &ValidatedPoint) -> f64 {
        match self {
            Axis::Lactate => point.lactate,
            Axis::HeartRate => point.heart_rate,
            Axis::StrokeRate => point.stroke_rate,
        }
    }
}

/// One instant on the fitted curves
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdPoint {
    /// Speed (m/s)
    pub speed: f64,
    /// Lactate (mmol/L)
    pub lactate: f64,
    /// Heart rate read from the fitted heart-rate curve (bpm)
    pub heart_rate: f64,
}

impl ThresholdPoint {
    /// Round to display precision
    pub fn display(&self) -> DisplayThreshold {
        DisplayThreshold {
            speed: precision::speed(self.speed),
            lactate: precision::lactate(self.lactate),
            heart_rate: precision::heart_rate(self.heart_rate),
        }
    }
}

/// Threshold rounded for reports
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayThreshold {
    pub speed: f64,
    pub lactate: f64,
    pub heart_rate: i64,
}

/// Point in the speed-lactate plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinePoint {
    pub x: f64,
    pub y: f64,
}

/// Modified Dmax reference line
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModDmaxLine {
    pub start: LinePoint,
    pub end: LinePoint,
}

/// Both thresholds with the geometry used to find LT2
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub lt1: ThresholdPoint,
    pub lt2: ThresholdPoint,
    pub mod_dmax_line: ModDmaxLine,
}

/// Thresholds rounded for reports
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayThresholds {
    pub lt1: DisplayThreshold,
    pub lt2: DisplayThreshold,
}

impl From<&Thresholds> for DisplayThresholds {
    fn from(thresholds: &Thresholds) -> Self {
        Self {
            lt1: thresholds.lt1.display(),
            lt2: thresholds.lt2.display(),
        }
    }
}

/// Speed and heart rate at a fixed lactate concentration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixedLactatePoint {
    /// Target concentration (mmol/L)
    pub target_mmol: f64,
    /// Speed (m/s, 1 decimal)
    pub speed: f64,
    /// Heart rate (bpm)
    pub heart_rate: i64,
}

/// Per-step efficiency relative to the first step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyPoint {
    /// 1-based position in the validated set
    pub step: usize,
    /// speed^3 / strokes per second (3 decimals)
    pub efficiency: f64,
    /// Change from step 1 (%, 1 decimal)
    pub percent_change: f64,
}

/// Fitted regressions for every axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Regressions {
    pub lactate: FittedCurve,
    pub hr: FittedCurve,
    /// Straight-line heart-rate trend
    pub hr_linear: FittedCurve,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sr: Option<FittedCurve>,
}

/// Evenly spaced samples of each fitted curve for chart collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveSamples {
    pub lactate: Vec<LinePoint>,
    pub hr: Vec<LinePoint>,
    pub hr_linear: Vec<LinePoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sr: Option<Vec<LinePoint>>,
}

/// Everything one calculation pass produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultBundle {
    /// Protocol the input was read under
    pub mode: ProtocolMode,
    /// Validated points, ascending by speed
    pub parsed_data: Vec<ValidatedPoint>,
    pub regressions: Regressions,
    pub curves: CurveSamples,
    pub thresholds: Thresholds,
    pub display_thresholds: DisplayThresholds,
    pub fixed_lactate_points: Vec<FixedLactatePoint>,
    /// Present only when every step carries a stroke rate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub efficiency_data: Option<Vec<EfficiencyPoint>>,
    pub training_zones: TrainingZones,
}
