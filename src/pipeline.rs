//! Pipeline orchestration
//!
//! This module provides the public API of the engine. It runs the full
//! calculation from raw step rows to a result bundle, and wraps bundles into
//! JSON reports.

use crate::config::EngineConfig;
use crate::curve::{CurveFitter, FittedCurve};
use crate::efficiency::EfficiencyScorer;
use crate::encoder::ReportEncoder;
use crate::error::ComputeError;
use crate::fixed_points::FixedPointInterpolator;
use crate::normalizer::{has_stroke_rate, Normalizer};
use crate::schema::{RawStep, StepTableAdapter, StepTest};
use crate::search::SearchGrid;
use crate::thresholds::ThresholdDetector;
use crate::types::{
    Axis, CurveSamples, DisplayThresholds, ProtocolMode, Regressions, ResultBundle,
    ValidatedPoint,
};
use crate::zones::{ZoneDeriver, ZoneInputs};
use tracing::{debug, warn};

/// Run the whole calculation with the default configuration.
///
/// # Example
/// ```ignore
/// let bundle = calculate(&rows, ProtocolMode::HeartRate)?;
/// println!("LT2 at {} m/s", bundle.display_thresholds.lt2.speed);
/// ```
pub fn calculate(rows: &[RawStep], mode: ProtocolMode) -> Result<ResultBundle, ComputeError> {
    calculate_with_config(rows, mode, &EngineConfig::default())
}

/// Run the whole calculation.
///
/// Pipeline stages:
/// 1. Normalizer - relabel, filter and sort rows
/// 2. CurveFitter - lactate, heart-rate (cubic and linear) and stroke-rate curves
/// 3. ThresholdDetector - LT1 and Modified Dmax LT2
/// 4. FixedPointInterpolator - 2, 4 and 6 mmol/L
/// 5. EfficiencyScorer - only with stroke-rate data
/// 6. ZoneDeriver - T1-T8
pub fn calculate_with_config(
    rows: &[RawStep],
    mode: ProtocolMode,
    config: &EngineConfig,
) -> Result<ResultBundle, ComputeError> {
    config.validate()?;

    // Stage 1: Normalize rows
    let points = Normalizer::normalize(rows, mode);
    if points.len() < config.min_points {
        warn!(
            found = points.len(),
            required = config.min_points,
            "refusing calculation"
        );
        return Err(ComputeError::InsufficientData {
            found: points.len(),
            required: config.min_points,
        });
    }

    // Stage 2: Fit curves
    let regressions = fit_regressions(&points, config)?;
    let grid = SearchGrid::new(&points, config.search_steps)?;

    // Stage 3: Thresholds
    let thresholds = ThresholdDetector::new(&points, &regressions.lactate, &regressions.hr, grid)
        .detect(config.lt1_offset_mmol, config.dmax_rise_mmol)?;

    // Stage 4: Fixed lactate points
    let fixed_lactate_points = FixedPointInterpolator::interpolate(
        &config.fixed_lactate_targets,
        &regressions.lactate,
        &regressions.hr,
        &grid,
    )?;

    // Stage 5: Efficiency
    let efficiency_data = EfficiencyScorer::score(&points);

    // Stage 6: Zones
    let zone_inputs = ZoneInputs::from_thresholds(&points, &thresholds).ok_or(
        ComputeError::InsufficientData {
            found: 0,
            required: config.min_points,
        },
    )?;
    let training_zones = ZoneDeriver::derive(zone_inputs);

    let curves = sample_curves(&regressions, &grid, config.curve_samples);

    debug!(
        points = points.len(),
        lt1_speed = thresholds.lt1.speed,
        lt2_speed = thresholds.lt2.speed,
        "calculation complete"
    );

    Ok(ResultBundle {
        mode,
        parsed_data: points,
        regressions,
        curves,
        display_thresholds: DisplayThresholds::from(&thresholds),
        thresholds,
        fixed_lactate_points,
        efficiency_data,
        training_zones,
    })
}

/// Parse a session document and calculate its bundle
pub fn calculate_document(json: &str) -> Result<(StepTest, ResultBundle), ComputeError> {
    let document = StepTableAdapter::parse_json(json)?;
    let bundle = calculate(&document.steps, document.mode)?;
    Ok((document, bundle))
}

fn fit_regressions(
    points: &[ValidatedPoint],
    config: &EngineConfig,
) -> Result<Regressions, ComputeError> {
    let order = config.polynomial_order;
    let precision = config.coefficient_precision;

    let lactate = CurveFitter::fit(points, Axis::Lactate, order, precision)?;
    let hr = CurveFitter::fit(points, Axis::HeartRate, order, precision)?;
    let hr_linear = CurveFitter::fit(points, Axis::HeartRate, 1, precision)?;
    let sr = if has_stroke_rate(points) {
        Some(CurveFitter::fit(points, Axis::StrokeRate, order, precision)?)
    } else {
        None
    };

    Ok(Regressions {
        lactate,
        hr,
        hr_linear,
        sr,
    })
}

fn sample_curves(regressions: &Regressions, grid: &SearchGrid, n: usize) -> CurveSamples {
    let sample = |curve: &FittedCurve| curve.sample(grid.min_speed, grid.max_speed, n);
    CurveSamples {
        lactate: sample(&regressions.lactate),
        hr: sample(&regressions.hr),
        hr_linear: sample(&regressions.hr_linear),
        sr: regressions.sr.as_ref().map(sample),
    }
}

/// Processor holding a configuration and report encoder.
///
/// Carries no per-session state: every call is independent.
pub struct ThresholdEngine {
    config: EngineConfig,
    encoder: ReportEncoder,
}

impl Default for ThresholdEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ThresholdEngine {
    /// Create an engine with the default configuration
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            encoder: ReportEncoder::new(),
        }
    }

    /// Create an engine with a validated configuration
    pub fn with_config(config: EngineConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self {
            config,
            encoder: ReportEncoder::new(),
        })
    }

    /// Load configuration from JSON
    pub fn load_config(&mut self, json: &str) -> Result<(), ComputeError> {
        self.config = EngineConfig::from_json(json)?;
        Ok(())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Calculate a bundle for raw rows
    pub fn calculate(
        &self,
        rows: &[RawStep],
        mode: ProtocolMode,
    ) -> Result<ResultBundle, ComputeError> {
        calculate_with_config(rows, mode, &self.config)
    }

    /// Calculate a session document and encode the report as JSON
    pub fn process_document(&self, document: &StepTest) -> Result<String, ComputeError> {
        let bundle = self.calculate(&document.steps, document.mode)?;
        self.encoder
            .encode_to_json(&bundle, document.session.as_ref(), document.steps.len())
    }

    /// Parse, calculate and encode in one call
    pub fn process_json(&self, json: &str) -> Result<String, ComputeError> {
        let document = StepTableAdapter::parse_json(json)?;
        self.process_document(&document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scenario_rows() -> Vec<RawStep> {
        let speeds = [2.0, 2.5, 3.0, 3.5, 4.0];
        let lactates = [1.0, 1.2, 1.5, 2.2, 4.0];
        let hrs = [128.0, 141.0, 153.0, 166.0, 178.0];
        let srs = [52.0, 56.0, 61.0, 66.0, 74.0];
        (0..5)
            .map(|i| RawStep::new(i as u32 + 1, hrs[i], speeds[i], lactates[i], Some(srs[i])))
            .collect()
    }

    fn sample_document() -> &'static str {
        r#"{
            "mode": "hr",
            "session": {
                "athleteName": "Test Athlete",
                "testDate": "2024-03-10",
                "boatClass": "K1 Women",
                "protocol": "7x4min",
                "comments": ""
            },
            "steps": [
                {"step": 1, "hrPlanned": 130, "hrAchieved": 131, "speed": 2.9, "lactate": 1.3, "strokeRate": 60},
                {"step": 2, "hrPlanned": 140, "hrAchieved": 141, "speed": 3.2, "lactate": 1.1, "strokeRate": 64},
                {"step": 3, "hrPlanned": 150, "hrAchieved": 150, "speed": 3.45, "lactate": 1.4, "strokeRate": 68},
                {"step": 4, "hrPlanned": 160, "hrAchieved": 161, "speed": 3.7, "lactate": 2.0, "strokeRate": 72},
                {"step": 5, "hrPlanned": 170, "hrAchieved": 169, "speed": 3.95, "lactate": 3.2, "strokeRate": 78},
                {"step": 6, "hrPlanned": 175, "hrAchieved": 176, "speed": 4.15, "lactate": 5.1, "strokeRate": 84},
                {"step": 7, "hrPlanned": "Max", "hrAchieved": 183, "speed": 4.35, "lactate": 8.6, "strokeRate": 92}
            ]
        }"#
    }

    #[test]
    fn test_scenario_a() {
        let bundle = calculate(&scenario_rows(), ProtocolMode::HeartRate).unwrap();
        let line = bundle.thresholds.mod_dmax_line;

        assert_eq!(line.start.x, 3.0);
        assert_eq!(line.start.y, 1.5);
        assert!(bundle.thresholds.lt2.speed >= 3.0 && bundle.thresholds.lt2.speed <= 4.0);
        assert!(bundle.thresholds.lt1.speed >= 2.0 && bundle.thresholds.lt1.speed <= 4.0);
    }

    #[test]
    fn test_scenario_b_no_stroke_rate() {
        let rows: Vec<RawStep> = scenario_rows()
            .into_iter()
            .map(|r| RawStep {
                stroke_rate: Some(0.0),
                ..r
            })
            .collect();
        let bundle = calculate(&rows, ProtocolMode::HeartRate).unwrap();

        assert!(bundle.efficiency_data.is_none());
        assert!(bundle.regressions.sr.is_none());
        assert!(bundle.curves.sr.is_none());

        let json = serde_json::to_value(&bundle).unwrap();
        assert!(json.get("efficiency_data").is_none());
        assert!(json["regressions"].get("sr").is_none());
    }

    #[test]
    fn test_scenario_c_insufficient_data() {
        let mut rows: Vec<RawStep> = scenario_rows().into_iter().take(3).collect();
        rows.push(RawStep::new(4, 166.0, 3.5, 0.0, None));
        rows.push(RawStep::new(5, 178.0, 4.0, 0.0, None));

        let result = calculate(&rows, ProtocolMode::HeartRate);
        assert!(matches!(
            result,
            Err(ComputeError::InsufficientData {
                found: 3,
                required: 5
            })
        ));
    }

    #[test]
    fn test_scenario_d_uniform_lactate() {
        let lactates = [1.0, 1.3, 1.6, 1.9, 2.2];
        let rows: Vec<RawStep> = scenario_rows()
            .into_iter()
            .zip(lactates)
            .map(|(r, l)| RawStep {
                lactate: Some(l),
                ..r
            })
            .collect();
        let bundle = calculate(&rows, ProtocolMode::HeartRate).unwrap();

        assert_eq!(bundle.thresholds.mod_dmax_line.start.x, 2.0);
        assert_eq!(bundle.thresholds.mod_dmax_line.start.y, 1.0);
    }

    #[test]
    fn test_narrow_speed_range() {
        let lactates = [1.1, 1.3, 1.8, 2.9, 5.0];
        let hrs = [150.0, 158.0, 165.0, 172.0, 178.0];
        for speeds in [[4.0, 4.1, 4.2, 4.3, 4.4], [4.0, 4.05, 4.1, 4.15, 4.2]] {
            let rows: Vec<RawStep> = (0..5)
                .map(|i| RawStep::new(i as u32 + 1, hrs[i], speeds[i], lactates[i], None))
                .collect();
            let bundle = calculate(&rows, ProtocolMode::HeartRate).unwrap();
            let thresholds = bundle.thresholds;

            assert!(thresholds.lt1.speed >= speeds[0] && thresholds.lt1.speed <= speeds[4]);
            assert_eq!(thresholds.mod_dmax_line.start.x, speeds[1]);
            assert!(
                thresholds.lt2.speed >= speeds[1] && thresholds.lt2.speed <= speeds[4],
                "LT2 {} outside [{}, {}]",
                thresholds.lt2.speed,
                speeds[1],
                speeds[4]
            );
        }
    }

    #[test]
    fn test_idempotent() {
        let rows = scenario_rows();
        let first = calculate(&rows, ProtocolMode::HeartRate).unwrap();
        let second = calculate(&rows, ProtocolMode::HeartRate).unwrap();

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_efficiency_present_with_stroke_rate() {
        let bundle = calculate(&scenario_rows(), ProtocolMode::HeartRate).unwrap();
        let efficiency = bundle.efficiency_data.unwrap();

        assert_eq!(efficiency.len(), 5);
        assert_eq!(efficiency[0].percent_change, 0.0);
        assert!(bundle.regressions.sr.is_some());
    }

    #[test]
    fn test_bundle_shape() {
        let bundle = calculate(&scenario_rows(), ProtocolMode::HeartRate).unwrap();

        assert_eq!(bundle.training_zones.zones.len(), 8);
        assert_eq!(bundle.fixed_lactate_points.len(), 3);
        assert_eq!(bundle.curves.lactate.len(), 101);
        assert_eq!(bundle.regressions.lactate.order, 3);
        assert_eq!(bundle.regressions.hr_linear.order, 1);
        assert_eq!(bundle.training_zones.inputs.max_speed, 4.0);
        assert_eq!(bundle.training_zones.inputs.max_hr, 178.0);
        assert_eq!(
            bundle.display_thresholds.lt1,
            bundle.thresholds.lt1.display()
        );
    }

    #[test]
    fn test_calculate_document() {
        let (document, bundle) = calculate_document(sample_document()).unwrap();

        assert_eq!(document.steps.len(), 7);
        assert_eq!(bundle.parsed_data.len(), 7);
        assert!(bundle.thresholds.lt1.speed < bundle.thresholds.lt2.speed);
        // Minimum lactate is step 2 (1.1 mmol/L), so LT1 targets 1.5
        assert_eq!(bundle.display_thresholds.lt1.lactate, 1.5);
    }

    #[test]
    fn test_engine_process_json() {
        let engine = ThresholdEngine::new();
        let report = engine.process_json(sample_document()).unwrap();
        let payload: serde_json::Value = serde_json::from_str(&report).unwrap();

        assert_eq!(payload["report_version"], "1.0.0");
        assert_eq!(payload["provenance"]["protocol_mode"], "hr");
        assert_eq!(payload["provenance"]["input_rows"], 7);
        assert_eq!(payload["session"]["athlete_name"], "Test Athlete");
        assert_eq!(payload["result"]["training_zones"]["zones"][0]["label"], "T1");
    }

    #[test]
    fn test_engine_with_custom_config() {
        let mut engine = ThresholdEngine::new();
        engine
            .load_config(r#"{"fixed_lactate_targets": [3.0], "curve_samples": 11}"#)
            .unwrap();
        let bundle = engine
            .calculate(&scenario_rows(), ProtocolMode::HeartRate)
            .unwrap();

        assert_eq!(bundle.fixed_lactate_points.len(), 1);
        assert_eq!(bundle.fixed_lactate_points[0].target_mmol, 3.0);
        assert_eq!(bundle.curves.hr.len(), 11);
    }

    #[test]
    fn test_invalid_json() {
        let engine = ThresholdEngine::new();
        assert!(engine.process_json("not valid json").is_err());
    }
}
