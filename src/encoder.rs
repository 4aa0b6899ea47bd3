//! Report encoding
//!
//! This module wraps a result bundle into a versioned JSON report with
//! producer, provenance and quality metadata. The bundle itself stays
//! clock-free; only the envelope records when it was computed.

use crate::error::ComputeError;
use crate::schema::SessionDetails;
use crate::types::ResultBundle;
use crate::{ENGINE_VERSION, PRODUCER_NAME};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current report schema version
pub const REPORT_VERSION: &str = "1.0.0";

/// R² below which a fitted curve is flagged as a poor fit
pub const POOR_FIT_R2: f64 = 0.9;

/// Producer metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Where a report came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProvenance {
    pub protocol_mode: String,
    pub computed_at_utc: String,
    /// Rows in the submitted table
    pub input_rows: usize,
    /// Rows that became validated points
    pub validated_points: usize,
}

/// Quality observations about a calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityFlag {
    /// Some table rows were not usable
    RowsRejected,
    /// At least one step has no stroke rate, so efficiency was skipped
    NoStrokeRate,
    /// The lactate curve explains the data poorly
    PoorLactateFit,
    /// The heart-rate curve explains the data poorly
    PoorHeartRateFit,
}

/// Report quality section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportQuality {
    pub lactate_r2: f64,
    pub heart_rate_r2: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke_rate_r2: Option<f64>,
    pub flags: Vec<QualityFlag>,
}

/// Complete report handed to presentation collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub provenance: ReportProvenance,
    pub quality: ReportQuality,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionDetails>,
    pub result: ResultBundle,
}

/// Report encoder
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    /// Wrap a bundle into a report
    pub fn encode(
        &self,
        bundle: &ResultBundle,
        session: Option<&SessionDetails>,
        input_rows: usize,
    ) -> ThresholdReport {
        let producer = ReportProducer {
            name: PRODUCER_NAME.to_string(),
            version: ENGINE_VERSION.to_string(),
            instance_id: self.instance_id.clone(),
        };

        let provenance = ReportProvenance {
            protocol_mode: bundle.mode.as_str().to_string(),
            computed_at_utc: Utc::now().to_rfc3339(),
            input_rows,
            validated_points: bundle.parsed_data.len(),
        };

        ThresholdReport {
            report_version: REPORT_VERSION.to_string(),
            producer,
            provenance,
            quality: self.build_quality(bundle, input_rows),
            session: session.cloned(),
            result: bundle.clone(),
        }
    }

    /// Encode to JSON string
    pub fn encode_to_json(
        &self,
        bundle: &ResultBundle,
        session: Option<&SessionDetails>,
        input_rows: usize,
    ) -> Result<String, ComputeError> {
        let report = self.encode(bundle, session, input_rows);
        serde_json::to_string(&report).map_err(|e| ComputeError::EncodingError(e.to_string()))
    }

    fn build_quality(&self, bundle: &ResultBundle, input_rows: usize) -> ReportQuality {
        let regressions = &bundle.regressions;
        let mut flags = Vec::new();

        if input_rows > bundle.parsed_data.len() {
            flags.push(QualityFlag::RowsRejected);
        }
        if bundle.efficiency_data.is_none() {
            flags.push(QualityFlag::NoStrokeRate);
        }
        if regressions.lactate.r2 < POOR_FIT_R2 {
            flags.push(QualityFlag::PoorLactateFit);
        }
        if regressions.hr.r2 < POOR_FIT_R2 {
            flags.push(QualityFlag::PoorHeartRateFit);
        }

        ReportQuality {
            lactate_r2: regressions.lactate.r2,
            heart_rate_r2: regressions.hr.r2,
            stroke_rate_r2: regressions.sr.as_ref().map(|c| c.r2),
            flags,
        }
    }
}
