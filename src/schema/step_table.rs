//! Step-test input schema
//!
//! A step test arrives as an ordered table of rows plus a protocol mode and,
//! optionally, the session details an operator filled in. Cells are parsed
//! leniently: the engine decides later which rows are usable.

use crate::types::{Column, ProtocolMode};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Current input schema version
pub const SCHEMA_VERSION: &str = "lactate.step_test.v1";

/// Placeholder written in the planned column of the final, max-effort step
pub const MAX_EFFORT_SENTINEL: &str = "Max";

/// One test step as entered by the operator.
///
/// Column meaning depends on the [`ProtocolMode`]: in heart-rate mode
/// `achieved` is heart rate and `secondary` is speed, in speed mode the two are
/// swapped, and in stroke-rate mode `achieved` is stroke rate while the
/// `stroke_rate` column holds heart rate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawStep {
    /// Step number as shown in the table
    #[serde(default)]
    pub step: u32,
    /// Planned intensity (ignored by the engine)
    #[serde(default, alias = "hrPlanned", deserialize_with = "numeric_cell")]
    pub planned: Option<f64>,
    /// Achieved primary value
    #[serde(default, alias = "hrAchieved", deserialize_with = "numeric_cell")]
    pub achieved: Option<f64>,
    /// Secondary measurement
    #[serde(default, alias = "speed", deserialize_with = "numeric_cell")]
    pub secondary: Option<f64>,
    /// Blood lactate (mmol/L)
    #[serde(default, deserialize_with = "numeric_cell")]
    pub lactate: Option<f64>,
    /// Last column, nominally stroke rate
    #[serde(default, alias = "strokeRate", deserialize_with = "numeric_cell")]
    pub stroke_rate: Option<f64>,
    /// Step duration (ignored by the engine)
    #[serde(default, deserialize_with = "numeric_cell")]
    pub time: Option<f64>,
}

impl RawStep {
    /// Build a fully populated row
    pub fn new(
        step: u32,
        achieved: f64,
        secondary: f64,
        lactate: f64,
        stroke_rate: Option<f64>,
    ) -> Self {
        Self {
            step,
            planned: None,
            achieved: Some(achieved),
            secondary: Some(secondary),
            lactate: Some(lactate),
            stroke_rate,
            time: None,
        }
    }

    /// Value held in a measurement column
    pub fn column(&self, column: Column) -> Option<f64> {
        match column {
            Column::Achieved => self.achieved,
            Column::Secondary => self.secondary,
            Column::StrokeRate => self.stroke_rate,
        }
    }
}

/// Boat classes offered on the session form
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoatClass {
    #[default]
    #[serde(rename = "K1 Men")]
    K1Men,
    #[serde(rename = "K1 Women")]
    K1Women,
    #[serde(rename = "C1 Men")]
    C1Men,
    #[serde(rename = "C1 Women")]
    C1Women,
    #[serde(rename = "Kayak Cross Men")]
    KayakCrossMen,
    #[serde(rename = "Kayak Cross Women")]
    KayakCrossWomen,
    #[serde(rename = "Other")]
    Other,
}

/// Athlete and session metadata carried through to the report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionDetails {
    #[serde(default, alias = "athleteName")]
    pub athlete_name: String,
    #[serde(
        default,
        alias = "testDate",
        deserialize_with = "optional_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub test_date: Option<NaiveDate>,
    #[serde(default, alias = "boatClass")]
    pub boat_class: BoatClass,
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub comments: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub temperature: String,
    #[serde(default, alias = "windSpeed", skip_serializing_if = "String::is_empty")]
    pub wind_speed: String,
}

/// Complete input document for one session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepTest {
    #[serde(default, alias = "tableType")]
    pub mode: ProtocolMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionDetails>,
    pub steps: Vec<RawStep>,
}

/// Cell contents as they may appear in JSON
#[derive(Deserialize)]
#[serde(untagged)]
enum Cell {
    Number(f64),
    Text(String),
}

/// Parse a textual cell into a finite number.
///
/// Empty cells, the max-effort sentinel and anything non-numeric yield `None`.
pub fn parse_cell(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(MAX_EFFORT_SENTINEL) {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn numeric_cell<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let cell = Option::<Cell>::deserialize(deserializer)?;
    Ok(match cell {
        Some(Cell::Number(n)) if n.is_finite() => Some(n),
        Some(Cell::Number(_)) => None,
        Some(Cell::Text(text)) => parse_cell(&text),
        None => None,
    })
}

fn optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = Option::<String>::deserialize(deserializer)?;
    match text.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
