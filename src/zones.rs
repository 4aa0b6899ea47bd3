//! Training zones
//!
//! Eight fixed zone templates (T1-T8) whose only variable parts are the heart
//! rate and speed bounds derived from the two thresholds and the session
//! maxima. T6-T8 describe anaerobic work outside the aerobic model and carry no
//! bounds. The domain grouping is for display only.

use crate::precision;
use crate::types::{Thresholds, ValidatedPoint};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fraction of max heart rate that ends T1
pub const HR_FRACTION_T1: f64 = 0.7;

/// Fraction of max speed that ends T1
pub const SPEED_FRACTION_T1: f64 = 0.75;

/// Separator shown after the moderate domain
pub const LT1_SEPARATOR: &str = "1ST METABOLIC THRESHOLD MT1/LT1";

/// Separator shown after the heavy domain
pub const LT2_SEPARATOR: &str = "2ND METABOLIC THRESHOLD MT2/LT2";

/// Physiological intensity domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Moderate,
    Heavy,
    Severe,
    Extreme,
}

impl Domain {
    pub fn label(&self) -> &'static str {
        match self {
            Domain::Moderate => "MODERATE",
            Domain::Heavy => "HEAVY",
            Domain::Severe => "SEVERE*",
            Domain::Extreme => "EXTREME*",
        }
    }

    /// Threshold separator drawn below this domain, if any
    pub fn separator_after(&self) -> Option<&'static str> {
        match self {
            Domain::Moderate => Some(LT1_SEPARATOR),
            Domain::Heavy => Some(LT2_SEPARATOR),
            Domain::Severe | Domain::Extreme => None,
        }
    }
}

/// Bound of a zone on one measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ZoneRange<T> {
    Below { upper: T },
    Between { lower: T, upper: T },
    Above { lower: T },
    NotApplicable,
}

impl<T: fmt::Display> ZoneRange<T> {
    /// Render with a fixed number of decimals
    fn render(&self, decimals: usize, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZoneRange::Below { upper } => write!(f, "< {upper:.decimals$}"),
            ZoneRange::Between { lower, upper } => {
                write!(f, "{lower:.decimals$} - {upper:.decimals$}")
            }
            ZoneRange::Above { lower } => write!(f, "> {lower:.decimals$}"),
            ZoneRange::NotApplicable => f.write_str("N/A"),
        }
    }
}

impl fmt::Display for ZoneRange<i64> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(0, f)
    }
}

impl fmt::Display for ZoneRange<f64> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(precision::ZONE_SPEED_DECIMALS as usize, f)
    }
}

/// One training zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    /// Zone label (T1-T8)
    pub label: String,
    pub descriptor: String,
    pub domain: Domain,
    /// Heart rate bounds (bpm)
    pub hr_range: ZoneRange<i64>,
    /// Speed bounds (m/s, 2 decimals)
    pub speed_range: ZoneRange<f64>,
    /// Typical share of VO2max (%)
    pub vo2max_pct: String,
    /// Session RPE on the 1-10 and [6-20] scales
    pub rpe: String,
    /// Recommended work duration
    pub duration: String,
}

/// Values the zone bounds are computed from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneInputs {
    pub max_hr: f64,
    pub lt1_hr: f64,
    pub lt2_hr: f64,
    pub max_speed: f64,
    pub lt1_speed: f64,
    pub lt2_speed: f64,
}

impl ZoneInputs {
    /// Session maxima come from the last (fastest) validated step
    pub fn from_thresholds(points: &[ValidatedPoint], thresholds: &Thresholds) -> Option<Self> {
        let last = points.last()?;
        Some(Self {
            max_hr: last.heart_rate,
            lt1_hr: thresholds.lt1.heart_rate,
            lt2_hr: thresholds.lt2.heart_rate,
            max_speed: last.speed,
            lt1_speed: thresholds.lt1.speed,
            lt2_speed: thresholds.lt2.speed,
        })
    }
}

/// Derived zone table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingZones {
    pub inputs: ZoneInputs,
    pub zones: Vec<Zone>,
}

/// Zone boundary values
#[derive(Debug, Clone, Copy, PartialEq)]
struct Boundaries {
    hr70: i64,
    hr_lt1: i64,
    hr_mid: i64,
    hr_lt2: i64,
    speed75: f64,
    speed_lt1: f64,
    speed_mid: f64,
    speed_lt2: f64,
}

impl Boundaries {
    fn from_inputs(inputs: &ZoneInputs) -> Self {
        let speed_mid = inputs.lt1_speed + (inputs.lt2_speed - inputs.lt1_speed) / 2.0;
        Self {
            hr70: precision::heart_rate(inputs.max_hr * HR_FRACTION_T1),
            hr_lt1: precision::heart_rate(inputs.lt1_hr),
            hr_mid: precision::heart_rate(inputs.lt1_hr + (inputs.lt2_hr - inputs.lt1_hr) / 2.0),
            hr_lt2: precision::heart_rate(inputs.lt2_hr),
            speed75: precision::zone_speed(inputs.max_speed * SPEED_FRACTION_T1),
            speed_lt1: precision::zone_speed(inputs.lt1_speed),
            speed_mid: precision::zone_speed(speed_mid),
            speed_lt2: precision::zone_speed(inputs.lt2_speed),
        }
    }
}

/// Zone template: everything except the bounds
struct Template {
    label: &'static str,
    descriptor: &'static str,
    domain: Domain,
    vo2max_pct: &'static str,
    rpe: &'static str,
    duration: &'static str,
}

const TEMPLATES: [Template; 8] = [
    Template {
        label: "T1",
        descriptor: "Light Aerobic",
        domain: Domain::Moderate,
        vo2max_pct: "50-60",
        rpe: "Very Light - Light (1-2) [7-11]",
        duration: "1 - 6 h",
    },
    Template {
        label: "T2",
        descriptor: "Moderate Aerobic",
        domain: Domain::Moderate,
        vo2max_pct: "60-75",
        rpe: "Light - Somewhat Hard (2-4) [11-13]",
        duration: "1 - 3 h",
    },
    Template {
        label: "T3",
        descriptor: "Heavy Aerobic",
        domain: Domain::Heavy,
        vo2max_pct: "70-85",
        rpe: "Somewhat Hard - Hard (4-5) [13-15]",
        duration: "45 - 90 min",
    },
    Template {
        label: "T4",
        descriptor: "Threshold",
        domain: Domain::Heavy,
        vo2max_pct: "80-90",
        rpe: "Somewhat Hard - Very Hard (5-7) [15-17]",
        duration: "30 - 60 min",
    },
    Template {
        label: "T5",
        descriptor: "Maximal Aerobic",
        domain: Domain::Severe,
        vo2max_pct: "90-100",
        rpe: "Very Hard - Maximal (7-10) [17-20]",
        duration: "12 - 30 min",
    },
    Template {
        label: "T6",
        descriptor: "Speed/Power Tolerance",
        domain: Domain::Extreme,
        vo2max_pct: "N/A",
        rpe: "Maximal (10) [20]",
        duration: "4 - 12 min",
    },
    Template {
        label: "T7",
        descriptor: "Speed/Power Production",
        domain: Domain::Extreme,
        vo2max_pct: "N/A",
        rpe: "Maximal (10) [20]",
        duration: "2 - 6 min",
    },
    Template {
        label: "T8",
        descriptor: "Neuro-muscular Power",
        domain: Domain::Extreme,
        vo2max_pct: "N/A",
        rpe: "Maximal (10) [20]",
        duration: "10 s - 2 min",
    },
];

/// Zone deriver
pub struct ZoneDeriver;

impl ZoneDeriver {
    /// Fill the eight templates with bounds computed from `inputs`
    pub fn derive(inputs: ZoneInputs) -> TrainingZones {
        let b = Boundaries::from_inputs(&inputs);

        let ranges: [(ZoneRange<i64>, ZoneRange<f64>); 8] = [
            (
                ZoneRange::Below { upper: b.hr70 },
                ZoneRange::Below { upper: b.speed75 },
            ),
            (
                ZoneRange::Between {
                    lower: b.hr70,
                    upper: b.hr_lt1,
                },
                ZoneRange::Between {
                    lower: b.speed75,
                    upper: b.speed_lt1,
                },
            ),
            (
                ZoneRange::Between {
                    lower: b.hr_lt1,
                    upper: b.hr_mid,
                },
                ZoneRange::Between {
                    lower: b.speed_lt1,
                    upper: b.speed_mid,
                },
            ),
            (
                ZoneRange::Between {
                    lower: b.hr_mid,
                    upper: b.hr_lt2,
                },
                ZoneRange::Between {
                    lower: b.speed_mid,
                    upper: b.speed_lt2,
                },
            ),
            (
                ZoneRange::Above { lower: b.hr_lt2 },
                ZoneRange::Above { lower: b.speed_lt2 },
            ),
            (ZoneRange::NotApplicable, ZoneRange::NotApplicable),
            (ZoneRange::NotApplicable, ZoneRange::NotApplicable),
            (ZoneRange::NotApplicable, ZoneRange::NotApplicable),
        ];

        let zones = TEMPLATES
            .iter()
            .zip(ranges)
            .map(|(t, (hr_range, speed_range))| Zone {
                label: t.label.to_string(),
                descriptor: t.descriptor.to_string(),
                domain: t.domain,
                hr_range,
                speed_range,
                vo2max_pct: t.vo2max_pct.to_string(),
                rpe: t.rpe.to_string(),
                duration: t.duration.to_string(),
            })
            .collect();

        TrainingZones { inputs, zones }
    }
}
