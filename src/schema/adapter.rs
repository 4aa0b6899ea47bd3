//! Parsing of step tables from JSON documents, arrays and NDJSON

use crate::error::ComputeError;
use crate::schema::step_table::{RawStep, StepTest};

/// Adapter for reading step tables
pub struct StepTableAdapter;

impl StepTableAdapter {
    /// Parse a full session document (`{"mode": .., "session": .., "steps": [..]}`)
    pub fn parse_document(json: &str) -> Result<StepTest, ComputeError> {
        let document: StepTest = serde_json::from_str(json)?;
        Ok(document)
    }

    /// Parse a JSON string containing an array of steps
    pub fn parse_array(json: &str) -> Result<Vec<RawStep>, ComputeError> {
        let steps: Vec<RawStep> = serde_json::from_str(json)?;
        Ok(steps)
    }

    /// Parse NDJSON (one step per line)
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<RawStep>, ComputeError> {
        let mut steps = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<RawStep>(trimmed) {
                Ok(step) => steps.push(step),
                Err(e) => {
                    return Err(ComputeError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(steps)
    }

    /// Accept either a session document or a bare array of steps
    pub fn parse_json(json: &str) -> Result<StepTest, ComputeError> {
        if json.trim_start().starts_with('[') {
            Ok(StepTest {
                steps: Self::parse_array(json)?,
                ..Default::default()
            })
        } else {
            Self::parse_document(json)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProtocolMode;

    #[test]
    fn test_parse_ndjson() {
        let ndjson = r#"
{"step": 1, "achieved": 140, "secondary": 3.0, "lactate": 1.1}

{"step": 2, "achieved": 152, "secondary": 3.3, "lactate": 1.4}
"#;
        let steps = StepTableAdapter::parse_ndjson(ndjson).unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[1].achieved, Some(152.0));
    }

    #[test]
    fn test_parse_ndjson_reports_line() {
        let ndjson = "{\"step\": 1}\nnot json\n";
        let err = StepTableAdapter::parse_ndjson(ndjson).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_json_accepts_array_and_document() {
        let array = r#"[{"step": 1, "lactate": 1.0}]"#;
        let doc = StepTableAdapter::parse_json(array).unwrap();
        assert_eq!(doc.mode, ProtocolMode::HeartRate);
        assert_eq!(doc.steps.len(), 1);

        let document = r#"{"mode": "sr", "steps": [{"step": 1}, {"step": 2}]}"#;
        let doc = StepTableAdapter::parse_json(document).unwrap();
        assert_eq!(doc.mode, ProtocolMode::StrokeRate);
        assert_eq!(doc.steps.len(), 2);
    }

    #[test]
    fn test_invalid_json() {
        assert!(StepTableAdapter::parse_array("not valid json").is_err());
    }
}
