//! acubed.chart.v1 schema definition

use crate::error::ValidationError;
use crate::note::Note;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Current schema version
pub const SCHEMA_VERSION: &str = "acubed.chart.v1";

/// One keytap as decoded from an upstream chart, not yet validated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartRecord {
    /// Seconds from the start of the chart
    pub time: f64,
    /// Binary channel mask, e.g. `"0100"`
    pub step: String,
}

impl ChartRecord {
    pub fn new(time: f64, step: impl Into<String>) -> Self {
        Self {
            time,
            step: step.into(),
        }
    }

    /// Validate into a [`Note`] for an `num_channels`-key layout.
    pub fn to_note(&self, num_channels: usize) -> Result<Note, ValidationError> {
        Note::with_channels(self.time, &self.step, num_channels)
    }
}

impl From<Note> for ChartRecord {
    fn from(note: Note) -> Self {
        ChartRecord {
            time: note.time(),
            step: note.step().to_string(),
        }
    }
}

/// Chart identifier, numeric (catalogue level) or free-form
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChartId {
    Number(i64),
    Text(String),
}

impl fmt::Display for ChartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartId::Number(n) => write!(f, "{n}"),
            ChartId::Text(s) => f.write_str(s),
        }
    }
}

/// A chart with its catalogue metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartDocument {
    /// Chart identifier (`_id` in stored documents)
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ChartId>,
    /// Song title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Manually assigned difficulty rating
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<u32>,
    /// Keytap records
    pub chart: Vec<ChartRecord>,
}

impl ChartDocument {
    pub fn new(chart: Vec<ChartRecord>) -> Self {
        Self {
            chart,
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: ChartId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_difficulty(mut self, difficulty: u32) -> Self {
        self.difficulty = Some(difficulty);
        self
    }

    /// Validate every record into a [`Note`], stopping at the first failure.
    pub fn to_notes(&self, num_channels: usize) -> Result<Vec<Note>, ValidationError> {
        self.chart
            .iter()
            .map(|record| record.to_note(num_channels))
            .collect()
    }

    /// Validate every record; on failure reports the offending record index.
    pub fn validate(&self, num_channels: usize) -> Result<(), (usize, ValidationError)> {
        for (index, record) in self.chart.iter().enumerate() {
            record.to_note(num_channels).map_err(|e| (index, e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_stored_document() {
        let json = r#"{
            "_id": 1234,
            "name": "Example Song",
            "difficulty": 42,
            "chart": [
                {"time": 0.0, "step": "1000"},
                {"time": 0.0, "step": "0001"},
                {"time": 0.25, "step": "0100"}
            ]
        }"#;

        let doc: ChartDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.id, Some(ChartId::Number(1234)));
        assert_eq!(doc.name.as_deref(), Some("Example Song"));
        assert_eq!(doc.difficulty, Some(42));
        assert_eq!(doc.chart.len(), 3);
        assert_eq!(doc.to_notes(4).unwrap().len(), 3);
    }

    #[test]
    fn test_metadata_is_optional() {
        let doc: ChartDocument =
            serde_json::from_str(r#"{"chart": [{"time": 1.5, "step": "0010"}]}"#).unwrap();
        assert!(doc.id.is_none());
        assert!(doc.name.is_none());

        let json = serde_json::to_string(&doc).unwrap();
        assert_eq!(json, r#"{"chart":[{"time":1.5,"step":"0010"}]}"#);
    }

    #[test]
    fn test_text_ids() {
        let doc: ChartDocument =
            serde_json::from_str(r#"{"id": "custom-7", "chart": []}"#).unwrap();
        assert_eq!(doc.id.unwrap().to_string(), "custom-7");
    }

    #[test]
    fn test_validate_reports_record_index() {
        let doc = ChartDocument::new(vec![
            ChartRecord::new(0.0, "1000"),
            ChartRecord::new(0.5, "0000"),
            ChartRecord::new(-1.0, "0100"),
        ]);

        let (index, error) = doc.validate(4).unwrap_err();
        assert_eq!(index, 1);
        assert!(matches!(error, ValidationError::InvalidStep { .. }));
    }

    #[test]
    fn test_record_from_note() {
        let note = Note::new(0.75, "0110").unwrap();
        assert_eq!(ChartRecord::from(note), ChartRecord::new(0.75, "0110"));
    }
}
