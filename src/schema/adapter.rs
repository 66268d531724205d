//! Parsing and batch validation of chart documents

use crate::error::{ComputeError, ValidationError};
use crate::schema::record::{ChartDocument, ChartId};

/// Adapter for reading chart documents in bulk
pub struct ChartAdapter;

impl ChartAdapter {
    /// Parse a JSON string containing an array of chart documents
    pub fn parse_array(json: &str) -> Result<Vec<ChartDocument>, ComputeError> {
        let documents: Vec<ChartDocument> = serde_json::from_str(json)?;
        Ok(documents)
    }

    /// Parse NDJSON (newline-delimited JSON), one chart document per line
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<ChartDocument>, ComputeError> {
        let mut documents = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<ChartDocument>(trimmed) {
                Ok(document) => documents.push(document),
                Err(e) => {
                    return Err(ComputeError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(documents)
    }

    /// Validate a batch of documents, returning only the failures
    pub fn validate_documents(
        documents: &[ChartDocument],
        num_channels: usize,
    ) -> Vec<ValidationResult> {
        documents
            .iter()
            .enumerate()
            .filter_map(|(index, document)| {
                document
                    .validate(num_channels)
                    .err()
                    .map(|(record_index, error)| ValidationResult {
                        index,
                        chart_id: document.id.clone(),
                        record_index,
                        error,
                    })
            })
            .collect()
    }
}

/// A document that failed validation
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Position of the document in the batch
    pub index: usize,
    pub chart_id: Option<ChartId>,
    /// Position of the first invalid record in the chart
    pub record_index: usize,
    pub error: ValidationError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ndjson_skips_blank_lines() {
        let ndjson = r#"
{"_id": 1, "chart": [{"time": 0.0, "step": "1000"}]}

{"_id": 2, "chart": [{"time": 0.5, "step": "0100"}]}
"#;
        let documents = ChartAdapter::parse_ndjson(ndjson).unwrap();
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[1].id, Some(ChartId::Number(2)));
    }

    #[test]
    fn test_parse_ndjson_reports_line() {
        let ndjson = "{\"chart\": []}\nnot json\n";
        let err = ChartAdapter::parse_ndjson(ndjson).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_array() {
        let json = r#"[{"chart": [{"time": 0.0, "step": "0001"}]}, {"chart": []}]"#;
        let documents = ChartAdapter::parse_array(json).unwrap();
        assert_eq!(documents.len(), 2);
        assert!(ChartAdapter::parse_array("{}").is_err());
    }

    #[test]
    fn test_validate_documents() {
        let json = r#"[
            {"_id": 1, "chart": [{"time": 0.0, "step": "1000"}]},
            {"_id": 2, "chart": [{"time": 0.0, "step": "1000"}, {"time": -0.5, "step": "0010"}]},
            {"_id": 3, "chart": [{"time": 0.0, "step": "10"}]}
        ]"#;
        let documents = ChartAdapter::parse_array(json).unwrap();
        let failures = ChartAdapter::validate_documents(&documents, 4);

        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].index, 1);
        assert_eq!(failures[0].record_index, 1);
        assert_eq!(failures[0].error, ValidationError::NegativeTime(-0.5));
        assert_eq!(failures[1].chart_id, Some(ChartId::Number(3)));
    }
}
