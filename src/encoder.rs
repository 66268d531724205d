//! Feature payload encoding
//!
//! This module wraps a chart's feature table and summary in a self-describing
//! JSON payload with producer and provenance metadata.

use crate::error::ComputeError;
use crate::schema::ChartDocument;
use crate::stepfile::Stepfile;
use crate::types::{
    ChartSummary, FeaturePayload, FeatureTable, Producer, Provenance, StepfileInfo,
};
use crate::{ACUBED_VERSION, PRODUCER_NAME};
use chrono::Utc;
use uuid::Uuid;

/// Current feature payload schema version
pub const FEATURES_VERSION: &str = "acubed.features.v1";

/// Encoder for producing feature payloads
pub struct FeatureEncoder {
    instance_id: String,
}

impl Default for FeatureEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureEncoder {
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

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Encode one chart's features into a payload
    pub fn encode(
        &self,
        document: &ChartDocument,
        stepfile: &Stepfile,
        features: FeatureTable,
        summary: ChartSummary,
    ) -> Result<FeaturePayload, ComputeError> {
        if features.len() != stepfile.len() {
            return Err(ComputeError::EncodingError(format!(
                "feature table has {} rows for {} keytaps",
                features.len(),
                stepfile.len()
            )));
        }

        let producer = Producer {
            name: PRODUCER_NAME.to_string(),
            version: ACUBED_VERSION.to_string(),
            instance_id: self.instance_id.clone(),
        };

        let provenance = Provenance {
            chart_id: document.id.clone(),
            chart_name: document.name.clone(),
            difficulty: document.difficulty,
            computed_at_utc: Utc::now().to_rfc3339(),
        };

        let info = StepfileInfo {
            id: stepfile.id(),
            num_notes: stepfile.num_notes(),
            num_keytaps: stepfile.len(),
            num_channels: stepfile.num_channels(),
        };

        Ok(FeaturePayload {
            schema_version: FEATURES_VERSION.to_string(),
            producer,
            provenance,
            stepfile: info,
            features,
            summary,
        })
    }

    /// Encode to JSON string
    pub fn encode_to_json(
        &self,
        document: &ChartDocument,
        stepfile: &Stepfile,
        features: FeatureTable,
        summary: ChartSummary,
    ) -> Result<String, ComputeError> {
        let payload = self.encode(document, stepfile, features, summary)?;
        serde_json::to_string_pretty(&payload)
            .map_err(|e| ComputeError::EncodingError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::FeatureAggregator;
    use crate::features::FeatureExtractor;
    use crate::note::Note;
    use crate::schema::ChartId;
    use pretty_assertions::assert_eq;

    fn make_test_chart() -> (ChartDocument, Stepfile) {
        let document = ChartDocument::default()
            .with_id(ChartId::Number(42))
            .with_name("Test Chart")
            .with_difficulty(12);
        let stepfile = Stepfile::new(vec![
            Note::new(0.0, "1000").unwrap(),
            Note::new(0.0, "0001").unwrap(),
            Note::new(0.25, "0100").unwrap(),
        ])
        .unwrap();
        (document, stepfile)
    }

    #[test]
    fn test_encode_feature_payload() {
        let (document, stepfile) = make_test_chart();
        let features = FeatureExtractor::default().extract(&stepfile).unwrap();
        let summary = FeatureAggregator::default().summarize(&features).unwrap();

        let encoder = FeatureEncoder::with_instance_id("test-instance".to_string());
        let payload = encoder.encode(&document, &stepfile, features, summary).unwrap();

        assert_eq!(payload.schema_version, FEATURES_VERSION);
        assert_eq!(payload.producer.name, "acubed");
        assert_eq!(payload.producer.instance_id, "test-instance");
        assert_eq!(payload.provenance.chart_id, Some(ChartId::Number(42)));
        assert_eq!(payload.provenance.chart_name.as_deref(), Some("Test Chart"));
        assert_eq!(payload.provenance.difficulty, Some(12));
        assert_eq!(payload.stepfile.num_notes, 2);
        assert_eq!(payload.stepfile.num_keytaps, 3);
        assert_eq!(payload.stepfile.id, stepfile.id());
        assert_eq!(payload.features.len(), 3);
        assert_eq!(payload.summary.keytaps, 3);
    }

    #[test]
    fn test_encode_to_json() {
        let (document, stepfile) = make_test_chart();
        let features = FeatureExtractor::default().extract(&stepfile).unwrap();
        let summary = FeatureAggregator::default().summarize(&features).unwrap();

        let json = FeatureEncoder::new()
            .encode_to_json(&document, &stepfile, features, summary)
            .unwrap();

        assert!(json.contains("\"schema_version\": \"acubed.features.v1\""));
        assert!(json.contains("\"computed_at_utc\""));
        assert!(json.contains("\"file_length\""));
    }

    #[test]
    fn test_mismatched_table_is_rejected() {
        let (document, stepfile) = make_test_chart();
        let features = FeatureExtractor::default().extract(&stepfile).unwrap();
        let summary = FeatureAggregator::default().summarize(&features).unwrap();

        let result =
            FeatureEncoder::new().encode(&document, &stepfile, FeatureTable::default(), summary);
        assert!(matches!(result, Err(ComputeError::EncodingError(_))));
    }

    #[test]
    fn test_instance_ids_are_unique() {
        assert_ne!(FeatureEncoder::new().instance_id(), FeatureEncoder::new().instance_id());
    }
}
