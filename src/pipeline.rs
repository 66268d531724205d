//! Pipeline orchestration
//!
//! This module provides the public API for ACubed.
//! It orchestrates the full pipeline from raw chart JSON to feature output.

use crate::adapters::{ChartPayloadAdapter, FfrAdapter, RecordAdapter};
use crate::aggregate::FeatureAggregator;
use crate::config::EngineConfig;
use crate::encoder::FeatureEncoder;
use crate::error::ComputeError;
use crate::features::FeatureExtractor;
use crate::schema::{ChartDocument, ChartId};
use crate::stepfile::Stepfile;
use crate::types::{ChartSummary, FeaturePayload, FeatureTable};
use log::{debug, info, warn};
use rayon::prelude::*;

/// Convert a chart of keytap records to a feature payload.
///
/// # Arguments
/// * `raw_json` - Either a bare array of `{time, step}` records or a full
///   chart document
///
/// # Example
/// ```ignore
/// let payload = chart_to_features(
///     r#"[{"time": 0.0, "step": "1000"}, {"time": 0.5, "step": "0100"}]"#.to_string()
/// )?;
/// ```
pub fn chart_to_features(raw_json: String) -> Result<String, ComputeError> {
    ChartProcessor::new().process_with(&RecordAdapter, &raw_json)
}

/// Convert a raw FFR API chart payload to a feature payload.
///
/// # Example
/// ```ignore
/// let payload = ffr_chart_to_features(ffr_json)?;
/// ```
pub fn ffr_chart_to_features(raw_json: String) -> Result<String, ComputeError> {
    ChartProcessor::new().process_with(&FfrAdapter, &raw_json)
}

/// Intermediate results for one chart
#[derive(Debug, Clone)]
pub struct ChartFeatures {
    pub stepfile: Stepfile,
    pub features: FeatureTable,
    pub summary: ChartSummary,
}

/// Result of one chart in a batch
#[derive(Debug)]
pub struct BatchOutcome {
    /// Position of the chart in the batch
    pub index: usize,
    pub chart_id: Option<ChartId>,
    pub result: Result<FeaturePayload, ComputeError>,
}

/// Reusable processor holding an engine configuration.
///
/// Charts are independent, so one processor can be shared across threads.
pub struct ChartProcessor {
    config: EngineConfig,
    extractor: FeatureExtractor,
    aggregator: FeatureAggregator,
    encoder: FeatureEncoder,
}

impl Default for ChartProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl ChartProcessor {
    /// Create a new processor with default settings
    pub fn new() -> Self {
        let config = EngineConfig::default();
        Self {
            extractor: FeatureExtractor::new(config.window.clone()),
            aggregator: FeatureAggregator::default(),
            encoder: FeatureEncoder::new(),
            config,
        }
    }

    /// Create a processor from a validated configuration
    pub fn with_config(config: EngineConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self {
            extractor: FeatureExtractor::new(config.window.clone()),
            aggregator: FeatureAggregator::new(config.aggregations.clone())?,
            encoder: FeatureEncoder::new(),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate a document's records and aggregate them into a stepfile
    pub fn build_stepfile(&self, document: &ChartDocument) -> Result<Stepfile, ComputeError> {
        let notes = document.to_notes(self.config.num_channels)?;
        let stepfile = Stepfile::with_options(notes, self.config.num_channels, self.config.epsilon)?;
        debug!(
            "chart {:?}: {} records aggregated into {} notes, {} keytaps",
            document.id,
            document.chart.len(),
            stepfile.num_notes(),
            stepfile.len()
        );
        Ok(stepfile)
    }

    /// Run every stage up to, but not including, encoding
    pub fn extract(&self, document: &ChartDocument) -> Result<ChartFeatures, ComputeError> {
        let stepfile = self.build_stepfile(document)?;
        let features = self.extractor.extract(&stepfile)?;
        let summary = self.aggregator.summarize(&features)?;
        Ok(ChartFeatures {
            stepfile,
            features,
            summary,
        })
    }

    /// Process one chart document into a feature payload
    pub fn process_document(
        &self,
        document: &ChartDocument,
    ) -> Result<FeaturePayload, ComputeError> {
        let ChartFeatures {
            stepfile,
            features,
            summary,
        } = self.extract(document)?;
        self.encoder.encode(document, &stepfile, features, summary)
    }

    /// Process keytap records or a chart document JSON
    pub fn process_json(&self, raw_json: &str) -> Result<String, ComputeError> {
        self.process_with(&RecordAdapter, raw_json)
    }

    /// Process an FFR API chart payload
    pub fn process_ffr(&self, raw_json: &str) -> Result<String, ComputeError> {
        self.process_with(&FfrAdapter, raw_json)
    }

    /// Parse with any adapter, then run the full pipeline.
    ///
    /// Pipeline stages:
    /// 1. ChartPayloadAdapter - Parse upstream JSON into a chart document
    /// 2. Stepfile - Validate, correct zero-framers, aggregate chords
    /// 3. FeatureExtractor - Vertical and horizontal densities per keytap
    /// 4. FeatureAggregator - Per-chart summary statistics
    /// 5. FeatureEncoder - Encode to JSON
    pub fn process_with(
        &self,
        adapter: &dyn ChartPayloadAdapter,
        raw_json: &str,
    ) -> Result<String, ComputeError> {
        let document = adapter.parse(raw_json)?;
        let payload = self.process_document(&document)?;
        serde_json::to_string_pretty(&payload)
            .map_err(|e| ComputeError::EncodingError(e.to_string()))
    }

    /// Process many charts in parallel.
    ///
    /// Outcomes come back in input order. A failing chart does not stop the
    /// rest of the batch.
    pub fn process_batch(&self, documents: &[ChartDocument]) -> Vec<BatchOutcome> {
        let outcomes: Vec<BatchOutcome> = documents
            .par_iter()
            .enumerate()
            .map(|(index, document)| BatchOutcome {
                index,
                chart_id: document.id.clone(),
                result: self.process_document(document),
            })
            .collect();

        let failed = outcomes
            .iter()
            .filter_map(|outcome| outcome.result.as_ref().err().map(|e| (outcome, e)))
            .inspect(|(outcome, e)| {
                warn!(
                    "skipping chart {} (id {:?}): {}",
                    outcome.index, outcome.chart_id, e
                )
            })
            .count();
        info!(
            "processed {} charts: {} succeeded, {} failed",
            outcomes.len(),
            outcomes.len() - failed,
            failed
        );

        outcomes
    }
}
