//! Core types for the ACubed feature pipeline
//!
//! This module defines the data structures produced after aggregation: the
//! per-keytap feature table, the per-chart summary, and the JSON payload.

use crate::schema::ChartId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Features for one physical keytap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    /// Keytap index within the chart
    pub timepoint: usize,
    /// Timestamp of the owning chord (seconds)
    pub time: f64,
    /// Receptor channel, 0 = leftmost
    pub channel: usize,
    /// Instantaneous tap rate on this channel (1/s)
    pub vertical: f64,
    /// Normalized interference inside the accuracy window
    pub horizontal: f64,
    /// Square root of `horizontal`
    pub horizontal_sqrt: f64,
    /// `vertical × sqrt(horizontal)`
    pub interaction: f64,
}

/// Feature columns that can be summarized
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureColumn {
    Vertical,
    Horizontal,
    Interaction,
}

impl FeatureColumn {
    pub const ALL: [FeatureColumn; 3] = [
        FeatureColumn::Vertical,
        FeatureColumn::Horizontal,
        FeatureColumn::Interaction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureColumn::Vertical => "vertical",
            FeatureColumn::Horizontal => "horizontal",
            FeatureColumn::Interaction => "interaction",
        }
    }
}

/// Per-keytap feature table for one chart, in keytap reading order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    pub rows: Vec<FeatureRow>,
}

impl FeatureTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one column, in row order
    ///
    /// The horizontal column is reported square-rooted, the scale the
    /// difficulty model consumes.
    pub fn column(&self, column: FeatureColumn) -> Vec<f64> {
        self.rows
            .iter()
            .map(|row| match column {
                FeatureColumn::Vertical => row.vertical,
                FeatureColumn::Horizontal => row.horizontal_sqrt,
                FeatureColumn::Interaction => row.interaction,
            })
            .collect()
    }
}

/// Aggregated features for one chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSummary {
    /// Number of physical keytaps
    pub keytaps: usize,
    /// `1 / keytaps`
    pub file_length: f64,
    /// Column name → aggregation label → value
    pub columns: BTreeMap<String, BTreeMap<String, f64>>,
}

impl ChartSummary {
    pub fn get(&self, column: FeatureColumn, label: &str) -> Option<f64> {
        self.columns
            .get(column.as_str())
            .and_then(|stats| stats.get(label))
            .copied()
    }
}

/// Producer metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Where the chart came from and when features were computed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provenance {
    pub chart_id: Option<ChartId>,
    pub chart_name: Option<String>,
    pub difficulty: Option<u32>,
    pub computed_at_utc: String,
}

/// Shape of the aggregated stepfile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepfileInfo {
    /// SHA-256 of the concatenated chord masks
    pub id: String,
    /// Number of chords
    pub num_notes: usize,
    /// Number of physical keytaps
    pub num_keytaps: usize,
    pub num_channels: usize,
}

/// Complete feature payload for one chart
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturePayload {
    pub schema_version: String,
    pub producer: Producer,
    pub provenance: Provenance,
    pub stepfile: StepfileInfo,
    pub features: FeatureTable,
    pub summary: ChartSummary,
}
