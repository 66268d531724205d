//! Per-chart feature aggregation
//!
//! Collapses a per-keytap [`FeatureTable`] into a fixed-size summary the
//! difficulty model can consume: configured statistics per feature column,
//! plus `file_length = 1 / keytaps`.

use crate::error::ComputeError;
use crate::types::{ChartSummary, FeatureColumn, FeatureTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Summary statistic applied to each feature column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    Mean,
    Min,
    Max,
    Sum,
    /// Sample standard deviation (n - 1 denominator)
    Std,
    Median,
    /// Linearly interpolated quantile, `q` in `[0, 1]`
    Quantile(f64),
}

impl Aggregation {
    /// Key used for this statistic in a [`ChartSummary`]
    pub fn label(&self) -> String {
        match self {
            Aggregation::Mean => "mean".to_string(),
            Aggregation::Min => "min".to_string(),
            Aggregation::Max => "max".to_string(),
            Aggregation::Sum => "sum".to_string(),
            Aggregation::Std => "std".to_string(),
            Aggregation::Median => "median".to_string(),
            Aggregation::Quantile(q) => format!("q{q}"),
        }
    }

    pub fn validate(&self) -> Result<(), ComputeError> {
        match self {
            Aggregation::Quantile(q) if !(0.0..=1.0).contains(q) => Err(
                ComputeError::ConfigError(format!("quantile must be within [0, 1], got {q}")),
            ),
            _ => Ok(()),
        }
    }

    /// Apply to a non-empty column.
    fn apply(&self, values: &[f64]) -> f64 {
        match self {
            Aggregation::Mean => mean(values),
            Aggregation::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Aggregation::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Aggregation::Sum => values.iter().sum(),
            Aggregation::Std => sample_std(values),
            Aggregation::Median => quantile(values, 0.5),
            Aggregation::Quantile(q) => quantile(values, *q),
        }
    }
}

/// Default statistics: mean, max, std and 90th percentile
pub fn default_aggregations() -> Vec<Aggregation> {
    vec![
        Aggregation::Mean,
        Aggregation::Max,
        Aggregation::Std,
        Aggregation::Quantile(0.9),
    ]
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mu = mean(values);
    let variance =
        values.iter().map(|x| (x - mu).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

fn quantile(values: &[f64], q: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// Aggregator over feature tables
#[derive(Debug, Clone)]
pub struct FeatureAggregator {
    aggregations: Vec<Aggregation>,
}

impl Default for FeatureAggregator {
    fn default() -> Self {
        Self {
            aggregations: default_aggregations(),
        }
    }
}

impl FeatureAggregator {
    /// Create an aggregator, rejecting quantiles outside `[0, 1]`
    pub fn new(aggregations: Vec<Aggregation>) -> Result<Self, ComputeError> {
        aggregations.iter().try_for_each(Aggregation::validate)?;
        Ok(Self { aggregations })
    }

    pub fn aggregations(&self) -> &[Aggregation] {
        &self.aggregations
    }

    /// Summarize a chart's feature table
    pub fn summarize(&self, table: &FeatureTable) -> Result<ChartSummary, ComputeError> {
        if table.is_empty() {
            return Err(ComputeError::DegenerateInput(
                "cannot summarize a chart without keytaps".to_string(),
            ));
        }

        let columns = FeatureColumn::ALL
            .iter()
            .map(|&column| {
                let values = table.column(column);
                let stats: BTreeMap<String, f64> = self
                    .aggregations
                    .iter()
                    .map(|agg| (agg.label(), agg.apply(&values)))
                    .collect();
                (column.as_str().to_string(), stats)
            })
            .collect();

        Ok(ChartSummary {
            keytaps: table.len(),
            file_length: 1.0 / table.len() as f64,
            columns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FeatureRow;
    use pretty_assertions::assert_eq;

    fn table(vertical: &[f64]) -> FeatureTable {
        FeatureTable {
            rows: vertical
                .iter()
                .enumerate()
                .map(|(i, &v)| FeatureRow {
                    timepoint: i,
                    time: i as f64,
                    channel: 0,
                    vertical: v,
                    horizontal: 4.0,
                    horizontal_sqrt: 2.0,
                    interaction: v * 2.0,
                })
                .collect(),
        }
    }

    #[test]
    fn test_statistics() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(Aggregation::Mean.apply(&values), 2.5);
        assert_eq!(Aggregation::Min.apply(&values), 1.0);
        assert_eq!(Aggregation::Max.apply(&values), 4.0);
        assert_eq!(Aggregation::Sum.apply(&values), 10.0);
        assert_eq!(Aggregation::Median.apply(&values), 2.5);
        assert!((Aggregation::Std.apply(&values) - 1.2909944487).abs() < 1e-9);
        assert!((Aggregation::Quantile(0.9).apply(&values) - 3.7).abs() < 1e-9);
        assert_eq!(Aggregation::Quantile(0.0).apply(&values), 1.0);
        assert_eq!(Aggregation::Quantile(1.0).apply(&values), 4.0);
    }

    #[test]
    fn test_single_value_std_is_zero() {
        assert_eq!(Aggregation::Std.apply(&[3.0]), 0.0);
    }

    #[test]
    fn test_quantile_ignores_input_order() {
        assert_eq!(Aggregation::Median.apply(&[5.0, 1.0, 3.0]), 3.0);
    }

    #[test]
    fn test_summarize() {
        let aggregator =
            FeatureAggregator::new(vec![Aggregation::Mean, Aggregation::Max]).unwrap();
        let summary = aggregator.summarize(&table(&[0.0, 2.0, 4.0, 6.0])).unwrap();

        assert_eq!(summary.keytaps, 4);
        assert_eq!(summary.file_length, 0.25);
        assert_eq!(summary.get(FeatureColumn::Vertical, "mean"), Some(3.0));
        assert_eq!(summary.get(FeatureColumn::Interaction, "max"), Some(12.0));
        assert_eq!(summary.get(FeatureColumn::Horizontal, "mean"), Some(2.0));
        assert_eq!(summary.get(FeatureColumn::Vertical, "std"), None);
    }

    #[test]
    fn test_out_of_range_quantile_is_rejected() {
        let result = FeatureAggregator::new(vec![Aggregation::Mean, Aggregation::Quantile(1.5)]);
        assert!(matches!(result, Err(ComputeError::ConfigError(_))));

        let result = FeatureAggregator::new(vec![Aggregation::Quantile(-0.1)]);
        assert!(matches!(result, Err(ComputeError::ConfigError(_))));

        let aggregator = FeatureAggregator::new(vec![Aggregation::Quantile(1.0)]).unwrap();
        let summary = aggregator.summarize(&table(&[1.0, 3.0])).unwrap();
        assert_eq!(summary.get(FeatureColumn::Vertical, "q1"), Some(3.0));
    }

    #[test]
    fn test_empty_table_is_degenerate() {
        let result = FeatureAggregator::default().summarize(&FeatureTable::default());
        assert!(matches!(result, Err(ComputeError::DegenerateInput(_))));
    }

    #[test]
    fn test_labels_and_serde() {
        assert_eq!(Aggregation::Quantile(0.9).label(), "q0.9");
        let parsed: Vec<Aggregation> =
            serde_json::from_str(r#"["mean", "std", {"quantile": 0.75}]"#).unwrap();
        assert_eq!(
            parsed,
            vec![Aggregation::Mean, Aggregation::Std, Aggregation::Quantile(0.75)]
        );
        assert!(Aggregation::Quantile(1.5).validate().is_err());
        assert!(Aggregation::Quantile(0.5).validate().is_ok());
    }
}
