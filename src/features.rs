//! Feature extraction
//!
//! This module runs both density calculators over a stepfile and joins
//! their outputs into one row per keytap:
//! - Vertical density (per-channel tap rate)
//! - Horizontal density and its square root
//! - Interaction, `vertical × sqrt(horizontal)`

use crate::density::{DensityCalculator, HorizontalDensity, VerticalDensity, WindowConfig};
use crate::error::ComputeError;
use crate::stepfile::Stepfile;
use crate::types::{FeatureRow, FeatureTable};

/// Feature extractor for computing per-keytap feature tables
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    vertical: VerticalDensity,
    horizontal: HorizontalDensity,
}

impl FeatureExtractor {
    /// Create an extractor using a custom horizontal window
    pub fn new(window: WindowConfig) -> Self {
        Self {
            vertical: VerticalDensity::new(),
            horizontal: HorizontalDensity::new(window),
        }
    }

    /// Extract the feature table for a stepfile
    pub fn extract(&self, stepfile: &Stepfile) -> Result<FeatureTable, ComputeError> {
        let vertical = self.vertical.compute(stepfile)?;
        let horizontal = self.horizontal.compute(stepfile)?;

        if vertical.len() != stepfile.len() || horizontal.len() != stepfile.len() {
            return Err(ComputeError::EncodingError(format!(
                "feature length mismatch: {} keytaps, {} vertical, {} horizontal",
                stepfile.len(),
                vertical.len(),
                horizontal.len()
            )));
        }

        let rows = stepfile
            .keytaps()
            .zip(vertical.into_iter().zip(horizontal))
            .enumerate()
            .map(|(timepoint, (keytap, (v, h)))| {
                let horizontal_sqrt = h.sqrt();
                FeatureRow {
                    timepoint,
                    time: keytap.time,
                    channel: keytap.channel,
                    vertical: v,
                    horizontal: h,
                    horizontal_sqrt,
                    interaction: v * horizontal_sqrt,
                }
            })
            .collect();

        Ok(FeatureTable { rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::Note;
    use pretty_assertions::assert_eq;

    fn stepfile(raw: &[(f64, &str)]) -> Stepfile {
        Stepfile::new(raw.iter().map(|&(t, s)| Note::new(t, s).unwrap()).collect()).unwrap()
    }

    #[test]
    fn test_rows_follow_keytap_order() {
        let table = FeatureExtractor::default()
            .extract(&stepfile(&[(0.0, "1001"), (1.0, "1000")]))
            .unwrap();

        let layout: Vec<(usize, f64, usize)> = table
            .rows
            .iter()
            .map(|r| (r.timepoint, r.time, r.channel))
            .collect();
        assert_eq!(layout, vec![(0, 0.0, 0), (1, 0.0, 3), (2, 1.0, 0)]);
    }

    #[test]
    fn test_interaction_uses_sqrt_horizontal() {
        let table = FeatureExtractor::default()
            .extract(&stepfile(&[(0.0, "1000"), (0.5, "1000")]))
            .unwrap();

        let last = &table.rows[1];
        assert_eq!(last.vertical, 2.0);
        assert!((last.horizontal_sqrt - last.horizontal.sqrt()).abs() < 1e-12);
        assert!((last.interaction - 2.0 * last.horizontal_sqrt).abs() < 1e-12);
        // first keytap on a channel has no tap rate
        assert_eq!(table.rows[0].interaction, 0.0);
    }

    #[test]
    fn test_custom_window() {
        let window = WindowConfig::new(vec![-0.5, -0.1, 0.1, 0.5], vec![1.0, 1.0, 1.0]).unwrap();
        let table = FeatureExtractor::new(window)
            .extract(&stepfile(&[(0.0, "1000"), (0.3, "0100")]))
            .unwrap();

        // each note sees itself plus the other inside the wider window
        assert_eq!(table.rows[0].horizontal, table.rows[1].horizontal);
        assert!((table.rows[0].horizontal - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_stepfile_is_degenerate() {
        let result = FeatureExtractor::default().extract(&stepfile(&[]));
        assert!(matches!(result, Err(ComputeError::DegenerateInput(_))));
    }
}
