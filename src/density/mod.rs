//! Density calculators
//!
//! Each calculator turns an aggregated [`Stepfile`] into one value per
//! physical keytap, in the stepfile's keytap reading order, so the outputs of
//! different calculators can be zipped positionally.

mod horizontal;
mod vertical;

pub use horizontal::{Closure, HorizontalDensity, WeightedInterval, WindowConfig};
pub use vertical::VerticalDensity;

use crate::error::ComputeError;
use crate::stepfile::Stepfile;

/// Trait for per-keytap density features
pub trait DensityCalculator {
    /// Column name used in feature tables
    fn name(&self) -> &'static str;

    /// Compute one density value per keytap of `stepfile`.
    ///
    /// Values follow [`Stepfile::keytaps`]: chords in time order, and inside
    /// a chord, channels left to right rather than input row order. Match
    /// values back to input records by `(time, channel)`, not by position.
    ///
    /// Fails with [`ComputeError::DegenerateInput`] when the stepfile has no
    /// keytaps.
    fn compute(&self, stepfile: &Stepfile) -> Result<Vec<f64>, ComputeError>;
}

fn ensure_keytaps(stepfile: &Stepfile, calculator: &str) -> Result<(), ComputeError> {
    if stepfile.is_empty() {
        return Err(ComputeError::DegenerateInput(format!(
            "{calculator} density is undefined for a chart without keytaps"
        )));
    }
    Ok(())
}
