//! Vertical density
//!
//! Instantaneous tap rate per channel: for every keytap, the reciprocal of
//! the time since the previous keytap on the same channel (seconds⁻¹). The
//! first keytap of each channel has no predecessor and is assigned `0`.

use super::{ensure_keytaps, DensityCalculator};
use crate::error::ComputeError;
use crate::stepfile::Stepfile;

/// Per-channel reciprocal inter-arrival time
#[derive(Debug, Clone, Copy, Default)]
pub struct VerticalDensity;

impl VerticalDensity {
    pub fn new() -> Self {
        Self
    }
}

impl DensityCalculator for VerticalDensity {
    fn name(&self) -> &'static str {
        "vertical"
    }

    fn compute(&self, stepfile: &Stepfile) -> Result<Vec<f64>, ComputeError> {
        ensure_keytaps(stepfile, self.name())?;

        // Walking keytaps in reading order visits each channel's partition in
        // time order, so the per-channel results come out already merged.
        let mut previous: Vec<Option<f64>> = vec![None; stepfile.num_channels()];
        let densities = stepfile
            .keytaps()
            .map(|keytap| {
                let density = previous[keytap.channel]
                    .map(|prev| reciprocal(keytap.time - prev))
                    .unwrap_or(0.0);
                previous[keytap.channel] = Some(keytap.time);
                density
            })
            .collect();

        Ok(densities)
    }
}

/// `1 / delta`, or `0` where that is undefined.
fn reciprocal(delta: f64) -> f64 {
    if delta <= 0.0 {
        return 0.0;
    }
    let rate = delta.recip();
    if rate.is_finite() {
        rate
    } else {
        0.0
    }
}
