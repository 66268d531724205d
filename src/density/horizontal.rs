//! Horizontal density
//!
//! Models how much interference nearby notes create inside the hit-accuracy
//! window. For each chord (the "center"), every chord whose offset from it
//! falls inside the window contributes `tap_count × weight`, where the
//! weight comes from the sub-interval the offset lands in. The raw score is
//! normalized by the window size (`Σ width × weight`) and repeated once per
//! keytap of the center chord.
//!
//! Offsets are compared in whole microseconds, so boundary ties resolve
//! the same way regardless of floating point noise in chart timestamps.

use super::{ensure_keytaps, DensityCalculator};
use crate::error::ComputeError;
use crate::stepfile::Stepfile;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Default sub-interval boundaries (seconds, relative to the center note)
pub const DEFAULT_PARTITION: [f64; 7] = [-0.117, -0.083, -0.050, -0.017, 0.017, 0.050, 0.118];

/// Default weight per sub-interval
pub const DEFAULT_WEIGHTS: [f64; 6] = [0.1, 0.5, 1.0, 1.0, 1.0, 0.5];

/// Which ends of a sub-interval are inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Closure {
    /// `[lower, upper)`, intervals before the dead zone
    Left,
    /// `[lower, upper]`, the dead zone around zero offset
    Both,
    /// `(lower, upper]`, intervals after the dead zone
    Right,
}

/// One weighted sub-interval of the accuracy window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedInterval {
    pub lower_us: i64,
    pub upper_us: i64,
    pub weight: f64,
    pub closure: Closure,
}

impl WeightedInterval {
    fn contains(&self, offset_us: i64) -> bool {
        match self.closure {
            Closure::Left => self.lower_us <= offset_us && offset_us < self.upper_us,
            Closure::Both => self.lower_us <= offset_us && offset_us <= self.upper_us,
            Closure::Right => self.lower_us < offset_us && offset_us <= self.upper_us,
        }
    }
}

/// Immutable accuracy-window configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WindowSpec", into = "WindowSpec")]
pub struct WindowConfig {
    partition: Vec<f64>,
    weights: Vec<f64>,
    intervals: Vec<WeightedInterval>,
    window_size: f64,
}

#[derive(Serialize, Deserialize)]
struct WindowSpec {
    partition: Vec<f64>,
    weights: Vec<f64>,
}

impl TryFrom<WindowSpec> for WindowConfig {
    type Error = ComputeError;

    fn try_from(spec: WindowSpec) -> Result<Self, Self::Error> {
        WindowConfig::new(spec.partition, spec.weights)
    }
}

impl From<WindowConfig> for WindowSpec {
    fn from(config: WindowConfig) -> Self {
        WindowSpec {
            partition: config.partition,
            weights: config.weights,
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        let partition = DEFAULT_PARTITION.to_vec();
        let weights = DEFAULT_WEIGHTS.to_vec();
        let intervals = build_intervals(&partition, &weights, 3);
        let window_size = compute_window_size(&partition, &weights);
        Self {
            partition,
            weights,
            intervals,
            window_size,
        }
    }
}

impl WindowConfig {
    /// Build a window from `n + 1` increasing boundaries and `n` weights.
    ///
    /// Exactly one sub-interval must straddle zero offset; it becomes the
    /// dead zone, closed on both ends.
    pub fn new(partition: Vec<f64>, weights: Vec<f64>) -> Result<Self, ComputeError> {
        if weights.is_empty() || partition.len() != weights.len() + 1 {
            return Err(ComputeError::ConfigError(format!(
                "window needs one more boundary than weights, got {} boundaries and {} weights",
                partition.len(),
                weights.len()
            )));
        }
        if partition.iter().chain(&weights).any(|v| !v.is_finite()) {
            return Err(ComputeError::ConfigError(
                "window boundaries and weights must be finite".to_string(),
            ));
        }
        if weights.iter().any(|&w| w < 0.0) {
            return Err(ComputeError::ConfigError(
                "window weights must be non-negative".to_string(),
            ));
        }
        if partition.windows(2).any(|pair| to_micros(pair[0]) >= to_micros(pair[1])) {
            return Err(ComputeError::ConfigError(
                "window boundaries must be strictly increasing".to_string(),
            ));
        }

        let dead_zone = partition
            .windows(2)
            .position(|pair| pair[0] < 0.0 && pair[1] > 0.0)
            .ok_or_else(|| {
                ComputeError::ConfigError("no window interval straddles zero offset".to_string())
            })?;

        let intervals = build_intervals(&partition, &weights, dead_zone);
        let window_size = compute_window_size(&partition, &weights);
        if window_size <= 0.0 {
            return Err(ComputeError::ConfigError(
                "window size must be positive".to_string(),
            ));
        }

        Ok(Self {
            partition,
            weights,
            intervals,
            window_size,
        })
    }

    pub fn partition(&self) -> &[f64] {
        &self.partition
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn intervals(&self) -> &[WeightedInterval] {
        &self.intervals
    }

    /// Normalizing denominator: `Σ interval_width × weight`
    pub fn window_size(&self) -> f64 {
        self.window_size
    }

    /// Weight for a neighbor `offset_us` microseconds from the center, if
    /// it falls inside the window.
    pub fn weight_at(&self, offset_us: i64) -> Option<f64> {
        self.intervals
            .iter()
            .find(|interval| interval.contains(offset_us))
            .map(|interval| interval.weight)
    }

    fn lower_us(&self) -> i64 {
        self.intervals.first().map_or(0, |i| i.lower_us)
    }

    fn upper_us(&self) -> i64 {
        self.intervals.last().map_or(0, |i| i.upper_us)
    }
}

fn build_intervals(partition: &[f64], weights: &[f64], dead_zone: usize) -> Vec<WeightedInterval> {
    partition
        .windows(2)
        .zip(weights)
        .enumerate()
        .map(|(k, (bounds, &weight))| WeightedInterval {
            lower_us: to_micros(bounds[0]),
            upper_us: to_micros(bounds[1]),
            weight,
            closure: match k.cmp(&dead_zone) {
                Ordering::Less => Closure::Left,
                Ordering::Equal => Closure::Both,
                Ordering::Greater => Closure::Right,
            },
        })
        .collect()
}

fn compute_window_size(partition: &[f64], weights: &[f64]) -> f64 {
    partition
        .windows(2)
        .zip(weights)
        .map(|(bounds, weight)| (bounds[1] - bounds[0]) * weight)
        .sum()
}

fn to_micros(seconds: f64) -> i64 {
    (seconds * 1e6).round() as i64
}

/// Windowed, weighted note-interaction density
#[derive(Debug, Clone, Default)]
pub struct HorizontalDensity {
    window: WindowConfig,
}

impl HorizontalDensity {
    pub fn new(window: WindowConfig) -> Self {
        Self { window }
    }

    pub fn window(&self) -> &WindowConfig {
        &self.window
    }

    /// Raw (unnormalized) interference score per chord
    pub fn raw_scores(&self, stepfile: &Stepfile) -> Vec<f64> {
        let notes = stepfile.notes();
        let times: Vec<i64> = notes.iter().map(|n| to_micros(n.time())).collect();
        let (lower, upper) = (self.window.lower_us(), self.window.upper_us());

        let mut start = 0;
        times
            .iter()
            .map(|&center| {
                while times[start] - center < lower {
                    start += 1;
                }
                let mut score = 0.0;
                for (neighbor, &time) in notes[start..].iter().zip(&times[start..]) {
                    let offset = time - center;
                    if offset > upper {
                        break;
                    }
                    if let Some(weight) = self.window.weight_at(offset) {
                        score += neighbor.tap_count() as f64 * weight;
                    }
                }
                score
            })
            .collect()
    }
}

impl DensityCalculator for HorizontalDensity {
    fn name(&self) -> &'static str {
        "horizontal"
    }

    fn compute(&self, stepfile: &Stepfile) -> Result<Vec<f64>, ComputeError> {
        ensure_keytaps(stepfile, self.name())?;

        let window_size = self.window.window_size();
        let mut densities = Vec::with_capacity(stepfile.len());
        for (note, score) in stepfile.notes().iter().zip(self.raw_scores(stepfile)) {
            let density = score / window_size;
            densities.extend(std::iter::repeat(density).take(note.tap_count()));
        }
        Ok(densities)
    }
}
