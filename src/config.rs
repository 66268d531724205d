//! Engine configuration
//!
//! Everything the feature engine can be tuned with, loadable from a JSON
//! file. Missing fields fall back to the defaults used by the published
//! difficulty model.

use crate::aggregate::{default_aggregations, Aggregation};
use crate::density::WindowConfig;
use crate::error::ComputeError;
use crate::note::{DEFAULT_CHANNELS, MAX_CHANNELS};
use crate::stepfile::ZERO_FRAMER_EPSILON;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Receptor channels per step
    pub num_channels: usize,
    /// Offset applied per zero-framer duplicate (seconds)
    pub epsilon: f64,
    /// Horizontal accuracy window
    pub window: WindowConfig,
    /// Statistics computed per feature column
    pub aggregations: Vec<Aggregation>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            num_channels: DEFAULT_CHANNELS,
            epsilon: ZERO_FRAMER_EPSILON,
            window: WindowConfig::default(),
            aggregations: default_aggregations(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ComputeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ComputeError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let config: Self = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ComputeError> {
        let mut file = File::create(path)?;
        file.write_all(self.to_json()?.as_bytes())?;
        Ok(())
    }

    /// Check the values serde cannot
    pub fn validate(&self) -> Result<(), ComputeError> {
        if self.num_channels == 0 || self.num_channels > MAX_CHANNELS {
            return Err(ComputeError::ConfigError(format!(
                "num_channels must be within 1..={MAX_CHANNELS}, got {}",
                self.num_channels
            )));
        }
        if !self.epsilon.is_finite() || self.epsilon <= 0.0 {
            return Err(ComputeError::ConfigError(format!(
                "epsilon must be a positive number, got {}",
                self.epsilon
            )));
        }
        if self.aggregations.is_empty() {
            return Err(ComputeError::ConfigError(
                "at least one aggregation is required".to_string(),
            ));
        }
        self.aggregations.iter().try_for_each(Aggregation::validate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.num_channels, 4);
        assert_eq!(config.epsilon, 1e-6);
        assert_eq!(config.window, WindowConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EngineConfig::from_json(r#"{"num_channels": 6}"#).unwrap();
        assert_eq!(config.num_channels, 6);
        assert_eq!(config.aggregations, default_aggregations());
    }

    #[test]
    fn test_json_round_trip() {
        let config = EngineConfig {
            aggregations: vec![Aggregation::Median, Aggregation::Quantile(0.25)],
            ..EngineConfig::default()
        };
        let parsed = EngineConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_invalid_values() {
        assert!(EngineConfig::from_json(r#"{"num_channels": 0}"#).is_err());
        assert!(EngineConfig::from_json(r#"{"num_channels": 33}"#).is_err());
        assert!(EngineConfig::from_json(r#"{"epsilon": 0.0}"#).is_err());
        assert!(EngineConfig::from_json(r#"{"aggregations": []}"#).is_err());
        assert!(EngineConfig::from_json(r#"{"aggregations": [{"quantile": 2.0}]}"#).is_err());
        assert!(EngineConfig::from_json(r#"{"window": {"partition": [0.1], "weights": []}}"#).is_err());
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("acubed-config-{}.json", std::process::id()));
        let config = EngineConfig {
            epsilon: 1e-5,
            ..EngineConfig::default()
        };
        config.save(&path).unwrap();
        let loaded = EngineConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = EngineConfig::load("/nonexistent/acubed.json");
        assert!(matches!(result, Err(ComputeError::Io(_))));
    }
}
