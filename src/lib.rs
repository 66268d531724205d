//! ACubed - Automated difficulty features for rhythm game stepfiles
//!
//! ACubed turns raw keytap charts into per-keytap density features through a
//! deterministic pipeline: chart adaptation → zero-framer correction and chord
//! aggregation → vertical/horizontal density → per-chart summary → JSON encoding.
//!
//! ## Modules
//!
//! - **Core model**: [`note`] and [`stepfile`] hold validated, aggregated charts
//! - **Densities**: [`density`] computes vertical and horizontal density per keytap
//! - **Pipeline**: [`pipeline`] runs single charts or parallel batches end to end

pub mod adapters;
pub mod aggregate;
pub mod config;
pub mod density;
pub mod encoder;
pub mod error;
pub mod features;
pub mod note;
pub mod pipeline;
pub mod schema;
pub mod stepfile;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::EngineConfig;
pub use density::{DensityCalculator, HorizontalDensity, VerticalDensity, WindowConfig};
pub use error::{ComputeError, ValidationError};
pub use note::{Note, Step};
pub use pipeline::{chart_to_features, ffr_chart_to_features, ChartProcessor};
pub use stepfile::Stepfile;

// Schema exports
pub use schema::{ChartAdapter, ChartDocument, ChartRecord, SCHEMA_VERSION};

/// ACubed version embedded in all feature payloads
pub const ACUBED_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for feature payloads
pub const PRODUCER_NAME: &str = "acubed";
