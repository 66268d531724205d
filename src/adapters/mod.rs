//! Chart payload adapters
//!
//! This module provides adapters that parse raw upstream chart JSON and map it
//! to [`ChartDocument`]s of keytap records.

mod ffr;
mod records;

pub use ffr::FfrAdapter;
pub use records::RecordAdapter;

use crate::error::ComputeError;
use crate::schema::ChartDocument;

/// Trait for upstream chart payload adapters
pub trait ChartPayloadAdapter {
    /// Parse raw JSON into a chart document
    fn parse(&self, raw_json: &str) -> Result<ChartDocument, ComputeError>;
}
