//! Plain keytap record adapter
//!
//! Accepts either a bare array of `{time, step}` records or a full chart
//! document.

use crate::error::ComputeError;
use crate::schema::{ChartDocument, ChartRecord};

use super::ChartPayloadAdapter;

/// Keytap record payload adapter
pub struct RecordAdapter;

impl ChartPayloadAdapter for RecordAdapter {
    fn parse(&self, raw_json: &str) -> Result<ChartDocument, ComputeError> {
        // decode by shape so serde reports the field that is actually wrong
        if raw_json.trim_start().starts_with('{') {
            serde_json::from_str::<ChartDocument>(raw_json)
                .map_err(|e| ComputeError::ParseError(format!("invalid chart document: {e}")))
        } else {
            serde_json::from_str::<Vec<ChartRecord>>(raw_json)
                .map(ChartDocument::new)
                .map_err(|e| ComputeError::ParseError(format!("invalid record list: {e}")))
        }
    }
}
