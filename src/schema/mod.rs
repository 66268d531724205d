//! Chart input schema
//!
//! A chart reaches the engine as a list of keytap records, one per physical
//! keytap: a two-key jump appears as two records sharing a timestamp.
//! Documents carry the chart plus optional catalogue metadata.

mod adapter;
mod record;

pub use adapter::*;
pub use record::*;
