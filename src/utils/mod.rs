//! Utility modules shared across aggregators
//!
//! - Coercion: text values to numbers and canonical codes
//! - Reference: code weight tables and closed vocabularies
//! - Summary: per-site statistics over one parameter

pub mod coercion;
pub mod reference;
pub mod summary;

// Re-export commonly used types
pub use coercion::{format_numeric, is_missing_value, parse_numeric};
pub use reference::{CodeTable, CodeWeight, ReferenceTables, Vocabulary};
pub use summary::{ClassTally, CoverSummary, NumericSummary, ZoneStat};
