//! Error taxonomy for metric aggregation and indicator assessment
//!
//! Aggregation-time data errors (`InvalidCodeValue`, `TypeCoercion`, `Schema`)
//! are fatal to the call that raised them. `MissingRequiredInput` is the typed
//! form of a per-site gap; indicator calculators turn it into a Not Assessed
//! result instead of failing the batch.

use polars::prelude::PolarsError;
use thiserror::Error;

/// Errors raised by the habitat metric pipeline.
#[derive(Debug, Error)]
pub enum PhabError {
    /// A categorical observation outside its defined vocabulary.
    #[error("Invalid code '{value}' for {parameter} at site {site}")]
    InvalidCodeValue {
        site: String,
        parameter: String,
        value: String,
    },

    /// A value that cannot be read as the number its parameter requires.
    #[error("Cannot coerce '{value}' to a number for {parameter} at site {site}")]
    TypeCoercion {
        site: String,
        parameter: String,
        value: String,
    },

    /// Misclassified metric, absent column, duplicate key or bad artifact.
    #[error("Schema error: {reason}")]
    Schema { reason: String },

    #[error("Missing required input '{input}' for site {site}")]
    MissingRequiredInput { site: String, input: String },

    #[error(transparent)]
    Polars(#[from] PolarsError),
}

impl PhabError {
    pub fn schema(reason: impl Into<String>) -> Self {
        PhabError::Schema {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PhabError>;
