//! Text-to-value coercion at the observation boundary

use crate::data::Observation;
use crate::error::{PhabError, Result};

/// Blank, `NA` and `.` mark an absent observation.
pub fn is_missing_value(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("NA") || trimmed == "."
}

/// Read an observation as a finite number.
pub fn parse_numeric(obs: &Observation) -> Result<f64> {
    match obs.value.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(PhabError::TypeCoercion {
            site: obs.site.clone(),
            parameter: obs.parameter.clone(),
            value: obs.value.clone(),
        }),
    }
}

/// Canonical form of a coded value (`" p "` -> `"P"`).
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// Shortest text that parses back to exactly `value`.
pub fn format_numeric(value: f64) -> String {
    format!("{}", value)
}
