//! Reference tables for coded field values
//!
//! Cover classes and proximity codes map to numeric weights plus a presence
//! flag. Callers may supply their own tables; the defaults follow the field
//! protocol's class midpoints.

use crate::data::Observation;
use crate::error::{PhabError, Result};
use crate::utils::coercion::normalize_code;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Numeric weight and presence flag for one code
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CodeWeight {
    pub weight: f64,
    pub present: bool,
}

/// Raw code -> weight/presence lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeTable {
    #[serde(flatten)]
    codes: BTreeMap<String, CodeWeight>,
}

impl CodeTable {
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = (&'a str, f64, bool)>) -> Self {
        let codes = entries
            .into_iter()
            .map(|(code, weight, present)| (normalize_code(code), CodeWeight { weight, present }))
            .collect();
        Self { codes }
    }

    /// Areal cover classes 0-4 (absent, <10%, 10-40%, 40-75%, >75%).
    pub fn cover_classes() -> Self {
        Self::from_entries([
            ("0", 0.0, false),
            ("1", 0.05, true),
            ("2", 0.25, true),
            ("3", 0.575, true),
            ("4", 0.875, true),
        ])
    }

    /// Human influence proximity: absent, adjacent/behind plot, within plot.
    pub fn proximity_classes() -> Self {
        Self::from_entries([("0", 0.0, false), ("C", 0.5, true), ("P", 1.0, true)])
    }

    pub fn lookup(&self, obs: &Observation) -> Result<CodeWeight> {
        self.codes
            .get(&normalize_code(&obs.value))
            .copied()
            .ok_or_else(|| PhabError::InvalidCodeValue {
                site: obs.site.clone(),
                parameter: obs.parameter.clone(),
                value: obs.value.clone(),
            })
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// Reference tables handed to the aggregators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceTables {
    pub cover: CodeTable,
    pub proximity: CodeTable,
}

impl Default for ReferenceTables {
    fn default() -> Self {
        Self {
            cover: CodeTable::cover_classes(),
            proximity: CodeTable::proximity_classes(),
        }
    }
}

/// Closed set of class codes, optionally with a catch-all bucket
#[derive(Debug, Clone, Copy)]
pub struct Vocabulary {
    pub codes: &'static [&'static str],
    pub catch_all: Option<&'static str>,
}

impl Vocabulary {
    pub const fn closed(codes: &'static [&'static str]) -> Self {
        Self { codes, catch_all: None }
    }

    pub const fn with_catch_all(codes: &'static [&'static str], catch_all: &'static str) -> Self {
        Self {
            codes,
            catch_all: Some(catch_all),
        }
    }

    /// Class code for an observation. Unknown values land in the catch-all
    /// bucket when there is one, otherwise fail with `InvalidCodeValue`.
    pub fn classify(&self, obs: &Observation) -> Result<&'static str> {
        let code = normalize_code(&obs.value);
        if let Some(known) = self.codes.iter().find(|c| **c == code) {
            return Ok(known);
        }
        match self.catch_all {
            Some(other) => {
                tracing::warn!(
                    "Unrecognized {} value '{}' at site {}, counted as {}",
                    obs.parameter,
                    obs.value,
                    obs.site,
                    other
                );
                Ok(other)
            }
            None => Err(PhabError::InvalidCodeValue {
                site: obs.site.clone(),
                parameter: obs.parameter.clone(),
                value: obs.value.clone(),
            }),
        }
    }
}
