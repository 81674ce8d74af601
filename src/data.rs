//! Observation Table loading and slicing
//!
//! Raw field observations arrive in long format: one row per
//! (site, sub-unit, parameter) with an untyped text value. Parameter names
//! carry the measurement category as a prefix (`FC_`, `HI_`, ...) and the
//! zone as a suffix (none = standard zone, `_DD` = drawdown zone).
//!
//! Values are kept as text here; each aggregator coerces per parameter.

use crate::error::{PhabError, Result};
use crate::utils::coercion::is_missing_value;
use anyhow::Context;
use polars::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use std::collections::BTreeSet;
use std::path::Path;

pub const SITE_COLUMN: &str = "SITE_ID";
pub const PARAMETER_COLUMN: &str = "PARAMETER";
pub const RESULT_COLUMN: &str = "RESULT";
pub const DEFAULT_KEY_COLUMNS: &[&str] = &["STATION"];
pub const DRAWDOWN_SUFFIX: &str = "_DD";

/// Spatial zone a parameter was measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Zone {
    Standard,
    Drawdown,
}

impl Zone {
    pub fn of_parameter(parameter: &str) -> Zone {
        if parameter.ends_with(DRAWDOWN_SUFFIX) {
            Zone::Drawdown
        } else {
            Zone::Standard
        }
    }

    /// Parameter name for `base` in this zone (`FC_SNAGS` -> `FC_SNAGS_DD`).
    pub fn parameter_name(self, base: &str) -> String {
        match self {
            Zone::Standard => base.to_string(),
            Zone::Drawdown => format!("{}{}", base, DRAWDOWN_SUFFIX),
        }
    }
}

/// A single raw field observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub site: String,
    /// Transect/station/bank discriminators joined with `/`; empty when absent.
    pub sub_unit: String,
    pub parameter: String,
    pub value: String,
}

impl Observation {
    pub fn new(
        site: impl Into<String>,
        sub_unit: impl Into<String>,
        parameter: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            site: site.into(),
            sub_unit: sub_unit.into(),
            parameter: parameter.into(),
            value: value.into(),
        }
    }
}

/// Normalized long-format observation set
#[derive(Debug, Clone, Default)]
pub struct ObservationTable {
    rows: Vec<Observation>,
}

impl ObservationTable {
    /// Build from rows, dropping blank/`NA` values (absent observations).
    pub fn new(rows: Vec<Observation>) -> Self {
        let rows = rows
            .into_iter()
            .filter(|obs| !is_missing_value(&obs.value))
            .collect();
        Self { rows }
    }

    /// Read a long DataFrame with `SITE_ID`, `PARAMETER`, `RESULT` and the
    /// given sub-unit key columns. Non-string columns are cast to text.
    pub fn from_dataframe(df: &DataFrame, key_columns: &[&str]) -> Result<Self> {
        let site_col = string_column(df, SITE_COLUMN)?;
        let param_col = string_column(df, PARAMETER_COLUMN)?;
        let value_col = string_column(df, RESULT_COLUMN)?;
        let key_cols = key_columns
            .iter()
            .map(|name| string_column(df, name))
            .collect::<Result<Vec<_>>>()?;

        let sites = site_col.str()?;
        let params = param_col.str()?;
        let values = value_col.str()?;
        let keys = key_cols
            .iter()
            .map(|c| c.str())
            .collect::<PolarsResult<Vec<_>>>()?;

        let mut rows = Vec::with_capacity(df.height());
        for idx in 0..df.height() {
            // null keys stay blank so validation can reject them
            let site = sites.get(idx).unwrap_or("");
            let param = params.get(idx).unwrap_or("");
            let Some(value) = values.get(idx) else {
                continue;
            };

            let parts: SmallVec<[&str; 4]> = keys
                .iter()
                .map(|k| k.get(idx).unwrap_or(""))
                .collect();

            rows.push(Observation::new(
                site.trim(),
                parts.join("/"),
                param.trim(),
                value.trim(),
            ));
        }

        Ok(Self::new(rows))
    }

    /// Load a long-format CSV with every column read as text.
    pub fn load_csv(path: &Path, key_columns: &[&str]) -> anyhow::Result<Self> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .try_into_reader_with_file_path(Some(path.into()))
            .with_context(|| format!("Failed to create CSV reader: {:?}", path))?
            .finish()
            .with_context(|| format!("Failed to load observations CSV: {:?}", path))?;

        Self::from_dataframe(&df, key_columns)
            .with_context(|| format!("Malformed observation table: {:?}", path))
    }

    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct site ids, sorted.
    pub fn sites(&self) -> BTreeSet<&str> {
        self.rows.iter().map(|o| o.site.as_str()).collect()
    }

    /// Input-shape validation: non-empty site ids and parameters, unique
    /// (site, sub-unit, parameter) triples.
    pub fn validate(&self) -> Result<()> {
        let mut seen: FxHashSet<(&str, &str, &str)> = FxHashSet::default();
        for obs in &self.rows {
            if obs.site.is_empty() {
                return Err(PhabError::schema(format!(
                    "Observation of {} has an empty site id",
                    obs.parameter
                )));
            }
            if obs.parameter.is_empty() {
                return Err(PhabError::schema(format!(
                    "Observation at site {} has an empty parameter name",
                    obs.site
                )));
            }
            if !seen.insert((&obs.site, &obs.sub_unit, &obs.parameter)) {
                return Err(PhabError::schema(format!(
                    "Duplicate observation for site {} sub-unit '{}' parameter {}",
                    obs.site, obs.sub_unit, obs.parameter
                )));
            }
        }
        Ok(())
    }

    /// Copy without rows lacking a site id or parameter; `None` when every
    /// row has both.
    pub fn without_blank_keys(&self) -> Option<Self> {
        let blank = |o: &Observation| o.site.is_empty() || o.parameter.is_empty();
        let dropped = self.rows.iter().filter(|o| blank(o)).count();
        if dropped == 0 {
            return None;
        }
        tracing::debug!("Dropping {} observations without site id or parameter", dropped);
        Some(Self {
            rows: self.rows.iter().filter(|o| !blank(o)).cloned().collect(),
        })
    }

    /// Borrowing view of the rows whose parameter starts with `prefix`.
    pub fn category_slice(&self, prefix: &str) -> CategorySlice<'_> {
        let mut by_parameter: FxHashMap<&str, Vec<&Observation>> = FxHashMap::default();
        for obs in self.rows.iter().filter(|o| o.parameter.starts_with(prefix)) {
            by_parameter.entry(obs.parameter.as_str()).or_default().push(obs);
        }
        CategorySlice { by_parameter }
    }
}

/// Observations of one category, grouped by parameter name
#[derive(Debug, Default)]
pub struct CategorySlice<'a> {
    by_parameter: FxHashMap<&'a str, Vec<&'a Observation>>,
}

impl<'a> CategorySlice<'a> {
    /// Rows for one parameter (empty when the parameter was not sampled).
    pub fn parameter(&self, name: &str) -> &[&'a Observation] {
        self.by_parameter.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Parameter names present, sorted.
    pub fn parameters(&self) -> Vec<&'a str> {
        let mut names: Vec<&str> = self.by_parameter.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.by_parameter.is_empty()
    }

    pub fn sites(&self) -> BTreeSet<&'a str> {
        self.by_parameter
            .values()
            .flatten()
            .map(|o| o.site.as_str())
            .collect()
    }
}

fn string_column(df: &DataFrame, name: &str) -> Result<Column> {
    let column = df
        .column(name)
        .map_err(|_| PhabError::schema(format!("Missing column '{}'", name)))?;
    Ok(column.cast(&DataType::String)?)
}
