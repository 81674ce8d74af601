//! Metric Table assembly
//!
//! Aggregator outputs are concatenated into one long table (site, metric,
//! value), then pivoted to one row per site. Wide columns are numeric unless
//! the metric is in the categorical exclusion set; a numeric column holding a
//! non-numeric value is a misclassified metric and fails the pivot.

use crate::data::SITE_COLUMN;
use crate::error::{PhabError, Result};
use crate::utils::coercion::{format_numeric, is_missing_value};
use polars::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

pub const METRIC_COLUMN: &str = "METRIC";
pub const VALUE_COLUMN: &str = "VALUE";

/// Metrics carrying class labels rather than numbers.
pub const DEFAULT_CATEGORICAL_METRICS: &[&str] = &[
    "BFOANGLE",
    "BKACLASS",
    "LSSDOMINANT",
    "SSSDOMINANT_RIP",
    "SSSDOMINANT_DD",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ValueKind {
    Numeric,
    Categorical,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MetricValue {
    Numeric(f64),
    Categorical(String),
}

impl MetricValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            MetricValue::Numeric(_) => ValueKind::Numeric,
            MetricValue::Categorical(_) => ValueKind::Categorical,
        }
    }

    /// Boundary representation; numbers re-parse to the same f64.
    pub fn to_text(&self) -> String {
        match self {
            MetricValue::Numeric(v) => format_numeric(*v),
            MetricValue::Categorical(s) => s.clone(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Numeric(v) => Some(*v),
            MetricValue::Categorical(_) => None,
        }
    }
}

/// One derived value for one site
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub site: String,
    pub name: String,
    pub value: MetricValue,
}

/// Long-format metric table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricTable {
    metrics: Vec<Metric>,
}

impl MetricTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a numeric metric; non-finite values are treated as missing.
    pub fn push_numeric(&mut self, site: &str, name: impl Into<String>, value: f64) {
        if value.is_finite() {
            self.metrics.push(Metric {
                site: site.to_string(),
                name: name.into(),
                value: MetricValue::Numeric(value),
            });
        }
    }

    pub fn push_categorical(&mut self, site: &str, name: impl Into<String>, value: impl Into<String>) {
        self.metrics.push(Metric {
            site: site.to_string(),
            name: name.into(),
            value: MetricValue::Categorical(value.into()),
        });
    }

    pub fn push_optional(&mut self, site: &str, name: impl Into<String>, value: Option<f64>) {
        if let Some(v) = value {
            self.push_numeric(site, name, v);
        }
    }

    pub fn extend(&mut self, other: MetricTable) {
        self.metrics.extend(other.metrics);
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn get(&self, site: &str, name: &str) -> Option<&MetricValue> {
        self.metrics
            .iter()
            .find(|m| m.site == site && m.name == name)
            .map(|m| &m.value)
    }

    pub fn numeric(&self, site: &str, name: &str) -> Option<f64> {
        self.get(site, name).and_then(MetricValue::as_f64)
    }

    pub fn names(&self) -> BTreeSet<&str> {
        self.metrics.iter().map(|m| m.name.as_str()).collect()
    }

    pub fn sites(&self) -> BTreeSet<&str> {
        self.metrics.iter().map(|m| m.site.as_str()).collect()
    }

    /// (site, metric, text value) triples, for comparing tables.
    pub fn triples(&self) -> BTreeSet<(String, String, String)> {
        self.metrics
            .iter()
            .map(|m| (m.site.clone(), m.name.clone(), m.value.to_text()))
            .collect()
    }

    pub fn sort(&mut self) {
        self.metrics
            .sort_by(|a, b| (&a.site, &a.name).cmp(&(&b.site, &b.name)));
    }

    /// Fails on a repeated (site, metric) pair.
    pub fn check_unique(&self) -> Result<()> {
        let mut seen: FxHashSet<(&str, &str)> = FxHashSet::default();
        for m in &self.metrics {
            if !seen.insert((&m.site, &m.name)) {
                return Err(PhabError::schema(format!(
                    "Metric {} appears twice for site {}",
                    m.name, m.site
                )));
            }
        }
        Ok(())
    }

    /// Long DataFrame `SITE_ID`, `METRIC`, `VALUE` with text values.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let sites: Vec<String> = self.metrics.iter().map(|m| m.site.clone()).collect();
        let names: Vec<String> = self.metrics.iter().map(|m| m.name.clone()).collect();
        let values: Vec<String> = self.metrics.iter().map(|m| m.value.to_text()).collect();

        Ok(DataFrame::new(vec![
            Column::new(SITE_COLUMN.into(), sites),
            Column::new(METRIC_COLUMN.into(), names),
            Column::new(VALUE_COLUMN.into(), values),
        ])?)
    }

    /// Read a long DataFrame; value kinds follow the exclusion set.
    pub fn from_dataframe(df: &DataFrame, categorical: &CategoricalMetrics) -> Result<Self> {
        let read = |name: &str| -> Result<Column> {
            let column = df
                .column(name)
                .map_err(|_| PhabError::schema(format!("Missing column '{}'", name)))?;
            Ok(column.cast(&DataType::String)?)
        };
        let site_col = read(SITE_COLUMN)?;
        let name_col = read(METRIC_COLUMN)?;
        let value_col = read(VALUE_COLUMN)?;
        let (sites, names, values) = (site_col.str()?, name_col.str()?, value_col.str()?);

        let mut table = MetricTable::new();
        for idx in 0..df.height() {
            let (Some(site), Some(name), Some(value)) =
                (sites.get(idx), names.get(idx), values.get(idx))
            else {
                continue;
            };
            if is_missing_value(value) {
                continue;
            }
            if categorical.contains(name) {
                table.push_categorical(site, name, value);
            } else {
                table.push_numeric(site, name, coerce_numeric(site, name, value)?);
            }
        }
        Ok(table)
    }
}

/// Names of metrics kept as text in the wide table
#[derive(Debug, Clone)]
pub struct CategoricalMetrics {
    names: FxHashSet<String>,
}

impl Default for CategoricalMetrics {
    fn default() -> Self {
        Self {
            names: DEFAULT_CATEGORICAL_METRICS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl CategoricalMetrics {
    pub fn with_extra<'a>(extra: impl IntoIterator<Item = &'a str>) -> Self {
        let mut set = Self::default();
        set.names.extend(extra.into_iter().map(str::to_string));
        set
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }
}

/// Concatenate aggregator outputs (outer union of sites), reject duplicate
/// keys and order by (site, metric).
pub fn assemble(tables: impl IntoIterator<Item = MetricTable>) -> Result<MetricTable> {
    let mut combined = MetricTable::new();
    for table in tables {
        combined.extend(table);
    }
    combined.check_unique()?;
    combined.sort();
    Ok(combined)
}

/// One wide column, aligned with `WideMetricTable::sites`
#[derive(Debug, Clone, PartialEq)]
pub enum WideColumn {
    Numeric(Vec<Option<f64>>),
    Categorical(Vec<Option<String>>),
}

impl WideColumn {
    pub fn kind(&self) -> ValueKind {
        match self {
            WideColumn::Numeric(_) => ValueKind::Numeric,
            WideColumn::Categorical(_) => ValueKind::Categorical,
        }
    }
}

/// Wide metric table: one row per site, one column per metric
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WideMetricTable {
    sites: Vec<String>,
    site_index: FxHashMap<String, usize>,
    columns: BTreeMap<String, WideColumn>,
}

impl WideMetricTable {
    /// Pivot long -> wide with per-column type coercion.
    pub fn pivot(long: &MetricTable, categorical: &CategoricalMetrics) -> Result<Self> {
        long.check_unique()?;

        let sites: Vec<String> = long.sites().into_iter().map(str::to_string).collect();
        let site_index: FxHashMap<String, usize> = sites
            .iter()
            .enumerate()
            .map(|(i, s)| (s.clone(), i))
            .collect();
        let n = sites.len();

        let mut columns: BTreeMap<String, WideColumn> = BTreeMap::new();
        for metric in long.metrics() {
            let row = site_index[&metric.site];
            let text = metric.value.to_text();
            let column = columns.entry(metric.name.clone()).or_insert_with(|| {
                if categorical.contains(&metric.name) {
                    WideColumn::Categorical(vec![None; n])
                } else {
                    WideColumn::Numeric(vec![None; n])
                }
            });
            match column {
                WideColumn::Numeric(values) => {
                    values[row] = Some(coerce_numeric(&metric.site, &metric.name, &text)?);
                }
                WideColumn::Categorical(values) => values[row] = Some(text),
            }
        }

        Ok(Self {
            sites,
            site_index,
            columns,
        })
    }

    pub fn sites(&self) -> &[String] {
        &self.sites
    }

    pub fn has_site(&self, site: &str) -> bool {
        self.site_index.contains_key(site)
    }

    pub fn column(&self, name: &str) -> Option<&WideColumn> {
        self.columns.get(name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn numeric(&self, site: &str, metric: &str) -> Option<f64> {
        let row = *self.site_index.get(site)?;
        match self.columns.get(metric)? {
            WideColumn::Numeric(values) => values[row],
            WideColumn::Categorical(_) => None,
        }
    }

    pub fn categorical(&self, site: &str, metric: &str) -> Option<&str> {
        let row = *self.site_index.get(site)?;
        match self.columns.get(metric)? {
            WideColumn::Categorical(values) => values[row].as_deref(),
            WideColumn::Numeric(_) => None,
        }
    }

    /// Wide -> long, dropping empty cells.
    pub fn melt(&self) -> MetricTable {
        let mut long = MetricTable::new();
        for (name, column) in &self.columns {
            for (row, site) in self.sites.iter().enumerate() {
                match column {
                    WideColumn::Numeric(values) => long.push_optional(site, name.as_str(), values[row]),
                    WideColumn::Categorical(values) => {
                        if let Some(v) = &values[row] {
                            long.push_categorical(site, name.as_str(), v.as_str());
                        }
                    }
                }
            }
        }
        long.sort();
        long
    }

    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut columns = Vec::with_capacity(self.columns.len() + 1);
        columns.push(Column::new(SITE_COLUMN.into(), self.sites.clone()));
        for (name, column) in &self.columns {
            columns.push(match column {
                WideColumn::Numeric(values) => Column::new(name.as_str().into(), values.clone()),
                WideColumn::Categorical(values) => Column::new(name.as_str().into(), values.clone()),
            });
        }
        Ok(DataFrame::new(columns)?)
    }

    /// Read a wide DataFrame; String columns stay categorical, all other
    /// dtypes are cast to Float64.
    pub fn from_dataframe(df: &DataFrame) -> Result<Self> {
        let site_col = df
            .column(SITE_COLUMN)
            .map_err(|_| PhabError::schema(format!("Missing column '{}'", SITE_COLUMN)))?
            .cast(&DataType::String)?;
        let mut sites = Vec::with_capacity(df.height());
        for site in site_col.str()?.into_iter() {
            let site = site.ok_or_else(|| PhabError::schema("Null site id in wide table"))?;
            sites.push(site.to_string());
        }
        let site_index: FxHashMap<String, usize> = sites
            .iter()
            .enumerate()
            .map(|(i, s)| (s.clone(), i))
            .collect();
        if site_index.len() != sites.len() {
            return Err(PhabError::schema("Duplicate site rows in wide table"));
        }

        let mut columns = BTreeMap::new();
        for column in df.get_columns() {
            let name = column.name().as_str();
            if name == SITE_COLUMN {
                continue;
            }
            let wide = match column.dtype() {
                DataType::String => WideColumn::Categorical(
                    column
                        .str()?
                        .into_iter()
                        .map(|v| v.map(str::to_string))
                        .collect(),
                ),
                _ => {
                    let cast = column.cast(&DataType::Float64)?;
                    WideColumn::Numeric(
                        cast.f64()?
                            .into_iter()
                            .map(|v| v.filter(|x| x.is_finite()))
                            .collect(),
                    )
                }
            };
            columns.insert(name.to_string(), wide);
        }

        Ok(Self {
            sites,
            site_index,
            columns,
        })
    }
}

/// Finite numbers only: `NaN`/`inf` text is a label, not a value.
fn coerce_numeric(site: &str, metric: &str, text: &str) -> Result<f64> {
    match text.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(PhabError::schema(format!(
            "Metric {} is classified numeric but has value '{}' at site {}",
            metric, text, site
        ))),
    }
}
