//! Site covariates and the site-keyed join with the wide metric table
//!
//! Covariates are resolved upstream (ecoregion, lake origin, location,
//! elevation, area) and arrive one row per site. The join with metrics is an
//! explicit outer join: every site of either table appears once, and each
//! lookup reports *which* input is missing instead of yielding a bare null.

use crate::assembler::WideMetricTable;
use crate::data::SITE_COLUMN;
use crate::error::{PhabError, Result};
use crate::utils::coercion::{is_missing_value, normalize_code};
use anyhow::Context;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

pub const ECOREGION_COLUMN: &str = "ECOREGION";
pub const ORIGIN_COLUMN: &str = "LAKE_ORIGIN";

/// Lake origin class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Origin {
    Natural,
    ManMade,
}

impl Origin {
    pub fn as_str(self) -> &'static str {
        match self {
            Origin::Natural => "NATURAL",
            Origin::ManMade => "MAN_MADE",
        }
    }

    pub fn parse(site: &str, raw: &str) -> Result<Self> {
        match normalize_code(raw).as_str() {
            "NATURAL" => Ok(Origin::Natural),
            "MAN_MADE" => Ok(Origin::ManMade),
            _ => Err(PhabError::InvalidCodeValue {
                site: site.to_string(),
                parameter: ORIGIN_COLUMN.to_string(),
                value: raw.to_string(),
            }),
        }
    }
}

/// Numeric covariates usable as model terms, named by their column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Covariate {
    #[serde(rename = "LAT_DD")]
    Latitude,
    #[serde(rename = "LON_DD")]
    Longitude,
    #[serde(rename = "ELEVATION")]
    Elevation,
    #[serde(rename = "AREA_HA")]
    Area,
}

impl Covariate {
    pub const ALL: [Covariate; 4] = [
        Covariate::Latitude,
        Covariate::Longitude,
        Covariate::Elevation,
        Covariate::Area,
    ];

    pub fn column(self) -> &'static str {
        match self {
            Covariate::Latitude => "LAT_DD",
            Covariate::Longitude => "LON_DD",
            Covariate::Elevation => "ELEVATION",
            Covariate::Area => "AREA_HA",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SiteCovariates {
    pub site: String,
    pub ecoregion: Option<String>,
    pub origin: Option<Origin>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub elevation: Option<f64>,
    pub area: Option<f64>,
}

impl SiteCovariates {
    pub fn new(site: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            ..Default::default()
        }
    }

    pub fn numeric(&self, covariate: Covariate) -> Option<f64> {
        match covariate {
            Covariate::Latitude => self.latitude,
            Covariate::Longitude => self.longitude,
            Covariate::Elevation => self.elevation,
            Covariate::Area => self.area,
        }
    }

    fn set_numeric(&mut self, covariate: Covariate, value: Option<f64>) {
        let slot = match covariate {
            Covariate::Latitude => &mut self.latitude,
            Covariate::Longitude => &mut self.longitude,
            Covariate::Elevation => &mut self.elevation,
            Covariate::Area => &mut self.area,
        };
        *slot = value;
    }
}

/// One covariate row per site
#[derive(Debug, Clone, Default)]
pub struct CovariateTable {
    by_site: BTreeMap<String, SiteCovariates>,
}

impl CovariateTable {
    pub fn from_rows(rows: impl IntoIterator<Item = SiteCovariates>) -> Result<Self> {
        let mut by_site = BTreeMap::new();
        for row in rows {
            if row.site.is_empty() {
                return Err(PhabError::schema("Covariate row with an empty site id"));
            }
            let site = row.site.clone();
            if by_site.insert(site.clone(), row).is_some() {
                return Err(PhabError::schema(format!("Duplicate covariate row for site {}", site)));
            }
        }
        Ok(Self { by_site })
    }

    /// Read covariates from a DataFrame. Only `SITE_ID` is required; an
    /// absent covariate column leaves that covariate missing for every site.
    pub fn from_dataframe(df: &DataFrame) -> Result<Self> {
        let sites = text_column(df, SITE_COLUMN)?
            .ok_or_else(|| PhabError::schema(format!("Missing column '{}'", SITE_COLUMN)))?;
        let ecoregions = text_column(df, ECOREGION_COLUMN)?;
        let origins = text_column(df, ORIGIN_COLUMN)?;
        let mut numerics = Vec::with_capacity(Covariate::ALL.len());
        for covariate in Covariate::ALL {
            numerics.push((covariate, text_column(df, covariate.column())?));
        }

        let mut rows = Vec::with_capacity(df.height());
        for idx in 0..df.height() {
            let Some(site) = cell(&sites, idx) else {
                return Err(PhabError::schema(format!("Null site id in covariate row {}", idx)));
            };
            let mut row = SiteCovariates::new(site);
            row.ecoregion = ecoregions
                .as_ref()
                .and_then(|c| cell(c, idx))
                .map(normalize_code);
            row.origin = origins
                .as_ref()
                .and_then(|c| cell(c, idx))
                .map(|raw| Origin::parse(site, raw))
                .transpose()?;
            for (covariate, column) in &numerics {
                let value = column
                    .as_ref()
                    .and_then(|c| cell(c, idx))
                    .map(|raw| parse_covariate(site, *covariate, raw))
                    .transpose()?;
                row.set_numeric(*covariate, value);
            }
            rows.push(row);
        }

        Self::from_rows(rows)
    }

    pub fn load_csv(path: &Path) -> anyhow::Result<Self> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .try_into_reader_with_file_path(Some(path.into()))
            .with_context(|| format!("Failed to create CSV reader: {:?}", path))?
            .finish()
            .with_context(|| format!("Failed to load covariates CSV: {:?}", path))?;

        Self::from_dataframe(&df).with_context(|| format!("Malformed covariate table: {:?}", path))
    }

    pub fn get(&self, site: &str) -> Option<&SiteCovariates> {
        self.by_site.get(site)
    }

    pub fn sites(&self) -> impl Iterator<Item = &str> {
        self.by_site.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_site.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_site.is_empty()
    }
}

fn text_column(df: &DataFrame, name: &str) -> Result<Option<StringChunked>> {
    let Ok(column) = df.column(name) else {
        return Ok(None);
    };
    let text = column.cast(&DataType::String)?;
    let chunked = text.str()?.clone();
    Ok(Some(chunked))
}

fn cell(column: &StringChunked, idx: usize) -> Option<&str> {
    column
        .get(idx)
        .map(str::trim)
        .filter(|v| !is_missing_value(v))
}

fn parse_covariate(site: &str, covariate: Covariate, raw: &str) -> Result<f64> {
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(PhabError::TypeCoercion {
            site: site.to_string(),
            parameter: covariate.column().to_string(),
            value: raw.to_string(),
        }),
    }
}

/// Why a joined lookup produced no value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MissingInput {
    SiteAbsentFromMetrics,
    SiteAbsentFromCovariates,
    Metric(String),
    Ecoregion,
    Origin,
    Covariate(Covariate),
}

impl MissingInput {
    pub fn into_error(self, site: &str) -> PhabError {
        PhabError::MissingRequiredInput {
            site: site.to_string(),
            input: self.to_string(),
        }
    }
}

impl fmt::Display for MissingInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingInput::SiteAbsentFromMetrics => write!(f, "site has no metrics"),
            MissingInput::SiteAbsentFromCovariates => write!(f, "site has no covariates"),
            MissingInput::Metric(name) => write!(f, "metric {}", name),
            MissingInput::Ecoregion => write!(f, "covariate {}", ECOREGION_COLUMN),
            MissingInput::Origin => write!(f, "covariate {}", ORIGIN_COLUMN),
            MissingInput::Covariate(c) => write!(f, "covariate {}", c.column()),
        }
    }
}

/// Outer join of the wide metric table and the covariate table
pub struct SiteFrame<'a> {
    metrics: &'a WideMetricTable,
    covariates: &'a CovariateTable,
    sites: Vec<&'a str>,
}

impl<'a> SiteFrame<'a> {
    pub fn new(metrics: &'a WideMetricTable, covariates: &'a CovariateTable) -> Self {
        let sites: BTreeSet<&str> = metrics
            .sites()
            .iter()
            .map(String::as_str)
            .chain(covariates.sites())
            .collect();
        Self {
            metrics,
            covariates,
            sites: sites.into_iter().collect(),
        }
    }

    /// Union of metric and covariate sites, sorted.
    pub fn sites(&self) -> &[&'a str] {
        &self.sites
    }

    pub fn site(&self, site: &'a str) -> JoinedSite<'a> {
        JoinedSite {
            site,
            metrics: self.metrics.has_site(site).then_some(self.metrics),
            covariates: self.covariates.get(site),
        }
    }
}

/// One site of the outer join
#[derive(Debug, Clone, Copy)]
pub struct JoinedSite<'a> {
    pub site: &'a str,
    metrics: Option<&'a WideMetricTable>,
    covariates: Option<&'a SiteCovariates>,
}

type Joined<T> = std::result::Result<T, MissingInput>;

impl<'a> JoinedSite<'a> {
    pub fn has_metrics(&self) -> bool {
        self.metrics.is_some()
    }

    pub fn has_covariates(&self) -> bool {
        self.covariates.is_some()
    }

    /// Finite value of a numeric metric.
    pub fn require_metric(&self, name: &str) -> Joined<f64> {
        let metrics = self.metrics.ok_or(MissingInput::SiteAbsentFromMetrics)?;
        metrics
            .numeric(self.site, name)
            .filter(|v| v.is_finite())
            .ok_or_else(|| MissingInput::Metric(name.to_string()))
    }

    fn require_covariates(&self) -> Joined<&'a SiteCovariates> {
        self.covariates.ok_or(MissingInput::SiteAbsentFromCovariates)
    }

    pub fn require_covariate(&self, covariate: Covariate) -> Joined<f64> {
        self.require_covariates()?
            .numeric(covariate)
            .filter(|v| v.is_finite())
            .ok_or(MissingInput::Covariate(covariate))
    }

    pub fn require_ecoregion(&self) -> Joined<&'a str> {
        self.require_covariates()?
            .ecoregion
            .as_deref()
            .ok_or(MissingInput::Ecoregion)
    }

    pub fn require_origin(&self) -> Joined<Origin> {
        self.require_covariates()?.origin.ok_or(MissingInput::Origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::{CategoricalMetrics, MetricTable};

    fn wide() -> WideMetricTable {
        let mut long = MetricTable::new();
        long.push_numeric("L1", "RVIVEG_SYN", 0.8);
        long.push_numeric("L2", "RVIVEG_SYN", 0.4);
        WideMetricTable::pivot(&long, &CategoricalMetrics::default()).unwrap()
    }

    #[test]
    fn test_from_dataframe_parses_and_tracks_blanks() {
        let df = df![
            "SITE_ID" => &["L1", "L2", "L3"],
            "ECOREGION" => &["cpl", "WMT", ""],
            "LAKE_ORIGIN" => &["NATURAL", "man_made", "NA"],
            "ELEVATION" => &["120.5", "", "40"],
        ]
        .unwrap();
        let table = CovariateTable::from_dataframe(&df).unwrap();

        let l1 = table.get("L1").unwrap();
        assert_eq!(l1.ecoregion.as_deref(), Some("CPL"));
        assert_eq!(l1.origin, Some(Origin::Natural));
        assert_eq!(l1.elevation, Some(120.5));
        assert_eq!(l1.area, None);

        let l2 = table.get("L2").unwrap();
        assert_eq!(l2.origin, Some(Origin::ManMade));
        assert_eq!(l2.elevation, None);

        let l3 = table.get("L3").unwrap();
        assert_eq!(l3.ecoregion, None);
        assert_eq!(l3.origin, None);
    }

    #[test]
    fn test_bad_origin_and_numeric_values_fail() {
        let df = df!["SITE_ID" => &["L1"], "LAKE_ORIGIN" => &["RESERVOIR"]].unwrap();
        assert!(matches!(
            CovariateTable::from_dataframe(&df),
            Err(PhabError::InvalidCodeValue { .. })
        ));

        let df = df!["SITE_ID" => &["L1"], "AREA_HA" => &["big"]].unwrap();
        assert!(matches!(
            CovariateTable::from_dataframe(&df),
            Err(PhabError::TypeCoercion { .. })
        ));
    }

    #[test]
    fn test_duplicate_sites_rejected() {
        let result = CovariateTable::from_rows([SiteCovariates::new("L1"), SiteCovariates::new("L1")]);
        assert!(matches!(result, Err(PhabError::Schema { .. })));
    }

    #[test]
    fn test_outer_join_reports_missing_inputs() {
        let metrics = wide();
        let mut l1 = SiteCovariates::new("L1");
        l1.ecoregion = Some("CPL".to_string());
        let mut l9 = SiteCovariates::new("L9");
        l9.origin = Some(Origin::Natural);
        let covariates = CovariateTable::from_rows([l1, l9]).unwrap();

        let frame = SiteFrame::new(&metrics, &covariates);
        assert_eq!(frame.sites(), &["L1", "L2", "L9"]);

        let l1 = frame.site("L1");
        assert_eq!(l1.require_metric("RVIVEG_SYN"), Ok(0.8));
        assert_eq!(l1.require_ecoregion(), Ok("CPL"));
        assert_eq!(l1.require_origin(), Err(MissingInput::Origin));
        assert_eq!(l1.require_metric("FCINATURAL_SIM"), Err(MissingInput::Metric("FCINATURAL_SIM".into())));

        let l2 = frame.site("L2");
        assert_eq!(l2.require_ecoregion(), Err(MissingInput::SiteAbsentFromCovariates));

        let l9 = frame.site("L9");
        assert!(!l9.has_metrics());
        assert_eq!(l9.require_metric("RVIVEG_SYN"), Err(MissingInput::SiteAbsentFromMetrics));
        assert_eq!(
            l9.require_covariate(Covariate::Elevation),
            Err(MissingInput::Covariate(Covariate::Elevation))
        );
    }

    #[test]
    fn test_missing_input_as_error() {
        let err = MissingInput::Origin.into_error("L1");
        assert!(matches!(err, PhabError::MissingRequiredInput { .. }));
        assert!(err.to_string().contains("LAKE_ORIGIN"));
    }
}
