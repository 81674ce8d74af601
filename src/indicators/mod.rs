//! Indicator Calculators
//!
//! Indicators read the outer join of the wide metric table and the site
//! covariates and produce one result per site. A site lacking any required
//! input is Not Assessed with an attributable reason; it never fails the
//! batch.

pub mod composite;
pub mod disturbance;
pub mod models;
pub mod oe;
pub mod thresholds;

pub use composite::CompositeIndicator;
pub use disturbance::DisturbanceIndicator;
pub use models::{ExpectedModel, ModelTerm, Transform};
pub use oe::{OeIndicator, OeScorer};
pub use thresholds::{Keyed, ThresholdSet};

use crate::config::IndicatorConfig;
use crate::covariates::{JoinedSite, MissingInput, SiteFrame};
use crate::error::Result;
use polars::prelude::*;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

pub const NOT_ASSESSED: &str = "Not Assessed";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum NotAssessedReason {
    MissingInput(MissingInput),
    /// Input present but outside a model transform's domain
    OutOfDomain { input: String, value: f64 },
    NoModel { key: String },
    NoThresholds { key: String },
    /// Expected value non-positive or non-finite
    InvalidExpected { expected: f64 },
    /// Ratio overflowed even though the expected value was valid
    NonFiniteRatio { observed: f64, expected: f64 },
    /// No threshold class covers the value
    Unclassified { value: f64 },
    ComponentNotAssessed { component: String },
}

impl From<MissingInput> for NotAssessedReason {
    fn from(missing: MissingInput) -> Self {
        NotAssessedReason::MissingInput(missing)
    }
}

impl fmt::Display for NotAssessedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotAssessedReason::MissingInput(missing) => write!(f, "missing {}", missing),
            NotAssessedReason::OutOfDomain { input, value } => {
                write!(f, "{} = {} outside model domain", input, value)
            }
            NotAssessedReason::NoModel { key } => write!(f, "no expected-value model for {}", key),
            NotAssessedReason::NoThresholds { key } => write!(f, "no thresholds for {}", key),
            NotAssessedReason::InvalidExpected { expected } => {
                write!(f, "expected value {} is not positive", expected)
            }
            NotAssessedReason::NonFiniteRatio { observed, expected } => {
                write!(f, "ratio {} / {} is not finite", observed, expected)
            }
            NotAssessedReason::Unclassified { value } => {
                write!(f, "no condition class covers {}", value)
            }
            NotAssessedReason::ComponentNotAssessed { component } => {
                write!(f, "component {} not assessed", component)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ConditionClass {
    Assessed(String),
    NotAssessed(NotAssessedReason),
}

impl ConditionClass {
    pub fn label(&self) -> &str {
        match self {
            ConditionClass::Assessed(class) => class,
            ConditionClass::NotAssessed(_) => NOT_ASSESSED,
        }
    }

    pub fn is_assessed(&self) -> bool {
        matches!(self, ConditionClass::Assessed(_))
    }

    pub fn reason(&self) -> Option<&NotAssessedReason> {
        match self {
            ConditionClass::Assessed(_) => None,
            ConditionClass::NotAssessed(reason) => Some(reason),
        }
    }
}

/// One indicator outcome for one site
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorResult {
    pub site: String,
    pub observed: Option<f64>,
    pub expected: Option<f64>,
    pub oe_ratio: Option<f64>,
    pub condition: ConditionClass,
}

impl IndicatorResult {
    /// Result carrying no values at all.
    pub fn not_assessed(site: &str, reason: impl Into<NotAssessedReason>) -> Self {
        Self {
            site: site.to_string(),
            observed: None,
            expected: None,
            oe_ratio: None,
            condition: ConditionClass::NotAssessed(reason.into()),
        }
    }

    pub fn is_assessed(&self) -> bool {
        self.condition.is_assessed()
    }
}

pub trait IndicatorCalculator: Send + Sync {
    fn name(&self) -> &str;

    fn assess_site(&self, site: &JoinedSite<'_>) -> IndicatorResult;

    /// Every site of the join, in site order.
    fn assess(&self, frame: &SiteFrame<'_>) -> Vec<IndicatorResult> {
        frame
            .sites()
            .par_iter()
            .map(|&site| self.assess_site(&frame.site(site)))
            .collect()
    }
}

/// Indicator name -> per-site results
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndicatorTable {
    pub by_indicator: BTreeMap<String, Vec<IndicatorResult>>,
}

impl IndicatorTable {
    pub fn insert(&mut self, name: impl Into<String>, results: Vec<IndicatorResult>) {
        self.by_indicator.insert(name.into(), results);
    }

    pub fn results(&self, indicator: &str) -> Option<&[IndicatorResult]> {
        self.by_indicator.get(indicator).map(Vec::as_slice)
    }

    pub fn get(&self, indicator: &str, site: &str) -> Option<&IndicatorResult> {
        self.results(indicator)?.iter().find(|r| r.site == site)
    }

    pub fn indicators(&self) -> impl Iterator<Item = &str> {
        self.by_indicator.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_indicator.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_indicator.is_empty()
    }

    /// Long frame: one row per (indicator, site).
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut indicator = Vec::new();
        let mut site = Vec::new();
        let mut observed = Vec::new();
        let mut expected = Vec::new();
        let mut ratio = Vec::new();
        let mut condition = Vec::new();
        let mut reason = Vec::new();

        for (name, results) in &self.by_indicator {
            for r in results {
                indicator.push(name.clone());
                site.push(r.site.clone());
                observed.push(r.observed);
                expected.push(r.expected);
                ratio.push(r.oe_ratio);
                condition.push(r.condition.label().to_string());
                reason.push(r.condition.reason().map(|x| x.to_string()));
            }
        }

        Ok(DataFrame::new(vec![
            Column::new("INDICATOR".into(), indicator),
            Column::new(crate::data::SITE_COLUMN.into(), site),
            Column::new("OBSERVED".into(), observed),
            Column::new("EXPECTED".into(), expected),
            Column::new("OE_RATIO".into(), ratio),
            Column::new("CONDITION".into(), condition),
            Column::new("REASON".into(), reason),
        ])?)
    }
}

/// The indicator set: independent indicators, then composites
pub struct IndicatorSuite {
    indicators: Vec<Box<dyn IndicatorCalculator>>,
    composites: Vec<CompositeIndicator>,
}

impl IndicatorSuite {
    pub fn empty() -> Self {
        Self {
            indicators: Vec::new(),
            composites: Vec::new(),
        }
    }

    /// Built-in indicators wired to the configured artifacts.
    pub fn standard(config: &IndicatorConfig) -> Self {
        let mut suite = Self::empty();
        for (name, observed) in oe::STANDARD_OE_INDICATORS {
            suite.add(Box::new(OeIndicator::new(name, observed, config.scorer(name))));
        }
        suite.add(Box::new(DisturbanceIndicator::riparian(config.disturbance.clone())));
        suite.add_composite(CompositeIndicator::new(
            composite::LITRIPCVR,
            composite::LITRIPCVR_COMPONENTS.to_vec(),
            config.scorer(composite::LITRIPCVR),
        ));
        suite
    }

    pub fn add(&mut self, indicator: Box<dyn IndicatorCalculator>) {
        self.indicators.push(indicator);
    }

    pub fn add_composite(&mut self, composite: CompositeIndicator) {
        self.composites.push(composite);
    }

    pub fn names(&self) -> Vec<&str> {
        self.indicators
            .iter()
            .map(|i| i.name())
            .chain(self.composites.iter().map(|c| c.name()))
            .collect()
    }

    pub fn assess(&self, frame: &SiteFrame<'_>) -> IndicatorTable {
        let computed: Vec<(String, Vec<IndicatorResult>)> = self
            .indicators
            .par_iter()
            .map(|indicator| {
                let results = indicator.assess(frame);
                let assessed = results.iter().filter(|r| r.is_assessed()).count();
                tracing::debug!("{}: {}/{} sites assessed", indicator.name(), assessed, results.len());
                (indicator.name().to_string(), results)
            })
            .collect();

        let mut table = IndicatorTable::default();
        for (name, results) in computed {
            table.insert(name, results);
        }

        // composites depend on completed components
        for composite in &self.composites {
            let results = composite.assess(frame, &table);
            table.insert(composite.name(), results);
        }
        table
    }
}

impl Default for IndicatorSuite {
    fn default() -> Self {
        Self::standard(&IndicatorConfig::default())
    }
}
