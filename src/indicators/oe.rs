//! Observed/expected indicators
//!
//! observed (a metric) / expected (a covariate model keyed by ecoregion and
//! lake origin) -> ratio -> condition class via keyed thresholds.

use super::models::ExpectedModel;
use super::thresholds::{site_key, Keyed, ThresholdSet};
use super::{ConditionClass, IndicatorCalculator, IndicatorResult, NotAssessedReason};
use crate::covariates::JoinedSite;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// (indicator, observed metric) of the built-in O/E indicators
pub const STANDARD_OE_INDICATORS: &[(&str, &str)] = &[
    ("RVEG", "RVIVEG_SYN"),
    ("LITCVR", "FCINATURAL_SIM"),
    ("DRAWDOWN", "BFXVERTHEIGHT_DD"),
];

/// Models and thresholds of one O/E indicator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OeScorer {
    #[serde(default)]
    pub models: Keyed<ExpectedModel>,
    #[serde(default)]
    pub thresholds: Keyed<ThresholdSet>,
}

impl OeScorer {
    pub fn new(models: Keyed<ExpectedModel>, thresholds: Keyed<ThresholdSet>) -> Self {
        Self { models, thresholds }
    }

    pub fn validate(&self) -> Result<()> {
        for model in self.models.values() {
            model.validate()?;
        }
        for set in self.thresholds.values() {
            set.validate()?;
        }
        Ok(())
    }

    /// Score an observed value for a site; requires ecoregion and origin.
    pub fn score(&self, site: &JoinedSite<'_>, observed: f64) -> IndicatorResult {
        match self.try_score(site, observed) {
            Ok(result) => result,
            Err(reason) => IndicatorResult::not_assessed(site.site, reason),
        }
    }

    fn try_score(
        &self,
        site: &JoinedSite<'_>,
        observed: f64,
    ) -> std::result::Result<IndicatorResult, NotAssessedReason> {
        let ecoregion = site.require_ecoregion()?;
        let origin = site.require_origin()?;
        let key = || site_key(Some(ecoregion), Some(origin));

        let (_, model) = self
            .models
            .lookup(Some(ecoregion), Some(origin))
            .ok_or_else(|| NotAssessedReason::NoModel { key: key() })?;
        let expected = model.predict(site)?;
        if !(expected.is_finite() && expected > 0.0) {
            return Err(NotAssessedReason::InvalidExpected { expected });
        }

        let (_, thresholds) = self
            .thresholds
            .lookup(Some(ecoregion), Some(origin))
            .ok_or_else(|| NotAssessedReason::NoThresholds { key: key() })?;
        let ratio = observed / expected;
        if !ratio.is_finite() {
            return Err(NotAssessedReason::NonFiniteRatio { observed, expected });
        }
        let class = thresholds
            .classify(ratio)
            .ok_or(NotAssessedReason::Unclassified { value: ratio })?;

        Ok(IndicatorResult {
            site: site.site.to_string(),
            observed: Some(observed),
            expected: Some(expected),
            oe_ratio: Some(ratio),
            condition: ConditionClass::Assessed(class.to_string()),
        })
    }
}

/// O/E indicator over one observed metric
pub struct OeIndicator {
    name: String,
    observed_metric: String,
    scorer: OeScorer,
}

impl OeIndicator {
    pub fn new(name: &str, observed_metric: &str, scorer: OeScorer) -> Self {
        Self {
            name: name.to_string(),
            observed_metric: observed_metric.to_string(),
            scorer,
        }
    }

    pub fn observed_metric(&self) -> &str {
        &self.observed_metric
    }
}

impl IndicatorCalculator for OeIndicator {
    fn name(&self) -> &str {
        &self.name
    }

    fn assess_site(&self, site: &JoinedSite<'_>) -> IndicatorResult {
        match site.require_metric(&self.observed_metric) {
            Ok(observed) => self.scorer.score(site, observed),
            Err(missing) => IndicatorResult::not_assessed(site.site, missing),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::{CategoricalMetrics, MetricTable, WideMetricTable};
    use crate::covariates::{CovariateTable, MissingInput, Origin, SiteCovariates, SiteFrame};
    use approx::assert_relative_eq;

    fn scorer() -> OeScorer {
        let mut models = Keyed::with_default(ExpectedModel::constant(0.5));
        models.insert("CPL|MAN_MADE", ExpectedModel::constant(0.25));
        models.insert("XER", ExpectedModel::constant(0.0));
        let thresholds = Keyed::with_default(
            ThresholdSet::new(vec![0.5, 0.8], ["Poor", "Fair", "Good"]).unwrap(),
        );
        OeScorer::new(models, thresholds)
    }

    fn site(id: &str, eco: Option<&str>, origin: Option<Origin>) -> SiteCovariates {
        let mut row = SiteCovariates::new(id);
        row.ecoregion = eco.map(str::to_string);
        row.origin = origin;
        row
    }

    fn fixture() -> (WideMetricTable, CovariateTable) {
        let mut long = MetricTable::new();
        for s in ["L1", "L2", "L3", "L4"] {
            long.push_numeric(s, "RVIVEG_SYN", 0.3);
        }
        let wide = WideMetricTable::pivot(&long, &CategoricalMetrics::default()).unwrap();
        let covariates = CovariateTable::from_rows([
            site("L1", Some("CPL"), Some(Origin::Natural)),
            site("L2", Some("CPL"), Some(Origin::ManMade)),
            site("L3", Some("CPL"), None),
            site("L4", Some("XER"), Some(Origin::Natural)),
            site("L5", Some("CPL"), Some(Origin::Natural)),
        ])
        .unwrap();
        (wide, covariates)
    }

    #[test]
    fn test_oe_ratio_and_class() {
        let (wide, covariates) = fixture();
        let frame = SiteFrame::new(&wide, &covariates);
        let results = OeIndicator::new("RVEG", "RVIVEG_SYN", scorer()).assess(&frame);
        assert_eq!(results.len(), 5);

        let l1 = &results[0];
        assert_relative_eq!(l1.oe_ratio.unwrap(), 0.6, epsilon = 1e-12);
        assert_eq!(l1.condition.label(), "Fair");

        // keyed model for CPL|MAN_MADE
        let l2 = &results[1];
        assert_eq!(l2.expected, Some(0.25));
        assert_eq!(l2.condition.label(), "Good");
    }

    #[test]
    fn test_not_assessed_reasons() {
        let (wide, covariates) = fixture();
        let frame = SiteFrame::new(&wide, &covariates);
        let results = OeIndicator::new("RVEG", "RVIVEG_SYN", scorer()).assess(&frame);

        assert_eq!(
            results[2].condition.reason(),
            Some(&NotAssessedReason::MissingInput(MissingInput::Origin))
        );
        assert_eq!(
            results[3].condition.reason(),
            Some(&NotAssessedReason::InvalidExpected { expected: 0.0 })
        );
        assert_eq!(
            results[4].condition.reason(),
            Some(&NotAssessedReason::MissingInput(MissingInput::SiteAbsentFromMetrics))
        );
        assert!(results[2..].iter().all(|r| r.oe_ratio.is_none()));
    }

    #[test]
    fn test_no_model_for_key() {
        let (wide, covariates) = fixture();
        let frame = SiteFrame::new(&wide, &covariates);
        let scorer = OeScorer::new(Keyed::new(), Keyed::new());
        let result = OeIndicator::new("LITCVR", "RVIVEG_SYN", scorer).assess_site(&frame.site("L1"));
        assert_eq!(
            result.condition.reason(),
            Some(&NotAssessedReason::NoModel {
                key: "CPL|NATURAL".to_string()
            })
        );
    }

    #[test]
    fn test_overflowing_ratio_is_not_assessed() {
        let (wide, covariates) = fixture();
        let frame = SiteFrame::new(&wide, &covariates);
        let tiny = 5e-324;
        let scorer = OeScorer::new(
            Keyed::with_default(ExpectedModel::constant(tiny)),
            Keyed::with_default(ThresholdSet::new(vec![0.5, 0.8], ["Poor", "Fair", "Good"]).unwrap()),
        );
        let result = OeIndicator::new("RVEG", "RVIVEG_SYN", scorer).assess_site(&frame.site("L1"));
        assert!(!result.is_assessed());
        assert_eq!(
            result.condition.reason(),
            Some(&NotAssessedReason::NonFiniteRatio {
                observed: 0.3,
                expected: tiny
            })
        );
        assert!(result.oe_ratio.is_none());
    }

    #[test]
    fn test_uncovered_ratio_is_not_assessed() {
        let (wide, covariates) = fixture();
        let frame = SiteFrame::new(&wide, &covariates);
        let broken = ThresholdSet {
            cuts: vec![0.5, 0.8],
            classes: vec!["Poor".to_string()],
        };
        let scorer = OeScorer::new(
            Keyed::with_default(ExpectedModel::constant(0.5)),
            Keyed::with_default(broken),
        );
        let result = OeIndicator::new("RVEG", "RVIVEG_SYN", scorer).assess_site(&frame.site("L1"));
        assert!(matches!(
            result.condition.reason(),
            Some(NotAssessedReason::Unclassified { .. })
        ));
    }
}
