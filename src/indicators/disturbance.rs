//! Site-independent disturbance indicator
//!
//! The observed disturbance index maps straight through one global threshold
//! set. No expected value, no covariates.

use super::thresholds::ThresholdSet;
use super::{ConditionClass, IndicatorCalculator, IndicatorResult, NotAssessedReason};
use crate::covariates::JoinedSite;

pub const RDIS: &str = "RDIS";
pub const RDIS_METRIC: &str = "HIIALL_SYN";

pub struct DisturbanceIndicator {
    name: String,
    observed_metric: String,
    thresholds: ThresholdSet,
}

impl DisturbanceIndicator {
    pub fn new(name: &str, observed_metric: &str, thresholds: ThresholdSet) -> Self {
        Self {
            name: name.to_string(),
            observed_metric: observed_metric.to_string(),
            thresholds,
        }
    }

    /// Riparian disturbance over the synthesized human influence index.
    pub fn riparian(thresholds: ThresholdSet) -> Self {
        Self::new(RDIS, RDIS_METRIC, thresholds)
    }

    /// Good < 0.2 <= Fair < 0.75 <= Poor
    pub fn default_thresholds() -> ThresholdSet {
        ThresholdSet {
            cuts: vec![0.2, 0.75],
            classes: vec!["Good".to_string(), "Fair".to_string(), "Poor".to_string()],
        }
    }
}

impl IndicatorCalculator for DisturbanceIndicator {
    fn name(&self) -> &str {
        &self.name
    }

    fn assess_site(&self, site: &JoinedSite<'_>) -> IndicatorResult {
        let observed = match site.require_metric(&self.observed_metric) {
            Ok(v) => v,
            Err(missing) => return IndicatorResult::not_assessed(site.site, missing),
        };
        let Some(class) = self.thresholds.classify(observed) else {
            return IndicatorResult::not_assessed(
                site.site,
                NotAssessedReason::Unclassified { value: observed },
            );
        };
        IndicatorResult {
            site: site.site.to_string(),
            observed: Some(observed),
            expected: None,
            oe_ratio: None,
            condition: ConditionClass::Assessed(class.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::{CategoricalMetrics, MetricTable, WideMetricTable};
    use crate::covariates::{CovariateTable, SiteFrame};

    #[test]
    fn test_global_thresholds_without_covariates() {
        let mut long = MetricTable::new();
        long.push_numeric("L1", RDIS_METRIC, 0.1);
        long.push_numeric("L2", RDIS_METRIC, 0.2);
        long.push_numeric("L3", RDIS_METRIC, 2.5);
        long.push_numeric("L4", "FCIALL_SIM", 0.3);
        let wide = WideMetricTable::pivot(&long, &CategoricalMetrics::default()).unwrap();
        let covariates = CovariateTable::default();
        let frame = SiteFrame::new(&wide, &covariates);

        let results =
            DisturbanceIndicator::riparian(DisturbanceIndicator::default_thresholds()).assess(&frame);
        let labels: Vec<&str> = results.iter().map(|r| r.condition.label()).collect();
        assert_eq!(labels, vec!["Good", "Fair", "Poor", "Not Assessed"]);
        assert!(results.iter().all(|r| r.expected.is_none()));
    }

    #[test]
    fn test_value_outside_every_class_is_not_assessed() {
        let mut long = MetricTable::new();
        long.push_numeric("L1", RDIS_METRIC, 0.1);
        long.push_numeric("L2", RDIS_METRIC, 0.5);
        let wide = WideMetricTable::pivot(&long, &CategoricalMetrics::default()).unwrap();
        let covariates = CovariateTable::default();
        let frame = SiteFrame::new(&wide, &covariates);

        let short = ThresholdSet {
            cuts: vec![0.2, 0.75],
            classes: vec!["Good".to_string()],
        };
        let results = DisturbanceIndicator::riparian(short).assess(&frame);
        assert_eq!(results[0].condition.label(), "Good");
        assert!(!results[1].is_assessed());
        assert_eq!(
            results[1].condition.reason(),
            Some(&NotAssessedReason::Unclassified { value: 0.5 })
        );
        assert!(results[1].observed.is_none());
    }
}
