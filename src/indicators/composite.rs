//! Composite indicator over already-computed component indicators
//!
//! A site is Not Assessed as soon as any component is; otherwise the mean of
//! the component observed values is scored like any O/E indicator.

use super::oe::OeScorer;
use super::{IndicatorResult, IndicatorTable, NotAssessedReason};
use crate::covariates::SiteFrame;
use rayon::prelude::*;

pub const LITRIPCVR: &str = "LITRIPCVR";
pub const LITRIPCVR_COMPONENTS: &[&str] = &["LITCVR", "RVEG"];

pub struct CompositeIndicator {
    name: String,
    components: Vec<String>,
    scorer: OeScorer,
}

impl CompositeIndicator {
    pub fn new(name: &str, components: Vec<&str>, scorer: OeScorer) -> Self {
        Self {
            name: name.to_string(),
            components: components.into_iter().map(str::to_string).collect(),
            scorer,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Mean observed value of the components, or the first component that
    /// is missing or Not Assessed.
    fn combined_observed(&self, site: &str, components: &IndicatorTable) -> Result<f64, NotAssessedReason> {
        let mut total = 0.0;
        for component in &self.components {
            let observed = components
                .get(component, site)
                .filter(|r| r.is_assessed())
                .and_then(|r| r.observed)
                .ok_or_else(|| NotAssessedReason::ComponentNotAssessed {
                    component: component.clone(),
                })?;
            total += observed;
        }
        Ok(total / self.components.len() as f64)
    }

    pub fn assess(&self, frame: &SiteFrame<'_>, components: &IndicatorTable) -> Vec<IndicatorResult> {
        frame
            .sites()
            .par_iter()
            .map(|&site| match self.combined_observed(site, components) {
                Ok(observed) => self.scorer.score(&frame.site(site), observed),
                Err(reason) => IndicatorResult::not_assessed(site, reason),
            })
            .collect()
    }
}
