//! Pre-fit expected-value models
//!
//! A model is a linear predictor over site covariates with an optional log10
//! link on each term and on the response:
//!
//!   expected = inverse(response, intercept + sum(coefficient * transform(x)))
//!
//! Models are consumed, never fitted here.

use super::NotAssessedReason;
use crate::covariates::{Covariate, JoinedSite};
use crate::error::{PhabError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transform {
    #[default]
    Identity,
    Log10,
}

impl Transform {
    /// `None` when the value is outside the transform's domain.
    pub fn apply(self, x: f64) -> Option<f64> {
        match self {
            Transform::Identity => Some(x),
            Transform::Log10 if x > 0.0 => Some(libm::log10(x)),
            Transform::Log10 => None,
        }
    }

    pub fn inverse(self, y: f64) -> f64 {
        match self {
            Transform::Identity => y,
            Transform::Log10 => libm::pow(10.0, y),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelTerm {
    pub covariate: Covariate,
    pub coefficient: f64,
    #[serde(default)]
    pub transform: Transform,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectedModel {
    pub intercept: f64,
    #[serde(default)]
    pub terms: Vec<ModelTerm>,
    #[serde(default)]
    pub response: Transform,
}

impl ExpectedModel {
    /// Model with no covariate terms.
    pub fn constant(expected: f64) -> Self {
        Self {
            intercept: expected,
            terms: Vec::new(),
            response: Transform::Identity,
        }
    }

    pub fn with_term(mut self, covariate: Covariate, coefficient: f64, transform: Transform) -> Self {
        self.terms.push(ModelTerm {
            covariate,
            coefficient,
            transform,
        });
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.intercept.is_finite() || self.terms.iter().any(|t| !t.coefficient.is_finite()) {
            return Err(PhabError::schema("Model intercept and coefficients must be finite"));
        }
        Ok(())
    }

    /// Expected value for a site. Fails with the first unusable covariate.
    pub fn predict(&self, site: &JoinedSite<'_>) -> std::result::Result<f64, NotAssessedReason> {
        let mut linear = self.intercept;
        for term in &self.terms {
            let x = site.require_covariate(term.covariate)?;
            let tx = term
                .transform
                .apply(x)
                .ok_or(NotAssessedReason::OutOfDomain {
                    input: term.covariate.column().to_string(),
                    value: x,
                })?;
            linear += term.coefficient * tx;
        }
        Ok(self.response.inverse(linear))
    }
}
