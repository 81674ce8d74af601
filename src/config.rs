//! Pipeline configuration
//!
//! JSON, every field optional:
//!
//! ```json
//! {
//!   "riparian_plot_extent_m": 15.0,
//!   "littoral_plot_extent_m": 10.0,
//!   "reference": { "cover": {"0": {"weight": 0.0, "present": false}, ...} },
//!   "extra_categorical_metrics": ["XYZCLASS"],
//!   "strict_inputs": true,
//!   "indicators": {
//!     "oe": {
//!       "RVEG": {
//!         "models": { "CPL|NATURAL": {"intercept": 0.4, "terms": []}, "default": {...} },
//!         "thresholds": { "default": {"cuts": [0.5, 0.8], "classes": ["Poor", "Fair", "Good"]} }
//!       }
//!     },
//!     "disturbance": {"cuts": [0.2, 0.75], "classes": ["Good", "Fair", "Poor"]}
//!   }
//! }
//! ```

use crate::assembler::CategoricalMetrics;
use crate::indicators::{DisturbanceIndicator, OeScorer, ThresholdSet};
use crate::metrics::PlotExtents;
use crate::utils::reference::ReferenceTables;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Expected-value models and thresholds per indicator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorConfig {
    #[serde(default)]
    pub oe: BTreeMap<String, OeScorer>,

    #[serde(default = "DisturbanceIndicator::default_thresholds")]
    pub disturbance: ThresholdSet,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            oe: BTreeMap::new(),
            disturbance: DisturbanceIndicator::default_thresholds(),
        }
    }
}

impl IndicatorConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read indicator config: {:?}", path))?;
        let config: IndicatorConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse indicator config JSON: {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, scorer) in &self.oe {
            scorer
                .validate()
                .with_context(|| format!("Invalid artifacts for indicator {}", name))?;
        }
        self.disturbance
            .validate()
            .context("Invalid disturbance thresholds")?;
        Ok(())
    }

    /// Artifacts for an indicator; empty when none are configured.
    pub fn scorer(&self, indicator: &str) -> OeScorer {
        self.oe.get(indicator).cloned().unwrap_or_else(|| {
            tracing::debug!("No models configured for {}; its sites will be Not Assessed", indicator);
            OeScorer::default()
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub riparian_plot_extent_m: f64,
    pub littoral_plot_extent_m: f64,
    pub reference: ReferenceTables,
    pub extra_categorical_metrics: Vec<String>,
    /// `false` runs aggregators in test mode (relaxed input validation)
    pub strict_inputs: bool,
    pub indicators: IndicatorConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let extents = PlotExtents::default();
        Self {
            riparian_plot_extent_m: extents.riparian_m,
            littoral_plot_extent_m: extents.littoral_m,
            reference: ReferenceTables::default(),
            extra_categorical_metrics: Vec::new(),
            strict_inputs: true,
            indicators: IndicatorConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read pipeline config: {:?}", path))?;
        Self::from_json_str(&contents).with_context(|| format!("Invalid pipeline config: {:?}", path))
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PipelineConfig =
            serde_json::from_str(json).context("Failed to parse pipeline config JSON")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, extent) in [
            ("riparian_plot_extent_m", self.riparian_plot_extent_m),
            ("littoral_plot_extent_m", self.littoral_plot_extent_m),
        ] {
            if !(extent.is_finite() && extent > 0.0) {
                anyhow::bail!("{} must be a positive number, got {}", name, extent);
            }
        }
        if self.reference.cover.is_empty() || self.reference.proximity.is_empty() {
            anyhow::bail!("Reference code tables must not be empty");
        }
        self.indicators.validate()
    }

    pub fn plot_extents(&self) -> PlotExtents {
        PlotExtents {
            riparian_m: self.riparian_plot_extent_m,
            littoral_m: self.littoral_plot_extent_m,
        }
    }

    pub fn categorical_metrics(&self) -> CategoricalMetrics {
        CategoricalMetrics::with_extra(self.extra_categorical_metrics.iter().map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::Transform;

    #[test]
    fn test_defaults_from_empty_json() {
        let config = PipelineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.plot_extents().riparian_m, 15.0);
        assert!(config.strict_inputs);
        assert_eq!(config.indicators.disturbance.cuts, vec![0.2, 0.75]);
    }

    #[test]
    fn test_full_config() {
        let json = r#"{
            "littoral_plot_extent_m": 12.5,
            "extra_categorical_metrics": ["XYZCLASS"],
            "strict_inputs": false,
            "indicators": {
                "oe": {
                    "RVEG": {
                        "models": {
                            "CPL|NATURAL": {
                                "intercept": -0.2,
                                "terms": [{"covariate": "AREA_HA", "coefficient": 0.1, "transform": "log10"}],
                                "response": "log10"
                            }
                        },
                        "thresholds": {"default": {"cuts": [0.5, 0.8], "classes": ["Poor", "Fair", "Good"]}}
                    }
                }
            }
        }"#;
        let config = PipelineConfig::from_json_str(json).unwrap();
        assert_eq!(config.littoral_plot_extent_m, 12.5);
        assert_eq!(config.riparian_plot_extent_m, 15.0);
        assert!(!config.strict_inputs);
        assert!(config.categorical_metrics().contains("XYZCLASS"));
        assert!(config.categorical_metrics().contains("BFOANGLE"));

        let rveg = config.indicators.scorer("RVEG");
        let (key, model) = rveg.models.lookup(Some("CPL"), Some(crate::covariates::Origin::Natural)).unwrap();
        assert_eq!(key, "CPL|NATURAL");
        assert_eq!(model.response, Transform::Log10);
        assert!(config.indicators.scorer("LITCVR").models.is_empty());
    }

    #[test]
    fn test_invalid_thresholds_rejected_at_load() {
        let json = r#"{"indicators": {"disturbance": {"cuts": [0.75, 0.2], "classes": ["Good", "Fair", "Poor"]}}}"#;
        assert!(PipelineConfig::from_json_str(json).is_err());

        let json = r#"{"riparian_plot_extent_m": 0}"#;
        assert!(PipelineConfig::from_json_str(json).is_err());
    }
}
