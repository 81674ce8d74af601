//! Pipeline coordinator
//!
//! Observation Table -> Category Aggregators (parallel) -> long Metric Table
//! -> wide Metric Table -> outer join with covariates -> Indicators
//! (parallel) -> Composite indicators.
//!
//! Every stage is a pure function of its inputs; parallel results are merged
//! by key, never by arrival order.

use crate::assembler::{assemble, MetricTable, WideMetricTable};
use crate::config::PipelineConfig;
use crate::covariates::{CovariateTable, SiteFrame};
use crate::data::ObservationTable;
use crate::error::Result;
use crate::indicators::{IndicatorSuite, IndicatorTable};
use crate::metrics::{AggregatorRegistry, CategoryAggregator};
use crate::synthesis::DrawdownExtent;
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::time::Instant;

/// Everything one run produces
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub metrics: MetricTable,
    pub wide: WideMetricTable,
    pub indicators: IndicatorTable,
}

pub struct PhabPipeline {
    config: PipelineConfig,
    registry: AggregatorRegistry,
    indicators: IndicatorSuite,
}

impl PhabPipeline {
    /// Built-in aggregators and indicators, configured from `config`.
    /// Fails when the configuration does not validate.
    pub fn new(config: PipelineConfig) -> anyhow::Result<Self> {
        let registry = AggregatorRegistry::standard(config.plot_extents());
        Self::with_registry(config, registry)
    }

    pub fn with_registry(config: PipelineConfig, registry: AggregatorRegistry) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self::from_parts(config, registry))
    }

    fn from_parts(config: PipelineConfig, registry: AggregatorRegistry) -> Self {
        let indicators = IndicatorSuite::standard(&config.indicators);
        Self {
            config,
            registry,
            indicators,
        }
    }

    pub fn with_indicators(mut self, indicators: IndicatorSuite) -> Self {
        self.indicators = indicators;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn registry(&self) -> &AggregatorRegistry {
        &self.registry
    }

    /// Run every aggregator over the observations and assemble one long
    /// metric table. The first data error aborts the whole call.
    pub fn compute_metrics(&self, observations: &ObservationTable) -> Result<MetricTable> {
        let start = Instant::now();
        let test_mode = !self.config.strict_inputs;
        let keyed;
        let observations = if test_mode {
            keyed = observations.without_blank_keys();
            keyed.as_ref().unwrap_or(observations)
        } else {
            observations.validate()?;
            observations
        };

        let unclaimed: BTreeSet<&str> = observations
            .rows()
            .iter()
            .map(|o| o.parameter.as_str())
            .filter(|p| self.registry.owner_of(p).is_none())
            .collect();
        if !unclaimed.is_empty() {
            tracing::debug!("Ignoring {} unclaimed parameters: {:?}", unclaimed.len(), unclaimed);
        }

        let extent = DrawdownExtent::from_observations(observations)?;
        let aggregators: Vec<&dyn CategoryAggregator> = self.registry.iter().collect();
        let tables = aggregators
            .par_iter()
            .map(|agg| agg.run(observations, &self.config.reference, &extent, test_mode))
            .collect::<Result<Vec<MetricTable>>>()?;

        let metrics = assemble(tables)?;
        tracing::info!(
            "Computed {} metrics for {} sites from {} observations in {:.3}s",
            metrics.len(),
            metrics.sites().len(),
            observations.len(),
            start.elapsed().as_secs_f64()
        );
        Ok(metrics)
    }

    /// Long -> wide with the configured categorical metric set.
    pub fn pivot(&self, metrics: &MetricTable) -> Result<WideMetricTable> {
        WideMetricTable::pivot(metrics, &self.config.categorical_metrics())
    }

    /// Indicators for every site of the metrics/covariates outer join.
    pub fn assess(&self, wide: &WideMetricTable, covariates: &CovariateTable) -> IndicatorTable {
        let start = Instant::now();
        let frame = SiteFrame::new(wide, covariates);
        let indicators = self.indicators.assess(&frame);
        tracing::info!(
            "Assessed {} indicators for {} sites in {:.3}s",
            indicators.len(),
            frame.sites().len(),
            start.elapsed().as_secs_f64()
        );
        indicators
    }

    pub fn run(
        &self,
        observations: &ObservationTable,
        covariates: &CovariateTable,
    ) -> Result<PipelineOutput> {
        let metrics = self.compute_metrics(observations)?;
        let wide = self.pivot(&metrics)?;
        let indicators = self.assess(&wide, covariates);
        Ok(PipelineOutput {
            metrics,
            wide,
            indicators,
        })
    }
}

impl Default for PhabPipeline {
    fn default() -> Self {
        let config = PipelineConfig::default();
        let registry = AggregatorRegistry::standard(config.plot_extents());
        Self::from_parts(config, registry)
    }
}
