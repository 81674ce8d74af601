//! Physical Habitat Metrics
//!
//! Batch pipeline turning long-format field observations from lake and stream
//! surveys into per-site habitat metrics and condition indicators.
//!
//! Module map:
//! - `data`: Observation Table (long format) loading, validation, slicing
//! - `utils/`: value coercion, reference code tables, per-site summaries
//! - `synthesis`: Zone Synthesizer (standard + drawdown zone reconciliation)
//! - `metrics/`: one Category Aggregator per measurement category + registry
//! - `assembler`: long Metric Table and the wide per-site pivot
//! - `covariates`: Site Covariates and the explicit metrics/covariates join
//! - `indicators/`: O/E indicators, disturbance indicator, composites
//! - `config`: JSON configuration
//! - `pipeline`: coordinator running the stages in parallel with rayon

pub mod assembler;
pub mod config;
pub mod covariates;
pub mod data;
pub mod error;
pub mod indicators;
pub mod metrics;
pub mod pipeline;
pub mod synthesis;
pub mod utils;

// Re-export commonly used types
pub use assembler::{CategoricalMetrics, MetricTable, MetricValue, WideMetricTable};
pub use config::{IndicatorConfig, PipelineConfig};
pub use covariates::{CovariateTable, Origin, SiteCovariates, SiteFrame};
pub use data::{Observation, ObservationTable};
pub use error::{PhabError, Result};
pub use indicators::{ConditionClass, IndicatorResult, IndicatorSuite, IndicatorTable, NotAssessedReason};
pub use metrics::{AggregatorRegistry, CategoryAggregator, PlotExtents};
pub use pipeline::{PhabPipeline, PipelineOutput};
pub use synthesis::{DrawdownExtent, ZoneSynthesizer};
