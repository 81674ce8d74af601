//! Category Aggregators
//!
//! Each measurement category is implemented in its own module and registered
//! by name. All of them share one contract: a slice of the observation table
//! (rows whose parameter carries the category prefix) in, a long metric
//! table restricted to the category's metrics out.

pub mod aquatic_macrophytes;
pub mod bank_features;
pub mod channel_geometry;
pub mod fish_cover;
pub mod human_influence;
pub mod littoral_zone;
pub mod riparian_vegetation;
pub mod station_depth;
pub mod substrate;
pub mod zoned;

pub use aquatic_macrophytes::AquaticMacrophytes;
pub use bank_features::BankFeatures;
pub use channel_geometry::ChannelGeometry;
pub use fish_cover::FishCover;
pub use human_influence::HumanInfluence;
pub use littoral_zone::LittoralZone;
pub use riparian_vegetation::RiparianVegetation;
pub use station_depth::StationDepth;
pub use substrate::Substrate;
pub use zoned::{Scope, ScopedValues, ZoneLayout};

use crate::assembler::MetricTable;
use crate::data::{CategorySlice, ObservationTable, Zone};
use crate::error::{PhabError, Result};
use crate::synthesis::DrawdownExtent;
use crate::utils::reference::ReferenceTables;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Plot depths used as synthesis mixing denominators
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlotExtents {
    pub riparian_m: f64,
    pub littoral_m: f64,
}

impl Default for PlotExtents {
    fn default() -> Self {
        Self {
            riparian_m: 15.0,
            littoral_m: 10.0,
        }
    }
}

/// Everything one aggregator call sees
pub struct AggregatorInput<'a> {
    pub slice: CategorySlice<'a>,
    pub reference: &'a ReferenceTables,
    pub extent: &'a DrawdownExtent,
    /// Relaxed input-shape validation
    pub test_mode: bool,
}

pub trait CategoryAggregator: Send + Sync {
    fn category(&self) -> &'static str;

    /// Parameter-name prefix owned by this category.
    fn prefix(&self) -> &'static str;

    /// Every parameter name the category understands.
    fn parameters(&self) -> Vec<String>;

    fn aggregate(&self, input: &AggregatorInput<'_>) -> Result<MetricTable>;

    /// Slice the observation table, validate it and aggregate.
    fn run(
        &self,
        observations: &ObservationTable,
        reference: &ReferenceTables,
        extent: &DrawdownExtent,
        test_mode: bool,
    ) -> Result<MetricTable> {
        let slice = observations.category_slice(self.prefix());
        if !test_mode {
            let known = self.parameters();
            if let Some(unknown) = slice
                .parameters()
                .into_iter()
                .find(|p| !known.iter().any(|k| k.as_str() == *p))
            {
                return Err(PhabError::schema(format!(
                    "Unknown {} parameter '{}'",
                    self.category(),
                    unknown
                )));
            }
        }

        let input = AggregatorInput {
            slice,
            reference,
            extent,
            test_mode,
        };
        let metrics = self.aggregate(&input)?;
        tracing::debug!(
            "{}: {} metrics for {} sites",
            self.category(),
            metrics.len(),
            metrics.sites().len()
        );
        Ok(metrics)
    }
}

/// `{prefix}{name}` for each name, plus the `_DD` twin when `zoned`.
pub(crate) fn parameter_names(prefix: &str, names: &[&str], zoned: bool) -> Vec<String> {
    let mut out = Vec::with_capacity(names.len() * 2);
    for name in names {
        let base = format!("{}{}", prefix, name);
        if zoned {
            out.push(Zone::Drawdown.parameter_name(&base));
        }
        out.push(base);
    }
    out
}

/// Category aggregators keyed by category name
pub struct AggregatorRegistry {
    aggregators: BTreeMap<&'static str, Box<dyn CategoryAggregator>>,
}

impl AggregatorRegistry {
    pub fn empty() -> Self {
        Self {
            aggregators: BTreeMap::new(),
        }
    }

    /// All built-in lake and stream categories.
    pub fn standard(extents: PlotExtents) -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(FishCover::new(extents.littoral_m)));
        registry.register(Box::new(AquaticMacrophytes::new(extents.littoral_m)));
        registry.register(Box::new(HumanInfluence::new()));
        registry.register(Box::new(RiparianVegetation::new(extents.riparian_m)));
        registry.register(Box::new(Substrate::littoral()));
        registry.register(Box::new(Substrate::shoreline(extents.riparian_m)));
        registry.register(Box::new(BankFeatures));
        registry.register(Box::new(StationDepth));
        registry.register(Box::new(LittoralZone));
        registry.register(Box::new(ChannelGeometry));
        registry
    }

    /// Adds an aggregator, returning the one it replaced.
    pub fn register(
        &mut self,
        aggregator: Box<dyn CategoryAggregator>,
    ) -> Option<Box<dyn CategoryAggregator>> {
        self.aggregators.insert(aggregator.category(), aggregator)
    }

    pub fn get(&self, category: &str) -> Option<&dyn CategoryAggregator> {
        self.aggregators.get(category).map(|a| a.as_ref())
    }

    pub fn categories(&self) -> Vec<&'static str> {
        self.aggregators.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn CategoryAggregator> {
        self.aggregators.values().map(|a| a.as_ref())
    }

    pub fn len(&self) -> usize {
        self.aggregators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aggregators.is_empty()
    }

    /// Category whose prefix claims `parameter`.
    pub fn owner_of(&self, parameter: &str) -> Option<&'static str> {
        self.iter()
            .find(|a| parameter.starts_with(a.prefix()))
            .map(|a| a.category())
    }
}

impl Default for AggregatorRegistry {
    fn default() -> Self {
        Self::standard(PlotExtents::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Observation;

    #[test]
    fn test_standard_registry() {
        let registry = AggregatorRegistry::default();
        assert_eq!(registry.len(), 10);
        assert!(registry.get("fish_cover").is_some());
        assert_eq!(registry.owner_of("HI_ROADS_DD"), Some("human_influence"));
        assert_eq!(registry.owner_of("SI_DEPTH"), Some("station_depth"));
        assert_eq!(registry.owner_of("SS_SAND"), Some("shoreline_substrate"));
        assert_eq!(registry.owner_of("WQ_PH"), None);
    }

    #[test]
    fn test_prefixes_do_not_overlap() {
        let registry = AggregatorRegistry::default();
        let prefixes: Vec<&str> = registry.iter().map(|a| a.prefix()).collect();
        for (i, a) in prefixes.iter().enumerate() {
            for (j, b) in prefixes.iter().enumerate() {
                if i != j {
                    assert!(!a.starts_with(b), "{} overlaps {}", a, b);
                }
            }
        }
    }

    #[test]
    fn test_declared_parameters_carry_prefix() {
        for agg in AggregatorRegistry::default().iter() {
            for p in agg.parameters() {
                assert!(p.starts_with(agg.prefix()), "{} outside {}", p, agg.category());
            }
        }
    }

    #[test]
    fn test_unknown_parameter_strict_vs_test_mode() {
        let table = ObservationTable::new(vec![
            Observation::new("L1", "A", "SI_DEPTH", "2.0"),
            Observation::new("L1", "A", "SI_SECCHI", "1.0"),
        ]);
        let reference = ReferenceTables::default();
        let extent = DrawdownExtent::default();

        let err = StationDepth.run(&table, &reference, &extent, false).unwrap_err();
        assert!(err.to_string().contains("SI_SECCHI"));

        let metrics = StationDepth.run(&table, &reference, &extent, true).unwrap();
        assert_eq!(metrics.numeric("L1", "SIXDEPTH"), Some(2.0));
    }

    #[test]
    fn test_parameter_names_with_zones() {
        let names = parameter_names("FC_", &["SNAGS"], true);
        assert_eq!(names, vec!["FC_SNAGS_DD".to_string(), "FC_SNAGS".to_string()]);
    }
}
