//! HUMAN INFLUENCE (RIPARIAN)
//!
//! Proximity codes (`0`, `C`, `P`) of thirteen disturbance types, in the
//! riparian plot and the drawdown zone. Synthesized values pool the station
//! counts of both zones; the indices are rebuilt from the pooled components.

use super::zoned::{coded_cover_by_zone, ZoneLayout};
use super::{parameter_names, AggregatorInput, CategoryAggregator};
use crate::assembler::MetricTable;
use crate::error::Result;
use crate::synthesis::{ZoneSynthesizer, ZoneTag};

pub const DISTURBANCE_TYPES: &[&str] = &[
    "BUILDINGS",
    "COMMERCIAL",
    "CROPS",
    "DOCKS",
    "LANDFILL",
    "LAWN",
    "ORCHARD",
    "OTHER",
    "PARK",
    "PASTURE",
    "POWERLINES",
    "ROADS",
    "WALLS",
];

const AGRICULTURAL: &[&str] = &["CROPS", "ORCHARD", "PASTURE"];
const NON_AGRICULTURAL: &[&str] = &[
    "BUILDINGS",
    "COMMERCIAL",
    "DOCKS",
    "LANDFILL",
    "LAWN",
    "OTHER",
    "PARK",
    "POWERLINES",
    "ROADS",
    "WALLS",
];

pub struct HumanInfluence {
    layout: ZoneLayout,
}

impl HumanInfluence {
    pub fn new() -> Self {
        Self {
            layout: ZoneLayout {
                standard_suffix: "_RIP",
                synthesizer: Some(ZoneSynthesizer::recombining(ZoneTag::Syn)),
            },
        }
    }
}

impl Default for HumanInfluence {
    fn default() -> Self {
        Self::new()
    }
}

impl CategoryAggregator for HumanInfluence {
    fn category(&self) -> &'static str {
        "human_influence"
    }

    fn prefix(&self) -> &'static str {
        "HI_"
    }

    fn parameters(&self) -> Vec<String> {
        parameter_names(self.prefix(), DISTURBANCE_TYPES, true)
    }

    fn aggregate(&self, input: &AggregatorInput<'_>) -> Result<MetricTable> {
        let family = coded_cover_by_zone(
            &input.slice,
            self.prefix(),
            DISTURBANCE_TYPES,
            &input.reference.proximity,
            &self.layout,
            input.extent,
        )?;
        let weights = &family.cover;

        let mut table = MetricTable::new();
        weights.emit(&mut table, "HIPW", &self.layout);
        family.presence.emit(&mut table, "HIFP", &self.layout);

        for (site, scope) in weights.site_scopes() {
            let name = |base: &str| self.layout.metric_name(base, scope);
            table.push_optional(&site, name("HIIALL"), weights.sum(&site, scope, DISTURBANCE_TYPES));
            table.push_optional(&site, name("HIIAG"), weights.sum(&site, scope, AGRICULTURAL));
            table.push_optional(&site, name("HIINONAG"), weights.sum(&site, scope, NON_AGRICULTURAL));
            table.push_optional(
                &site,
                name("HINALL"),
                family.presence.count_positive(&site, scope, DISTURBANCE_TYPES),
            );
        }

        Ok(table)
    }
}
