//! AQUATIC MACROPHYTES (LITTORAL)

use super::zoned::{coded_cover_by_zone, ZoneLayout};
use super::{parameter_names, AggregatorInput, CategoryAggregator};
use crate::assembler::MetricTable;
use crate::error::Result;
use crate::synthesis::{ZoneSynthesizer, ZoneTag};

pub const PLANT_TYPES: &[&str] = &["EMERGENT", "FLOATING", "SUBMERGENT", "TOTALCOVER"];

const GROWTH_FORMS: &[&str] = &["EMERGENT", "FLOATING", "SUBMERGENT"];

pub struct AquaticMacrophytes {
    layout: ZoneLayout,
}

impl AquaticMacrophytes {
    pub fn new(littoral_extent_m: f64) -> Self {
        Self {
            layout: ZoneLayout {
                standard_suffix: "_LIT",
                synthesizer: Some(ZoneSynthesizer::weighted(littoral_extent_m, ZoneTag::Sim)),
            },
        }
    }
}

impl CategoryAggregator for AquaticMacrophytes {
    fn category(&self) -> &'static str {
        "aquatic_macrophytes"
    }

    fn prefix(&self) -> &'static str {
        "AM_"
    }

    fn parameters(&self) -> Vec<String> {
        parameter_names(self.prefix(), PLANT_TYPES, true)
    }

    fn aggregate(&self, input: &AggregatorInput<'_>) -> Result<MetricTable> {
        let family = coded_cover_by_zone(
            &input.slice,
            self.prefix(),
            PLANT_TYPES,
            &input.reference.cover,
            &self.layout,
            input.extent,
        )?;

        let mut table = MetricTable::new();
        family.cover.emit(&mut table, "AMFC", &self.layout);
        family.presence.emit(&mut table, "AMFP", &self.layout);
        for (site, scope) in family.cover.site_scopes() {
            table.push_optional(
                &site,
                self.layout.metric_name("AMITOTAL", scope),
                family.cover.sum(&site, scope, GROWTH_FORMS),
            );
        }
        Ok(table)
    }
}
