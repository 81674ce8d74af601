//! RIPARIAN VEGETATION
//!
//! Cover classes of the canopy, understory and ground layers plus the
//! dominant vegetation type of the canopy and understory. Covers blend the
//! two zones by drawdown extent; vegetation type frequencies pool stations.

use super::zoned::{class_frequencies_by_zone, coded_cover_by_zone, ZoneLayout};
use super::{parameter_names, AggregatorInput, CategoryAggregator};
use crate::assembler::MetricTable;
use crate::error::Result;
use crate::synthesis::{ZoneSynthesizer, ZoneTag};
use crate::utils::reference::Vocabulary;

pub const COVER_TYPES: &[&str] = &[
    "CANOPY_BIG_TREES",
    "CANOPY_SMALL_TREES",
    "UNDERSTORY_WOODY",
    "UNDERSTORY_NONWOODY",
    "GROUND_WOODY",
    "GROUND_NONWOODY",
    "GROUND_BARE",
    "GROUND_INUNDATED",
];

/// Deciduous, coniferous, broadleaf evergreen, mixed, none
pub const VEGETATION_TYPES: Vocabulary = Vocabulary::closed(&["D", "C", "E", "M", "N"]);

const CANOPY: &[&str] = &["CANOPY_BIG_TREES", "CANOPY_SMALL_TREES"];
const UNDERSTORY: &[&str] = &["UNDERSTORY_WOODY", "UNDERSTORY_NONWOODY"];
const GROUND: &[&str] = &["GROUND_WOODY", "GROUND_NONWOODY"];
const WOODY: &[&str] = &[
    "CANOPY_BIG_TREES",
    "CANOPY_SMALL_TREES",
    "UNDERSTORY_WOODY",
    "GROUND_WOODY",
];
const HERBS: &[&str] = &["UNDERSTORY_NONWOODY", "GROUND_NONWOODY"];
const VEGETATED: &[&str] = &[
    "CANOPY_BIG_TREES",
    "CANOPY_SMALL_TREES",
    "UNDERSTORY_WOODY",
    "UNDERSTORY_NONWOODY",
    "GROUND_WOODY",
    "GROUND_NONWOODY",
];

/// (parameter, metric prefix) of the layer vegetation types
const LAYER_TYPES: &[(&str, &str)] = &[("RV_CANOPY", "RVFPCAN"), ("RV_UNDERSTORY", "RVFPUND")];

pub struct RiparianVegetation {
    layout: ZoneLayout,
}

impl RiparianVegetation {
    pub fn new(riparian_extent_m: f64) -> Self {
        Self {
            layout: ZoneLayout {
                standard_suffix: "_RIP",
                synthesizer: Some(ZoneSynthesizer::weighted(riparian_extent_m, ZoneTag::Syn)),
            },
        }
    }
}

impl CategoryAggregator for RiparianVegetation {
    fn category(&self) -> &'static str {
        "riparian_vegetation"
    }

    fn prefix(&self) -> &'static str {
        "RV_"
    }

    fn parameters(&self) -> Vec<String> {
        let mut names = parameter_names(self.prefix(), COVER_TYPES, true);
        names.extend(parameter_names(self.prefix(), &["CANOPY", "UNDERSTORY"], true));
        names
    }

    fn aggregate(&self, input: &AggregatorInput<'_>) -> Result<MetricTable> {
        let family = coded_cover_by_zone(
            &input.slice,
            self.prefix(),
            COVER_TYPES,
            &input.reference.cover,
            &self.layout,
            input.extent,
        )?;
        let cover = &family.cover;

        let mut table = MetricTable::new();
        cover.emit(&mut table, "RVFC", &self.layout);
        family.presence.emit(&mut table, "RVFP", &self.layout);

        for (site, scope) in cover.site_scopes() {
            let name = |base: &str| self.layout.metric_name(base, scope);
            table.push_optional(&site, name("RVICANOPY"), cover.sum(&site, scope, CANOPY));
            table.push_optional(&site, name("RVIUNDERSTORY"), cover.sum(&site, scope, UNDERSTORY));
            table.push_optional(&site, name("RVIGROUND"), cover.sum(&site, scope, GROUND));
            table.push_optional(&site, name("RVIWOODY"), cover.sum(&site, scope, WOODY));
            table.push_optional(&site, name("RVIHERBS"), cover.sum(&site, scope, HERBS));
            table.push_optional(&site, name("RVIVEG"), cover.sum(&site, scope, VEGETATED));
        }

        let recombining = Some(ZoneSynthesizer::recombining(ZoneTag::Syn));
        for &(parameter, metric_prefix) in LAYER_TYPES {
            let frequencies = class_frequencies_by_zone(
                &input.slice,
                parameter,
                &VEGETATION_TYPES,
                recombining,
                input.extent,
            )?;
            frequencies.emit(&mut table, metric_prefix, &self.layout);
        }

        Ok(table)
    }
}
