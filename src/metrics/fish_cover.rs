//! FISH COVER (LITTORAL)
//!
//! Cover classes (0-4) of eight fish-cover types recorded at each littoral
//! station, in the standard plot (`FC_{TYPE}`) and, where sampled, in the
//! drawdown zone (`FC_{TYPE}_DD`).
//!
//! Metrics, each for `_LIT`, `_DD` and `_SIM`:
//!   - `FCFP{TYPE}`: fraction of stations with the type present
//!   - `FCFC{TYPE}`: mean areal cover
//!   - `FCIALL`, `FCIBIG`, `FCINATURAL`, `FCIRIPVEG`: summed cover indices
//!   - `FCNALL`: number of cover types present

use super::zoned::{coded_cover_by_zone, ZoneLayout};
use super::{parameter_names, AggregatorInput, CategoryAggregator};
use crate::assembler::MetricTable;
use crate::error::Result;
use crate::synthesis::{ZoneSynthesizer, ZoneTag};

pub const COVER_TYPES: &[&str] = &[
    "AQUATIC",
    "BOULDERS",
    "BRUSH",
    "LEDGES",
    "LIVETREES",
    "OVERHANG",
    "SNAGS",
    "STRUCTURES",
];

const BIG_TYPES: &[&str] = &["BOULDERS", "LEDGES", "LIVETREES", "STRUCTURES"];
const NATURAL_TYPES: &[&str] = &[
    "AQUATIC",
    "BOULDERS",
    "BRUSH",
    "LEDGES",
    "LIVETREES",
    "OVERHANG",
    "SNAGS",
];
const RIPVEG_TYPES: &[&str] = &["BRUSH", "LIVETREES", "OVERHANG"];

pub struct FishCover {
    layout: ZoneLayout,
}

impl FishCover {
    pub fn new(littoral_extent_m: f64) -> Self {
        Self {
            layout: ZoneLayout {
                standard_suffix: "_LIT",
                synthesizer: Some(ZoneSynthesizer::weighted(littoral_extent_m, ZoneTag::Sim)),
            },
        }
    }
}

impl CategoryAggregator for FishCover {
    fn category(&self) -> &'static str {
        "fish_cover"
    }

    fn prefix(&self) -> &'static str {
        "FC_"
    }

    fn parameters(&self) -> Vec<String> {
        parameter_names(self.prefix(), COVER_TYPES, true)
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

        let mut table = MetricTable::new();
        family.cover.emit(&mut table, "FCFC", &self.layout);
        family.presence.emit(&mut table, "FCFP", &self.layout);

        for (site, scope) in family.cover.site_scopes() {
            let name = |base: &str| self.layout.metric_name(base, scope);
            let cover = &family.cover;
            table.push_optional(&site, name("FCIALL"), cover.sum(&site, scope, COVER_TYPES));
            table.push_optional(&site, name("FCIBIG"), cover.sum(&site, scope, BIG_TYPES));
            table.push_optional(&site, name("FCINATURAL"), cover.sum(&site, scope, NATURAL_TYPES));
            table.push_optional(&site, name("FCIRIPVEG"), cover.sum(&site, scope, RIPVEG_TYPES));
            table.push_optional(
                &site,
                name("FCNALL"),
                family.presence.count_positive(&site, scope, COVER_TYPES),
            );
        }

        Ok(table)
    }
}
