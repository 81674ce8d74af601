//! SUBSTRATE
//!
//! One implementation serves two categories:
//! - littoral bottom substrate (`BS_`), zone-agnostic, metrics `LS*`, plus
//!   sediment color and odor frequencies
//! - shoreline substrate (`SS_`), riparian zones, metrics `SS*`
//!
//! Both report per-class cover/presence, a cover-weighted mean log10
//! particle diameter over the mineral classes, and the dominant class.

use super::zoned::{class_frequencies_by_zone, coded_cover_by_zone, Scope, ScopedValues, ZoneLayout};
use super::{parameter_names, AggregatorInput, CategoryAggregator};
use crate::assembler::MetricTable;
use crate::error::Result;
use crate::synthesis::{ZoneSynthesizer, ZoneTag};
use crate::utils::reference::Vocabulary;

pub const SUBSTRATE_CLASSES: &[&str] = &[
    "BEDROCK",
    "BOULDERS",
    "COBBLE",
    "GRAVEL",
    "SAND",
    "SILT",
    "WOOD",
    "VEGETATION",
    "OTHER",
];

/// Geometric-mean diameter (mm) of each mineral class
pub const MINERAL_DIAMETERS_MM: &[(&str, f64)] = &[
    ("BEDROCK", 5657.0),
    ("BOULDERS", 1000.0),
    ("COBBLE", 126.5),
    ("GRAVEL", 11.3),
    ("SAND", 0.346),
    ("SILT", 0.0077),
];

pub const SEDIMENT_COLOR: Vocabulary = Vocabulary::with_catch_all(
    &["BLACK", "BROWN", "GRAY", "GREEN", "RED", "WHITE", "OTHER"],
    "OTHER",
);
pub const SEDIMENT_ODOR: Vocabulary = Vocabulary::with_catch_all(
    &["NONE", "H2S", "ANOXIC", "OIL", "CHEMICAL", "OTHER"],
    "OTHER",
);

/// (parameter suffix, vocabulary) of the sediment descriptors
const DESCRIPTORS: &[(&str, Vocabulary)] = &[("COLOR", SEDIMENT_COLOR), ("ODOR", SEDIMENT_ODOR)];

pub struct Substrate {
    category: &'static str,
    prefix: &'static str,
    /// `LS` or `SS`
    metric_prefix: &'static str,
    layout: ZoneLayout,
    /// Sediment color/odor are recorded with the littoral bottom only
    descriptors: bool,
}

impl Substrate {
    pub fn littoral() -> Self {
        Self {
            category: "littoral_substrate",
            prefix: "BS_",
            metric_prefix: "LS",
            layout: ZoneLayout::zone_agnostic(),
            descriptors: true,
        }
    }

    pub fn shoreline(riparian_extent_m: f64) -> Self {
        Self {
            category: "shoreline_substrate",
            prefix: "SS_",
            metric_prefix: "SS",
            layout: ZoneLayout {
                standard_suffix: "_RIP",
                synthesizer: Some(ZoneSynthesizer::weighted(riparian_extent_m, ZoneTag::Syn)),
            },
            descriptors: false,
        }
    }

    fn zoned(&self) -> bool {
        self.layout.synthesizer.is_some()
    }

    fn metric(&self, base: &str) -> String {
        format!("{}{}", self.metric_prefix, base)
    }
}

/// Cover-weighted mean of log10 diameter; `None` without mineral cover.
fn mean_log_diameter(cover: &ScopedValues, site: &str, scope: Scope) -> Option<f64> {
    let mut weighted = 0.0;
    let mut total = 0.0;
    for &(class, diameter) in MINERAL_DIAMETERS_MM {
        if let Some(c) = cover.get(site, scope, class) {
            weighted += c * libm::log10(diameter);
            total += c;
        }
    }
    if total > 0.0 {
        Some(weighted / total)
    } else {
        None
    }
}

/// Class with the largest mean cover; ties go to the coarser class.
fn dominant_class(cover: &ScopedValues, site: &str, scope: Scope) -> Option<&'static str> {
    let mut best: Option<(&'static str, f64)> = None;
    for &class in SUBSTRATE_CLASSES {
        if let Some(c) = cover.get(site, scope, class) {
            if c > 0.0 && best.map_or(true, |(_, b)| c > b) {
                best = Some((class, c));
            }
        }
    }
    best.map(|(class, _)| class)
}

impl CategoryAggregator for Substrate {
    fn category(&self) -> &'static str {
        self.category
    }

    fn prefix(&self) -> &'static str {
        self.prefix
    }

    fn parameters(&self) -> Vec<String> {
        let mut names = parameter_names(self.prefix, SUBSTRATE_CLASSES, self.zoned());
        if self.descriptors {
            let suffixes: Vec<&str> = DESCRIPTORS.iter().map(|(s, _)| *s).collect();
            names.extend(parameter_names(self.prefix, &suffixes, false));
        }
        names
    }

    fn aggregate(&self, input: &AggregatorInput<'_>) -> Result<MetricTable> {
        let family = coded_cover_by_zone(
            &input.slice,
            self.prefix,
            SUBSTRATE_CLASSES,
            &input.reference.cover,
            &self.layout,
            input.extent,
        )?;

        let mut table = MetricTable::new();
        family.cover.emit(&mut table, &self.metric("FC"), &self.layout);
        family.presence.emit(&mut table, &self.metric("FP"), &self.layout);

        for (site, scope) in family.cover.site_scopes() {
            table.push_optional(
                &site,
                self.layout.metric_name(&self.metric("XLDIA"), scope),
                mean_log_diameter(&family.cover, &site, scope),
            );
            if scope == Scope::Synthesized {
                continue;
            }
            if let Some(class) = dominant_class(&family.cover, &site, scope) {
                table.push_categorical(
                    &site,
                    self.layout.metric_name(&self.metric("SDOMINANT"), scope),
                    class,
                );
            }
        }

        if self.descriptors {
            for (suffix, vocabulary) in DESCRIPTORS {
                let parameter = format!("{}{}", self.prefix, suffix);
                let frequencies =
                    class_frequencies_by_zone(&input.slice, &parameter, vocabulary, None, input.extent)?;
                frequencies.emit(&mut table, &self.metric(&format!("FP{}", suffix)), &self.layout);
            }
        }

        Ok(table)
    }
}
