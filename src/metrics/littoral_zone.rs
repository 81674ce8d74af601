//! Surface film observed in the littoral zone

use super::zoned::{class_frequencies_by_zone, ZoneLayout};
use super::{AggregatorInput, CategoryAggregator};
use crate::assembler::MetricTable;
use crate::error::Result;
use crate::utils::reference::Vocabulary;

pub const FILM_PARAMETER: &str = "LZ_FILM";

pub const FILM_TYPES: Vocabulary =
    Vocabulary::with_catch_all(&["NONE", "SCUM", "ALGAL_MAT", "OILY", "OTHER"], "OTHER");

pub struct LittoralZone;

impl CategoryAggregator for LittoralZone {
    fn category(&self) -> &'static str {
        "littoral_zone"
    }

    fn prefix(&self) -> &'static str {
        "LZ_"
    }

    fn parameters(&self) -> Vec<String> {
        vec![FILM_PARAMETER.to_string()]
    }

    fn aggregate(&self, input: &AggregatorInput<'_>) -> Result<MetricTable> {
        let frequencies =
            class_frequencies_by_zone(&input.slice, FILM_PARAMETER, &FILM_TYPES, None, input.extent)?;
        let mut table = MetricTable::new();
        frequencies.emit(&mut table, "LZFPFILM", &ZoneLayout::zone_agnostic());
        Ok(table)
    }
}
