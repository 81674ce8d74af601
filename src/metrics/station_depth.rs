//! Depth at the littoral stations

use super::{AggregatorInput, CategoryAggregator};
use crate::assembler::MetricTable;
use crate::error::Result;
use crate::utils::summary::summarize_numeric;

pub const DEPTH_PARAMETER: &str = "SI_DEPTH";

pub struct StationDepth;

impl CategoryAggregator for StationDepth {
    fn category(&self) -> &'static str {
        "station_depth"
    }

    fn prefix(&self) -> &'static str {
        "SI_"
    }

    fn parameters(&self) -> Vec<String> {
        vec![DEPTH_PARAMETER.to_string()]
    }

    fn aggregate(&self, input: &AggregatorInput<'_>) -> Result<MetricTable> {
        let mut table = MetricTable::new();
        for (site, s) in summarize_numeric(input.slice.parameter(DEPTH_PARAMETER))? {
            table.push_numeric(&site, "SIXDEPTH", s.mean);
            table.push_numeric(&site, "SIVDEPTH", s.sd);
            table.push_numeric(&site, "SINDEPTH", s.n as f64);
            table.push_numeric(&site, "SIMAXDEPTH", s.max);
        }
        Ok(table)
    }
}
