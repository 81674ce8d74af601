//! CHANNEL GEOMETRY (STREAMS)
//!
//! Transect measurements of bank angle, wetted width, thalweg depth and
//! incision height.
//!
//! Bank angle classes (degrees):
//!   - GRADUAL  [0, 30)
//!   - MODERATE [30, 60)
//!   - STEEP    [60, 75)
//!   - VERTICAL [75, inf)

use super::{AggregatorInput, CategoryAggregator};
use crate::assembler::MetricTable;
use crate::error::{PhabError, Result};
use crate::utils::coercion::parse_numeric;
use crate::utils::summary::{describe, numeric_values, summarize_numeric, ClassTally};

pub const BANK_ANGLE_PARAMETER: &str = "CG_BANK_ANGLE";
pub const WETTED_WIDTH_PARAMETER: &str = "CG_WETTED_WIDTH";
pub const THALWEG_DEPTH_PARAMETER: &str = "CG_THALWEG_DEPTH";
pub const INCISED_HEIGHT_PARAMETER: &str = "CG_INCISED_HEIGHT";

pub const BANK_ANGLE_CLASSES: &[&str] = &["GRADUAL", "MODERATE", "STEEP", "VERTICAL"];

/// Lower bounds of MODERATE, STEEP and VERTICAL
const BANK_ANGLE_BREAKS: [f64; 3] = [30.0, 60.0, 75.0];

/// Class of a bank angle; `None` for negative or non-finite angles.
pub fn bank_angle_class(degrees: f64) -> Option<&'static str> {
    if !(degrees.is_finite() && degrees >= 0.0) {
        return None;
    }
    let idx = BANK_ANGLE_BREAKS.iter().filter(|b| degrees >= **b).count();
    Some(BANK_ANGLE_CLASSES[idx])
}

pub struct ChannelGeometry;

impl CategoryAggregator for ChannelGeometry {
    fn category(&self) -> &'static str {
        "channel_geometry"
    }

    fn prefix(&self) -> &'static str {
        "CG_"
    }

    fn parameters(&self) -> Vec<String> {
        [
            BANK_ANGLE_PARAMETER,
            WETTED_WIDTH_PARAMETER,
            THALWEG_DEPTH_PARAMETER,
            INCISED_HEIGHT_PARAMETER,
        ]
        .iter()
        .map(|p| p.to_string())
        .collect()
    }

    fn aggregate(&self, input: &AggregatorInput<'_>) -> Result<MetricTable> {
        let mut table = MetricTable::new();
        let slice = &input.slice;

        let angle_rows = slice.parameter(BANK_ANGLE_PARAMETER);
        for obs in angle_rows {
            if bank_angle_class(parse_numeric(obs)?).is_none() {
                return Err(PhabError::TypeCoercion {
                    site: obs.site.clone(),
                    parameter: obs.parameter.clone(),
                    value: obs.value.clone(),
                });
            }
        }

        for (site, angles) in numeric_values(angle_rows)? {
            let summary = describe(&angles);
            table.push_numeric(&site, "XBKA", summary.mean);
            table.push_numeric(&site, "SDBKA", summary.sd);

            let mut tally = ClassTally::default();
            for class in angles.iter().filter_map(|a| bank_angle_class(*a)) {
                tally.add(class);
            }
            for &class in BANK_ANGLE_CLASSES {
                table.push_numeric(&site, format!("PBKA_{}", class), tally.frequency(class));
            }
            if let Some(modal) = tally.modal_class(BANK_ANGLE_CLASSES) {
                table.push_categorical(&site, "BKACLASS", modal);
            }
        }

        for (site, s) in summarize_numeric(slice.parameter(WETTED_WIDTH_PARAMETER))? {
            table.push_numeric(&site, "XWIDTH", s.mean);
            table.push_numeric(&site, "SDWIDTH", s.sd);
        }

        for (site, s) in summarize_numeric(slice.parameter(THALWEG_DEPTH_PARAMETER))? {
            table.push_numeric(&site, "XDEPTH", s.mean);
            table.push_numeric(&site, "SDDEPTH", s.sd);
            table.push_numeric(&site, "VDEPTH_MAX", s.max);
        }

        for (site, s) in summarize_numeric(slice.parameter(INCISED_HEIGHT_PARAMETER))? {
            table.push_numeric(&site, "XINC_H", s.mean);
        }

        Ok(table)
    }
}
