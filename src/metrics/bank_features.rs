//! BANK FEATURES
//!
//! Bank angle class frequencies and the drawdown-zone bank dimensions. The
//! horizontal drawdown distance also feeds the zone synthesizer as the
//! per-site drawdown extent (see `synthesis::DrawdownExtent`).

use super::{AggregatorInput, CategoryAggregator};
use crate::assembler::MetricTable;
use crate::error::Result;
use crate::synthesis::HORIZ_DIST_PARAMETER;
use crate::utils::reference::Vocabulary;
use crate::utils::summary::{summarize_numeric, tally_classes};

pub const ANGLE_PARAMETER: &str = "BF_ANGLE";
pub const VERT_HEIGHT_PARAMETER: &str = "BF_VERT_HEIGHT_DD";

pub const BANK_ANGLES: Vocabulary = Vocabulary::closed(&["FLAT", "GRADUAL", "STEEP", "NEAR_VERTICAL"]);

/// Angle code -> frequency metric
const ANGLE_METRICS: &[(&str, &str)] = &[
    ("FLAT", "BFFFLAT"),
    ("GRADUAL", "BFFGRADUAL"),
    ("STEEP", "BFFSTEEP"),
    ("NEAR_VERTICAL", "BFFVERTICAL"),
];

pub struct BankFeatures;

impl CategoryAggregator for BankFeatures {
    fn category(&self) -> &'static str {
        "bank_features"
    }

    fn prefix(&self) -> &'static str {
        "BF_"
    }

    fn parameters(&self) -> Vec<String> {
        [ANGLE_PARAMETER, VERT_HEIGHT_PARAMETER, HORIZ_DIST_PARAMETER]
            .iter()
            .map(|p| p.to_string())
            .collect()
    }

    fn aggregate(&self, input: &AggregatorInput<'_>) -> Result<MetricTable> {
        let mut table = MetricTable::new();

        for (site, tally) in tally_classes(input.slice.parameter(ANGLE_PARAMETER), &BANK_ANGLES)? {
            for &(code, metric) in ANGLE_METRICS {
                table.push_numeric(&site, metric, tally.frequency(code));
            }
            if let Some(modal) = tally.modal_class(BANK_ANGLES.codes) {
                table.push_categorical(&site, "BFOANGLE", modal);
            }
        }

        for (site, s) in summarize_numeric(input.slice.parameter(VERT_HEIGHT_PARAMETER))? {
            table.push_numeric(&site, "BFXVERTHEIGHT_DD", s.mean);
            table.push_numeric(&site, "BFSVERTHEIGHT_DD", s.sd);
        }

        for (site, s) in summarize_numeric(input.slice.parameter(HORIZ_DIST_PARAMETER))? {
            table.push_numeric(&site, "BFXHORIZDIST_DD", s.mean);
            table.push_numeric(&site, "BFNHORIZDIST_DD", s.n as f64);
        }

        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::MetricValue;
    use crate::data::{Observation, ObservationTable};
    use crate::error::PhabError;
    use crate::synthesis::DrawdownExtent;
    use crate::utils::reference::ReferenceTables;
    use approx::assert_relative_eq;

    fn run(rows: Vec<Observation>) -> Result<MetricTable> {
        BankFeatures.run(
            &ObservationTable::new(rows),
            &ReferenceTables::default(),
            &DrawdownExtent::default(),
            false,
        )
    }

    #[test]
    fn test_angle_frequencies_and_mode() {
        let out = run(vec![
            Observation::new("L1", "A", "BF_ANGLE", "STEEP"),
            Observation::new("L1", "B", "BF_ANGLE", "near_vertical"),
            Observation::new("L1", "C", "BF_ANGLE", "STEEP"),
            Observation::new("L1", "D", "BF_ANGLE", "FLAT"),
        ])
        .unwrap();
        assert_eq!(out.numeric("L1", "BFFSTEEP"), Some(0.5));
        assert_eq!(out.numeric("L1", "BFFVERTICAL"), Some(0.25));
        assert_eq!(out.numeric("L1", "BFFGRADUAL"), Some(0.0));
        assert_eq!(
            out.get("L1", "BFOANGLE"),
            Some(&MetricValue::Categorical("STEEP".to_string()))
        );
    }

    #[test]
    fn test_drawdown_dimensions() {
        let out = run(vec![
            Observation::new("L1", "A", "BF_VERT_HEIGHT_DD", "0.5"),
            Observation::new("L1", "B", "BF_VERT_HEIGHT_DD", "1.5"),
            Observation::new("L1", "A", "BF_HORIZ_DIST_DD", "4"),
            Observation::new("L2", "A", "BF_VERT_HEIGHT_DD", "2"),
        ])
        .unwrap();
        assert_eq!(out.numeric("L1", "BFXVERTHEIGHT_DD"), Some(1.0));
        assert_relative_eq!(
            out.numeric("L1", "BFSVERTHEIGHT_DD").unwrap(),
            std::f64::consts::SQRT_2 / 2.0,
            epsilon = 1e-12
        );
        assert_eq!(out.numeric("L1", "BFNHORIZDIST_DD"), Some(1.0));
        // single value: SD is not emitted
        assert_eq!(out.numeric("L2", "BFSVERTHEIGHT_DD"), None);
        assert_eq!(out.numeric("L2", "BFXVERTHEIGHT_DD"), Some(2.0));
    }

    #[test]
    fn test_unknown_angle_code_fails() {
        let err = run(vec![Observation::new("L1", "A", "BF_ANGLE", "OVERHANG")]).unwrap_err();
        assert!(matches!(err, PhabError::InvalidCodeValue { .. }));
    }
}
