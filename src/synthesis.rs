//! Zone Synthesizer
//!
//! Reconciles standard-zone and drawdown-zone versions of one metric into a
//! single value comparable with surveys that sampled only one zone.
//!
//! Policy:
//! - standard only: the standard value, unchanged
//! - drawdown only: nothing is synthesized
//! - both: weighted blend by drawdown extent (continuous/fractional metrics)
//!   or pooled re-tabulation of station counts (categorical frequencies)
//!
//! A missing extent degrades the blend to an unweighted mean.

use crate::data::ObservationTable;
use crate::error::Result;
use crate::utils::summary::{summarize_numeric, ZoneStat};
use rustc_hash::FxHashMap;

/// Parameter holding the horizontal extent (m) of the drawdown zone.
pub const HORIZ_DIST_PARAMETER: &str = "BF_HORIZ_DIST_DD";

/// Suffix of a synthesized metric; fixed per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZoneTag {
    /// Riparian-type data (standard + drawdown riparian plot)
    Syn,
    /// Littoral-type data
    Sim,
}

impl ZoneTag {
    pub fn suffix(self) -> &'static str {
        match self {
            ZoneTag::Syn => "_SYN",
            ZoneTag::Sim => "_SIM",
        }
    }
}

/// How the two zone values are combined
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SynthesisPolicy {
    /// Mix by the share of the plot depth covered by the drawdown zone.
    WeightedBlend { plot_extent_m: f64 },
    /// Pool the station counts of both zones.
    FrequencyRecombination,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneSynthesizer {
    pub policy: SynthesisPolicy,
    pub tag: ZoneTag,
}

impl ZoneSynthesizer {
    pub fn weighted(plot_extent_m: f64, tag: ZoneTag) -> Self {
        Self {
            policy: SynthesisPolicy::WeightedBlend { plot_extent_m },
            tag,
        }
    }

    pub fn recombining(tag: ZoneTag) -> Self {
        Self {
            policy: SynthesisPolicy::FrequencyRecombination,
            tag,
        }
    }

    /// Synthesized metric name for a base name (`FCFCSNAGS` -> `FCFCSNAGS_SIM`).
    pub fn metric_name(&self, base: &str) -> String {
        format!("{}{}", base, self.tag.suffix())
    }

    /// Drawdown share of the blend; `None` when the extent is unusable.
    pub fn drawdown_weight(&self, extent: Option<f64>) -> Option<f64> {
        match self.policy {
            SynthesisPolicy::WeightedBlend { plot_extent_m } => {
                let extent = extent.filter(|e| e.is_finite())?;
                if !(plot_extent_m.is_finite() && plot_extent_m > 0.0) {
                    return None;
                }
                Some((extent / plot_extent_m).clamp(0.0, 1.0))
            }
            SynthesisPolicy::FrequencyRecombination => None,
        }
    }

    pub fn synthesize(
        &self,
        standard: Option<ZoneStat>,
        drawdown: Option<ZoneStat>,
        extent: Option<f64>,
    ) -> Option<f64> {
        let standard = standard?;
        let Some(drawdown) = drawdown else {
            return Some(standard.mean);
        };

        match self.policy {
            SynthesisPolicy::WeightedBlend { .. } => {
                let w = self.drawdown_weight(extent).unwrap_or_else(|| {
                    tracing::debug!("No drawdown extent, using unweighted zone mean");
                    0.5
                });
                Some(w * drawdown.mean + (1.0 - w) * standard.mean)
            }
            SynthesisPolicy::FrequencyRecombination => {
                let n = standard.n + drawdown.n;
                if n == 0 {
                    return Some(standard.mean);
                }
                Some(
                    (standard.mean * standard.n as f64 + drawdown.mean * drawdown.n as f64)
                        / n as f64,
                )
            }
        }
    }
}

/// Per-site horizontal extent of the drawdown zone (mean over stations)
#[derive(Debug, Clone, Default)]
pub struct DrawdownExtent {
    by_site: FxHashMap<String, f64>,
}

impl DrawdownExtent {
    pub fn from_observations(table: &ObservationTable) -> Result<Self> {
        let slice = table.category_slice(HORIZ_DIST_PARAMETER);
        let summaries = summarize_numeric(slice.parameter(HORIZ_DIST_PARAMETER))?;
        let by_site = summaries
            .into_iter()
            .map(|(site, summary)| (site, summary.mean))
            .collect();
        Ok(Self { by_site })
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        Self {
            by_site: pairs.into_iter().map(|(s, e)| (s.to_string(), e)).collect(),
        }
    }

    pub fn get(&self, site: &str) -> Option<f64> {
        self.by_site.get(site).copied()
    }

    pub fn len(&self) -> usize {
        self.by_site.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_site.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Observation;
    use approx::assert_relative_eq;

    #[test]
    fn test_standard_only_is_exact() {
        let syn = ZoneSynthesizer::weighted(15.0, ZoneTag::Syn);
        let out = syn.synthesize(Some(ZoneStat::new(0.3125, 10)), None, Some(4.0));
        assert_eq!(out, Some(0.3125));

        let syn = ZoneSynthesizer::recombining(ZoneTag::Syn);
        assert_eq!(syn.synthesize(Some(ZoneStat::new(0.7, 10)), None, None), Some(0.7));
    }

    #[test]
    fn test_drawdown_only_is_not_synthesized() {
        let syn = ZoneSynthesizer::weighted(10.0, ZoneTag::Sim);
        assert_eq!(syn.synthesize(None, Some(ZoneStat::new(0.4, 10)), Some(3.0)), None);
    }

    #[test]
    fn test_weighted_blend() {
        let syn = ZoneSynthesizer::weighted(15.0, ZoneTag::Syn);
        let out = syn
            .synthesize(Some(ZoneStat::new(0.2, 10)), Some(ZoneStat::new(0.8, 10)), Some(5.0))
            .unwrap();
        // w = 5/15
        assert_relative_eq!(out, 0.8 / 3.0 + 0.2 * 2.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_extent_beyond_plot_is_clamped() {
        let syn = ZoneSynthesizer::weighted(10.0, ZoneTag::Sim);
        let out = syn
            .synthesize(Some(ZoneStat::new(0.2, 10)), Some(ZoneStat::new(0.6, 10)), Some(40.0))
            .unwrap();
        assert_relative_eq!(out, 0.6, epsilon = 1e-12);
    }

    #[test]
    fn test_missing_extent_falls_back_to_unweighted() {
        let syn = ZoneSynthesizer::weighted(15.0, ZoneTag::Syn);
        let out = syn
            .synthesize(Some(ZoneStat::new(0.2, 10)), Some(ZoneStat::new(0.6, 3)), None)
            .unwrap();
        assert_relative_eq!(out, 0.4, epsilon = 1e-12);

        let out = syn
            .synthesize(Some(ZoneStat::new(0.2, 10)), Some(ZoneStat::new(0.6, 3)), Some(f64::NAN))
            .unwrap();
        assert_relative_eq!(out, 0.4, epsilon = 1e-12);
    }

    #[test]
    fn test_frequency_recombination_pools_counts() {
        let syn = ZoneSynthesizer::recombining(ZoneTag::Syn);
        // 3/10 present in riparian, 2/5 in drawdown -> 5/15
        let out = syn
            .synthesize(Some(ZoneStat::new(0.3, 10)), Some(ZoneStat::new(0.4, 5)), Some(8.0))
            .unwrap();
        assert_relative_eq!(out, 1.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_blend_stays_within_zone_range() {
        let syn = ZoneSynthesizer::weighted(15.0, ZoneTag::Syn);
        for extent in [None, Some(0.0), Some(3.3), Some(15.0), Some(99.0)] {
            for (a, b) in [(0.0, 1.0), (0.875, 0.05), (0.3, 0.3)] {
                let out = syn
                    .synthesize(Some(ZoneStat::new(a, 4)), Some(ZoneStat::new(b, 7)), extent)
                    .unwrap();
                assert!(out >= f64::min(a, b) - 1e-12 && out <= f64::max(a, b) + 1e-12);
            }
        }
    }

    #[test]
    fn test_drawdown_extent_from_observations() {
        let table = ObservationTable::new(vec![
            Observation::new("L1", "A", "BF_HORIZ_DIST_DD", "2"),
            Observation::new("L1", "B", "BF_HORIZ_DIST_DD", "4"),
            Observation::new("L2", "A", "BF_ANGLE", "FLAT"),
        ]);
        let extent = DrawdownExtent::from_observations(&table).unwrap();
        assert_eq!(extent.get("L1"), Some(3.0));
        assert_eq!(extent.get("L2"), None);
    }

    #[test]
    fn test_metric_name_tags() {
        let syn = ZoneSynthesizer::weighted(15.0, ZoneTag::Syn);
        assert_eq!(syn.metric_name("RVFCGROUND_WOODY"), "RVFCGROUND_WOODY_SYN");
        let sim = ZoneSynthesizer::weighted(10.0, ZoneTag::Sim);
        assert_eq!(sim.metric_name("FCFCSNAGS"), "FCFCSNAGS_SIM");
    }
}
