//! Zone-aware metric families shared by several aggregators
//!
//! A family is a set of per-type values (one per cover type, class code,
//! ...) held for each site in up to three scopes: standard zone, drawdown
//! zone and synthesized.

use crate::assembler::MetricTable;
use crate::data::{CategorySlice, Zone, DRAWDOWN_SUFFIX};
use crate::error::Result;
use crate::synthesis::{DrawdownExtent, ZoneSynthesizer};
use crate::utils::reference::{CodeTable, Vocabulary};
use crate::utils::summary::{summarize_coded, tally_classes, ZoneStat};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    Standard,
    Drawdown,
    Synthesized,
}

/// Metric-name suffixes and synthesis strategy of a category
#[derive(Debug, Clone, Copy)]
pub struct ZoneLayout {
    /// `_LIT`, `_RIP`, or empty for zone-agnostic categories
    pub standard_suffix: &'static str,
    pub synthesizer: Option<ZoneSynthesizer>,
}

impl ZoneLayout {
    pub const fn zone_agnostic() -> Self {
        Self {
            standard_suffix: "",
            synthesizer: None,
        }
    }

    pub fn suffix(&self, scope: Scope) -> &'static str {
        match scope {
            Scope::Standard => self.standard_suffix,
            Scope::Drawdown => DRAWDOWN_SUFFIX,
            Scope::Synthesized => self
                .synthesizer
                .map(|s| s.tag.suffix())
                .unwrap_or(""),
        }
    }

    pub fn metric_name(&self, base: &str, scope: Scope) -> String {
        format!("{}{}", base, self.suffix(scope))
    }
}

/// Per-site, per-scope values of one metric family
#[derive(Debug, Clone, Default)]
pub struct ScopedValues {
    values: BTreeMap<(String, Scope, &'static str), f64>,
    /// Largest station count behind any value of a (site, zone)
    stations: BTreeMap<(String, Scope), usize>,
    synthesizer: Option<ZoneSynthesizer>,
    extents: BTreeMap<String, f64>,
}

impl ScopedValues {
    /// Empty family whose synthesized indices are derived with `synthesizer`.
    pub fn synthesized_by(synthesizer: Option<ZoneSynthesizer>) -> Self {
        Self {
            synthesizer,
            ..Self::default()
        }
    }

    pub fn insert(&mut self, site: &str, scope: Scope, key: &'static str, value: f64) {
        self.values.insert((site.to_string(), scope, key), value);
    }

    /// Insert a zone summary, remembering how many stations it covers.
    pub fn insert_stat(&mut self, site: &str, scope: Scope, key: &'static str, stat: ZoneStat) {
        self.insert(site, scope, key, stat.mean);
        let n = self.stations.entry((site.to_string(), scope)).or_insert(0);
        *n = (*n).max(stat.n);
    }

    pub fn set_extent(&mut self, site: &str, extent: Option<f64>) {
        if let Some(e) = extent {
            self.extents.insert(site.to_string(), e);
        }
    }

    pub fn get(&self, site: &str, scope: Scope, key: &'static str) -> Option<f64> {
        self.values.get(&(site.to_string(), scope, key)).copied()
    }

    /// Every (site, scope) pair holding at least one value.
    pub fn site_scopes(&self) -> BTreeSet<(String, Scope)> {
        self.values
            .keys()
            .map(|(site, scope, _)| (site.clone(), *scope))
            .collect()
    }

    /// Sum over the members present; `None` when none are.
    pub fn sum(&self, site: &str, scope: Scope, members: &[&'static str]) -> Option<f64> {
        self.index(site, scope, |zone| {
            let present: Vec<f64> = self.present(site, zone, members).collect();
            if present.is_empty() {
                None
            } else {
                Some(present.iter().sum())
            }
        })
    }

    /// Number of members with a positive value; `None` when none are recorded.
    pub fn count_positive(&self, site: &str, scope: Scope, members: &[&'static str]) -> Option<f64> {
        self.index(site, scope, |zone| {
            let present: Vec<f64> = self.present(site, zone, members).collect();
            if present.is_empty() {
                None
            } else {
                Some(present.iter().filter(|v| **v > 0.0).count() as f64)
            }
        })
    }

    fn present<'a>(
        &'a self,
        site: &'a str,
        scope: Scope,
        members: &'a [&'static str],
    ) -> impl Iterator<Item = f64> + 'a {
        members.iter().filter_map(move |&m| self.get(site, scope, m))
    }

    /// A synthesized index is the synthesis of the two zone indices, so it
    /// lies between them even when the zones record different members.
    fn index(&self, site: &str, scope: Scope, zone_index: impl Fn(Scope) -> Option<f64>) -> Option<f64> {
        let Some(synthesizer) = self.synthesizer.filter(|_| scope == Scope::Synthesized) else {
            return zone_index(scope);
        };
        let stat = |zone: Scope| {
            let n = self.stations.get(&(site.to_string(), zone)).copied().unwrap_or(0);
            zone_index(zone).map(|mean| ZoneStat::new(mean, n))
        };
        synthesizer.synthesize(
            stat(Scope::Standard),
            stat(Scope::Drawdown),
            self.extents.get(site).copied(),
        )
    }

    /// Write every value as `{prefix}{key}{scope suffix}`.
    pub fn emit(&self, table: &mut MetricTable, prefix: &str, layout: &ZoneLayout) {
        for ((site, scope, key), value) in &self.values {
            let name = layout.metric_name(&format!("{}{}", prefix, key), *scope);
            table.push_numeric(site, name, *value);
        }
    }
}

/// Cover and presence values of a coded family
#[derive(Debug, Clone, Default)]
pub struct CoverFamily {
    pub cover: ScopedValues,
    pub presence: ScopedValues,
}

/// Summarize `{param_prefix}{TYPE}` and `{param_prefix}{TYPE}_DD` for each
/// type and synthesize both zones per site.
pub fn coded_cover_by_zone(
    slice: &CategorySlice<'_>,
    param_prefix: &str,
    types: &[&'static str],
    codes: &CodeTable,
    layout: &ZoneLayout,
    extent: &DrawdownExtent,
) -> Result<CoverFamily> {
    let mut family = CoverFamily {
        cover: ScopedValues::synthesized_by(layout.synthesizer),
        presence: ScopedValues::synthesized_by(layout.synthesizer),
    };

    for &ty in types {
        let base = format!("{}{}", param_prefix, ty);
        let standard = summarize_coded(slice.parameter(&base), codes)?;
        let drawdown = summarize_coded(slice.parameter(&Zone::Drawdown.parameter_name(&base)), codes)?;

        let sites: BTreeSet<&String> = standard.keys().chain(drawdown.keys()).collect();
        for site in sites {
            let std_summary = standard.get(site);
            let dd_summary = drawdown.get(site);

            if let Some(s) = std_summary {
                family.cover.insert_stat(site, Scope::Standard, ty, s.cover);
                family.presence.insert_stat(site, Scope::Standard, ty, s.presence);
            }
            if let Some(d) = dd_summary {
                family.cover.insert_stat(site, Scope::Drawdown, ty, d.cover);
                family.presence.insert_stat(site, Scope::Drawdown, ty, d.presence);
            }

            if let Some(synthesizer) = layout.synthesizer {
                let site_extent = extent.get(site);
                family.cover.set_extent(site, site_extent);
                family.presence.set_extent(site, site_extent);
                let cover = synthesizer.synthesize(
                    std_summary.map(|s| s.cover),
                    dd_summary.map(|d| d.cover),
                    site_extent,
                );
                let presence = synthesizer.synthesize(
                    std_summary.map(|s| s.presence),
                    dd_summary.map(|d| d.presence),
                    site_extent,
                );
                if let Some(v) = cover {
                    family.cover.insert(site, Scope::Synthesized, ty, v);
                }
                if let Some(v) = presence {
                    family.presence.insert(site, Scope::Synthesized, ty, v);
                }
            }
        }
    }

    Ok(family)
}

/// Class frequencies of `parameter` (and its `_DD` twin) keyed by code,
/// recombined across zones when a synthesizer is given.
pub fn class_frequencies_by_zone(
    slice: &CategorySlice<'_>,
    parameter: &str,
    vocabulary: &Vocabulary,
    synthesizer: Option<ZoneSynthesizer>,
    extent: &DrawdownExtent,
) -> Result<ScopedValues> {
    let standard = tally_classes(slice.parameter(parameter), vocabulary)?;
    let drawdown = tally_classes(
        slice.parameter(&Zone::Drawdown.parameter_name(parameter)),
        vocabulary,
    )?;

    let mut values = ScopedValues::synthesized_by(synthesizer);
    let sites: BTreeSet<&String> = standard.keys().chain(drawdown.keys()).collect();
    for site in sites {
        let std_tally = standard.get(site);
        let dd_tally = drawdown.get(site);
        for &code in vocabulary.codes {
            let std_stat: Option<ZoneStat> = std_tally.map(|t| t.frequency_stat(code));
            let dd_stat: Option<ZoneStat> = dd_tally.map(|t| t.frequency_stat(code));
            if let Some(s) = std_stat {
                values.insert_stat(site, Scope::Standard, code, s);
            }
            if let Some(d) = dd_stat {
                values.insert_stat(site, Scope::Drawdown, code, d);
            }
            if let Some(syn) = synthesizer {
                let site_extent = extent.get(site);
                values.set_extent(site, site_extent);
                if let Some(v) = syn.synthesize(std_stat, dd_stat, site_extent) {
                    values.insert(site, Scope::Synthesized, code, v);
                }
            }
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Observation, ObservationTable};
    use crate::synthesis::ZoneTag;
    use approx::assert_relative_eq;

    const TYPES: &[&str] = &["SNAGS", "BRUSH"];

    fn layout() -> ZoneLayout {
        ZoneLayout {
            standard_suffix: "_LIT",
            synthesizer: Some(ZoneSynthesizer::weighted(10.0, ZoneTag::Sim)),
        }
    }

    #[test]
    fn test_coded_cover_by_zone() {
        let table = ObservationTable::new(vec![
            Observation::new("L1", "A", "FC_SNAGS", "2"),
            Observation::new("L1", "B", "FC_SNAGS", "0"),
            Observation::new("L1", "A", "FC_SNAGS_DD", "4"),
            Observation::new("L2", "A", "FC_BRUSH", "1"),
        ]);
        let slice = table.category_slice("FC_");
        let extent = DrawdownExtent::from_pairs([("L1", 5.0)]);
        let family = coded_cover_by_zone(
            &slice,
            "FC_",
            TYPES,
            &CodeTable::cover_classes(),
            &layout(),
            &extent,
        )
        .unwrap();

        assert_relative_eq!(family.cover.get("L1", Scope::Standard, "SNAGS").unwrap(), 0.125);
        assert_relative_eq!(family.cover.get("L1", Scope::Drawdown, "SNAGS").unwrap(), 0.875);
        // w = 0.5
        assert_relative_eq!(
            family.cover.get("L1", Scope::Synthesized, "SNAGS").unwrap(),
            0.5 * 0.875 + 0.5 * 0.125,
            epsilon = 1e-12
        );
        assert_eq!(family.cover.get("L2", Scope::Synthesized, "BRUSH"), Some(0.05));
        assert_eq!(family.cover.get("L2", Scope::Drawdown, "BRUSH"), None);
        assert_eq!(family.presence.get("L1", Scope::Standard, "SNAGS"), Some(0.5));
    }

    #[test]
    fn test_emit_names_by_scope() {
        let mut values = ScopedValues::default();
        values.insert("L1", Scope::Standard, "SNAGS", 0.1);
        values.insert("L1", Scope::Drawdown, "SNAGS", 0.2);
        values.insert("L1", Scope::Synthesized, "SNAGS", 0.15);
        let mut table = MetricTable::new();
        values.emit(&mut table, "FCFC", &layout());

        assert_eq!(table.numeric("L1", "FCFCSNAGS_LIT"), Some(0.1));
        assert_eq!(table.numeric("L1", "FCFCSNAGS_DD"), Some(0.2));
        assert_eq!(table.numeric("L1", "FCFCSNAGS_SIM"), Some(0.15));
    }

    #[test]
    fn test_sum_and_count_over_present_members() {
        let mut values = ScopedValues::default();
        values.insert("L1", Scope::Standard, "SNAGS", 0.25);
        values.insert("L1", Scope::Standard, "BRUSH", 0.0);
        assert_eq!(values.sum("L1", Scope::Standard, TYPES), Some(0.25));
        assert_eq!(values.count_positive("L1", Scope::Standard, TYPES), Some(1.0));
        assert_eq!(values.sum("L1", Scope::Drawdown, TYPES), None);
    }

    #[test]
    fn test_synthesized_index_stays_between_zone_indices() {
        // standard records BRUSH, drawdown only SNAGS
        let table = ObservationTable::new(vec![
            Observation::new("L1", "A", "FC_SNAGS", "0"),
            Observation::new("L1", "A", "FC_BRUSH", "4"),
            Observation::new("L1", "A", "FC_SNAGS_DD", "4"),
        ]);
        let slice = table.category_slice("FC_");
        let extent = DrawdownExtent::from_pairs([("L1", 5.0)]);
        let family = coded_cover_by_zone(
            &slice,
            "FC_",
            TYPES,
            &CodeTable::cover_classes(),
            &layout(),
            &extent,
        )
        .unwrap();

        let cover = &family.cover;
        assert_eq!(cover.sum("L1", Scope::Standard, TYPES), Some(0.875));
        assert_eq!(cover.sum("L1", Scope::Drawdown, TYPES), Some(0.875));
        assert_relative_eq!(cover.sum("L1", Scope::Synthesized, TYPES).unwrap(), 0.875, epsilon = 1e-12);

        let presence = &family.presence;
        assert_eq!(presence.count_positive("L1", Scope::Standard, TYPES), Some(1.0));
        assert_eq!(presence.count_positive("L1", Scope::Drawdown, TYPES), Some(1.0));
        assert_relative_eq!(
            presence.count_positive("L1", Scope::Synthesized, TYPES).unwrap(),
            1.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_recombined_index_pools_zone_station_counts() {
        let mut values = ScopedValues::synthesized_by(Some(ZoneSynthesizer::recombining(ZoneTag::Syn)));
        values.insert_stat("L1", Scope::Standard, "SNAGS", ZoneStat::new(0.2, 3));
        values.insert_stat("L1", Scope::Standard, "BRUSH", ZoneStat::new(0.4, 3));
        values.insert_stat("L1", Scope::Drawdown, "SNAGS", ZoneStat::new(1.0, 1));
        // (0.6 * 3 + 1.0 * 1) / 4
        assert_relative_eq!(values.sum("L1", Scope::Synthesized, TYPES).unwrap(), 0.7, epsilon = 1e-12);
        assert_eq!(values.sum("L2", Scope::Synthesized, TYPES), None);
    }
}
