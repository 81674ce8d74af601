//! Per-site summary statistics over parameter slices
//!
//! Every helper takes the rows of one parameter and returns one summary per
//! site, keyed in a `BTreeMap` so downstream metric emission is ordered.

use crate::data::Observation;
use crate::error::Result;
use crate::utils::coercion::parse_numeric;
use crate::utils::reference::{CodeTable, Vocabulary};
use std::collections::BTreeMap;

/// Site-level mean of a per-station quantity and the number of stations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneStat {
    pub mean: f64,
    pub n: usize,
}

impl ZoneStat {
    pub fn new(mean: f64, n: usize) -> Self {
        Self { mean, n }
    }

    fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        Some(Self::new(mean, values.len()))
    }
}

/// Cover and presence of one coded parameter at one site
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverSummary {
    /// Mean of the per-station weights
    pub cover: ZoneStat,
    /// Fraction of stations where the code flags presence
    pub presence: ZoneStat,
}

/// Descriptive statistics of a continuous parameter at one site
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericSummary {
    pub n: usize,
    pub mean: f64,
    /// Sample standard deviation; NaN for a single value
    pub sd: f64,
    pub min: f64,
    pub max: f64,
}

/// Class counts of one categorical parameter at one site
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClassTally {
    pub counts: BTreeMap<&'static str, usize>,
    pub total: usize,
}

impl ClassTally {
    pub fn add(&mut self, code: &'static str) {
        *self.counts.entry(code).or_insert(0) += 1;
        self.total += 1;
    }

    pub fn frequency(&self, code: &str) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.counts.get(code).copied().unwrap_or(0) as f64 / self.total as f64
    }

    /// Frequency of `code` as a zone statistic (for recombination).
    pub fn frequency_stat(&self, code: &str) -> ZoneStat {
        ZoneStat::new(self.frequency(code), self.total)
    }

    /// Most frequent class; ties go to the first code in `order`.
    pub fn modal_class(&self, order: &[&'static str]) -> Option<&'static str> {
        let mut best: Option<(&'static str, usize)> = None;
        for &code in order {
            let count = self.counts.get(&code).copied().unwrap_or(0);
            if count > 0 && best.map_or(true, |(_, c)| count > c) {
                best = Some((code, count));
            }
        }
        best.map(|(code, _)| code)
    }
}

/// Cover and presence per site from coded values.
pub fn summarize_coded(
    rows: &[&Observation],
    table: &CodeTable,
) -> Result<BTreeMap<String, CoverSummary>> {
    let mut by_site: BTreeMap<&str, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
    for obs in rows {
        let code = table.lookup(obs)?;
        let entry = by_site.entry(obs.site.as_str()).or_default();
        entry.0.push(code.weight);
        entry.1.push(if code.present { 1.0 } else { 0.0 });
    }

    Ok(by_site
        .into_iter()
        .filter_map(|(site, (weights, presence))| {
            let cover = ZoneStat::from_values(&weights)?;
            let presence = ZoneStat::from_values(&presence)?;
            Some((site.to_string(), CoverSummary { cover, presence }))
        })
        .collect())
}

/// Mean/SD/range per site from continuous values.
pub fn summarize_numeric(rows: &[&Observation]) -> Result<BTreeMap<String, NumericSummary>> {
    let mut by_site: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for obs in rows {
        let value = parse_numeric(obs)?;
        by_site.entry(obs.site.as_str()).or_default().push(value);
    }

    Ok(by_site
        .into_iter()
        .map(|(site, values)| (site.to_string(), describe(&values)))
        .collect())
}

/// Parsed continuous values per site, for aggregators that bucket them.
pub fn numeric_values(rows: &[&Observation]) -> Result<BTreeMap<String, Vec<f64>>> {
    let mut by_site: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for obs in rows {
        let value = parse_numeric(obs)?;
        by_site.entry(obs.site.clone()).or_default().push(value);
    }
    Ok(by_site)
}

/// Class counts per site from categorical values.
pub fn tally_classes(
    rows: &[&Observation],
    vocabulary: &Vocabulary,
) -> Result<BTreeMap<String, ClassTally>> {
    let mut by_site: BTreeMap<String, ClassTally> = BTreeMap::new();
    for obs in rows {
        let code = vocabulary.classify(obs)?;
        by_site.entry(obs.site.clone()).or_default().add(code);
    }
    Ok(by_site)
}

pub fn describe(values: &[f64]) -> NumericSummary {
    let n = values.len();
    let mean = values.iter().sum::<f64>() / n as f64;
    let sd = if n > 1 {
        let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
        (ss / (n - 1) as f64).sqrt()
    } else {
        f64::NAN
    };
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    NumericSummary { n, mean, sd, min, max }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn obs(site: &str, station: &str, param: &str, value: &str) -> Observation {
        Observation::new(site, station, param, value)
    }

    #[test]
    fn test_summarize_coded() {
        let rows = vec![
            obs("L1", "A", "FC_SNAGS", "0"),
            obs("L1", "B", "FC_SNAGS", "2"),
            obs("L1", "C", "FC_SNAGS", "4"),
            obs("L2", "A", "FC_SNAGS", "1"),
        ];
        let refs: Vec<&Observation> = rows.iter().collect();
        let out = summarize_coded(&refs, &CodeTable::cover_classes()).unwrap();

        let l1 = out["L1"];
        assert_relative_eq!(l1.cover.mean, (0.0 + 0.25 + 0.875) / 3.0, epsilon = 1e-12);
        assert_relative_eq!(l1.presence.mean, 2.0 / 3.0, epsilon = 1e-12);
        assert_eq!(l1.cover.n, 3);
        assert_relative_eq!(out["L2"].cover.mean, 0.05, epsilon = 1e-12);
    }

    #[test]
    fn test_summarize_numeric_sd() {
        let rows = vec![
            obs("L1", "A", "SI_DEPTH", "1"),
            obs("L1", "B", "SI_DEPTH", "3"),
            obs("L2", "A", "SI_DEPTH", "4"),
        ];
        let refs: Vec<&Observation> = rows.iter().collect();
        let out = summarize_numeric(&refs).unwrap();
        assert_relative_eq!(out["L1"].mean, 2.0, epsilon = 1e-12);
        assert_relative_eq!(out["L1"].sd, 2f64.sqrt(), epsilon = 1e-12);
        assert_eq!(out["L1"].max, 3.0);
        assert!(out["L2"].sd.is_nan());
    }

    #[test]
    fn test_modal_class_tie_breaks_on_order() {
        let mut tally = ClassTally::default();
        tally.add("STEEP");
        tally.add("FLAT");
        assert_eq!(tally.modal_class(&["FLAT", "GRADUAL", "STEEP"]), Some("FLAT"));
        tally.add("STEEP");
        assert_eq!(tally.modal_class(&["FLAT", "GRADUAL", "STEEP"]), Some("STEEP"));
        assert_relative_eq!(tally.frequency("STEEP"), 2.0 / 3.0, epsilon = 1e-12);
        assert_eq!(tally.frequency("GRADUAL"), 0.0);
    }
}
