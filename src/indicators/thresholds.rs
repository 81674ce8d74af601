//! Condition-class thresholds
//!
//! A threshold set partitions the real line with ascending cut points:
//!
//!   (-inf, c0) -> classes[0]
//!   [c0, c1)   -> classes[1]
//!   ...
//!   [cn, +inf) -> classes[n+1]
//!
//! so every finite value maps to exactly one class.

use crate::covariates::Origin;
use crate::error::{PhabError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSet {
    pub cuts: Vec<f64>,
    pub classes: Vec<String>,
}

impl ThresholdSet {
    pub fn new<S: Into<String>>(cuts: Vec<f64>, classes: impl IntoIterator<Item = S>) -> Result<Self> {
        let set = Self {
            cuts,
            classes: classes.into_iter().map(Into::into).collect(),
        };
        set.validate()?;
        Ok(set)
    }

    /// Finite, strictly ascending cuts and one more class than cuts.
    pub fn validate(&self) -> Result<()> {
        if self.classes.len() != self.cuts.len() + 1 {
            return Err(PhabError::schema(format!(
                "Threshold set has {} cuts but {} classes",
                self.cuts.len(),
                self.classes.len()
            )));
        }
        if self.cuts.iter().any(|c| !c.is_finite()) {
            return Err(PhabError::schema("Threshold cuts must be finite"));
        }
        if self.cuts.windows(2).any(|w| w[0] >= w[1]) {
            return Err(PhabError::schema(format!(
                "Threshold cuts must be strictly ascending: {:?}",
                self.cuts
            )));
        }
        Ok(())
    }

    /// Class of a finite value; `None` for NaN or infinities.
    pub fn classify(&self, value: f64) -> Option<&str> {
        if !value.is_finite() {
            return None;
        }
        let idx = self.cuts.partition_point(|c| *c <= value);
        self.classes.get(idx).map(String::as_str)
    }
}

/// Artifacts keyed by `"ECOREGION|ORIGIN"`, `"ECOREGION"` or `"default"`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Keyed<T> {
    entries: BTreeMap<String, T>,
}

impl<T> Default for Keyed<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

pub const DEFAULT_KEY: &str = "default";

impl<T> Keyed<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default(value: T) -> Self {
        let mut keyed = Self::new();
        keyed.insert(DEFAULT_KEY, value);
        keyed
    }

    pub fn insert(&mut self, key: impl Into<String>, value: T) {
        self.entries.insert(key.into(), value);
    }

    /// Most specific entry for a site, with the key that matched.
    pub fn lookup(&self, ecoregion: Option<&str>, origin: Option<Origin>) -> Option<(&str, &T)> {
        let mut candidates = Vec::with_capacity(3);
        if let Some(eco) = ecoregion {
            if let Some(origin) = origin {
                candidates.push(format!("{}|{}", eco, origin.as_str()));
            }
            candidates.push(eco.to_string());
        }
        candidates.push(DEFAULT_KEY.to_string());

        candidates
            .iter()
            .find_map(|key| self.entries.get_key_value(key.as_str()))
            .map(|(k, v)| (k.as_str(), v))
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Site key used in Not Assessed reasons.
pub fn site_key(ecoregion: Option<&str>, origin: Option<Origin>) -> String {
    match (ecoregion, origin) {
        (Some(eco), Some(origin)) => format!("{}|{}", eco, origin.as_str()),
        (Some(eco), None) => eco.to_string(),
        (None, _) => DEFAULT_KEY.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gfp() -> ThresholdSet {
        ThresholdSet::new(vec![0.5, 0.8], ["Poor", "Fair", "Good"]).unwrap()
    }

    #[test]
    fn test_intervals_are_closed_open() {
        let t = gfp();
        assert_eq!(t.classify(-3.0), Some("Poor"));
        assert_eq!(t.classify(0.4999), Some("Poor"));
        assert_eq!(t.classify(0.5), Some("Fair"));
        assert_eq!(t.classify(0.8), Some("Good"));
        assert_eq!(t.classify(1e9), Some("Good"));
        assert_eq!(t.classify(f64::NAN), None);
    }

    #[test]
    fn test_partition_is_total() {
        let t = gfp();
        for i in -200..=200 {
            let v = i as f64 * 0.01;
            assert!(t.classify(v).is_some(), "{}", v);
        }
    }

    #[test]
    fn test_invalid_sets_rejected() {
        assert!(ThresholdSet::new(vec![0.5], ["A"]).is_err());
        assert!(ThresholdSet::new(vec![0.8, 0.5], ["A", "B", "C"]).is_err());
        assert!(ThresholdSet::new(vec![0.5, 0.5], ["A", "B", "C"]).is_err());
        assert!(ThresholdSet::new(vec![f64::INFINITY], ["A", "B"]).is_err());
        assert!(ThresholdSet::new(Vec::new(), ["Only"]).is_ok());
    }

    #[test]
    fn test_keyed_lookup_order() {
        let mut keyed = Keyed::with_default(1);
        keyed.insert("CPL", 2);
        keyed.insert("CPL|MAN_MADE", 3);

        assert_eq!(keyed.lookup(Some("CPL"), Some(Origin::ManMade)), Some(("CPL|MAN_MADE", &3)));
        assert_eq!(keyed.lookup(Some("CPL"), Some(Origin::Natural)), Some(("CPL", &2)));
        assert_eq!(keyed.lookup(Some("WMT"), Some(Origin::Natural)), Some(("default", &1)));
        assert_eq!(keyed.lookup(None, None), Some(("default", &1)));

        let empty: Keyed<i32> = Keyed::new();
        assert_eq!(empty.lookup(Some("CPL"), None), None);
    }

    #[test]
    fn test_keyed_deserializes_from_map() {
        let keyed: Keyed<ThresholdSet> = serde_json::from_str(
            r#"{"default": {"cuts": [0.2, 0.75], "classes": ["Good", "Fair", "Poor"]}}"#,
        )
        .unwrap();
        let (_, set) = keyed.lookup(None, None).unwrap();
        assert_eq!(set.classify(0.2), Some("Fair"));
    }
}
