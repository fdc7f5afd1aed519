//! Per-country enablement of quest types

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::geo::{BoundingBox, LatLon};

/// Countries in which a quest type is enabled, by ISO 3166 code
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "codes", rename_all = "snake_case")]
pub enum CountrySet {
    #[default]
    All,
    AllExcept(Vec<String>),
    NoneExcept(Vec<String>),
}

impl CountrySet {
    pub fn none_except(codes: &[&str]) -> Self {
        CountrySet::NoneExcept(codes.iter().map(|c| c.to_string()).collect())
    }

    pub fn all_except(codes: &[&str]) -> Self {
        CountrySet::AllExcept(codes.iter().map(|c| c.to_string()).collect())
    }

    /// Whether a place inside exactly the countries `codes` is enabled.
    ///
    /// An empty `codes` means the location is not in any known country.
    pub fn is_enabled_in(&self, codes: &[String]) -> bool {
        match self {
            CountrySet::All => true,
            CountrySet::AllExcept(excluded) => !codes.iter().any(|c| excluded.contains(c)),
            CountrySet::NoneExcept(included) => codes.iter().any(|c| included.contains(c)),
        }
    }
}

impl fmt::Display for CountrySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CountrySet::All => f.write_str("all"),
            CountrySet::AllExcept(codes) => write!(f, "all except {}", codes.join(", ")),
            CountrySet::NoneExcept(codes) => write!(f, "none except {}", codes.join(", ")),
        }
    }
}

/// Point-in-country lookup
pub trait CountryBoundaries: Send + Sync {
    /// Codes of all countries containing `pos`
    fn countries_at(&self, pos: &LatLon) -> Vec<String>;

    /// Codes of all countries whose area touches `bbox`
    fn countries_intersecting(&self, bbox: &BoundingBox) -> Vec<String>;

    fn is_in_any(&self, pos: &LatLon, countries: &CountrySet) -> bool {
        match countries {
            CountrySet::All => true,
            _ => countries.is_enabled_in(&self.countries_at(pos)),
        }
    }

    /// Whether any place within `bbox` may be enabled; used to skip a quest type for a
    /// whole download. May return false positives, never false negatives.
    fn intersects(&self, bbox: &BoundingBox, countries: &CountrySet) -> bool {
        match countries {
            CountrySet::All | CountrySet::AllExcept(_) => true,
            CountrySet::NoneExcept(included) => self
                .countries_intersecting(bbox)
                .iter()
                .any(|c| included.contains(c)),
        }
    }
}

/// One country approximated by a set of bounding boxes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryArea {
    pub code: String,
    pub bboxes: Vec<BoundingBox>,
}

/// Country lookup from coarse bounding boxes
#[derive(Debug, Clone, Default)]
pub struct CountryBoxes {
    areas: Vec<CountryArea>,
}

impl CountryBoxes {
    pub fn new(areas: Vec<CountryArea>) -> Self {
        Self { areas }
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }
}

impl CountryBoundaries for CountryBoxes {
    fn countries_at(&self, pos: &LatLon) -> Vec<String> {
        self.areas
            .iter()
            .filter(|a| a.bboxes.iter().any(|b| b.contains(pos)))
            .map(|a| a.code.clone())
            .collect()
    }

    fn countries_intersecting(&self, bbox: &BoundingBox) -> Vec<String> {
        self.areas
            .iter()
            .filter(|a| a.bboxes.iter().any(|b| b.intersects(bbox)))
            .map(|a| a.code.clone())
            .collect()
    }
}
