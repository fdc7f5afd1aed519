//! OSM element model: nodes, ways, relations and their geometry

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::QuestError;
use crate::geo::{polyline_center, polyline_length, ring_center, LatLon};

pub type Tags = BTreeMap<String, String>;

/// Kind of OSM primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Node,
    Way,
    Relation,
}

impl ElementType {
    pub const ALL: [ElementType; 3] = [ElementType::Node, ElementType::Way, ElementType::Relation];

    pub fn as_str(&self) -> &'static str {
        match self {
            ElementType::Node => "node",
            ElementType::Way => "way",
            ElementType::Relation => "relation",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementType {
    type Err = QuestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "node" => Ok(ElementType::Node),
            "way" => Ok(ElementType::Way),
            "relation" => Ok(ElementType::Relation),
            other => Err(QuestError::invalid_value("element type", other)),
        }
    }
}

/// Composite key of an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementKey {
    #[serde(rename = "type")]
    pub element_type: ElementType,
    pub id: i64,
}

impl ElementKey {
    pub fn new(element_type: ElementType, id: i64) -> Self {
        Self { element_type, id }
    }
}

impl fmt::Display for ElementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.element_type, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationMember {
    #[serde(rename = "type")]
    pub element_type: ElementType,
    #[serde(rename = "ref")]
    pub id: i64,
    #[serde(default)]
    pub role: String,
}

/// Type-specific payload. Serialized in the Overpass JSON layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ElementData {
    Node { lat: f64, lon: f64 },
    Way { nodes: Vec<i64> },
    Relation { members: Vec<RelationMember> },
}

/// Immutable snapshot of an OSM element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: i64,
    #[serde(default)]
    pub version: i32,
    #[serde(default)]
    pub tags: Tags,
    /// Last edit time, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub data: ElementData,
}

impl Element {
    pub fn node(id: i64, pos: LatLon, tags: Tags) -> Self {
        Self {
            id,
            version: 1,
            tags,
            timestamp: None,
            data: ElementData::Node {
                lat: pos.lat,
                lon: pos.lon,
            },
        }
    }

    pub fn way(id: i64, nodes: Vec<i64>, tags: Tags) -> Self {
        Self {
            id,
            version: 1,
            tags,
            timestamp: None,
            data: ElementData::Way { nodes },
        }
    }

    pub fn relation(id: i64, members: Vec<RelationMember>, tags: Tags) -> Self {
        Self {
            id,
            version: 1,
            tags,
            timestamp: None,
            data: ElementData::Relation { members },
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn element_type(&self) -> ElementType {
        match self.data {
            ElementData::Node { .. } => ElementType::Node,
            ElementData::Way { .. } => ElementType::Way,
            ElementData::Relation { .. } => ElementType::Relation,
        }
    }

    pub fn key(&self) -> ElementKey {
        ElementKey::new(self.element_type(), self.id)
    }

    pub fn position(&self) -> Option<LatLon> {
        match self.data {
            ElementData::Node { lat, lon } => Some(LatLon::new(lat, lon)),
            _ => None,
        }
    }

    pub fn way_nodes(&self) -> &[i64] {
        match &self.data {
            ElementData::Way { nodes } => nodes,
            _ => &[],
        }
    }

    pub fn is_closed_way(&self) -> bool {
        let nodes = self.way_nodes();
        nodes.len() >= 4 && nodes.first() == nodes.last()
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}

/// Resolved shape of an element, with a representative center point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ElementGeometry {
    Point {
        center: LatLon,
    },
    Polylines {
        polylines: Vec<Vec<LatLon>>,
        center: LatLon,
    },
    Polygons {
        polygons: Vec<Vec<LatLon>>,
        center: LatLon,
    },
}

impl ElementGeometry {
    pub fn point(center: LatLon) -> Self {
        ElementGeometry::Point { center }
    }

    /// Geometry for one open line; `None` when it has no points
    pub fn polyline(points: Vec<LatLon>) -> Option<Self> {
        let center = polyline_center(&points)?;
        Some(ElementGeometry::Polylines {
            polylines: vec![points],
            center,
        })
    }

    pub fn polylines(lines: Vec<Vec<LatLon>>) -> Option<Self> {
        let longest = lines.iter().max_by(|a, b| {
            polyline_length(a)
                .partial_cmp(&polyline_length(b))
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        let center = polyline_center(longest)?;
        Some(ElementGeometry::Polylines {
            polylines: lines,
            center,
        })
    }

    pub fn polygons(rings: Vec<Vec<LatLon>>) -> Option<Self> {
        let all: Vec<LatLon> = rings.iter().flatten().copied().collect();
        let center = ring_center(rings.first()?).or_else(|| ring_center(&all))?;
        Some(ElementGeometry::Polygons {
            polygons: rings,
            center,
        })
    }

    pub fn center(&self) -> LatLon {
        match self {
            ElementGeometry::Point { center }
            | ElementGeometry::Polylines { center, .. }
            | ElementGeometry::Polygons { center, .. } => *center,
        }
    }

    /// Total length of all polylines; `None` for points and areas
    pub fn polyline_length(&self) -> Option<f64> {
        match self {
            ElementGeometry::Polylines { polylines, .. } => {
                Some(polylines.iter().map(|l| polyline_length(l)).sum())
            }
            _ => None,
        }
    }
}
