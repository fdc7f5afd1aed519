//! In-memory map data for one downloaded area

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::element::{Element, ElementData, ElementGeometry, ElementKey, ElementType};
use crate::error::Result;
use crate::geo::{BoundingBox, LatLon};

/// Elements downloaded for a bounding box, indexed by key.
///
/// Iteration order is nodes, then ways, then relations, each by ascending id.
#[derive(Debug, Clone, Default)]
pub struct MapData {
    elements: HashMap<ElementKey, Element>,
    pub bbox: Option<BoundingBox>,
}

/// On-disk layout accepted by file-backed sources (Overpass JSON)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MapDataFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,
    pub elements: Vec<Element>,
}

impl MapData {
    pub fn new(elements: impl IntoIterator<Item = Element>, bbox: Option<BoundingBox>) -> Self {
        let elements = elements.into_iter().map(|e| (e.key(), e)).collect();
        Self { elements, bbox }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Add all elements of `other`; elements present in both are replaced
    pub fn extend(&mut self, other: MapData) {
        self.elements.extend(other.elements);
    }

    pub fn get(&self, key: &ElementKey) -> Option<&Element> {
        self.elements.get(key)
    }

    pub fn node(&self, id: i64) -> Option<&Element> {
        self.get(&ElementKey::new(ElementType::Node, id))
    }

    pub fn way(&self, id: i64) -> Option<&Element> {
        self.get(&ElementKey::new(ElementType::Way, id))
    }

    /// All elements in deterministic order
    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        let mut keys: Vec<&ElementKey> = self.elements.keys().collect();
        keys.sort();
        keys.into_iter().filter_map(move |k| self.elements.get(k))
    }

    pub fn ways(&self) -> impl Iterator<Item = &Element> {
        self.iter()
            .filter(|e| e.element_type() == ElementType::Way)
    }

    /// Ways that reference the given node
    pub fn ways_for_node(&self, node_id: i64) -> Vec<&Element> {
        self.ways()
            .filter(|w| w.way_nodes().contains(&node_id))
            .collect()
    }

    fn way_points(&self, way: &Element) -> Option<Vec<LatLon>> {
        way.way_nodes()
            .iter()
            .map(|id| self.node(*id).and_then(Element::position))
            .collect()
    }

    /// Resolve the geometry of an element from the nodes in this data set.
    ///
    /// Returns `None` when any referenced node is missing.
    pub fn geometry(&self, key: &ElementKey) -> Option<ElementGeometry> {
        let element = self.get(key)?;
        match &element.data {
            ElementData::Node { lat, lon } => Some(ElementGeometry::point(LatLon::new(*lat, *lon))),
            ElementData::Way { .. } => {
                let points = self.way_points(element)?;
                if points.len() < 2 {
                    return None;
                }
                if element.is_closed_way() {
                    ElementGeometry::polygons(vec![points])
                } else {
                    ElementGeometry::polyline(points)
                }
            }
            ElementData::Relation { members } => {
                let lines: Vec<Vec<LatLon>> = members
                    .iter()
                    .filter(|m| m.element_type == ElementType::Way)
                    .filter_map(|m| self.way(m.id))
                    .filter_map(|w| self.way_points(w))
                    .filter(|pts| pts.len() >= 2)
                    .collect();
                if lines.is_empty() {
                    let points: Vec<LatLon> = members
                        .iter()
                        .filter(|m| m.element_type == ElementType::Node)
                        .filter_map(|m| self.node(m.id).and_then(Element::position))
                        .collect();
                    return points.first().copied().map(ElementGeometry::point);
                }
                if element.tag("type") == Some("multipolygon") {
                    ElementGeometry::polygons(lines)
                } else {
                    ElementGeometry::polylines(lines)
                }
            }
        }
    }
}

impl MapDataFile {
    pub fn open(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let file: MapDataFile = serde_json::from_str(&text)?;
        tracing::debug!(path = %path.display(), elements = file.elements.len(), "Loaded map data file");
        Ok(file)
    }
}

impl From<MapDataFile> for MapData {
    fn from(file: MapDataFile) -> Self {
        MapData::new(file.elements, file.bbox)
    }
}
