//! Sources of map data and note positions
//!
//! The network clients live outside this crate. The file-backed sources here read an
//! Overpass-style JSON dump and a list of note positions, which is enough for the CLI and
//! for tests.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::cancel::CancelToken;
use crate::element::{Element, ElementData, ElementKey};
use crate::error::{QuestError, Result};
use crate::geo::{BoundingBox, LatLon};
use crate::map_data::{MapData, MapDataFile};

/// Give up splitting after this many quarterings of the original box
const MAX_SPLIT_DEPTH: u32 = 6;

pub trait MapDataSource: Send + Sync {
    /// All elements in `bbox`, with ways complete.
    ///
    /// Fails with [`QuestError::QueryTooBig`] if the area holds too much data for one request.
    fn get_map_data(&self, bbox: &BoundingBox) -> Result<MapData>;
}

pub trait NotesSource: Send + Sync {
    /// Positions of at most `max` open notes in `bbox`
    fn get_note_positions(&self, bbox: &BoundingBox, max: usize) -> Result<Vec<LatLon>>;
}

/// Fetch the map data of `bbox`, splitting it into quarters while the source refuses it
pub fn download_map_data(
    source: &dyn MapDataSource,
    bbox: &BoundingBox,
    cancel: &CancelToken,
) -> Result<MapData> {
    let mut data = MapData::new(Vec::new(), Some(*bbox));
    fetch_split(source, bbox, cancel, 0, &mut data)?;
    Ok(data)
}

fn fetch_split(
    source: &dyn MapDataSource,
    bbox: &BoundingBox,
    cancel: &CancelToken,
    depth: u32,
    into: &mut MapData,
) -> Result<()> {
    cancel.check()?;
    match source.get_map_data(bbox) {
        Ok(data) => {
            into.extend(data);
            Ok(())
        }
        Err(QuestError::QueryTooBig { .. }) if depth < MAX_SPLIT_DEPTH => {
            tracing::debug!(bbox = %bbox, depth, "Query too big, splitting into quarters");
            for quarter in bbox.quarters() {
                fetch_split(source, &quarter, cancel, depth + 1, into)?;
            }
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Map data read from an Overpass JSON file
#[derive(Debug, Clone, Default)]
pub struct FileMapDataSource {
    elements: Vec<Element>,
    max_nodes_per_query: Option<usize>,
}

impl FileMapDataSource {
    pub fn new(elements: Vec<Element>) -> Self {
        Self {
            elements,
            max_nodes_per_query: None,
        }
    }

    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(MapDataFile::open(path)?.elements))
    }

    /// Refuse queries covering more than `max` nodes, like a server with a size limit
    pub fn with_max_nodes_per_query(mut self, max: usize) -> Self {
        self.max_nodes_per_query = Some(max);
        self
    }
}

impl MapDataSource for FileMapDataSource {
    fn get_map_data(&self, bbox: &BoundingBox) -> Result<MapData> {
        let inside: HashSet<i64> = self
            .elements
            .iter()
            .filter(|e| e.position().is_some_and(|p| bbox.contains(&p)))
            .map(|e| e.id)
            .collect();
        if self.max_nodes_per_query.is_some_and(|max| inside.len() > max) {
            return Err(QuestError::QueryTooBig {
                bbox: bbox.to_string(),
            });
        }

        let ways: Vec<&Element> = self
            .elements
            .iter()
            .filter(|e| e.way_nodes().iter().any(|id| inside.contains(id)))
            .collect();
        let way_nodes: HashSet<i64> = ways
            .iter()
            .flat_map(|w| w.way_nodes().iter().copied())
            .collect();
        let selected: HashSet<ElementKey> = self
            .elements
            .iter()
            .filter(|e| match &e.data {
                ElementData::Node { .. } => inside.contains(&e.id) || way_nodes.contains(&e.id),
                ElementData::Way { .. } => ways.iter().any(|w| w.id == e.id),
                ElementData::Relation { .. } => false,
            })
            .map(Element::key)
            .collect();

        let relations = self.elements.iter().filter(|e| match &e.data {
            ElementData::Relation { members } => members
                .iter()
                .any(|m| selected.contains(&ElementKey::new(m.element_type, m.id))),
            _ => false,
        });
        let elements: Vec<Element> = self
            .elements
            .iter()
            .filter(|e| selected.contains(&e.key()))
            .chain(relations)
            .cloned()
            .collect();
        Ok(MapData::new(elements, Some(*bbox)))
    }
}

/// On-disk layout of a note positions file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotesFile {
    pub notes: Vec<LatLon>,
}

#[derive(Debug, Clone, Default)]
pub struct FileNotesSource {
    positions: Vec<LatLon>,
}

impl FileNotesSource {
    pub fn new(positions: Vec<LatLon>) -> Self {
        Self { positions }
    }

    pub fn open(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let file: NotesFile = serde_json::from_str(&text)?;
        Ok(Self::new(file.notes))
    }
}

impl NotesSource for FileNotesSource {
    fn get_note_positions(&self, bbox: &BoundingBox, max: usize) -> Result<Vec<LatLon>> {
        Ok(self
            .positions
            .iter()
            .filter(|p| bbox.contains(p))
            .take(max)
            .copied()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ElementType, Tags};

    fn grid() -> Vec<Element> {
        let mut elements = Vec::new();
        for i in 0..4 {
            for j in 0..4 {
                let id = i * 4 + j + 1;
                let pos = LatLon::new(0.1 + i as f64 * 0.2, 0.1 + j as f64 * 0.2);
                elements.push(Element::node(id, pos, Tags::new()));
            }
        }
        elements.push(Element::way(100, vec![1, 16], Tags::new()));
        elements
    }

    #[test]
    fn test_ways_are_complete() {
        let source = FileMapDataSource::new(grid());
        let data = source
            .get_map_data(&BoundingBox::new(0.0, 0.0, 0.2, 0.2))
            .unwrap();
        assert!(data.way(100).is_some());
        assert!(data.node(1).is_some());
        assert!(data.node(16).is_some());
        assert!(data.node(2).is_none());
    }

    #[test]
    fn test_too_big_query_is_split() {
        let source = FileMapDataSource::new(grid()).with_max_nodes_per_query(4);
        let bbox = BoundingBox::new(0.0, 0.0, 0.8, 0.8);
        assert!(matches!(
            source.get_map_data(&bbox),
            Err(QuestError::QueryTooBig { .. })
        ));

        let data = download_map_data(&source, &bbox, &CancelToken::new()).unwrap();
        assert_eq!(data.len(), 17);
        assert_eq!(data.bbox, Some(bbox));
        assert!(data
            .get(&ElementKey::new(ElementType::Way, 100))
            .is_some());
    }

    #[test]
    fn test_split_gives_up_eventually() {
        let source = FileMapDataSource::new(grid()).with_max_nodes_per_query(0);
        let result = download_map_data(
            &source,
            &BoundingBox::new(0.0, 0.0, 0.8, 0.8),
            &CancelToken::new(),
        );
        assert!(matches!(result, Err(QuestError::QueryTooBig { .. })));
    }

    #[test]
    fn test_download_checks_cancellation() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let source = FileMapDataSource::new(grid());
        let err = download_map_data(&source, &BoundingBox::new(0.0, 0.0, 1.0, 1.0), &cancel)
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_notes_limited_to_bbox_and_max() {
        let source = FileNotesSource::new(vec![
            LatLon::new(0.1, 0.1),
            LatLon::new(0.2, 0.2),
            LatLon::new(5.0, 5.0),
        ]);
        let bbox = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        assert_eq!(source.get_note_positions(&bbox, 10).unwrap().len(), 2);
        assert_eq!(source.get_note_positions(&bbox, 1).unwrap().len(), 1);
    }
}
