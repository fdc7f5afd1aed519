//! Slippy-map tile math
//!
//! Tiles follow the OSM web mercator scheme: x grows east, y grows south.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::geo::{BoundingBox, LatLon};

/// Zoom level at which download freshness is tracked
pub const QUEST_TILE_ZOOM: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tile {
    pub x: u32,
    pub y: u32,
}

impl Tile {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Tile containing `pos` at `zoom`
    pub fn enclosing(pos: &LatLon, zoom: u32) -> Self {
        Tile::new(lon_to_tile_x(pos.lon, zoom), lat_to_tile_y(pos.lat, zoom))
    }

    pub fn as_bounding_box(&self, zoom: u32) -> BoundingBox {
        BoundingBox::new(
            tile_y_to_lat(self.y + 1, zoom),
            tile_x_to_lon(self.x, zoom),
            tile_y_to_lat(self.y, zoom),
            tile_x_to_lon(self.x + 1, zoom),
        )
    }

    pub fn as_tiles_rect(&self) -> TilesRect {
        TilesRect::new(self.x, self.y, self.x, self.y)
    }
}

/// Inclusive rectangle of tiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TilesRect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl TilesRect {
    pub fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Smallest tiles rect at `zoom` covering `bbox`
    pub fn enclosing(bbox: &BoundingBox, zoom: u32) -> Self {
        let min = Tile::enclosing(&LatLon::new(bbox.max_lat, bbox.min_lon), zoom);
        let max = Tile::enclosing(&LatLon::new(bbox.min_lat, bbox.max_lon), zoom);
        TilesRect::new(min.x, min.y, max.x, max.y)
    }

    pub fn size(&self) -> usize {
        ((self.right - self.left + 1) as usize) * ((self.bottom - self.top + 1) as usize)
    }

    pub fn tiles(&self) -> impl Iterator<Item = Tile> + '_ {
        (self.top..=self.bottom)
            .flat_map(move |y| (self.left..=self.right).map(move |x| Tile::new(x, y)))
    }

    pub fn as_bounding_box(&self, zoom: u32) -> BoundingBox {
        let top_left = Tile::new(self.left, self.top).as_bounding_box(zoom);
        let bottom_right = Tile::new(self.right, self.bottom).as_bounding_box(zoom);
        BoundingBox::new(
            bottom_right.min_lat,
            top_left.min_lon,
            top_left.max_lat,
            bottom_right.max_lon,
        )
    }
}

fn tile_count(zoom: u32) -> f64 {
    f64::from(1u32 << zoom)
}

fn clamp_tile(v: f64, zoom: u32) -> u32 {
    (v.floor().max(0.0) as u32).min((1u32 << zoom) - 1)
}

fn lon_to_tile_x(lon: f64, zoom: u32) -> u32 {
    clamp_tile((lon + 180.0) / 360.0 * tile_count(zoom), zoom)
}

fn lat_to_tile_y(lat: f64, zoom: u32) -> u32 {
    let lat = lat.clamp(-85.0511, 85.0511).to_radians();
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * tile_count(zoom);
    clamp_tile(y, zoom)
}

fn tile_x_to_lon(x: u32, zoom: u32) -> f64 {
    f64::from(x) / tile_count(zoom) * 360.0 - 180.0
}

fn tile_y_to_lat(y: u32, zoom: u32) -> f64 {
    let n = PI - 2.0 * PI * f64::from(y) / tile_count(zoom);
    n.sinh().atan().to_degrees()
}
