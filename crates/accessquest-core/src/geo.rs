//! Spherical earth math on WGS84 coordinates
//!
//! Distances are in meters on a sphere of radius [`EARTH_RADIUS`].

use serde::{Deserialize, Serialize};
use std::fmt;

pub const EARTH_RADIUS: f64 = 6_371_000.0;

/// A position on the earth's surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle distance to `other` in meters (haversine)
    pub fn distance_to(&self, other: &LatLon) -> f64 {
        let phi1 = self.lat.to_radians();
        let phi2 = other.lat.to_radians();
        let d_phi = phi2 - phi1;
        let d_lambda = (other.lon - self.lon).to_radians();
        let a = (d_phi / 2.0).sin().powi(2)
            + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS * a.sqrt().atan2((1.0 - a).sqrt())
    }

    /// Position truncated to 5 decimal places (about one meter)
    pub fn truncated(&self) -> (i64, i64) {
        (
            (self.lat * 100_000.0).trunc() as i64,
            (self.lon * 100_000.0).trunc() as i64,
        )
    }

    /// Smallest bounding box containing a circle of `radius` meters around this position
    pub fn enclosing_bounding_box(&self, radius: f64) -> BoundingBox {
        let d_lat = (radius / EARTH_RADIUS).to_degrees();
        let cos_lat = self.lat.to_radians().cos().max(1e-9);
        let d_lon = (radius / (EARTH_RADIUS * cos_lat)).to_degrees();
        BoundingBox::new(
            (self.lat - d_lat).max(-90.0),
            (self.lon - d_lon).max(-180.0),
            (self.lat + d_lat).min(90.0),
            (self.lon + d_lon).min(180.0),
        )
    }
}

impl fmt::Display for LatLon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lon)
    }
}

/// Axis-aligned lat/lon rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn new(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        }
    }

    pub fn min(&self) -> LatLon {
        LatLon::new(self.min_lat, self.min_lon)
    }

    pub fn max(&self) -> LatLon {
        LatLon::new(self.max_lat, self.max_lon)
    }

    pub fn contains(&self, pos: &LatLon) -> bool {
        pos.lat >= self.min_lat
            && pos.lat <= self.max_lat
            && pos.lon >= self.min_lon
            && pos.lon <= self.max_lon
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        !(other.max_lat < self.min_lat
            || other.min_lat > self.max_lat
            || other.max_lon < self.min_lon
            || other.min_lon > self.max_lon)
    }

    /// Approximate area in square meters
    pub fn area(&self) -> f64 {
        let min = self.min();
        let width = min.distance_to(&LatLon::new(self.min_lat, self.max_lon));
        let height = min.distance_to(&LatLon::new(self.max_lat, self.min_lon));
        width * height
    }

    /// Split into four equally sized quarters
    pub fn quarters(&self) -> [BoundingBox; 4] {
        let mid_lat = (self.min_lat + self.max_lat) / 2.0;
        let mid_lon = (self.min_lon + self.max_lon) / 2.0;
        [
            BoundingBox::new(self.min_lat, self.min_lon, mid_lat, mid_lon),
            BoundingBox::new(self.min_lat, mid_lon, mid_lat, self.max_lon),
            BoundingBox::new(mid_lat, self.min_lon, self.max_lat, mid_lon),
            BoundingBox::new(mid_lat, mid_lon, self.max_lat, self.max_lon),
        ]
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.min_lat, self.min_lon, self.max_lat, self.max_lon
        )
    }
}

impl std::str::FromStr for BoundingBox {
    type Err = crate::error::QuestError;

    /// Parses `min_lat,min_lon,max_lat,max_lon`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<f64> = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|_| crate::error::QuestError::invalid_value("bounding box", s))?;
        match parts.as_slice() {
            [min_lat, min_lon, max_lat, max_lon] if min_lat <= max_lat && min_lon <= max_lon => {
                Ok(BoundingBox::new(*min_lat, *min_lon, *max_lat, *max_lon))
            }
            _ => Err(crate::error::QuestError::invalid_value("bounding box", s)),
        }
    }
}

/// Length of a polyline in meters
pub fn polyline_length(points: &[LatLon]) -> f64 {
    points.windows(2).map(|w| w[0].distance_to(&w[1])).sum()
}

/// Point halfway along a polyline, interpolated linearly within the segment
pub fn polyline_center(points: &[LatLon]) -> Option<LatLon> {
    let first = *points.first()?;
    let half = polyline_length(points) / 2.0;
    let mut walked = 0.0;
    for w in points.windows(2) {
        let segment = w[0].distance_to(&w[1]);
        if segment > 0.0 && walked + segment >= half {
            let t = (half - walked) / segment;
            return Some(LatLon::new(
                w[0].lat + (w[1].lat - w[0].lat) * t,
                w[0].lon + (w[1].lon - w[0].lon) * t,
            ));
        }
        walked += segment;
    }
    Some(first)
}

/// Average of the ring's vertices, ignoring the closing duplicate
pub fn ring_center(ring: &[LatLon]) -> Option<LatLon> {
    let points = match (ring.first(), ring.last()) {
        (Some(a), Some(b)) if ring.len() > 1 && a == b => &ring[..ring.len() - 1],
        _ => ring,
    };
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let lat = points.iter().map(|p| p.lat).sum::<f64>() / n;
    let lon = points.iter().map(|p| p.lon).sum::<f64>() / n;
    Some(LatLon::new(lat, lon))
}
