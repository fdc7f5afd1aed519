//! Automatic choice of the next area to download

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::downloader::refresh_cutoff_ms;
use crate::db::{lock, Database, DownloadCategory};
use crate::error::Result;
use crate::geo::{BoundingBox, LatLon};
use crate::tiles::{Tile, TilesRect};

/// How much to download around the user
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutoDownloadProfile {
    pub max_area_km2: f64,
    /// Number of quests wanted within the download radius
    pub desired_quest_count: usize,
}

impl AutoDownloadProfile {
    /// On mobile data
    pub const MOBILE: AutoDownloadProfile = AutoDownloadProfile {
        max_area_km2: 6.0,
        desired_quest_count: 500,
    };

    /// On wifi: a larger base area to survey from even without connection later
    pub const WIFI: AutoDownloadProfile = AutoDownloadProfile {
        max_area_km2: 12.0,
        desired_quest_count: 1000,
    };

    /// Radius in meters of a circle with the maximum area
    pub fn max_radius(&self) -> f64 {
        (self.max_area_km2 * 1000.0 * 1000.0 / PI).sqrt()
    }

    /// Radius in meters that should hold the desired number of quests at `density`
    /// (quests per m²), clamped to `[min_radius, max_radius]`.
    ///
    /// Without any known quests the maximum radius is used.
    pub fn radius_for_density(&self, density: f64, min_radius: f64) -> f64 {
        let max_radius = self.max_radius();
        let radius = if density > 0.0 {
            (self.desired_quest_count as f64 / (PI * density)).sqrt()
        } else {
            max_radius
        };
        radius.max(min_radius).min(max_radius)
    }
}

/// Picks a download radius from the quest density around the user
pub struct VariableRadiusStrategy {
    db: Arc<Mutex<Database>>,
    profile: AutoDownloadProfile,
    tile_zoom: u32,
    refresh_after: Duration,
}

impl VariableRadiusStrategy {
    pub fn new(
        db: Arc<Mutex<Database>>,
        profile: AutoDownloadProfile,
        tile_zoom: u32,
        refresh_after: Duration,
    ) -> Self {
        Self {
            db,
            profile,
            tile_zoom,
            refresh_after,
        }
    }

    /// Area to download next around `pos`, or `None` if everything nearby is fresh
    pub fn get_download_bbox(&self, pos: &LatLon) -> Result<Option<BoundingBox>> {
        self.get_download_bbox_at(pos, Utc::now().timestamp_millis())
    }

    pub fn get_download_bbox_at(&self, pos: &LatLon, now_ms: i64) -> Result<Option<BoundingBox>> {
        let ignore_older_than = refresh_cutoff_ms(now_ms, self.refresh_after);
        let db = lock(&self.db)?;

        let tile = Tile::enclosing(pos, self.tile_zoom);
        let tile_bbox = tile.as_bounding_box(self.tile_zoom);
        if !has_quests(&db, &tile.as_tiles_rect(), self.tile_zoom, ignore_older_than)? {
            tracing::info!(tile_x = tile.x, tile_y = tile.y, "Downloading tiny area around user");
            return Ok(Some(tile_bbox));
        }

        let area = tile_bbox.area();
        let density = if area > 0.0 {
            db.get_visible_quest_count(&tile_bbox)? as f64 / area
        } else {
            0.0
        };
        let tile_radius = (area / PI).sqrt();
        let radius = self.profile.radius_for_density(density, tile_radius);

        let bbox = pos.enclosing_bounding_box(radius);
        let rect = TilesRect::enclosing(&bbox, self.tile_zoom);
        if has_quests(&db, &rect, self.tile_zoom, ignore_older_than)? {
            tracing::info!(radius = radius as i64, "All downloaded around user");
            Ok(None)
        } else {
            tracing::info!(radius = radius as i64, "Downloading around user");
            Ok(Some(bbox))
        }
    }
}

fn has_quests(db: &Database, rect: &TilesRect, zoom: u32, ignore_older_than: i64) -> Result<bool> {
    Ok(db
        .get_downloaded_categories(rect, zoom, ignore_older_than)?
        .contains(&DownloadCategory::Quests))
}
