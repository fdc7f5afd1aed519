//! One download: notes, then map data, then quest reconciliation

use chrono::Utc;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::source::{download_map_data, MapDataSource, NotesSource};
use super::DownloadProgressListener;
use crate::cancel::CancelToken;
use crate::db::{lock, DownloadCategory};
use crate::error::{QuestError, Result};
use crate::geo::BoundingBox;
use crate::reconcile::{QuestController, ReconcileSummary};
use crate::tiles::{TilesRect, QUEST_TILE_ZOOM};
use crate::trace_time;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DownloadSettings {
    pub tile_zoom: u32,
    /// Downloaded tiles younger than this are not downloaded again
    pub refresh_quests_after: Duration,
    pub max_notes: usize,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            tile_zoom: QUEST_TILE_ZOOM,
            refresh_quests_after: Duration::from_secs(72 * 3600),
            max_notes: 10_000,
        }
    }
}

/// How a download ended, when it did not fail
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DownloadOutcome {
    /// The area was downloaded recently enough
    UpToDate,
    Downloaded(ReconcileSummary),
    Cancelled,
}

pub struct QuestDownloader {
    controller: Arc<QuestController>,
    map_source: Arc<dyn MapDataSource>,
    notes_source: Option<Arc<dyn NotesSource>>,
    settings: DownloadSettings,
    running: Mutex<()>,
}

impl QuestDownloader {
    pub fn new(controller: Arc<QuestController>, map_source: Arc<dyn MapDataSource>) -> Self {
        Self {
            controller,
            map_source,
            notes_source: None,
            settings: DownloadSettings::default(),
            running: Mutex::new(()),
        }
    }

    /// Without a notes source no notes are fetched and none block quests
    pub fn with_notes_source(mut self, source: Arc<dyn NotesSource>) -> Self {
        self.notes_source = Some(source);
        self
    }

    pub fn with_settings(mut self, settings: DownloadSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &DownloadSettings {
        &self.settings
    }

    /// Download everything needed for quests in `tiles`.
    ///
    /// Progress goes to `listener`: `on_started`, then `on_success` or `on_error`, then
    /// always `on_finished`. A cancelled download finishes without success and is not an
    /// error. Phases completed before a failure stay committed.
    #[tracing::instrument(skip(self, cancel, listener), fields(tiles = tiles.size()))]
    pub fn download(
        &self,
        tiles: &TilesRect,
        cancel: &CancelToken,
        listener: &dyn DownloadProgressListener,
    ) -> Result<DownloadOutcome> {
        if cancel.is_cancelled() {
            return Ok(DownloadOutcome::Cancelled);
        }
        let _running = self
            .running
            .lock()
            .map_err(|_| QuestError::Other("download lock poisoned".to_string()))?;

        listener.on_started();
        let result = self.run(tiles, cancel);
        match &result {
            Ok(DownloadOutcome::Cancelled) => {}
            Ok(_) => listener.on_success(),
            Err(e) => {
                tracing::error!(error = %e, "Unable to download quests");
                listener.on_error(e);
            }
        }
        listener.on_finished();
        result
    }

    fn run(&self, tiles: &TilesRect, cancel: &CancelToken) -> Result<DownloadOutcome> {
        if self.has_quests_already(tiles)? {
            tracing::info!("Quests already downloaded");
            return Ok(DownloadOutcome::UpToDate);
        }

        let bbox = tiles.as_bounding_box(self.settings.tile_zoom);
        tracing::info!(bbox = %bbox, "Starting download");
        match self.download_phases(tiles, &bbox, cancel) {
            Ok(summary) => Ok(DownloadOutcome::Downloaded(summary)),
            Err(e) if e.is_cancelled() => {
                tracing::info!(bbox = %bbox, "Download cancelled");
                Ok(DownloadOutcome::Cancelled)
            }
            Err(e) => Err(e),
        }
    }

    fn download_phases(
        &self,
        tiles: &TilesRect,
        bbox: &BoundingBox,
        cancel: &CancelToken,
    ) -> Result<ReconcileSummary> {
        let zoom = self.settings.tile_zoom;

        // note positions block quests, so they go first
        if let Some(notes) = &self.notes_source {
            cancel.check()?;
            let start = Instant::now();
            let positions = notes.get_note_positions(bbox, self.settings.max_notes)?;
            let db = lock(self.controller.database())?;
            db.replace_note_positions(bbox, &positions)?;
            db.put_downloaded_tiles(tiles, zoom, DownloadCategory::Notes)?;
            trace_time!(start, "download_notes", notes = positions.len());
        }

        cancel.check()?;
        let start = Instant::now();
        let map_data = download_map_data(self.map_source.as_ref(), bbox, cancel)?;
        trace_time!(start, "download_map_data", elements = map_data.len());

        let summary = self.controller.reconcile_bbox(&map_data, bbox, cancel)?;
        lock(self.controller.database())?.put_downloaded_tiles(tiles, zoom, DownloadCategory::Quests)?;
        Ok(summary)
    }

    fn has_quests_already(&self, tiles: &TilesRect) -> Result<bool> {
        let ignore_older_than =
            refresh_cutoff_ms(Utc::now().timestamp_millis(), self.settings.refresh_quests_after);
        Ok(lock(self.controller.database())?
            .get_downloaded_categories(tiles, self.settings.tile_zoom, ignore_older_than)?
            .contains(&DownloadCategory::Quests))
    }
}

/// Epoch milliseconds before which downloaded data counts as stale, never negative
pub(crate) fn refresh_cutoff_ms(now_ms: i64, refresh_after: Duration) -> i64 {
    let refresh_ms = i64::try_from(refresh_after.as_millis()).unwrap_or(i64::MAX);
    now_ms.saturating_sub(refresh_ms).max(0)
}
