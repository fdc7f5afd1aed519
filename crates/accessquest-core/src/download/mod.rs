//! Download orchestration
//!
//! A download of a tiles rect runs notes first, then map data, then reconciliation,
//! and records the tiles as downloaded. [`DownloadService`] queues downloads on a worker
//! thread; [`VariableRadiusStrategy`] picks areas for automatic downloads.

mod downloader;
mod service;
pub mod source;
pub mod strategy;


use crate::error::QuestError;

pub use downloader::{DownloadOutcome, DownloadSettings, QuestDownloader};
pub use service::{DownloadRequest, DownloadService, DownloadState};
pub use source::{
    download_map_data, FileMapDataSource, FileNotesSource, MapDataSource, NotesSource,
};
pub use strategy::{AutoDownloadProfile, VariableRadiusStrategy};

/// Progress callbacks of a download, called on the downloading thread
pub trait DownloadProgressListener: Send + Sync {
    fn on_started(&self) {}
    fn on_error(&self, _error: &QuestError) {}
    fn on_success(&self) {}
    fn on_finished(&self) {}
}

/// Listener that ignores all progress
pub struct NoProgress;

impl DownloadProgressListener for NoProgress {}
