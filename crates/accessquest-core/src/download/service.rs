//! Background download queue
//!
//! One worker thread runs one download at a time. A priority request (one the user asked
//! for) cancels the download in progress and runs next; other requests wait their turn.

use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use super::downloader::{DownloadOutcome, QuestDownloader};
use super::DownloadProgressListener;
use crate::cancel::CancelToken;
use crate::error::{QuestError, Result};
use crate::tiles::TilesRect;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DownloadState {
    Idle,
    Downloading,
    /// The last download finished successfully
    Success,
    /// The last download failed
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadRequest {
    pub tiles: TilesRect,
    pub priority: bool,
}

struct Running {
    cancel: CancelToken,
    priority: bool,
}

struct Queue {
    requests: VecDeque<DownloadRequest>,
    current: Option<Running>,
    state: DownloadState,
    shutdown: bool,
}

struct Shared {
    queue: Mutex<Queue>,
    changed: Condvar,
    listeners: Vec<Arc<dyn DownloadProgressListener>>,
}

impl Shared {
    fn queue(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Forwards progress to every registered listener, in registration order
struct ProgressRelay<'a>(&'a [Arc<dyn DownloadProgressListener>]);

impl DownloadProgressListener for ProgressRelay<'_> {
    fn on_started(&self) {
        self.0.iter().for_each(|l| l.on_started());
    }

    fn on_error(&self, error: &QuestError) {
        self.0.iter().for_each(|l| l.on_error(error));
    }

    fn on_success(&self) {
        self.0.iter().for_each(|l| l.on_success());
    }

    fn on_finished(&self) {
        self.0.iter().for_each(|l| l.on_finished());
    }
}

pub struct DownloadService {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl DownloadService {
    /// Start the worker thread.
    ///
    /// Listeners are called on the worker thread.
    pub fn start(
        downloader: Arc<QuestDownloader>,
        listeners: Vec<Arc<dyn DownloadProgressListener>>,
    ) -> Result<Self> {
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue {
                requests: VecDeque::new(),
                current: None,
                state: DownloadState::Idle,
                shutdown: false,
            }),
            changed: Condvar::new(),
            listeners,
        });
        let worker_shared = Arc::clone(&shared);
        let worker = std::thread::Builder::new()
            .name("quest-download".to_string())
            .spawn(move || run_worker(&worker_shared, &downloader))?;
        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }

    pub fn request(&self, request: DownloadRequest) {
        let mut queue = self.shared.queue();
        if request.priority {
            if let Some(running) = &queue.current {
                tracing::info!("Cancelling download in progress for a priority download");
                running.cancel.cancel();
            }
            queue.requests.push_front(request);
        } else {
            queue.requests.push_back(request);
        }
        self.shared.changed.notify_all();
    }

    /// Drop all waiting requests and cancel the one in progress
    pub fn cancel(&self) {
        let mut queue = self.shared.queue();
        queue.requests.clear();
        if let Some(running) = &queue.current {
            running.cancel.cancel();
        }
        self.shared.changed.notify_all();
    }

    pub fn state(&self) -> DownloadState {
        self.shared.queue().state
    }

    pub fn is_download_in_progress(&self) -> bool {
        self.shared.queue().current.is_some()
    }

    pub fn is_priority_download_in_progress(&self) -> bool {
        self.shared
            .queue()
            .current
            .as_ref()
            .is_some_and(|r| r.priority)
    }

    /// Block until no download is running or waiting
    pub fn wait_until_idle(&self) {
        let mut queue = self.shared.queue();
        while queue.current.is_some() || !queue.requests.is_empty() {
            queue = self
                .shared
                .changed
                .wait(queue)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

impl Drop for DownloadService {
    fn drop(&mut self) {
        {
            let mut queue = self.shared.queue();
            queue.shutdown = true;
            queue.requests.clear();
            if let Some(running) = &queue.current {
                running.cancel.cancel();
            }
            self.shared.changed.notify_all();
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("Download worker panicked");
            }
        }
    }
}

fn next_request(shared: &Shared) -> Option<(DownloadRequest, CancelToken)> {
    let mut queue = shared.queue();
    loop {
        if queue.shutdown {
            return None;
        }
        if let Some(request) = queue.requests.pop_front() {
            let cancel = CancelToken::new();
            queue.current = Some(Running {
                cancel: cancel.clone(),
                priority: request.priority,
            });
            queue.state = DownloadState::Downloading;
            return Some((request, cancel));
        }
        queue = shared
            .changed
            .wait(queue)
            .unwrap_or_else(PoisonError::into_inner);
    }
}

fn run_worker(shared: &Shared, downloader: &QuestDownloader) {
    let relay = ProgressRelay(&shared.listeners);
    while let Some((request, cancel)) = next_request(shared) {
        let state = match downloader.download(&request.tiles, &cancel, &relay) {
            Ok(DownloadOutcome::Cancelled) => DownloadState::Idle,
            Ok(_) => DownloadState::Success,
            Err(_) => DownloadState::Error,
        };
        let mut queue = shared.queue();
        queue.current = None;
        queue.state = state;
        shared.changed.notify_all();
    }
    tracing::debug!("Download worker stopped");
}
