//! Reconciliation of downloaded elements with the quest store
//!
//! [`QuestController`] decides which quests should exist for which elements and applies
//! the difference to the [`Database`]. Two entry points exist: the batch path for a
//! freshly downloaded bounding box, and the single-element path for an element that was
//! edited or deleted.

mod batch;
mod quest_giver;


use serde::Serialize;
use std::sync::{Arc, Mutex};

use crate::countries::CountryBoundaries;
use crate::db::Database;
use crate::quest::{Quest, QuestTypeRegistry};

/// Receives the aggregated outcome of each reconciliation run.
///
/// Called synchronously on the thread that ran the reconciliation.
pub trait QuestUpdateListener: Send + Sync {
    fn on_updated(&self, added: &[Quest], deleted_ids: &[i64], country_disabled: usize);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconcileSettings {
    /// Notes within this distance of an element block new quests for it
    pub note_block_radius_m: f64,
    /// Longer lines get no quests in the batch path
    pub max_geometry_length_m: f64,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            note_block_radius_m: 1.0,
            max_geometry_length_m: 600.0,
        }
    }
}

/// Counts reported after a reconciliation run
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub added: usize,
    pub deleted: usize,
    /// Applicable elements that got no quest because the quest type is off in their country
    pub country_disabled: usize,
    /// Elements skipped because their geometry could not be resolved
    pub skipped: usize,
}

pub struct QuestController {
    registry: Arc<QuestTypeRegistry>,
    db: Arc<Mutex<Database>>,
    countries: Arc<dyn CountryBoundaries>,
    settings: ReconcileSettings,
    listeners: Vec<Arc<dyn QuestUpdateListener>>,
}

impl QuestController {
    pub fn new(
        registry: Arc<QuestTypeRegistry>,
        db: Arc<Mutex<Database>>,
        countries: Arc<dyn CountryBoundaries>,
    ) -> Self {
        Self {
            registry,
            db,
            countries,
            settings: ReconcileSettings::default(),
            listeners: Vec::new(),
        }
    }

    pub fn with_settings(mut self, settings: ReconcileSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn QuestUpdateListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn registry(&self) -> &QuestTypeRegistry {
        &self.registry
    }

    pub fn database(&self) -> &Arc<Mutex<Database>> {
        &self.db
    }

    fn notify(&self, added: &[Quest], deleted_ids: &[i64], country_disabled: usize) {
        for listener in &self.listeners {
            listener.on_updated(added, deleted_ids, country_disabled);
        }
    }
}
