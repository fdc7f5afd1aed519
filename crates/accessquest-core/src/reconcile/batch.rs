//! Quest creation for a whole downloaded area

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use super::{QuestController, ReconcileSummary};
use crate::cancel::CancelToken;
use crate::db::lock;
use crate::element::{ElementGeometry, ElementKey};
use crate::error::Result;
use crate::geo::BoundingBox;
use crate::map_data::MapData;
use crate::quest::{Quest, QuestType};
use crate::trace_time;

#[derive(Default)]
struct BatchState {
    summary: ReconcileSummary,
    added: Vec<Quest>,
    deleted: Vec<i64>,
    geometries: HashMap<ElementKey, Option<ElementGeometry>>,
    no_geometry: HashSet<ElementKey>,
}

impl QuestController {
    /// Replace the quests inside `bbox` with those that `map_data` calls for.
    ///
    /// Each quest type is committed on its own; cancellation is checked between quest types,
    /// so a cancelled run leaves every quest type either fully updated or untouched.
    #[tracing::instrument(skip(self, map_data, cancel), fields(bbox = %bbox, elements = map_data.len()))]
    pub fn reconcile_bbox(
        &self,
        map_data: &MapData,
        bbox: &BoundingBox,
        cancel: &CancelToken,
    ) -> Result<ReconcileSummary> {
        let start = Instant::now();
        let blocked: HashSet<(i64, i64)> = lock(&self.db)?
            .get_note_positions(bbox)?
            .iter()
            .map(|p| p.truncated())
            .collect();

        let mut state = BatchState::default();
        let mut outcome = Ok(());
        for quest_type in self.registry.all() {
            outcome = cancel
                .check()
                .and_then(|_| self.reconcile_quest_type(quest_type, map_data, bbox, &blocked, &mut state));
            if outcome.is_err() {
                break;
            }
        }

        state.summary.skipped = state.no_geometry.len();
        state.summary.added = state.added.len();
        state.summary.deleted = state.deleted.len();
        self.notify(&state.added, &state.deleted, state.summary.country_disabled);
        trace_time!(start, "reconcile_bbox", added = state.summary.added);

        outcome?;
        tracing::info!(
            added = state.summary.added,
            deleted = state.summary.deleted,
            country_disabled = state.summary.country_disabled,
            "Reconciled quests"
        );
        Ok(state.summary)
    }

    fn reconcile_quest_type(
        &self,
        quest_type: &QuestType,
        map_data: &MapData,
        bbox: &BoundingBox,
        blocked: &HashSet<(i64, i64)>,
        state: &mut BatchState,
    ) -> Result<()> {
        let countries = quest_type.enabled_in_countries();
        if !self.countries.intersects(bbox, countries) {
            tracing::debug!(quest_type = quest_type.name(), "Quest type disabled in this area");
            return Ok(());
        }

        let mut quests = Vec::new();
        let mut keep = Vec::new();
        for key in quest_type.applicable_elements(map_data) {
            let geometry = state
                .geometries
                .entry(key)
                .or_insert_with(|| map_data.geometry(&key));
            let Some(geometry) = geometry.as_ref() else {
                if state.no_geometry.insert(key) {
                    tracing::warn!(element = %key, "Skipping element without geometry");
                }
                continue;
            };

            let center = geometry.center();
            if blocked.contains(&center.truncated()) {
                keep.push((quest_type.name(), key));
                continue;
            }
            if !self.countries.is_in_any(&center, countries) {
                state.summary.country_disabled += 1;
                continue;
            }
            if geometry
                .polyline_length()
                .is_some_and(|length| length > self.settings.max_geometry_length_m)
            {
                continue;
            }
            quests.push(Quest::new(quest_type.name(), key, geometry.clone()));
        }

        let result = lock(&self.db)?.replace_quests_in_bbox(&quests, &keep, bbox, &[quest_type.name()])?;
        tracing::debug!(
            quest_type = quest_type.name(),
            added = result.added.len(),
            deleted = result.deleted.len(),
            "Replaced quests"
        );
        state.added.extend(result.added);
        state.deleted.extend(result.deleted);
        Ok(())
    }
}
