//! Single-element quest updates

use std::collections::HashMap;

use super::{QuestController, ReconcileSummary};
use crate::db::lock;
use crate::element::{Element, ElementGeometry, ElementKey};
use crate::error::Result;
use crate::quest::{Quest, QuestStatus, QuestType};

impl QuestController {
    /// Bring the quests of one element up to date after it changed.
    ///
    /// Quest types that cannot judge a single element without surrounding data are left
    /// alone. New quests are not created while a note is near the element; existing ones
    /// stay. Only NEW quests are removed when the element no longer qualifies.
    #[tracing::instrument(skip(self, element, geometry), fields(element = %element.key()))]
    pub fn update_quests(
        &self,
        element: &Element,
        geometry: &ElementGeometry,
    ) -> Result<ReconcileSummary> {
        let key = element.key();
        let center = geometry.center();

        let db = lock(&self.db)?;
        let existing = db.get_all_quests_for_element(&key)?;
        let existing_by_type: HashMap<&str, &Quest> = existing
            .iter()
            .map(|q| (q.quest_type.as_str(), q))
            .collect();
        let blocked = !db
            .get_note_positions(&center.enclosing_bounding_box(self.settings.note_block_radius_m))?
            .is_empty();

        let mut to_add = Vec::new();
        let mut to_delete = Vec::new();
        let mut country_disabled = 0;
        for quest_type in self.registry.all() {
            let Some(applicable) = quest_type.is_applicable_to(element) else {
                continue;
            };
            let current = existing_by_type.get(quest_type.name());
            if applicable {
                if current.is_some() || blocked {
                    continue;
                }
                if !self
                    .countries
                    .is_in_any(&center, quest_type.enabled_in_countries())
                {
                    country_disabled += 1;
                    continue;
                }
                to_add.push(Quest::new(quest_type.name(), key, geometry.clone()));
            } else if let Some(quest) = current.filter(|q| q.status == QuestStatus::New) {
                to_delete.extend(quest.id);
            }
        }

        let (added, deleted) = db.update_quests_for_element(&to_add, &to_delete)?;
        drop(db);

        if blocked {
            tracing::debug!("Note near element, no new quests created");
        }
        tracing::debug!(added = added.len(), deleted = deleted.len(), "Updated quests for element");
        self.notify(&added, &deleted, country_disabled);
        Ok(ReconcileSummary {
            added: added.len(),
            deleted: deleted.len(),
            country_disabled,
            skipped: 0,
        })
    }

    /// Create quests of `quest_types` for the element without any eligibility checks.
    ///
    /// Used to restore quests after an edit of the element was undone.
    pub fn recreate_quests(
        &self,
        element: &Element,
        geometry: &ElementGeometry,
        quest_types: &[&QuestType],
    ) -> Result<Vec<Quest>> {
        let key = element.key();
        let to_add: Vec<Quest> = quest_types
            .iter()
            .map(|t| Quest::new(t.name(), key, geometry.clone()))
            .collect();
        let (added, _) = lock(&self.db)?.update_quests_for_element(&to_add, &[])?;
        self.notify(&added, &[], 0);
        Ok(added)
    }

    /// Remove every quest of a deleted element
    pub fn delete_quests(&self, key: &ElementKey) -> Result<Vec<i64>> {
        let deleted = lock(&self.db)?.delete_all_quests_for_element(key)?;
        tracing::debug!(element = %key, deleted = deleted.len(), "Deleted quests of element");
        self.notify(&[], &deleted, 0);
        Ok(deleted)
    }
}
