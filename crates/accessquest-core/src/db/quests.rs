//! Quest store

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::{HashMap, HashSet};

use crate::changes::StringMapChanges;
use crate::element::{ElementGeometry, ElementKey, ElementType};
use crate::error::{QuestError, Result};
use crate::geo::BoundingBox;
use crate::map_db_err;
use crate::quest::{Quest, QuestStatus};

const QUEST_COLUMNS: &str = "id, quest_type, element_type, element_id, status, geometry_json, changes_json, last_update";

/// Outcome of replacing the quests of a bounding box
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReplaceResult {
    pub added: Vec<Quest>,
    pub deleted: Vec<i64>,
}

fn quest_from_row(row: &Row) -> Result<Quest> {
    let id: i64 = row.get(0).map_err(|e| map_db_err!("get id", e))?;
    let quest_type: String = row.get(1).map_err(|e| map_db_err!("get quest_type", e))?;
    let element_type: String = row.get(2).map_err(|e| map_db_err!("get element_type", e))?;
    let element_id: i64 = row.get(3).map_err(|e| map_db_err!("get element_id", e))?;
    let status: String = row.get(4).map_err(|e| map_db_err!("get status", e))?;
    let geometry_json: String = row.get(5).map_err(|e| map_db_err!("get geometry", e))?;
    let changes_json: Option<String> = row.get(6).map_err(|e| map_db_err!("get changes", e))?;
    let last_update: String = row.get(7).map_err(|e| map_db_err!("get last_update", e))?;

    let geometry: ElementGeometry = serde_json::from_str(&geometry_json)?;
    let changes = changes_json
        .map(|json| serde_json::from_str::<StringMapChanges>(&json))
        .transpose()?;
    let last_update = DateTime::parse_from_rfc3339(&last_update)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| QuestError::invalid_value("last_update", e))?;

    Ok(Quest {
        id: Some(id),
        quest_type,
        element: ElementKey::new(element_type.parse::<ElementType>()?, element_id),
        status: status.parse()?,
        geometry,
        changes,
        last_update,
    })
}

fn collect_quests(conn: &Connection, sql: &str, args: impl rusqlite::Params) -> Result<Vec<Quest>> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| map_db_err!("prepare quest query", e))?;
    let mut rows = stmt
        .query(args)
        .map_err(|e| map_db_err!("execute quest query", e))?;

    let mut quests = Vec::new();
    while let Some(row) = rows.next().map_err(|e| map_db_err!("read quest", e))? {
        quests.push(quest_from_row(row)?);
    }
    Ok(quests)
}

/// Insert unless a quest of the same type already exists for the element.
///
/// Returns the stored quest with its id, or `None` if it was a duplicate.
fn insert_quest(conn: &Connection, quest: &Quest) -> Result<Option<Quest>> {
    let center = quest.geometry.center();
    let changes_json = quest
        .changes
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    let inserted = conn
        .execute(
            "INSERT OR IGNORE INTO osm_quests
                 (quest_type, element_type, element_id, status, geometry_json,
                  center_lat, center_lon, changes_json, last_update)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                quest.quest_type,
                quest.element.element_type.as_str(),
                quest.element.id,
                quest.status.as_str(),
                serde_json::to_string(&quest.geometry)?,
                center.lat,
                center.lon,
                changes_json,
                quest.last_update.to_rfc3339(),
            ],
        )
        .map_err(|e| map_db_err!("insert quest", e))?;

    if inserted == 0 {
        return Ok(None);
    }
    let mut stored = quest.clone();
    stored.id = Some(conn.last_insert_rowid());
    Ok(Some(stored))
}

fn delete_quest(conn: &Connection, id: i64) -> Result<bool> {
    let deleted = conn
        .execute("DELETE FROM osm_quests WHERE id = ?1", params![id])
        .map_err(|e| map_db_err!("delete quest", e))?;
    Ok(deleted > 0)
}

impl super::Database {
    pub fn get_quest(&self, id: i64) -> Result<Option<Quest>> {
        let sql = format!("SELECT {} FROM osm_quests WHERE id = ?1", QUEST_COLUMNS);
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| map_db_err!("prepare quest query", e))?;
        let row = stmt
            .query_row(params![id], |row| Ok(quest_from_row(row)))
            .optional()
            .map_err(|e| map_db_err!("get quest", e))?;
        row.transpose()
    }

    /// Like [`get_quest`](Self::get_quest), failing with `NotFound` for unknown ids
    pub fn require_quest(&self, id: i64) -> Result<Quest> {
        self.get_quest(id)?
            .ok_or_else(|| QuestError::not_found("quest", id))
    }

    pub fn get_all_quests_for_element(&self, key: &ElementKey) -> Result<Vec<Quest>> {
        let sql = format!(
            "SELECT {} FROM osm_quests WHERE element_type = ?1 AND element_id = ?2 ORDER BY id",
            QUEST_COLUMNS
        );
        collect_quests(&self.conn, &sql, params![key.element_type.as_str(), key.id])
    }

    /// Add and delete quests of one element in a single transaction.
    ///
    /// Quests that already exist for their type and element are not added again.
    /// Returns the stored quests and the ids that were actually deleted.
    pub fn update_quests_for_element(
        &self,
        to_add: &[Quest],
        to_delete: &[i64],
    ) -> Result<(Vec<Quest>, Vec<i64>)> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| QuestError::transaction("start", e))?;

        let mut deleted = Vec::new();
        for id in to_delete {
            if delete_quest(&tx, *id)? {
                deleted.push(*id);
            }
        }
        let mut added = Vec::new();
        for quest in to_add {
            if let Some(stored) = insert_quest(&tx, quest)? {
                added.push(stored);
            }
        }

        tx.commit()
            .map_err(|e| QuestError::transaction("commit", e))?;
        Ok((added, deleted))
    }

    /// Delete every quest of the element, whatever its status; returns the deleted ids
    pub fn delete_all_quests_for_element(&self, key: &ElementKey) -> Result<Vec<i64>> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| QuestError::transaction("start", e))?;
        let ids: Vec<i64> = {
            let mut stmt = tx
                .prepare("SELECT id FROM osm_quests WHERE element_type = ?1 AND element_id = ?2")
                .map_err(|e| map_db_err!("prepare quest id query", e))?;
            let mut rows = stmt
                .query(params![key.element_type.as_str(), key.id])
                .map_err(|e| map_db_err!("query quest ids", e))?;
            let mut ids = Vec::new();
            while let Some(row) = rows.next().map_err(|e| map_db_err!("read quest id", e))? {
                ids.push(row.get(0).map_err(|e| map_db_err!("get id", e))?);
            }
            ids
        };
        tx.execute(
            "DELETE FROM osm_quests WHERE element_type = ?1 AND element_id = ?2",
            params![key.element_type.as_str(), key.id],
        )
        .map_err(|e| map_db_err!("delete quests for element", e))?;
        tx.commit()
            .map_err(|e| QuestError::transaction("commit", e))?;
        Ok(ids)
    }

    /// Make `quests` the complete set of NEW quests of `quest_types` inside `bbox`.
    ///
    /// Quests not yet stored are added; NEW quests of those types in the box that are
    /// neither in `quests` nor in `keep` are deleted. Quests with any other status are left
    /// alone and keep blocking re-creation.
    pub fn replace_quests_in_bbox(
        &self,
        quests: &[Quest],
        keep: &[(&str, ElementKey)],
        bbox: &BoundingBox,
        quest_types: &[&str],
    ) -> Result<ReplaceResult> {
        let wanted: HashSet<(&str, ElementKey)> = quests
            .iter()
            .map(|q| (q.quest_type.as_str(), q.element))
            .chain(keep.iter().copied())
            .collect();
        let types: HashSet<&str> = quest_types.iter().copied().collect();

        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| QuestError::transaction("start", e))?;

        let sql = format!(
            "SELECT {} FROM osm_quests
             WHERE center_lat BETWEEN ?1 AND ?2 AND center_lon BETWEEN ?3 AND ?4 AND status = ?5",
            QUEST_COLUMNS
        );
        let existing = collect_quests(
            &tx,
            &sql,
            params![
                bbox.min_lat,
                bbox.max_lat,
                bbox.min_lon,
                bbox.max_lon,
                QuestStatus::New.as_str()
            ],
        )?;

        let mut result = ReplaceResult::default();
        for quest in existing {
            let obsolete = types.contains(quest.quest_type.as_str())
                && !wanted.contains(&(quest.quest_type.as_str(), quest.element));
            if let (true, Some(id)) = (obsolete, quest.id) {
                if delete_quest(&tx, id)? {
                    result.deleted.push(id);
                }
            }
        }
        for quest in quests {
            if let Some(stored) = insert_quest(&tx, quest)? {
                result.added.push(stored);
            }
        }

        tx.commit()
            .map_err(|e| QuestError::transaction("commit", e))?;
        Ok(result)
    }

    /// Number of quests shown on the map inside `bbox`
    pub fn get_visible_quest_count(&self, bbox: &BoundingBox) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM osm_quests
                 WHERE center_lat BETWEEN ?1 AND ?2 AND center_lon BETWEEN ?3 AND ?4 AND status = ?5",
                params![
                    bbox.min_lat,
                    bbox.max_lat,
                    bbox.min_lon,
                    bbox.max_lon,
                    QuestStatus::New.as_str()
                ],
                |r| r.get(0),
            )
            .map_err(|e| map_db_err!("count visible quests", e))?;
        Ok(count as usize)
    }

    pub fn list_quests(
        &self,
        bbox: Option<&BoundingBox>,
        status: Option<QuestStatus>,
    ) -> Result<Vec<Quest>> {
        let mut sql = format!("SELECT {} FROM osm_quests WHERE 1 = 1", QUEST_COLUMNS);
        let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        if let Some(bbox) = bbox {
            sql.push_str(" AND center_lat BETWEEN ? AND ? AND center_lon BETWEEN ? AND ?");
            args.push(Box::new(bbox.min_lat));
            args.push(Box::new(bbox.max_lat));
            args.push(Box::new(bbox.min_lon));
            args.push(Box::new(bbox.max_lon));
        }
        if let Some(status) = status {
            sql.push_str(" AND status = ?");
            args.push(Box::new(status.as_str()));
        }
        sql.push_str(" ORDER BY id");
        collect_quests(
            &self.conn,
            &sql,
            rusqlite::params_from_iter(args.iter().map(|a| a.as_ref())),
        )
    }

    pub fn set_quest_status(&self, id: i64, status: QuestStatus) -> Result<()> {
        let updated = self
            .conn
            .execute(
                "UPDATE osm_quests SET status = ?1, last_update = ?2 WHERE id = ?3",
                params![status.as_str(), Utc::now().to_rfc3339(), id],
            )
            .map_err(|e| map_db_err!("update quest status", e))?;
        if updated == 0 {
            return Err(QuestError::not_found("quest", id));
        }
        Ok(())
    }

    /// Store the tag changes of an answer and mark the quest ANSWERED
    pub fn answer_quest(&self, id: i64, changes: &StringMapChanges) -> Result<()> {
        self.write_changes(id, QuestStatus::Answered, Some(changes))
    }

    /// Undo the user's last action on a quest; returns the new status.
    ///
    /// Answered and hidden quests go back to NEW. Closed quests were already uploaded, so
    /// they become REVERT carrying the reversed changes.
    pub fn revert_quest(&self, id: i64) -> Result<QuestStatus> {
        let quest = self.require_quest(id)?;
        match quest.status {
            QuestStatus::Answered | QuestStatus::Hidden => {
                self.write_changes(id, QuestStatus::New, None)?;
                Ok(QuestStatus::New)
            }
            QuestStatus::Closed => {
                let reversed = quest.changes.as_ref().map(StringMapChanges::reversed);
                self.write_changes(id, QuestStatus::Revert, reversed.as_ref())?;
                Ok(QuestStatus::Revert)
            }
            other => Err(QuestError::invalid_value(
                "quest status for undo",
                other,
            )),
        }
    }

    fn write_changes(
        &self,
        id: i64,
        status: QuestStatus,
        changes: Option<&StringMapChanges>,
    ) -> Result<()> {
        let changes_json = changes.map(serde_json::to_string).transpose()?;
        let updated = self
            .conn
            .execute(
                "UPDATE osm_quests SET status = ?1, changes_json = ?2, last_update = ?3 WHERE id = ?4",
                params![status.as_str(), changes_json, Utc::now().to_rfc3339(), id],
            )
            .map_err(|e| map_db_err!("store quest changes", e))?;
        if updated == 0 {
            return Err(QuestError::not_found("quest", id));
        }
        Ok(())
    }

    /// Count of quests per status, for diagnostics
    pub fn quest_counts_by_status(&self) -> Result<HashMap<QuestStatus, usize>> {
        let mut stmt = self
            .conn
            .prepare("SELECT status, COUNT(*) FROM osm_quests GROUP BY status")
            .map_err(|e| map_db_err!("prepare quest count query", e))?;
        let mut rows = stmt
            .query([])
            .map_err(|e| map_db_err!("count quests", e))?;
        let mut counts = HashMap::new();
        while let Some(row) = rows.next().map_err(|e| map_db_err!("read quest count", e))? {
            let status: String = row.get(0).map_err(|e| map_db_err!("get status", e))?;
            let count: i64 = row.get(1).map_err(|e| map_db_err!("get count", e))?;
            counts.insert(status.parse()?, count as usize);
        }
        Ok(counts)
    }
}
