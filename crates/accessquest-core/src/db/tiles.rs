//! Downloaded-tile tracker

use chrono::Utc;
use rusqlite::params;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{QuestError, Result};
use crate::map_db_err;
use crate::tiles::{Tile, TilesRect};

/// Kind of data downloaded for a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DownloadCategory {
    Quests,
    Notes,
}

impl DownloadCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadCategory::Quests => "QUESTS",
            DownloadCategory::Notes => "NOTES",
        }
    }
}

impl fmt::Display for DownloadCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DownloadCategory {
    type Err = QuestError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "QUESTS" => Ok(DownloadCategory::Quests),
            "NOTES" => Ok(DownloadCategory::Notes),
            other => Err(QuestError::invalid_value("download category", other)),
        }
    }
}

impl super::Database {
    /// Stamp every tile of `rect` as downloaded now for `category`
    pub fn put_downloaded_tiles(
        &self,
        rect: &TilesRect,
        zoom: u32,
        category: DownloadCategory,
    ) -> Result<()> {
        self.put_downloaded_tiles_at(rect, zoom, category, Utc::now().timestamp_millis())
    }

    pub(crate) fn put_downloaded_tiles_at(
        &self,
        rect: &TilesRect,
        zoom: u32,
        category: DownloadCategory,
        date: i64,
    ) -> Result<()> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| QuestError::transaction("start", e))?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT OR REPLACE INTO downloaded_tiles (x, y, zoom, category, date)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )
                .map_err(|e| map_db_err!("prepare tile insert", e))?;
            for tile in rect.tiles() {
                stmt.execute(params![tile.x, tile.y, zoom, category.as_str(), date])
                    .map_err(|e| map_db_err!("insert downloaded tile", e))?;
            }
        }
        tx.commit()
            .map_err(|e| QuestError::transaction("commit", e))?;
        Ok(())
    }

    /// Categories downloaded after `ignore_older_than` (epoch millis) for every tile of `rect`
    pub fn get_downloaded_categories(
        &self,
        rect: &TilesRect,
        zoom: u32,
        ignore_older_than: i64,
    ) -> Result<Vec<DownloadCategory>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT category FROM downloaded_tiles
                 WHERE zoom = ?1 AND x BETWEEN ?2 AND ?3 AND y BETWEEN ?4 AND ?5 AND date > ?6
                 GROUP BY category HAVING COUNT(*) >= ?7",
            )
            .map_err(|e| map_db_err!("prepare downloaded tiles query", e))?;

        let mut rows = stmt
            .query(params![
                zoom,
                rect.left,
                rect.right,
                rect.top,
                rect.bottom,
                ignore_older_than,
                rect.size() as i64
            ])
            .map_err(|e| map_db_err!("query downloaded tiles", e))?;

        let mut categories = Vec::new();
        while let Some(row) = rows
            .next()
            .map_err(|e| map_db_err!("read downloaded tile", e))?
        {
            let category: String = row
                .get(0)
                .map_err(|e| map_db_err!("get category", e))?;
            match category.parse() {
                Ok(c) => categories.push(c),
                Err(_) => tracing::warn!(category = %category, "Unknown download category in database"),
            }
        }
        Ok(categories)
    }

    pub fn remove_downloaded_tile(&self, tile: &Tile, zoom: u32) -> Result<usize> {
        self.conn
            .execute(
                "DELETE FROM downloaded_tiles WHERE x = ?1 AND y = ?2 AND zoom = ?3",
                params![tile.x, tile.y, zoom],
            )
            .map_err(|e| map_db_err!("remove downloaded tile", e))
    }

    pub fn remove_all_downloaded_tiles(&self) -> Result<usize> {
        self.conn
            .execute("DELETE FROM downloaded_tiles", [])
            .map_err(|e| map_db_err!("clear downloaded tiles", e))
    }
}
