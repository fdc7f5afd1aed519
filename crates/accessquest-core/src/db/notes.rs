//! Positions of open notes

use rusqlite::params;

use crate::error::{QuestError, Result};
use crate::geo::{BoundingBox, LatLon};
use crate::map_db_err;

impl super::Database {
    /// Replace all note positions inside `bbox` with `positions`
    pub fn replace_note_positions(&self, bbox: &BoundingBox, positions: &[LatLon]) -> Result<()> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| QuestError::transaction("start", e))?;

        tx.execute(
            "DELETE FROM note_positions
             WHERE lat BETWEEN ?1 AND ?2 AND lon BETWEEN ?3 AND ?4",
            params![bbox.min_lat, bbox.max_lat, bbox.min_lon, bbox.max_lon],
        )
        .map_err(|e| map_db_err!("clear note positions", e))?;

        {
            let mut stmt = tx
                .prepare("INSERT INTO note_positions (lat, lon) VALUES (?1, ?2)")
                .map_err(|e| map_db_err!("prepare note position insert", e))?;
            for pos in positions {
                stmt.execute(params![pos.lat, pos.lon])
                    .map_err(|e| map_db_err!("insert note position", e))?;
            }
        }

        tx.commit()
            .map_err(|e| QuestError::transaction("commit", e))?;
        Ok(())
    }

    pub fn get_note_positions(&self, bbox: &BoundingBox) -> Result<Vec<LatLon>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT lat, lon FROM note_positions
                 WHERE lat BETWEEN ?1 AND ?2 AND lon BETWEEN ?3 AND ?4",
            )
            .map_err(|e| map_db_err!("prepare note positions query", e))?;

        let mut rows = stmt
            .query(params![bbox.min_lat, bbox.max_lat, bbox.min_lon, bbox.max_lon])
            .map_err(|e| map_db_err!("query note positions", e))?;

        let mut positions = Vec::new();
        while let Some(row) = rows
            .next()
            .map_err(|e| map_db_err!("read note position", e))?
        {
            let lat: f64 = row.get(0).map_err(|e| map_db_err!("get lat", e))?;
            let lon: f64 = row.get(1).map_err(|e| map_db_err!("get lon", e))?;
            positions.push(LatLon::new(lat, lon));
        }
        Ok(positions)
    }
}
