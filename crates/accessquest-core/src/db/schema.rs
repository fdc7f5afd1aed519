//! SQLite database schema

use rusqlite::{Connection, Result};

pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Result of schema creation
#[derive(Debug, PartialEq, Eq)]
pub enum SchemaCreateResult {
    /// Schema created or already current
    Ok,
    /// An incompatible schema was dropped and created from scratch
    Recreated,
}

const SCHEMA_SQL: &str = r#"
-- At most one quest per quest type and element
CREATE TABLE IF NOT EXISTS osm_quests (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    quest_type TEXT NOT NULL,
    element_type TEXT NOT NULL,
    element_id INTEGER NOT NULL,
    status TEXT NOT NULL,
    geometry_json TEXT NOT NULL,
    center_lat REAL NOT NULL,
    center_lon REAL NOT NULL,
    changes_json TEXT,
    last_update TEXT NOT NULL,
    UNIQUE (quest_type, element_type, element_id)
);
CREATE INDEX IF NOT EXISTS idx_osm_quests_element ON osm_quests(element_type, element_id);
CREATE INDEX IF NOT EXISTS idx_osm_quests_center ON osm_quests(center_lat, center_lon);

-- Download freshness per tile and category; date in epoch milliseconds
CREATE TABLE IF NOT EXISTS downloaded_tiles (
    x INTEGER NOT NULL,
    y INTEGER NOT NULL,
    zoom INTEGER NOT NULL,
    category TEXT NOT NULL,
    date INTEGER NOT NULL,
    PRIMARY KEY (x, y, zoom, category)
);

-- Positions of open notes, which block quest creation
CREATE TABLE IF NOT EXISTS note_positions (
    lat REAL NOT NULL,
    lon REAL NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_note_positions ON note_positions(lat, lon);

-- Index metadata
CREATE TABLE IF NOT EXISTS index_meta (
    key TEXT PRIMARY KEY,
    value TEXT
);
"#;

fn drop_all_tables(conn: &Connection) -> Result<()> {
    conn.execute("DROP TABLE IF EXISTS osm_quests", [])?;
    conn.execute("DROP TABLE IF EXISTS downloaded_tiles", [])?;
    conn.execute("DROP TABLE IF EXISTS note_positions", [])?;
    conn.execute("DROP TABLE IF EXISTS index_meta", [])?;
    Ok(())
}

fn create_fresh(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR REPLACE INTO index_meta (key, value) VALUES ('schema_version', ?1)",
        [&CURRENT_SCHEMA_VERSION.to_string()],
    )?;
    Ok(())
}

pub fn create_schema(conn: &Connection) -> Result<SchemaCreateResult> {
    let current_version: Option<i32> = conn
        .query_row(
            "SELECT value FROM index_meta WHERE key = 'schema_version'",
            [],
            |r| r.get::<_, String>(0).map(|s| s.parse().unwrap_or(0)),
        )
        .ok();

    match current_version {
        None => {
            create_fresh(conn)?;
            Ok(SchemaCreateResult::Ok)
        }
        Some(v) if v == CURRENT_SCHEMA_VERSION => Ok(SchemaCreateResult::Ok),
        Some(v) => {
            drop_all_tables(conn)?;
            create_fresh(conn)?;
            tracing::info!(
                "Unknown database schema version {}, recreated at version {}",
                v,
                CURRENT_SCHEMA_VERSION
            );
            Ok(SchemaCreateResult::Recreated)
        }
    }
}

#[cfg(test)]
pub fn force_set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO index_meta (key, value) VALUES ('schema_version', ?1)",
        [&version.to_string()],
    )?;
    Ok(())
}
