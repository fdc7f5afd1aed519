use crate::cli::support::{accessquest, download, list_quests, write_map, BBOX};
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

// ============================================================================
// download
// ============================================================================

#[test]
fn test_download_creates_quests() {
    let dir = tempdir().unwrap();
    let map = write_map(dir.path());

    accessquest(dir.path())
        .arg("download")
        .arg("--data")
        .arg(&map)
        .args(["--bbox", BBOX])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added"));

    let quests = list_quests(dir.path(), &[]);
    let incline: Vec<_> = quests
        .iter()
        .filter(|q| q["quest_type"] == "AddPathIncline")
        .collect();
    assert_eq!(incline.len(), 1);
    assert_eq!(incline[0]["element"]["type"], "way");
    assert_eq!(incline[0]["element"]["id"], 10);
    assert_eq!(incline[0]["status"], "NEW");

    // recently checked toilets get no quest, unsurveyed ones do
    assert!(quests.iter().all(|q| q["element"]["id"] != 3));
    assert!(quests
        .iter()
        .any(|q| q["element"]["id"] == 4 && q["quest_type"] == "AddWheelchairAccessToilets"));
}

#[test]
fn test_second_download_is_up_to_date() {
    let dir = tempdir().unwrap();
    download(dir.path());

    let output = accessquest(dir.path())
        .args(["--format", "json", "download", "--data"])
        .arg(dir.path().join("map.json"))
        .args(["--bbox", BBOX])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["outcome"], "up_to_date");
}

#[test]
fn test_download_json_summary() {
    let dir = tempdir().unwrap();
    let map = write_map(dir.path());

    let output = accessquest(dir.path())
        .args(["--format", "json", "download", "--data"])
        .arg(&map)
        .args(["--bbox", BBOX])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["outcome"], "downloaded");
    assert!(json["added"].as_u64().unwrap() >= 1);
    assert_eq!(json["deleted"], 0);
    assert_eq!(json["skipped"], 0);
}

#[test]
fn test_notes_block_new_quests() {
    let dir = tempdir().unwrap();
    let map = write_map(dir.path());
    let notes = dir.path().join("notes.json");
    // exactly on the unsurveyed toilets
    fs::write(&notes, r#"{"notes": [{"lat": 47.3771, "lon": 8.5421}]}"#).unwrap();

    accessquest(dir.path())
        .arg("download")
        .arg("--data")
        .arg(&map)
        .arg("--notes")
        .arg(&notes)
        .args(["--bbox", BBOX])
        .assert()
        .success();

    let quests = list_quests(dir.path(), &[]);
    assert!(quests.iter().all(|q| q["element"]["id"] != 4));
    assert!(quests.iter().any(|q| q["element"]["id"] == 10));
}

#[test]
fn test_download_missing_data_file() {
    let dir = tempdir().unwrap();

    accessquest(dir.path())
        .args(["download", "--data", "missing.json", "--bbox", BBOX])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn test_download_rejects_bad_bbox() {
    let dir = tempdir().unwrap();
    let map = write_map(dir.path());

    accessquest(dir.path())
        .arg("download")
        .arg("--data")
        .arg(&map)
        .args(["--bbox", "47.38,8.54,47.37,8.55"])
        .assert()
        .code(2);
}

// ============================================================================
// auto-download
// ============================================================================

#[test]
fn test_auto_download_fresh_area_fetches_tile() {
    let dir = tempdir().unwrap();

    let output = accessquest(dir.path())
        .args(["--format", "json", "auto-download", "--lat", "47.3769", "--lon", "8.5417"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let bbox = &json["bbox"];
    let min_lat = bbox["min_lat"].as_f64().unwrap();
    let max_lat = bbox["max_lat"].as_f64().unwrap();
    assert!(min_lat < 47.3769 && 47.3769 < max_lat);
    assert_eq!(json["profile"]["desired_quest_count"], 500);
}

#[test]
fn test_auto_download_after_download_grows_radius() {
    let dir = tempdir().unwrap();
    download(dir.path());

    let output = accessquest(dir.path())
        .args(["--format", "json", "auto-download", "--wifi"])
        .args(["--lat", "47.3769", "--lon", "8.5417"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["profile"]["desired_quest_count"], 1000);
    let bbox = &json["bbox"];
    let height = bbox["max_lat"].as_f64().unwrap() - bbox["min_lat"].as_f64().unwrap();
    // larger than the single zoom 16 tile (about 0.004 degrees of latitude here)
    assert!(height > 0.005);
}

#[test]
fn test_download_marks_tiles_and_notes() {
    let dir = tempdir().unwrap();
    let map = write_map(dir.path());
    let notes = dir.path().join("notes.json");
    fs::write(&notes, r#"{"notes": [{"lat": 47.3771, "lon": 8.5421}]}"#).unwrap();

    accessquest(dir.path())
        .arg("download")
        .arg("--data")
        .arg(&map)
        .arg("--notes")
        .arg(&notes)
        .args(["--bbox", BBOX])
        .assert()
        .success();

    let conn = rusqlite::Connection::open(dir.path().join("quests.db")).unwrap();
    let count = |category: &str| -> i64 {
        conn.query_row(
            "SELECT COUNT(*) FROM downloaded_tiles WHERE zoom = 16 AND category = ?1",
            [category],
            |row| row.get(0),
        )
        .unwrap()
    };
    let quest_tiles = count("QUESTS");
    assert!(quest_tiles >= 1);
    assert_eq!(count("NOTES"), quest_tiles);

    let stored_notes: i64 = conn
        .query_row("SELECT COUNT(*) FROM note_positions", [], |row| row.get(0))
        .unwrap();
    assert_eq!(stored_notes, 1);
}
