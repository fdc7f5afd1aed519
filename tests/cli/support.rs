use assert_cmd::{cargo::cargo_bin_cmd, Command};
use std::fs;
use std::path::{Path, PathBuf};

/// Footway, toilets checked recently and unsurveyed toilets, in Zurich
pub const MAP_JSON: &str = r#"{
  "elements": [
    {"type": "node", "id": 1, "lat": 47.37690, "lon": 8.54170},
    {"type": "node", "id": 2, "lat": 47.37690, "lon": 8.54230},
    {"type": "way", "id": 10, "nodes": [1, 2], "tags": {"highway": "footway"}},
    {"type": "node", "id": 3, "lat": 47.37700, "lon": 8.54200,
     "tags": {"amenity": "toilets", "wheelchair": "yes", "check_date:wheelchair": "2099-01-01"}},
    {"type": "node", "id": 4, "lat": 47.37710, "lon": 8.54210, "tags": {"amenity": "toilets"}}
  ]
}"#;

pub const BBOX: &str = "47.3765,8.5410,47.3775,8.5430";

/// Get a Command for accessquest that ignores the user's configuration
pub fn accessquest(dir: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("accessquest");
    cmd.current_dir(dir)
        .env("ACCESSQUEST_CONFIG_DIR", dir.join("config"))
        .env_remove("ACCESSQUEST_CONFIG")
        .env_remove("ACCESSQUEST_LOG")
        .env_remove("RUST_LOG")
        .arg("--database")
        .arg(dir.join("quests.db"));
    cmd
}

pub fn write_map(dir: &Path) -> PathBuf {
    let path = dir.join("map.json");
    fs::write(&path, MAP_JSON).unwrap();
    path
}

/// Run a download of [`BBOX`] from the map in `dir`
pub fn download(dir: &Path) {
    let map = write_map(dir);
    accessquest(dir)
        .arg("download")
        .arg("--data")
        .arg(&map)
        .args(["--bbox", BBOX])
        .assert()
        .success();
}

/// Stored quests as JSON
pub fn list_quests(dir: &Path, extra: &[&str]) -> Vec<serde_json::Value> {
    let output = accessquest(dir)
        .args(["--format", "json", "quests", "list"])
        .args(extra)
        .output()
        .unwrap();
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).unwrap()
}

/// Id of the first stored quest of `quest_type`
pub fn quest_id(dir: &Path, quest_type: &str) -> i64 {
    list_quests(dir, &[])
        .iter()
        .find(|q| q["quest_type"] == quest_type)
        .and_then(|q| q["id"].as_i64())
        .unwrap()
}
