use crate::cli::support::{accessquest, download, list_quests};
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

const BENCH_MAP: &str = r#"{
  "elements": [
    {"type": "node", "id": 7, "lat": 47.37700, "lon": 8.54200, "tags": {"amenity": "bench"}}
  ]
}"#;

const BENCH_CONFIG: &str = r#"
[[quest_types]]
name = "AddBenchBackrest"
filter = "nodes with amenity = bench and !backrest"
key = "backrest"
"#;

#[test]
fn test_quest_types_lists_builtins_in_order() {
    let dir = tempdir().unwrap();

    let output = accessquest(dir.path())
        .args(["--format", "json", "quest-types"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let types = json.as_array().unwrap();
    assert_eq!(types.len(), 12);
    assert_eq!(types[0]["name"], "AddKerbType");
    assert_eq!(types[0]["mode"], "custom");
    assert!(types[0]["filter"].is_null());
    assert_eq!(types[11]["name"], "AddWheelchairAccessToilets");
    assert_eq!(types[11]["mode"], "filter");
    assert!(types[11]["filter"].as_str().unwrap().contains("amenity = toilets"));
}

#[test]
fn test_config_adds_quest_type() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("accessquest.toml");
    fs::write(&config, BENCH_CONFIG).unwrap();

    accessquest(dir.path())
        .arg("--config")
        .arg(&config)
        .arg("quest-types")
        .assert()
        .success()
        .stdout(predicate::str::contains("AddBenchBackrest [filter] countries: all"));

    let map = dir.path().join("map.json");
    fs::write(&map, BENCH_MAP).unwrap();
    accessquest(dir.path())
        .arg("--config")
        .arg(&config)
        .arg("download")
        .arg("--data")
        .arg(&map)
        .args(["--bbox", "47.3765,8.5410,47.3775,8.5430"])
        .assert()
        .success();

    let quests = list_quests(dir.path(), &[]);
    assert_eq!(quests.len(), 1);
    assert_eq!(quests[0]["quest_type"], "AddBenchBackrest");
}

#[test]
fn test_default_config_location() {
    let dir = tempdir().unwrap();
    let config_dir = dir.path().join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(config_dir.join("config.toml"), BENCH_CONFIG).unwrap();

    accessquest(dir.path())
        .arg("quest-types")
        .assert()
        .success()
        .stdout(predicate::str::contains("AddBenchBackrest"));
}

#[test]
fn test_invalid_filter_in_config_is_fatal() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("accessquest.toml");
    fs::write(
        &config,
        BENCH_CONFIG.replace("!backrest", "backrest ="),
    )
    .unwrap();

    accessquest(dir.path())
        .arg("--config")
        .arg(&config)
        .arg("quest-types")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("at position"));
}

#[test]
fn test_duplicate_quest_type_in_config_is_fatal() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("accessquest.toml");
    fs::write(
        &config,
        BENCH_CONFIG.replace("AddBenchBackrest", "AddPathIncline"),
    )
    .unwrap();

    let output = accessquest(dir.path())
        .args(["--format", "json", "--config"])
        .arg(&config)
        .arg("quest-types")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let json: serde_json::Value = serde_json::from_slice(&output.stderr).unwrap();
    assert_eq!(json["error"]["type"], "duplicate_quest_type");
}

#[test]
fn test_quests_survive_between_runs() {
    let dir = tempdir().unwrap();
    download(dir.path());
    let first = list_quests(dir.path(), &[]);
    let second = list_quests(dir.path(), &[]);
    assert!(!first.is_empty());
    assert_eq!(first, second);
}
