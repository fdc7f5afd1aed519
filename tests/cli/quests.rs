use crate::cli::support::{accessquest, download, list_quests, quest_id};
use predicates::prelude::*;
use tempfile::tempdir;

// ============================================================================
// quests list
// ============================================================================

#[test]
fn test_list_empty_database() {
    let dir = tempdir().unwrap();

    accessquest(dir.path())
        .args(["quests", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No quests found"));
}

#[test]
fn test_list_human() {
    let dir = tempdir().unwrap();
    download(dir.path());

    accessquest(dir.path())
        .args(["quests", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("NEW AddPathIncline way/10"));
}

#[test]
fn test_list_by_bbox() {
    let dir = tempdir().unwrap();
    download(dir.path());

    assert!(!list_quests(dir.path(), &["--bbox", "47.3765,8.5410,47.3775,8.5430"]).is_empty());
    assert!(list_quests(dir.path(), &["--bbox", "-1,-1,1,1"]).is_empty());
}

// ============================================================================
// answer / hide / revert
// ============================================================================

#[test]
fn test_answer_and_revert() {
    let dir = tempdir().unwrap();
    download(dir.path());
    let id = quest_id(dir.path(), "AddPathIncline");

    accessquest(dir.path())
        .args(["quests", "answer", &id.to_string(), "up", "--data"])
        .arg(dir.path().join("map.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("ADD \"incline\"=\"up\""));

    let answered = list_quests(dir.path(), &["--status", "answered"]);
    assert_eq!(answered.len(), 1);
    assert_eq!(answered[0]["id"], id);
    assert_eq!(answered[0]["changes"]["changes"][0]["op"], "add");

    // a second answer is refused
    accessquest(dir.path())
        .args(["quests", "answer", &id.to_string(), "down", "--data"])
        .arg(dir.path().join("map.json"))
        .assert()
        .code(2);

    accessquest(dir.path())
        .args(["quests", "revert", &id.to_string()])
        .assert()
        .success()
        .stdout(predicate::str::contains("NEW"));

    assert!(list_quests(dir.path(), &["--status", "answered"]).is_empty());
}

#[test]
fn test_answer_json() {
    let dir = tempdir().unwrap();
    download(dir.path());
    let id = quest_id(dir.path(), "AddWheelchairAccessToilets");

    let output = accessquest(dir.path())
        .args(["--format", "json", "quests", "answer", &id.to_string(), "yes", "--data"])
        .arg(dir.path().join("map.json"))
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["status"], "ANSWERED");
    assert_eq!(json["changes"]["changes"][0]["key"], "wheelchair");
    assert_eq!(json["changes"]["changes"][0]["value"], "yes");
}

#[test]
fn test_hide_and_revert() {
    let dir = tempdir().unwrap();
    download(dir.path());
    let id = quest_id(dir.path(), "AddPathIncline");

    accessquest(dir.path())
        .args(["quests", "hide", &id.to_string()])
        .assert()
        .success()
        .stdout(predicate::str::contains("HIDDEN"));

    let hidden = list_quests(dir.path(), &["--status", "hidden"]);
    assert_eq!(hidden.len(), 1);

    accessquest(dir.path())
        .args(["quests", "revert", &id.to_string()])
        .assert()
        .success();
    assert!(list_quests(dir.path(), &["--status", "hidden"]).is_empty());
}

#[test]
fn test_unknown_quest_is_data_error() {
    let dir = tempdir().unwrap();

    accessquest(dir.path())
        .args(["quests", "revert", "999"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("not found"));

    let output = accessquest(dir.path())
        .args(["--format", "json", "quests", "hide", "999"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
    let json: serde_json::Value = serde_json::from_slice(&output.stderr).unwrap();
    assert_eq!(json["error"]["type"], "not_found");
}

#[test]
fn test_bad_status_is_usage_error() {
    let dir = tempdir().unwrap();

    accessquest(dir.path())
        .args(["quests", "list", "--status", "done"])
        .assert()
        .code(2);
}
