use crate::cli::support::accessquest;
use predicates::prelude::*;
use tempfile::tempdir;

// ============================================================================
// filter check
// ============================================================================

#[test]
fn test_filter_check_normalizes() {
    let dir = tempdir().unwrap();

    accessquest(dir.path())
        .args(["filter", "check", "nodes with amenity=toilets and !wheelchair"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "nodes with amenity = toilets and !wheelchair",
        ))
        .stdout(predicate::str::contains("node[amenity = toilets]"));
}

#[test]
fn test_filter_check_json() {
    let dir = tempdir().unwrap();

    let output = accessquest(dir.path())
        .args(["--format", "json", "filter", "check", "ways, nodes with highway=footway"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["filter"], "nodes, ways with highway = footway");
    assert_eq!(json["kinds"], serde_json::json!(["node", "way"]));
    assert!(json["overpass"].as_str().unwrap().contains("highway = footway"));
}

#[test]
fn test_filter_check_parse_error() {
    let dir = tempdir().unwrap();

    accessquest(dir.path())
        .args(["filter", "check", "nodes with amenity ="])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("error:"))
        .stderr(predicate::str::contains("at position"));
}

#[test]
fn test_filter_check_parse_error_json() {
    let dir = tempdir().unwrap();

    let output = accessquest(dir.path())
        .args(["--format", "json", "filter", "check", "nodes with amenity ="])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));

    let json: serde_json::Value = serde_json::from_slice(&output.stderr).unwrap();
    assert_eq!(json["error"]["type"], "filter_parse");
    assert!(json["error"]["position"].is_u64());
}

// ============================================================================
// filter match
// ============================================================================

#[test]
fn test_filter_match_tags() {
    let dir = tempdir().unwrap();

    accessquest(dir.path())
        .args(["filter", "match", "nodes with amenity = toilets and !wheelchair"])
        .args(["--tag", "amenity=toilets"])
        .assert()
        .success()
        .stdout(predicate::str::diff("match\n"));

    accessquest(dir.path())
        .args(["filter", "match", "nodes with amenity = toilets and !wheelchair"])
        .args(["--tag", "amenity=toilets", "--tag", "wheelchair=yes"])
        .assert()
        .success()
        .stdout(predicate::str::diff("no match\n"));
}

#[test]
fn test_filter_match_element_kind() {
    let dir = tempdir().unwrap();

    accessquest(dir.path())
        .args(["filter", "match", "ways with highway = footway"])
        .args(["--tag", "highway=footway"])
        .assert()
        .success()
        .stdout(predicate::str::diff("no match\n"));

    accessquest(dir.path())
        .args(["filter", "match", "ways with highway = footway"])
        .args(["--tag", "highway=footway", "--kind", "way"])
        .assert()
        .success()
        .stdout(predicate::str::diff("match\n"));
}

#[test]
fn test_filter_match_edit_date() {
    let dir = tempdir().unwrap();

    accessquest(dir.path())
        .args(["filter", "match", "nodes with older today -1 years"])
        .args(["--edited", "2001-01-01"])
        .assert()
        .success()
        .stdout(predicate::str::diff("match\n"));

    accessquest(dir.path())
        .args(["filter", "match", "nodes with older today -1 years"])
        .args(["--edited", "2999-01-01"])
        .assert()
        .success()
        .stdout(predicate::str::diff("no match\n"));
}

#[test]
fn test_filter_match_rejects_bad_tag() {
    let dir = tempdir().unwrap();

    accessquest(dir.path())
        .args(["filter", "match", "nodes", "--tag", "amenity"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("key=value"));
}
