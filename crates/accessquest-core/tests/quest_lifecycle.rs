//! Download, answer and revert quests against an on-disk database

use std::collections::HashMap;
use std::fs;
use std::sync::{Arc, Mutex};

use accessquest_core::cancel::CancelToken;
use accessquest_core::config::AppConfig;
use accessquest_core::countries::CountryBoxes;
use accessquest_core::db::{lock, Database};
use accessquest_core::download::{DownloadOutcome, FileMapDataSource, NoProgress, QuestDownloader};
use accessquest_core::element::{ElementKey, ElementType};
use accessquest_core::filter::ElementFilterExpression;
use accessquest_core::geo::BoundingBox;
use accessquest_core::map_data::{MapData, MapDataFile};
use accessquest_core::quest::{Answer, QuestStatus};
use accessquest_core::reconcile::QuestController;
use accessquest_core::tiles::{TilesRect, QUEST_TILE_ZOOM};
use tempfile::tempdir;

const MAP_JSON: &str = r#"{
  "elements": [
    {"type": "node", "id": 1, "lat": 47.37690, "lon": 8.54170},
    {"type": "node", "id": 2, "lat": 47.37690, "lon": 8.54230},
    {"type": "way", "id": 10, "nodes": [1, 2], "tags": {"highway": "footway"}},
    {"type": "node", "id": 3, "lat": 47.37700, "lon": 8.54200,
     "tags": {"amenity": "toilets", "wheelchair": "yes", "check_date:wheelchair": "2099-01-01"}}
  ]
}"#;

fn footway() -> ElementKey {
    ElementKey::new(ElementType::Way, 10)
}

fn setup(db_path: &std::path::Path, map_path: &std::path::Path) -> (Arc<QuestController>, QuestDownloader) {
    let config = AppConfig::default();
    let db = Arc::new(Mutex::new(Database::open(db_path).unwrap()));
    let controller = Arc::new(QuestController::new(
        Arc::new(config.build_registry().unwrap()),
        db,
        Arc::new(CountryBoxes::default()),
    ));
    let source = FileMapDataSource::open(map_path).unwrap();
    let downloader = QuestDownloader::new(Arc::clone(&controller), Arc::new(source))
        .with_settings(config.download_settings());
    (controller, downloader)
}

fn area() -> TilesRect {
    let bbox: BoundingBox = "47.3765,8.5410,47.3775,8.5430".parse().unwrap();
    TilesRect::enclosing(&bbox, QUEST_TILE_ZOOM)
}

#[test]
fn test_footway_lifecycle() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("quests.db");
    let map_path = dir.path().join("map.json");
    fs::write(&map_path, MAP_JSON).unwrap();

    let (controller, downloader) = setup(&db_path, &map_path);
    let outcome = downloader
        .download(&area(), &CancelToken::new(), &NoProgress)
        .unwrap();
    assert!(matches!(outcome, DownloadOutcome::Downloaded(_)));

    let quests = lock(controller.database())
        .unwrap()
        .get_all_quests_for_element(&footway())
        .unwrap();
    let mut per_type: HashMap<&str, usize> = HashMap::new();
    for quest in &quests {
        *per_type.entry(quest.quest_type.as_str()).or_default() += 1;
    }
    assert_eq!(per_type.get("AddPathIncline"), Some(&1));
    assert!(per_type.values().all(|count| *count == 1));

    // toilets with a recent check date are not asked about
    let toilets = ElementKey::new(ElementType::Node, 3);
    assert!(lock(controller.database())
        .unwrap()
        .get_all_quests_for_element(&toilets)
        .unwrap()
        .is_empty());

    // answer the incline quest
    let incline = quests
        .iter()
        .find(|q| q.quest_type == "AddPathIncline")
        .unwrap();
    let quest_type = controller.registry().get_by_name("AddPathIncline").unwrap();
    let map_data: MapData = serde_json::from_str::<MapDataFile>(MAP_JSON)
        .unwrap()
        .into();
    let way = map_data.get(&footway()).unwrap();
    let answer: Answer = "up".parse().unwrap();
    let changes = quest_type.apply_answer(&answer, &way.tags).unwrap();
    let incline_id = incline.id.unwrap();
    lock(controller.database())
        .unwrap()
        .answer_quest(incline_id, &changes)
        .unwrap();

    // a second reconciliation of the unchanged data does not bring it back
    let bbox = area().as_bounding_box(QUEST_TILE_ZOOM);
    let summary = controller
        .reconcile_bbox(&map_data, &bbox, &CancelToken::new())
        .unwrap();
    assert_eq!(summary.added, 0);
    assert_eq!(summary.deleted, 0);
    drop(downloader);
    drop(controller);

    // everything survives reopening the database
    let db = Database::open(&db_path).unwrap();
    let stored = db.require_quest(incline_id).unwrap();
    assert_eq!(stored.status, QuestStatus::Answered);
    assert_eq!(stored.changes, Some(changes));
    assert_eq!(db.revert_quest(incline_id).unwrap(), QuestStatus::New);
    assert!(db.require_quest(incline_id).unwrap().changes.is_none());
}

#[test]
fn test_second_download_is_up_to_date() {
    let dir = tempdir().unwrap();
    let map_path = dir.path().join("map.json");
    fs::write(&map_path, MAP_JSON).unwrap();

    let (_controller, downloader) = setup(&dir.path().join("quests.db"), &map_path);
    downloader
        .download(&area(), &CancelToken::new(), &NoProgress)
        .unwrap();
    let again = downloader
        .download(&area(), &CancelToken::new(), &NoProgress)
        .unwrap();
    assert_eq!(again, DownloadOutcome::UpToDate);
}

#[test]
fn test_builtin_filters_survive_text_round_trip() {
    let config = AppConfig::default();
    let registry = config.build_registry().unwrap();
    let map_data: MapData = serde_json::from_str::<MapDataFile>(MAP_JSON)
        .unwrap()
        .into();

    for quest_type in registry.all() {
        let Some(filter) = quest_type.filter() else {
            continue;
        };
        let reparsed: ElementFilterExpression = filter.to_string().parse().unwrap();
        assert_eq!(&reparsed, filter, "{}", quest_type.name());
        for element in map_data.iter() {
            assert_eq!(
                reparsed.matches(element),
                filter.matches(element),
                "{} on {}",
                quest_type.name(),
                element.key()
            );
        }
    }
}
