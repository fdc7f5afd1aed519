//! `accessquest quests` commands - list, answer, hide and revert stored quests

use std::path::Path;

use crate::cli::OutputFormat;
use crate::commands::dispatch::CommandContext;
use accessquest_core::db::lock;
use accessquest_core::error::{QuestError, Result};
use accessquest_core::geo::BoundingBox;
use accessquest_core::map_data::{MapData, MapDataFile};
use accessquest_core::quest::{Answer, Quest, QuestStatus};

pub fn list(ctx: &CommandContext, bbox: Option<&BoundingBox>, status: Option<QuestStatus>) -> Result<()> {
    let config = ctx.load_config()?;
    let db = ctx.open_database(&config)?;
    let quests = lock(&db)?.list_quests(bbox, status)?;

    match ctx.cli.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&quests)?);
        }
        OutputFormat::Human => {
            if quests.is_empty() {
                if !ctx.cli.quiet {
                    println!("No quests found");
                }
                return Ok(());
            }
            for quest in &quests {
                print_quest(quest);
            }
        }
    }
    Ok(())
}

fn print_quest(quest: &Quest) {
    let id = quest.id.map(|id| id.to_string()).unwrap_or_default();
    println!(
        "{} {} {} {} ({})",
        id,
        quest.status,
        quest.quest_type,
        quest.element,
        quest.geometry.center()
    );
}

/// Answer a NEW quest from the element's current tags in `data`
pub fn answer(ctx: &CommandContext, id: i64, value: &str, data: &Path) -> Result<()> {
    let answer: Answer = value.parse()?;
    let config = ctx.load_config()?;
    let registry = config.build_registry()?;
    let db = ctx.open_database(&config)?;
    let db = lock(&db)?;

    let quest = db.require_quest(id)?;
    if quest.status != QuestStatus::New {
        return Err(QuestError::invalid_value("quest status for answer", quest.status));
    }
    let quest_type = registry
        .get_by_name(&quest.quest_type)
        .ok_or_else(|| QuestError::not_found("quest type", &quest.quest_type))?;

    let map_data: MapData = MapDataFile::open(data)?.into();
    let element = map_data
        .get(&quest.element)
        .ok_or_else(|| QuestError::not_found("element", quest.element))?;

    let changes = quest_type.apply_answer(&answer, &element.tags)?;
    db.answer_quest(id, &changes)?;
    tracing::info!(quest = id, quest_type = %quest.quest_type, changes = changes.changes.len(), "Answered quest");

    match ctx.cli.format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "id": id,
                "status": QuestStatus::Answered,
                "commit_message": quest_type.commit_message(),
                "changes": changes,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Human => {
            for change in &changes.changes {
                println!("{}", change);
            }
        }
    }
    Ok(())
}

pub fn hide(ctx: &CommandContext, id: i64) -> Result<()> {
    let config = ctx.load_config()?;
    let db = ctx.open_database(&config)?;
    let db = lock(&db)?;

    let quest = db.require_quest(id)?;
    if quest.status != QuestStatus::New {
        return Err(QuestError::invalid_value("quest status for hide", quest.status));
    }
    db.set_quest_status(id, QuestStatus::Hidden)?;
    print_status(ctx, id, QuestStatus::Hidden)
}

pub fn revert(ctx: &CommandContext, id: i64) -> Result<()> {
    let config = ctx.load_config()?;
    let db = ctx.open_database(&config)?;
    let status = lock(&db)?.revert_quest(id)?;
    print_status(ctx, id, status)
}

fn print_status(ctx: &CommandContext, id: i64, status: QuestStatus) -> Result<()> {
    match ctx.cli.format {
        OutputFormat::Json => {
            let output = serde_json::json!({ "id": id, "status": status });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Human => {
            if !ctx.cli.quiet {
                println!("{} {}", id, status);
            }
        }
    }
    Ok(())
}
