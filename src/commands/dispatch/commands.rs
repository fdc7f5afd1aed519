//! Command implementations for all accessquest commands

use crate::cli::{Commands, FilterCommands, QuestsCommands};
use crate::commands::dispatch::command::{Command, CommandContext};
use crate::commands::{auto_download, download, filter, quest_types, quests};
use accessquest_core::error::Result;

impl Command for Commands {
    fn execute(&self, ctx: &CommandContext) -> Result<()> {
        match self {
            Commands::Filter { command } => execute_filter(ctx, command),
            Commands::QuestTypes => quest_types::execute(ctx),
            Commands::Download(args) => download::execute(ctx, args),
            Commands::AutoDownload(args) => auto_download::execute(ctx, args),
            Commands::Quests { command } => execute_quests(ctx, command),
        }
    }
}

fn execute_filter(ctx: &CommandContext, command: &FilterCommands) -> Result<()> {
    match command {
        FilterCommands::Check { expression } => filter::check(ctx, expression),
        FilterCommands::Match {
            expression,
            tags,
            edited,
            kind,
        } => filter::matches(ctx, expression, tags, *edited, *kind),
    }
}

fn execute_quests(ctx: &CommandContext, command: &QuestsCommands) -> Result<()> {
    match command {
        QuestsCommands::List { bbox, status } => quests::list(ctx, bbox.as_ref(), *status),
        QuestsCommands::Answer { id, value, data } => quests::answer(ctx, *id, value, data),
        QuestsCommands::Hide { id } => quests::hide(ctx, *id),
        QuestsCommands::Revert { id } => quests::revert(ctx, *id),
    }
}
