//! `accessquest quest-types` command - list the quest type registry

use crate::cli::OutputFormat;
use crate::commands::dispatch::CommandContext;
use accessquest_core::error::Result;

/// Print every registered quest type in registry order
pub fn execute(ctx: &CommandContext) -> Result<()> {
    let config = ctx.load_config()?;
    let registry = config.build_registry()?;

    match ctx.cli.format {
        OutputFormat::Json => {
            let output: Vec<_> = registry
                .all()
                .iter()
                .map(|quest_type| {
                    serde_json::json!({
                        "name": quest_type.name(),
                        "mode": quest_type.mode(),
                        "commit_message": quest_type.commit_message(),
                        "countries": quest_type.enabled_in_countries(),
                        "filter": quest_type.filter().map(|f| f.to_string()),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Human => {
            for quest_type in registry.all() {
                println!(
                    "{} [{}] countries: {}",
                    quest_type.name(),
                    quest_type.mode(),
                    quest_type.enabled_in_countries()
                );
                if let Some(filter) = quest_type.filter() {
                    if !ctx.cli.quiet {
                        println!("  {}", filter);
                    }
                }
            }
        }
    }
    Ok(())
}
