//! `accessquest auto-download` command - preview the next automatic download

use crate::cli::{AutoDownloadArgs, OutputFormat};
use crate::commands::dispatch::CommandContext;
use accessquest_core::download::VariableRadiusStrategy;
use accessquest_core::error::Result;
use accessquest_core::geo::LatLon;

pub fn execute(ctx: &CommandContext, args: &AutoDownloadArgs) -> Result<()> {
    let config = ctx.load_config()?;
    let db = ctx.open_database(&config)?;
    let profile = config.auto_download_profile(args.wifi);
    let strategy =
        VariableRadiusStrategy::new(db, profile, config.tile_zoom, config.refresh_quests_after());

    let pos = LatLon::new(args.lat, args.lon);
    let bbox = strategy.get_download_bbox(&pos)?;

    match ctx.cli.format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "position": pos,
                "profile": profile,
                "bbox": bbox,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Human => match bbox {
            Some(bbox) => println!("{}", bbox),
            None => {
                if !ctx.cli.quiet {
                    println!("Nothing to download around {}", pos);
                }
            }
        },
    }
    Ok(())
}
