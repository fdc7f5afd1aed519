//! `accessquest download` command - download an area and reconcile its quests

use std::sync::Arc;

use tracing::warn;

use crate::cli::{DownloadArgs, OutputFormat};
use crate::commands::dispatch::CommandContext;
use accessquest_core::cancel::CancelToken;
use accessquest_core::download::{
    DownloadOutcome, DownloadProgressListener, FileMapDataSource, FileNotesSource, NoProgress,
    QuestDownloader,
};
use accessquest_core::error::{QuestError, Result};
use accessquest_core::tiles::TilesRect;

/// Prints download progress to stderr
struct ProgressPrinter;

impl DownloadProgressListener for ProgressPrinter {
    fn on_started(&self) {
        eprintln!("Downloading...");
    }

    fn on_success(&self) {
        eprintln!("Download finished");
    }
}

pub fn execute(ctx: &CommandContext, args: &DownloadArgs) -> Result<()> {
    let config = ctx.load_config()?;
    let controller = ctx.controller(&config)?;

    let mut downloader =
        QuestDownloader::new(controller, Arc::new(FileMapDataSource::open(&args.data)?))
            .with_settings(config.download_settings());
    if let Some(notes) = &args.notes {
        downloader = downloader.with_notes_source(Arc::new(FileNotesSource::open(notes)?));
    }

    let tiles = TilesRect::enclosing(&args.bbox, config.tile_zoom);
    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_token.cancel()) {
        warn!(error = %e, "Failed to install Ctrl-C handler");
    }

    let show_progress = ctx.cli.format == OutputFormat::Human && !ctx.cli.quiet;
    let listener: &dyn DownloadProgressListener = if show_progress {
        &ProgressPrinter
    } else {
        &NoProgress
    };
    let outcome = downloader.download(&tiles, &cancel, listener)?;
    tracing::debug!(elapsed = ?ctx.start.elapsed(), "download");

    if outcome == DownloadOutcome::Cancelled {
        return Err(QuestError::Cancelled);
    }

    match ctx.cli.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        OutputFormat::Human => match &outcome {
            DownloadOutcome::UpToDate => println!("Already up to date: {}", args.bbox),
            DownloadOutcome::Downloaded(summary) => {
                println!(
                    "Added {} quests, removed {}",
                    summary.added, summary.deleted
                );
                if !ctx.cli.quiet && (summary.skipped > 0 || summary.country_disabled > 0) {
                    println!(
                        "Skipped {} elements without geometry, {} disabled in their country",
                        summary.skipped, summary.country_disabled
                    );
                }
            }
            DownloadOutcome::Cancelled => {}
        },
    }
    Ok(())
}
