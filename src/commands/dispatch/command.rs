//! Command trait and context for dispatching commands

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::cli::Cli;
use accessquest_core::config::AppConfig;
use accessquest_core::db::Database;
use accessquest_core::error::Result;
use accessquest_core::reconcile::QuestController;

/// Shared context for command execution
pub struct CommandContext<'a> {
    pub cli: &'a Cli,
    pub start: Instant,
}

impl<'a> CommandContext<'a> {
    pub fn new(cli: &'a Cli, start: Instant) -> Self {
        Self { cli, start }
    }

    /// Configuration from `--config`, the default location, or built-in defaults
    pub fn load_config(&self) -> Result<AppConfig> {
        let config = AppConfig::load_or_default(self.cli.config.as_deref())?;
        tracing::debug!(elapsed = ?self.start.elapsed(), "load_config");
        Ok(config)
    }

    pub fn database_path(&self, config: &AppConfig) -> Result<PathBuf> {
        match &self.cli.database {
            Some(path) => Ok(path.clone()),
            None => config.database_path(),
        }
    }

    pub fn open_database(&self, config: &AppConfig) -> Result<Arc<Mutex<Database>>> {
        let path = self.database_path(config)?;
        let db = Database::open(&path)?;
        tracing::debug!(path = %path.display(), elapsed = ?self.start.elapsed(), "open_database");
        Ok(Arc::new(Mutex::new(db)))
    }

    /// Quest controller over the configured registry, database and countries
    pub fn controller(&self, config: &AppConfig) -> Result<Arc<QuestController>> {
        let registry = Arc::new(config.build_registry()?);
        let db = self.open_database(config)?;
        let controller = QuestController::new(registry, db, Arc::new(config.country_boundaries()))
            .with_settings(config.reconcile_settings());
        Ok(Arc::new(controller))
    }
}

/// Trait for commands that can be executed
pub trait Command {
    fn execute(&self, ctx: &CommandContext) -> Result<()>;
}

/// No-op command (when no subcommand is provided)
pub struct NoCommand;

impl Command for NoCommand {
    fn execute(&self, _ctx: &CommandContext) -> Result<()> {
        println!("accessquest {}", env!("CARGO_PKG_VERSION"));
        println!();
        println!("Accessibility survey quests for OpenStreetMap data.");
        println!();
        println!("Run `accessquest --help` for usage information.");
        Ok(())
    }
}
