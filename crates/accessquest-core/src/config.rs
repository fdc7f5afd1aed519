//! Application configuration for accessquest
//!
//! Stored in `<config_dir>/accessquest/config.toml`; every key is optional.

pub mod types;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::bail_invalid;
use crate::countries::CountryBoxes;
use crate::download::{AutoDownloadProfile, DownloadSettings};
use crate::error::{QuestError, Result};
use crate::quest::catalog::custom_value_quest;
use crate::quest::{default_quest_types, QuestTypeRegistry};
use crate::reconcile::ReconcileSettings;

pub use types::{AppConfig, AutoDownloadConfig, QuestTypeConfig};

const CONFIG_DIR: &str = "accessquest";
const CONFIG_FILE: &str = "config.toml";
const DATABASE_FILE: &str = "quests.db";
const CONFIG_DIR_ENV_VAR: &str = "ACCESSQUEST_CONFIG_DIR";

/// Highest zoom for which tile coordinates fit the tile tracker
const MAX_TILE_ZOOM: u32 = 22;

/// Ten years
const MAX_REFRESH_QUESTS_AFTER_HOURS: u64 = 87_600;

impl AppConfig {
    /// Location of the config file when none is given on the command line
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = if let Ok(env_dir) = std::env::var(CONFIG_DIR_ENV_VAR) {
            PathBuf::from(env_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| QuestError::Other("unable to determine config directory".to_string()))?
                .join(CONFIG_DIR)
        };
        Ok(config_dir.join(CONFIG_FILE))
    }

    /// Load and validate configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            QuestError::Other(format!("failed to read config from {}: {}", path.display(), e))
        })?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        tracing::debug!(path = %path.display(), quest_types = config.quest_types.len(), "Loaded config");
        Ok(config)
    }

    /// Load `path` if given, else the default location; a missing default file means defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let path = Self::default_path()?;
                if path.exists() {
                    Self::load(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| QuestError::Other(format!("failed to serialize config: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Check value ranges and that all configured quest types build
    pub fn validate(&self) -> Result<()> {
        if self.tile_zoom == 0 || self.tile_zoom > MAX_TILE_ZOOM {
            bail_invalid!("tile_zoom", self.tile_zoom);
        }
        if self.refresh_quests_after_hours > MAX_REFRESH_QUESTS_AFTER_HOURS {
            bail_invalid!("refresh_quests_after_hours", self.refresh_quests_after_hours);
        }
        if self.note_block_radius_m < 0.0 {
            bail_invalid!("note_block_radius_m", self.note_block_radius_m);
        }
        if self.max_geometry_length_m <= 0.0 {
            bail_invalid!("max_geometry_length_m", self.max_geometry_length_m);
        }
        for (name, profile) in [
            ("auto_download.mobile", &self.auto_download.mobile),
            ("auto_download.wifi", &self.auto_download.wifi),
        ] {
            if profile.max_area_km2 <= 0.0 || profile.desired_quest_count == 0 {
                bail_invalid!(name, format!("{:?}", profile));
            }
        }
        self.build_registry()?;
        Ok(())
    }

    /// Path of the quest database
    pub fn database_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.database {
            return Ok(path.clone());
        }
        Ok(dirs::data_local_dir()
            .ok_or_else(|| QuestError::Other("unable to determine data directory".to_string()))?
            .join(CONFIG_DIR)
            .join(DATABASE_FILE))
    }

    /// Built-in quest types followed by the configured ones
    pub fn build_registry(&self) -> Result<QuestTypeRegistry> {
        let mut types = default_quest_types()?;
        for custom in &self.quest_types {
            types.push(custom_value_quest(
                &custom.name,
                &custom.filter,
                &custom.key,
                custom.countries.clone(),
            )?);
        }
        QuestTypeRegistry::new(types)
    }

    pub fn country_boundaries(&self) -> CountryBoxes {
        CountryBoxes::new(self.countries.clone())
    }

    pub fn reconcile_settings(&self) -> ReconcileSettings {
        ReconcileSettings {
            note_block_radius_m: self.note_block_radius_m,
            max_geometry_length_m: self.max_geometry_length_m,
        }
    }

    pub fn download_settings(&self) -> DownloadSettings {
        DownloadSettings {
            tile_zoom: self.tile_zoom,
            refresh_quests_after: self.refresh_quests_after(),
            max_notes: self.max_notes,
        }
    }

    pub fn refresh_quests_after(&self) -> Duration {
        Duration::from_secs(self.refresh_quests_after_hours.saturating_mul(3600))
    }

    pub fn auto_download_profile(&self, wifi: bool) -> AutoDownloadProfile {
        if wifi {
            self.auto_download.wifi
        } else {
            self.auto_download.mobile
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::countries::{CountryArea, CountrySet};
    use crate::geo::BoundingBox;
    use tempfile::tempdir;

    fn bench_quest() -> QuestTypeConfig {
        QuestTypeConfig {
            name: "AddBenchBackrest".to_string(),
            filter: "nodes with amenity = bench and !backrest".to_string(),
            key: "backrest".to_string(),
            countries: CountrySet::none_except(&["CH"]),
        }
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.tile_zoom, 16);
        assert_eq!(config.refresh_quests_after_hours, 72);
        assert_eq!(config.max_notes, 10_000);
        assert_eq!(config.auto_download.mobile, AutoDownloadProfile::MOBILE);
        assert_eq!(config.auto_download.wifi, AutoDownloadProfile::WIFI);
        assert!(config.validate().is_ok());
        assert_eq!(config.build_registry().unwrap().len(), 12);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: AppConfig = toml::from_str("max_notes = 50\n").unwrap();
        assert_eq!(config.max_notes, 50);
        assert_eq!(config.tile_zoom, 16);
        assert_eq!(config.note_block_radius_m, 1.0);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = AppConfig {
            database: Some(dir.path().join("quests.db")),
            countries: vec![CountryArea {
                code: "CH".to_string(),
                bboxes: vec![BoundingBox::new(45.8, 5.9, 47.8, 10.5)],
            }],
            quest_types: vec![bench_quest()],
            ..Default::default()
        };
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.database_path().unwrap(), dir.path().join("quests.db"));
    }

    #[test]
    fn test_custom_quest_types_follow_builtins() {
        let config = AppConfig {
            quest_types: vec![bench_quest()],
            ..Default::default()
        };
        let registry = config.build_registry().unwrap();
        assert_eq!(registry.len(), 13);
        assert_eq!(registry.names().last(), Some(&"AddBenchBackrest"));
        let bench = registry.get_by_name("AddBenchBackrest").unwrap();
        assert_eq!(bench.commit_message(), "Add backrest");
        assert_eq!(bench.enabled_in_countries(), &CountrySet::none_except(&["CH"]));
    }

    #[test]
    fn test_bad_filter_is_rejected() {
        let config = AppConfig {
            quest_types: vec![QuestTypeConfig {
                filter: "nodes with amenity =".to_string(),
                ..bench_quest()
            }],
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, QuestError::FilterParse { .. }));
    }

    #[test]
    fn test_duplicate_quest_type_is_rejected() {
        let config = AppConfig {
            quest_types: vec![QuestTypeConfig {
                name: "AddPathIncline".to_string(),
                ..bench_quest()
            }],
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, QuestError::DuplicateQuestType { .. }));
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        let zoom = AppConfig {
            tile_zoom: 0,
            ..Default::default()
        };
        assert!(matches!(zoom.validate(), Err(QuestError::InvalidValue { .. })));

        let mut profile = AppConfig::default();
        profile.auto_download.wifi.desired_quest_count = 0;
        assert!(matches!(profile.validate(), Err(QuestError::InvalidValue { .. })));

        let refresh = AppConfig {
            refresh_quests_after_hours: u64::MAX,
            ..Default::default()
        };
        assert!(matches!(refresh.validate(), Err(QuestError::InvalidValue { .. })));
        assert_eq!(refresh.refresh_quests_after(), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_settings_from_config() {
        let config = AppConfig {
            refresh_quests_after_hours: 2,
            max_geometry_length_m: 300.0,
            ..Default::default()
        };
        assert_eq!(config.download_settings().refresh_quests_after, Duration::from_secs(7200));
        assert_eq!(config.reconcile_settings().max_geometry_length_m, 300.0);
        assert_eq!(config.auto_download_profile(true), AutoDownloadProfile::WIFI);
    }
}
