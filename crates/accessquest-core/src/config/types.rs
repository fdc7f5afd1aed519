//! Configuration type definitions

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::countries::{CountryArea, CountrySet};
use crate::download::AutoDownloadProfile;
use crate::tiles::QUEST_TILE_ZOOM;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Quest database path (optional, defaults to the local data directory)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,

    /// Zoom level at which downloaded areas are tracked
    #[serde(default = "default_tile_zoom")]
    pub tile_zoom: u32,

    /// Areas downloaded longer ago than this are downloaded again
    #[serde(default = "default_refresh_quests_after_hours")]
    pub refresh_quests_after_hours: u64,

    /// Notes within this distance of an element block new quests for it
    #[serde(default = "default_note_block_radius_m")]
    pub note_block_radius_m: f64,

    /// Lines longer than this get no quests
    #[serde(default = "default_max_geometry_length_m")]
    pub max_geometry_length_m: f64,

    /// Maximum number of notes fetched per download
    #[serde(default = "default_max_notes")]
    pub max_notes: usize,

    #[serde(default)]
    pub auto_download: AutoDownloadConfig,

    /// Country areas for enabling quest types per country
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub countries: Vec<CountryArea>,

    /// Additional quest types, appended after the built-in ones
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quest_types: Vec<QuestTypeConfig>,
}

/// Auto-download profiles by network type
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutoDownloadConfig {
    #[serde(default = "default_mobile_profile")]
    pub mobile: AutoDownloadProfile,

    #[serde(default = "default_wifi_profile")]
    pub wifi: AutoDownloadProfile,
}

/// A quest type asking for one tag value on every element matching a filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestTypeConfig {
    pub name: String,

    /// Filter expression, e.g. `nodes with amenity = bench and !backrest`
    pub filter: String,

    /// Tag key the answer is written to
    pub key: String,

    #[serde(default)]
    pub countries: CountrySet,
}

fn default_tile_zoom() -> u32 {
    QUEST_TILE_ZOOM
}

fn default_refresh_quests_after_hours() -> u64 {
    72
}

fn default_note_block_radius_m() -> f64 {
    1.0
}

fn default_max_geometry_length_m() -> f64 {
    600.0
}

fn default_max_notes() -> usize {
    10_000
}

fn default_mobile_profile() -> AutoDownloadProfile {
    AutoDownloadProfile::MOBILE
}

fn default_wifi_profile() -> AutoDownloadProfile {
    AutoDownloadProfile::WIFI
}

impl Default for AutoDownloadConfig {
    fn default() -> Self {
        AutoDownloadConfig {
            mobile: default_mobile_profile(),
            wifi: default_wifi_profile(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database: None,
            tile_zoom: default_tile_zoom(),
            refresh_quests_after_hours: default_refresh_quests_after_hours(),
            note_block_radius_m: default_note_block_radius_m(),
            max_geometry_length_m: default_max_geometry_length_m(),
            max_notes: default_max_notes(),
            auto_download: AutoDownloadConfig::default(),
            countries: Vec::new(),
            quest_types: Vec::new(),
        }
    }
}
