//! Subcommand argument structures

use chrono::NaiveDate;
use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::cli::parse::{parse_bbox, parse_date, parse_element_type, parse_status, parse_tag};
use accessquest_core::element::ElementType;
use accessquest_core::geo::BoundingBox;
use accessquest_core::quest::QuestStatus;

#[derive(Subcommand, Debug)]
pub enum FilterCommands {
    /// Parse an expression and print its normalized and Overpass forms
    Check {
        /// Filter expression, e.g. "nodes with amenity = toilets and !wheelchair"
        expression: String,
    },

    /// Evaluate an expression against one element
    Match {
        expression: String,

        /// Element tag (key=value), can be given multiple times
        #[arg(long = "tag", short = 't', value_parser = parse_tag, action = clap::ArgAction::Append)]
        tags: Vec<(String, String)>,

        /// Date the element was last edited (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        edited: Option<NaiveDate>,

        /// Element type (node, way, relation)
        #[arg(long, value_parser = parse_element_type, default_value = "node")]
        kind: ElementType,
    },
}

/// Arguments for the download command.
#[derive(Args, Debug)]
pub struct DownloadArgs {
    /// Map data file (Overpass JSON)
    #[arg(long)]
    pub data: PathBuf,

    /// Note positions file
    #[arg(long)]
    pub notes: Option<PathBuf>,

    /// Area to download (min_lat,min_lon,max_lat,max_lon)
    #[arg(long, value_parser = parse_bbox, allow_hyphen_values = true)]
    pub bbox: BoundingBox,
}

/// Arguments for the auto-download command.
#[derive(Args, Debug)]
pub struct AutoDownloadArgs {
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,

    /// Use the wifi profile instead of the mobile data one
    #[arg(long)]
    pub wifi: bool,
}

#[derive(Subcommand, Debug)]
pub enum QuestsCommands {
    /// List stored quests
    List {
        /// Only quests inside this area (min_lat,min_lon,max_lat,max_lon)
        #[arg(long, value_parser = parse_bbox, allow_hyphen_values = true)]
        bbox: Option<BoundingBox>,

        /// Only quests with this status (new, answered, hidden, ...)
        #[arg(long, value_parser = parse_status)]
        status: Option<QuestStatus>,
    },

    /// Answer a quest, storing the resulting tag changes
    Answer {
        id: i64,

        /// Answer text: yes/no, a value, `value;note`, `separate` or `left=..,right=..`
        value: String,

        /// Map data file holding the element's current tags
        #[arg(long)]
        data: PathBuf,
    },

    /// Hide a quest
    Hide { id: i64 },

    /// Undo the last answer or hide of a quest
    Revert { id: i64 },
}
