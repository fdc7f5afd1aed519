//! Quests, quest types and the quest type registry

pub mod answer;
pub mod catalog;
mod pedestrian_way;
pub mod quest_type;
pub mod registry;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::changes::StringMapChanges;
use crate::element::{ElementGeometry, ElementKey};
use crate::error::QuestError;

pub use answer::Answer;
pub use catalog::default_quest_types;
pub use quest_type::{QuestType, Selection};
pub use registry::QuestTypeRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QuestStatus {
    /// Created, waiting for an answer
    New,
    /// Answered locally, changes not yet uploaded
    Answered,
    /// Hidden by the user
    Hidden,
    /// Filtered out by settings
    Invisible,
    /// Answered and uploaded
    Closed,
    /// Answer undone, waiting to upload the reversal
    Revert,
}

impl QuestStatus {
    pub const ALL: [QuestStatus; 6] = [
        QuestStatus::New,
        QuestStatus::Answered,
        QuestStatus::Hidden,
        QuestStatus::Invisible,
        QuestStatus::Closed,
        QuestStatus::Revert,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestStatus::New => "NEW",
            QuestStatus::Answered => "ANSWERED",
            QuestStatus::Hidden => "HIDDEN",
            QuestStatus::Invisible => "INVISIBLE",
            QuestStatus::Closed => "CLOSED",
            QuestStatus::Revert => "REVERT",
        }
    }

    /// Only unanswered quests are shown on the map
    pub fn is_visible(&self) -> bool {
        matches!(self, QuestStatus::New)
    }
}

impl fmt::Display for QuestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestStatus {
    type Err = QuestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QuestStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| QuestError::invalid_value("quest status", s))
    }
}

/// One quest type asked about one element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quest {
    /// Assigned by the quest store on insert
    pub id: Option<i64>,
    pub quest_type: String,
    pub element: ElementKey,
    pub status: QuestStatus,
    pub geometry: ElementGeometry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes: Option<StringMapChanges>,
    pub last_update: DateTime<Utc>,
}

impl Quest {
    pub fn new(quest_type: &str, element: ElementKey, geometry: ElementGeometry) -> Self {
        Self {
            id: None,
            quest_type: quest_type.to_string(),
            element,
            status: QuestStatus::New,
            geometry,
            changes: None,
            last_update: Utc::now(),
        }
    }
}
