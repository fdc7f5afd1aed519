//! User answers to quests

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::QuestError;

/// What the surveyor answered.
///
/// Textual form: `yes`/`no`, `separate` (sidewalk mapped as its own way),
/// `left=<v>,right=<v>` (either side optional), `<value>;<note>`, or a plain value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Answer {
    Value {
        value: String,
    },
    YesNo {
        yes: bool,
    },
    /// A generic value that needs a free-text description
    ValueWithNote {
        value: String,
        note: String,
    },
    SidewalkSeparate,
    Sidewalks {
        left: Option<String>,
        right: Option<String>,
    },
}

impl Answer {
    pub fn value(value: &str) -> Self {
        Answer::Value {
            value: value.to_string(),
        }
    }

    /// The answer as a single tag value, if it is one
    pub fn as_value(&self) -> Option<&str> {
        match self {
            Answer::Value { value } => Some(value),
            Answer::YesNo { yes: true } => Some("yes"),
            Answer::YesNo { yes: false } => Some("no"),
            _ => None,
        }
    }

    pub fn as_yes_no(&self) -> Option<bool> {
        match self {
            Answer::YesNo { yes } => Some(*yes),
            Answer::Value { value } if value == "yes" => Some(true),
            Answer::Value { value } if value == "no" => Some(false),
            _ => None,
        }
    }
}

impl FromStr for Answer {
    type Err = QuestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(QuestError::invalid_value("answer", "(empty)"));
        }
        match s {
            "yes" => return Ok(Answer::YesNo { yes: true }),
            "no" => return Ok(Answer::YesNo { yes: false }),
            "separate" => return Ok(Answer::SidewalkSeparate),
            _ => {}
        }

        if s.starts_with("left=") || s.starts_with("right=") {
            let mut left = None;
            let mut right = None;
            for part in s.split(',') {
                match part.trim().split_once('=') {
                    Some(("left", v)) if !v.is_empty() => left = Some(v.to_string()),
                    Some(("right", v)) if !v.is_empty() => right = Some(v.to_string()),
                    _ => return Err(QuestError::invalid_value("sidewalk answer", s)),
                }
            }
            return Ok(Answer::Sidewalks { left, right });
        }

        if let Some((value, note)) = s.split_once(';') {
            return Ok(Answer::ValueWithNote {
                value: value.trim().to_string(),
                note: note.trim().to_string(),
            });
        }

        Ok(Answer::value(s))
    }
}
