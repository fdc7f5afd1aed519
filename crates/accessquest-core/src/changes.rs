//! Tag change sets
//!
//! Answers are never applied to an element directly. A quest type records the
//! intended edits on a [`StringMapChangesBuilder`] seeded with the element's current
//! tags; the resulting [`StringMapChanges`] can later be checked for conflicts against
//! a newer version of the element, applied, or reversed for undo.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::check_date::{format_check_date, last_check_date_keys, SURVEY_MARK_KEY};
use crate::element::Tags;
use crate::error::{QuestError, Result};

/// A single edit of one key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum StringMapEntryChange {
    Add {
        key: String,
        value: String,
    },
    Modify {
        key: String,
        value_before: String,
        value: String,
    },
    Delete {
        key: String,
        value_before: String,
    },
}

impl StringMapEntryChange {
    pub fn key(&self) -> &str {
        match self {
            StringMapEntryChange::Add { key, .. }
            | StringMapEntryChange::Modify { key, .. }
            | StringMapEntryChange::Delete { key, .. } => key,
        }
    }

    /// Whether `map` was changed by someone else in a way this edit cannot be applied to
    pub fn conflicts_with(&self, map: &Tags) -> bool {
        match self {
            StringMapEntryChange::Add { key, value } => {
                map.get(key).is_some_and(|current| current != value)
            }
            StringMapEntryChange::Modify {
                key,
                value_before,
                value,
            } => {
                let current = map.get(key);
                current != Some(value_before) && current != Some(value)
            }
            StringMapEntryChange::Delete { key, value_before } => {
                map.get(key).is_some_and(|current| current != value_before)
            }
        }
    }

    pub fn apply_to(&self, map: &mut Tags) {
        match self {
            StringMapEntryChange::Add { key, value } | StringMapEntryChange::Modify { key, value, .. } => {
                map.insert(key.clone(), value.clone());
            }
            StringMapEntryChange::Delete { key, .. } => {
                map.remove(key);
            }
        }
    }

    pub fn reversed(&self) -> StringMapEntryChange {
        match self {
            StringMapEntryChange::Add { key, value } => StringMapEntryChange::Delete {
                key: key.clone(),
                value_before: value.clone(),
            },
            StringMapEntryChange::Modify {
                key,
                value_before,
                value,
            } => StringMapEntryChange::Modify {
                key: key.clone(),
                value_before: value.clone(),
                value: value_before.clone(),
            },
            StringMapEntryChange::Delete { key, value_before } => StringMapEntryChange::Add {
                key: key.clone(),
                value: value_before.clone(),
            },
        }
    }
}

impl fmt::Display for StringMapEntryChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StringMapEntryChange::Add { key, value } => write!(f, "ADD \"{}\"=\"{}\"", key, value),
            StringMapEntryChange::Modify {
                key,
                value_before,
                value,
            } => write!(f, "MODIFY \"{}\"=\"{}\" -> \"{}\"=\"{}\"", key, value_before, key, value),
            StringMapEntryChange::Delete { key, value_before } => {
                write!(f, "DELETE \"{}\"=\"{}\"", key, value_before)
            }
        }
    }
}

/// An immutable diff over a tag map
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringMapChanges {
    pub changes: Vec<StringMapEntryChange>,
}

impl StringMapChanges {
    pub fn new(changes: Vec<StringMapEntryChange>) -> Self {
        Self { changes }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// The diff that exactly undoes this one
    pub fn reversed(&self) -> StringMapChanges {
        StringMapChanges::new(self.changes.iter().map(|c| c.reversed()).collect())
    }

    pub fn has_conflicts_to(&self, map: &Tags) -> bool {
        self.conflicts_to(map).next().is_some()
    }

    pub fn conflicts_to<'a>(&'a self, map: &'a Tags) -> impl Iterator<Item = &'a StringMapEntryChange> {
        self.changes.iter().filter(move |c| c.conflicts_with(map))
    }

    /// Apply all changes, or none if any of them conflicts
    pub fn apply_to(&self, map: &mut Tags) -> Result<()> {
        if let Some(conflict) = self.conflicts_to(map).next() {
            return Err(QuestError::tag_conflict(
                conflict.key(),
                format!("cannot apply {}", conflict),
            ));
        }
        for change in &self.changes {
            change.apply_to(map);
        }
        Ok(())
    }
}

impl fmt::Display for StringMapChanges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.changes.iter().map(|c| c.to_string()).collect();
        f.write_str(&parts.join(", "))
    }
}

/// Collects edits against a fixed set of source tags
pub struct StringMapChangesBuilder<'a> {
    source: &'a Tags,
    changes: BTreeMap<String, StringMapEntryChange>,
    today: NaiveDate,
}

impl<'a> StringMapChangesBuilder<'a> {
    pub fn new(source: &'a Tags) -> Self {
        Self {
            source,
            changes: BTreeMap::new(),
            today: Utc::now().date_naive(),
        }
    }

    /// Use a fixed date for check date tags
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn add(&mut self, key: &str, value: &str) -> Result<()> {
        if self.source.contains_key(key) {
            return Err(QuestError::tag_conflict(key, "the key already exists"));
        }
        self.put(StringMapEntryChange::Add {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    pub fn modify(&mut self, key: &str, value: &str) -> Result<()> {
        let value_before = self.existing(key)?;
        self.put(StringMapEntryChange::Modify {
            key: key.to_string(),
            value_before,
            value: value.to_string(),
        })
    }

    pub fn delete(&mut self, key: &str) -> Result<()> {
        let value_before = self.existing(key)?;
        self.put(StringMapEntryChange::Delete {
            key: key.to_string(),
            value_before,
        })
    }

    pub fn delete_if_exists(&mut self, key: &str) -> Result<()> {
        if self.source.contains_key(key) {
            self.delete(key)?;
        }
        Ok(())
    }

    pub fn add_or_modify(&mut self, key: &str, value: &str) -> Result<()> {
        if self.source.contains_key(key) {
            self.modify(key, value)
        } else {
            self.add(key, value)
        }
    }

    pub fn modify_if_exists(&mut self, key: &str, value: &str) -> Result<()> {
        if self.source.contains_key(key) {
            self.modify(key, value)?;
        }
        Ok(())
    }

    pub fn previous_value(&self, key: &str) -> Option<&str> {
        self.source.get(key).map(String::as_str)
    }

    /// Set `key` to `value`; if it already had that value, record a fresh survey instead
    pub fn update_with_check_date(&mut self, key: &str, value: &str) -> Result<()> {
        if self.previous_value(key) == Some(value) {
            self.update_check_date_for_key(key)
        } else {
            self.add_or_modify(key, value)?;
            self.delete_check_dates_for_key(key)
        }
    }

    /// Set `check_date:<key>` to today and drop the other companion keys
    pub fn update_check_date_for_key(&mut self, key: &str) -> Result<()> {
        let survey_key = format!("{}:{}", SURVEY_MARK_KEY, key);
        let today = format_check_date(self.today);
        self.add_or_modify(&survey_key, &today)?;
        for companion in last_check_date_keys(key) {
            if companion != survey_key {
                self.delete_if_exists(&companion)?;
            }
        }
        Ok(())
    }

    pub fn delete_check_dates_for_key(&mut self, key: &str) -> Result<()> {
        for companion in last_check_date_keys(key) {
            self.delete_if_exists(&companion)?;
        }
        Ok(())
    }

    pub fn create(self) -> StringMapChanges {
        StringMapChanges::new(self.changes.into_values().collect())
    }

    fn existing(&self, key: &str) -> Result<String> {
        self.source
            .get(key)
            .cloned()
            .ok_or_else(|| QuestError::tag_conflict(key, "the key does not exist"))
    }

    /// Repeating an identical change is a no-op; two different changes to one key are an error
    fn put(&mut self, change: StringMapEntryChange) -> Result<()> {
        match self.changes.get(change.key()) {
            Some(existing) if *existing == change => Ok(()),
            Some(_) => Err(QuestError::tag_conflict(
                change.key(),
                "the key is already being modified",
            )),
            None => {
                self.changes.insert(change.key().to_string(), change);
                Ok(())
            }
        }
    }
}
