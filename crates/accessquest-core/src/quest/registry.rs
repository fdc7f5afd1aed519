//! Ordered, immutable catalog of quest types

use std::collections::HashMap;

use super::quest_type::QuestType;
use crate::error::{QuestError, Result};

/// Quest types in evaluation order, with lookup by name
#[derive(Debug, Clone)]
pub struct QuestTypeRegistry {
    types: Vec<QuestType>,
    by_name: HashMap<String, usize>,
}

impl QuestTypeRegistry {
    /// Fails on duplicate names; such a registry is misconfigured
    pub fn new(types: Vec<QuestType>) -> Result<Self> {
        let mut by_name = HashMap::with_capacity(types.len());
        for (index, quest_type) in types.iter().enumerate() {
            if by_name.insert(quest_type.name().to_string(), index).is_some() {
                return Err(QuestError::DuplicateQuestType {
                    name: quest_type.name().to_string(),
                });
            }
        }
        tracing::debug!(count = types.len(), "Quest type registry built");
        Ok(Self { types, by_name })
    }

    pub fn all(&self) -> &[QuestType] {
        &self.types
    }

    pub fn get_by_name(&self, name: &str) -> Option<&QuestType> {
        self.by_name.get(name).map(|index| &self.types[*index])
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.types.iter().map(QuestType::name).collect()
    }
}
