//! Quest type descriptors

use std::fmt;
use std::sync::Arc;

use super::answer::Answer;
use crate::changes::{StringMapChanges, StringMapChangesBuilder};
use crate::countries::CountrySet;
use crate::element::{Element, ElementKey, Tags};
use crate::error::Result;
use crate::filter::ElementFilterExpression;
use crate::map_data::MapData;

pub type ApplyAnswerFn =
    Arc<dyn Fn(&Answer, &mut StringMapChangesBuilder<'_>) -> Result<()> + Send + Sync>;
pub type ApplicableElementsFn = Arc<dyn Fn(&MapData) -> Vec<ElementKey> + Send + Sync>;
pub type IsApplicableToFn = Arc<dyn Fn(&Element) -> Option<bool> + Send + Sync>;

/// How a quest type picks its elements
#[derive(Clone)]
pub enum Selection {
    /// Every element matching the expression
    Filter(ElementFilterExpression),
    /// Selection that needs the surrounding map data, e.g. nodes of crossing ways.
    ///
    /// `is_applicable_to` answers for a single element without that context, or `None`
    /// when it cannot tell.
    Custom {
        applicable_elements: ApplicableElementsFn,
        is_applicable_to: IsApplicableToFn,
    },
}

/// A named rule: which elements to ask about and how to turn answers into tag changes
#[derive(Clone)]
pub struct QuestType {
    name: String,
    commit_message: String,
    selection: Selection,
    enabled_in_countries: CountrySet,
    apply_answer: ApplyAnswerFn,
}

impl QuestType {
    pub fn new(
        name: &str,
        commit_message: &str,
        selection: Selection,
        apply_answer: ApplyAnswerFn,
    ) -> Self {
        Self {
            name: name.to_string(),
            commit_message: commit_message.to_string(),
            selection,
            enabled_in_countries: CountrySet::All,
            apply_answer,
        }
    }

    pub fn with_countries(mut self, countries: CountrySet) -> Self {
        self.enabled_in_countries = countries;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn commit_message(&self) -> &str {
        &self.commit_message
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn enabled_in_countries(&self) -> &CountrySet {
        &self.enabled_in_countries
    }

    pub fn mode(&self) -> &'static str {
        match self.selection {
            Selection::Filter(_) => "filter",
            Selection::Custom { .. } => "custom",
        }
    }

    pub fn filter(&self) -> Option<&ElementFilterExpression> {
        match &self.selection {
            Selection::Filter(filter) => Some(filter),
            Selection::Custom { .. } => None,
        }
    }

    /// Keys of all elements in `map_data` this quest type applies to
    pub fn applicable_elements(&self, map_data: &MapData) -> Vec<ElementKey> {
        match &self.selection {
            Selection::Filter(filter) => map_data
                .iter()
                .filter(|e| filter.matches(e))
                .map(Element::key)
                .collect(),
            Selection::Custom {
                applicable_elements,
                ..
            } => applicable_elements(map_data),
        }
    }

    pub fn is_applicable_to(&self, element: &Element) -> Option<bool> {
        match &self.selection {
            Selection::Filter(filter) => Some(filter.matches(element)),
            Selection::Custom {
                is_applicable_to, ..
            } => is_applicable_to(element),
        }
    }

    /// Translate an answer into changes of `tags`
    pub fn apply_answer(&self, answer: &Answer, tags: &Tags) -> Result<StringMapChanges> {
        let mut builder = StringMapChangesBuilder::new(tags);
        (self.apply_answer)(answer, &mut builder)?;
        Ok(builder.create())
    }

    /// Like [`apply_answer`](Self::apply_answer) with a caller-supplied builder
    pub fn apply_answer_to(&self, answer: &Answer, builder: &mut StringMapChangesBuilder<'_>) -> Result<()> {
        (self.apply_answer)(answer, builder)
    }
}

impl fmt::Debug for QuestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuestType")
            .field("name", &self.name)
            .field("mode", &self.mode())
            .field("enabled_in_countries", &self.enabled_in_countries)
            .finish()
    }
}
