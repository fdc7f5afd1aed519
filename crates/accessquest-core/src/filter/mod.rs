//! Element filter expressions
//!
//! A filter expression selects map elements by kind and tags, written in a small
//! query language:
//!
//! ```text
//! ways with highway = footway and (!incline or incline older today -8 years)
//! ```
//!
//! Expressions are compiled once with [`ElementFilterExpression::from_str`] and can be
//! printed back to the same language ([`Display`](std::fmt::Display)) or rendered as an
//! Overpass QL query for diagnostics.

pub mod date;
pub mod expression;
mod overpass;
mod parser;
pub mod tag_filter;

#[cfg(test)]
mod tests;

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

use crate::element::{Element, ElementType};
use crate::error::{QuestError, Result};

pub use date::{DateFilter, DateUnit};
pub use expression::Expression;
pub use tag_filter::{Comparison, Pattern, TagFilter};

/// Words with a meaning of their own in the filter language
const RESERVED_WORDS: [&str; 5] = ["with", "and", "or", "older", "newer"];

/// A compiled filter: element kinds plus an optional tag expression
#[derive(Debug, Clone, PartialEq)]
pub struct ElementFilterExpression {
    kinds: Vec<ElementType>,
    root: Option<Expression>,
}

impl ElementFilterExpression {
    pub fn new(mut kinds: Vec<ElementType>, root: Option<Expression>) -> Self {
        if kinds.is_empty() {
            kinds = ElementType::ALL.to_vec();
        }
        kinds.sort();
        kinds.dedup();
        Self { kinds, root }
    }

    pub fn kinds(&self) -> &[ElementType] {
        &self.kinds
    }

    pub fn root(&self) -> Option<&Expression> {
        self.root.as_ref()
    }

    pub fn includes_element_type(&self, element_type: ElementType) -> bool {
        self.kinds.contains(&element_type)
    }

    /// Evaluate against the element using the current time for relative dates
    pub fn matches(&self, element: &Element) -> bool {
        self.matches_at(element, Utc::now())
    }

    pub fn matches_at(&self, element: &Element, now: DateTime<Utc>) -> bool {
        self.includes_element_type(element.element_type())
            && self.root.as_ref().is_none_or(|e| e.matches(element, now))
    }

    /// Render as an Overpass QL query
    pub fn to_overpass(&self) -> String {
        self.to_overpass_at(Utc::now())
    }

    pub fn to_overpass_at(&self, now: DateTime<Utc>) -> String {
        overpass::create(&self.kinds, self.root.as_ref(), now)
    }
}

impl FromStr for ElementFilterExpression {
    type Err = QuestError;

    fn from_str(s: &str) -> Result<Self> {
        parser::parse(s)
    }
}

impl fmt::Display for ElementFilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds: Vec<&str> = self
            .kinds
            .iter()
            .map(|k| match k {
                ElementType::Node => "nodes",
                ElementType::Way => "ways",
                ElementType::Relation => "relations",
            })
            .collect();
        f.write_str(&kinds.join(", "))?;
        if let Some(root) = &self.root {
            write!(f, " with {}", root)?;
        }
        Ok(())
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Quote a key or value for the filter language unless it is a plain identifier
pub(crate) fn quote_if_needed(s: &str) -> String {
    let reserved = RESERVED_WORDS.iter().any(|w| w.eq_ignore_ascii_case(s));
    if is_identifier(s) && !reserved {
        s.to_string()
    } else if s.contains('\'') {
        format!("\"{}\"", s)
    } else {
        format!("'{}'", s)
    }
}
