//! Boolean expression tree over tag predicates

use chrono::{DateTime, Utc};
use std::fmt;

use super::tag_filter::TagFilter;
use crate::element::Element;

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Leaf(TagFilter),
    And(Vec<Expression>),
    Or(Vec<Expression>),
    Not(Box<Expression>),
}

impl Expression {
    /// Conjunction, merging nested conjunctions into one level
    pub fn and(children: Vec<Expression>) -> Expression {
        Self::flatten(children, true)
    }

    /// Disjunction, merging nested disjunctions into one level
    pub fn or(children: Vec<Expression>) -> Expression {
        Self::flatten(children, false)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(child: Expression) -> Expression {
        Expression::Not(Box::new(child))
    }

    fn flatten(children: Vec<Expression>, conjunction: bool) -> Expression {
        let mut flat = Vec::with_capacity(children.len());
        for child in children {
            match child {
                Expression::And(inner) if conjunction => flat.extend(inner),
                Expression::Or(inner) if !conjunction => flat.extend(inner),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            if let Some(only) = flat.pop() {
                return only;
            }
        }
        if conjunction {
            Expression::And(flat)
        } else {
            Expression::Or(flat)
        }
    }

    pub fn matches(&self, element: &Element, now: DateTime<Utc>) -> bool {
        match self {
            Expression::Leaf(filter) => filter.matches(element, now),
            Expression::And(children) => children.iter().all(|c| c.matches(element, now)),
            Expression::Or(children) => children.iter().any(|c| c.matches(element, now)),
            Expression::Not(child) => !child.matches(element, now),
        }
    }
}

impl From<TagFilter> for Expression {
    fn from(filter: TagFilter) -> Self {
        Expression::Leaf(filter)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Leaf(filter) => write!(f, "{}", filter),
            Expression::And(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" and ")?;
                    }
                    match child {
                        Expression::Or(_) => write!(f, "({})", child)?,
                        _ => write!(f, "{}", child)?,
                    }
                }
                Ok(())
            }
            Expression::Or(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" or ")?;
                    }
                    write!(f, "{}", child)?;
                }
                Ok(())
            }
            Expression::Not(child) => write!(f, "!({})", child),
        }
    }
}
