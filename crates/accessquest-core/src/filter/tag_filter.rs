//! Leaf predicates over an element's tags and edit date

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use std::fmt;

use super::date::DateFilter;
use super::quote_if_needed;
use crate::check_date::{last_check_date_keys, parse_check_date};
use crate::element::Element;

/// A regular expression that must match the whole string
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!("^(?:{})$", source))?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
}

impl Comparison {
    pub fn symbol(&self) -> &'static str {
        match self {
            Comparison::Greater => ">",
            Comparison::GreaterOrEqual => ">=",
            Comparison::Less => "<",
            Comparison::LessOrEqual => "<=",
        }
    }

    pub fn holds<T: PartialOrd>(&self, lhs: T, rhs: T) -> bool {
        match self {
            Comparison::Greater => lhs > rhs,
            Comparison::GreaterOrEqual => lhs >= rhs,
            Comparison::Less => lhs < rhs,
            Comparison::LessOrEqual => lhs <= rhs,
        }
    }
}

/// A single predicate node of a filter expression
#[derive(Debug, Clone, PartialEq)]
pub enum TagFilter {
    HasKey { key: String },
    NotHasKey { key: String },
    HasTag { key: String, value: String },
    NotHasTag { key: String, value: String },
    HasKeyLike { key: Pattern },
    NotHasKeyLike { key: Pattern },
    HasTagValueLike { key: String, value: Pattern },
    NotHasTagValueLike { key: String, value: Pattern },
    HasTagLike { key: Pattern, value: Pattern },
    /// `key > 3`, `key <= 1.5`; non-numeric values never match
    HasTagNumber {
        key: String,
        op: Comparison,
        value: f64,
    },
    /// `check_date < 2020-01-01`; values that are not check dates never match
    HasDateTag {
        key: String,
        op: Comparison,
        date: DateFilter,
    },
    /// Key present and its most recent verification is before `date`
    TagOlderThan { key: String, date: DateFilter },
    /// Key present and its most recent verification is after `date`
    TagNewerThan { key: String, date: DateFilter },
    ElementOlderThan { date: DateFilter },
    ElementNewerThan { date: DateFilter },
}

impl TagFilter {
    pub fn has_tag_greater_than(key: &str, value: f64) -> Self {
        Self::number(key, Comparison::Greater, value)
    }

    pub fn has_tag_less_than(key: &str, value: f64) -> Self {
        Self::number(key, Comparison::Less, value)
    }

    pub fn has_date_tag_less_or_equal_than(key: &str, date: DateFilter) -> Self {
        TagFilter::HasDateTag {
            key: key.to_string(),
            op: Comparison::LessOrEqual,
            date,
        }
    }

    fn number(key: &str, op: Comparison, value: f64) -> Self {
        TagFilter::HasTagNumber {
            key: key.to_string(),
            op,
            value,
        }
    }

    pub fn matches(&self, element: &Element, now: DateTime<Utc>) -> bool {
        let tags = &element.tags;
        match self {
            TagFilter::HasKey { key } => tags.contains_key(key),
            TagFilter::NotHasKey { key } => !tags.contains_key(key),
            TagFilter::HasTag { key, value } => tags.get(key) == Some(value),
            TagFilter::NotHasTag { key, value } => tags.get(key) != Some(value),
            TagFilter::HasKeyLike { key } => tags.keys().any(|k| key.is_match(k)),
            TagFilter::NotHasKeyLike { key } => !tags.keys().any(|k| key.is_match(k)),
            TagFilter::HasTagValueLike { key, value } => {
                tags.get(key).is_some_and(|v| value.is_match(v))
            }
            TagFilter::NotHasTagValueLike { key, value } => {
                !tags.get(key).is_some_and(|v| value.is_match(v))
            }
            TagFilter::HasTagLike { key, value } => tags
                .iter()
                .any(|(k, v)| key.is_match(k) && value.is_match(v)),
            TagFilter::HasTagNumber { key, op, value } => tags
                .get(key)
                .and_then(|v| v.trim().parse::<f64>().ok())
                .is_some_and(|v| op.holds(v, *value)),
            TagFilter::HasDateTag { key, op, date } => tags
                .get(key)
                .and_then(|v| parse_check_date(v))
                .is_some_and(|d| op.holds(d, date.date_at(now))),
            TagFilter::TagOlderThan { key, date } => {
                tags.contains_key(key)
                    && last_verified(element, key).is_some_and(|d| d < date.date_at(now))
            }
            TagFilter::TagNewerThan { key, date } => {
                tags.contains_key(key)
                    && last_verified(element, key).is_some_and(|d| d > date.date_at(now))
            }
            TagFilter::ElementOlderThan { date } => element
                .timestamp
                .is_some_and(|t| t.date_naive() < date.date_at(now)),
            TagFilter::ElementNewerThan { date } => element
                .timestamp
                .is_some_and(|t| t.date_naive() > date.date_at(now)),
        }
    }
}

/// Most recent of the element's edit date, the tag's own value and its companion check dates
fn last_verified(element: &Element, key: &str) -> Option<NaiveDate> {
    let edited = element.timestamp.map(|t| t.date_naive());
    let own = element.tags.get(key).and_then(|v| parse_check_date(v));
    let companions = last_check_date_keys(key)
        .into_iter()
        .filter_map(|k| element.tags.get(&k).and_then(|v| parse_check_date(v)));
    edited.into_iter().chain(own).chain(companions).max()
}

pub(super) fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

impl fmt::Display for TagFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let q = |s: &str| quote_if_needed(s);
        match self {
            TagFilter::HasKey { key } => write!(f, "{}", q(key)),
            TagFilter::NotHasKey { key } => write!(f, "!{}", q(key)),
            TagFilter::HasTag { key, value } => write!(f, "{} = {}", q(key), q(value)),
            TagFilter::NotHasTag { key, value } => write!(f, "{} != {}", q(key), q(value)),
            TagFilter::HasKeyLike { key } => write!(f, "~{}", q(key.as_str())),
            TagFilter::NotHasKeyLike { key } => write!(f, "!~{}", q(key.as_str())),
            TagFilter::HasTagValueLike { key, value } => {
                write!(f, "{} ~ {}", q(key), q(value.as_str()))
            }
            TagFilter::NotHasTagValueLike { key, value } => {
                write!(f, "{} !~ {}", q(key), q(value.as_str()))
            }
            TagFilter::HasTagLike { key, value } => {
                write!(f, "~{} ~ {}", q(key.as_str()), q(value.as_str()))
            }
            TagFilter::HasTagNumber { key, op, value } => {
                write!(f, "{} {} {}", q(key), op.symbol(), format_number(*value))
            }
            TagFilter::HasDateTag { key, op, date } => {
                write!(f, "{} {} {}", q(key), op.symbol(), date)
            }
            TagFilter::TagOlderThan { key, date } => write!(f, "{} older {}", q(key), date),
            TagFilter::TagNewerThan { key, date } => write!(f, "{} newer {}", q(key), date),
            TagFilter::ElementOlderThan { date } => write!(f, "older {}", date),
            TagFilter::ElementNewerThan { date } => write!(f, "newer {}", date),
        }
    }
}
