//! Overpass QL rendering of filter expressions

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use super::expression::Expression;
use super::tag_filter::{format_number, TagFilter};
use crate::check_date::{format_check_date, last_check_date_keys};
use crate::element::ElementType;

pub(super) fn create(kinds: &[ElementType], root: Option<&Expression>, now: DateTime<Utc>) -> String {
    OverpassQueryCreator::new(kinds, now).create(root)
}

/// A statement that filters an input set: either merged leaf filters or a subexpression
enum Statement<'a> {
    Tags(Vec<&'a TagFilter>),
    Nested(&'a Expression),
}

struct OverpassQueryCreator {
    element_types: Vec<&'static str>,
    now: DateTime<Utc>,
    next_set_id: u32,
    set_ids: HashMap<*const Expression, u32>,
}

impl OverpassQueryCreator {
    fn new(kinds: &[ElementType], now: DateTime<Utc>) -> Self {
        let has = |t| kinds.contains(&t);
        let element_types = if has(ElementType::Node) && has(ElementType::Way) && has(ElementType::Relation) {
            vec!["nwr"]
        } else if has(ElementType::Node) && has(ElementType::Way) {
            vec!["nw"]
        } else if has(ElementType::Way) && has(ElementType::Relation) {
            vec!["wr"]
        } else {
            kinds
                .iter()
                .map(|k| match k {
                    ElementType::Node => "node",
                    ElementType::Way => "way",
                    ElementType::Relation => "rel",
                })
                .collect()
        };
        Self {
            element_types,
            now,
            next_set_id: 1,
            set_ids: HashMap::new(),
        }
    }

    fn create(&mut self, root: Option<&Expression>) -> String {
        let types = self.element_types.clone();
        if let [element_type] = types.as_slice() {
            return match root {
                None => format!("{};\n", element_type),
                Some(expr) => self.expression(expr, element_type, None, None),
            };
        }

        let Some(expr) = root else {
            let parts: Vec<String> = types.iter().map(|t| format!("{}; ", t)).collect();
            return format!("({});\n", parts.join(" "));
        };

        let result_set = self.set_id_of(expr);
        let mut result = String::new();
        for element_type in &types {
            result.push_str(&self.expression(expr, element_type, None, Some(result_set)));
        }
        let union: Vec<String> = types
            .iter()
            .map(|t| format!("{};", set_name(t, result_set)))
            .collect();
        result.push_str(&format!("({});\n", union.join(" ")));
        result
    }

    fn set_id_of(&mut self, expr: &Expression) -> u32 {
        let key = expr as *const Expression;
        if let Some(id) = self.set_ids.get(&key) {
            return *id;
        }
        let id = self.next_set_id;
        self.next_set_id += 1;
        self.set_ids.insert(key, id);
        id
    }

    fn expression(
        &mut self,
        expr: &Expression,
        element_type: &str,
        input: Option<u32>,
        output: Option<u32>,
    ) -> String {
        match expr {
            Expression::Leaf(filter) => self.tags(&[filter], element_type, input, output),
            Expression::And(children) => self.all_of(children, element_type, input, output),
            Expression::Or(children) => self.any_of(children, element_type, input, output),
            Expression::Not(child) => self.none_of(child, element_type, input, output),
        }
    }

    fn all_of(
        &mut self,
        children: &[Expression],
        element_type: &str,
        input: Option<u32>,
        output: Option<u32>,
    ) -> String {
        let mut statements: Vec<Statement> = Vec::new();
        let mut leaves: Vec<&TagFilter> = Vec::new();
        for child in children {
            match child {
                Expression::Leaf(filter) => leaves.push(filter),
                other => {
                    if !leaves.is_empty() {
                        statements.push(Statement::Tags(std::mem::take(&mut leaves)));
                    }
                    statements.push(Statement::Nested(other));
                }
            }
        }
        if !leaves.is_empty() {
            statements.push(Statement::Tags(leaves));
        }

        let mut working_set = None;
        let mut result = String::new();
        let last = statements.len().saturating_sub(1);
        for (i, statement) in statements.iter().enumerate() {
            let stmt_input = if i == 0 { input } else { working_set };
            let stmt_output = if i == last {
                output
            } else {
                let id = match working_set {
                    Some(id) => id,
                    None => {
                        let id = self.next_set_id;
                        self.next_set_id += 1;
                        id
                    }
                };
                working_set = Some(id);
                Some(id)
            };
            let text = match statement {
                Statement::Tags(filters) => self.tags(filters, element_type, stmt_input, stmt_output),
                Statement::Nested(expr) => self.expression(expr, element_type, stmt_input, stmt_output),
            };
            result.push_str(&text);
        }
        result
    }

    fn any_of(
        &mut self,
        children: &[Expression],
        element_type: &str,
        input: Option<u32>,
        output: Option<u32>,
    ) -> String {
        let mut result = String::new();
        let mut child_sets = Vec::with_capacity(children.len());
        for child in children {
            let set = self.set_id_of(child);
            result.push_str(&self.expression(child, element_type, input, Some(set)));
            child_sets.push(set);
        }
        let union: Vec<String> = child_sets
            .iter()
            .map(|id| format!("{};", set_name(element_type, *id)))
            .collect();
        result.push_str(&format!(
            "({}){};\n",
            union.join(" "),
            output_clause(element_type, output)
        ));
        result
    }

    /// Set difference of the input and the child's result
    fn none_of(
        &mut self,
        child: &Expression,
        element_type: &str,
        input: Option<u32>,
        output: Option<u32>,
    ) -> String {
        let child_set = self.set_id_of(child);
        let mut result = self.expression(child, element_type, input, Some(child_set));
        result.push_str(&format!(
            "({}{}; - {};){};\n",
            element_type,
            input_clause(element_type, input),
            set_name(element_type, child_set),
            output_clause(element_type, output)
        ));
        result
    }

    fn tags(
        &self,
        filters: &[&TagFilter],
        element_type: &str,
        input: Option<u32>,
        output: Option<u32>,
    ) -> String {
        let tag_filters: String = filters.iter().map(|f| self.leaf(f)).collect();
        format!(
            "{}{}{}{};\n",
            element_type,
            input_clause(element_type, input),
            tag_filters,
            output_clause(element_type, output)
        )
    }

    fn leaf(&self, filter: &TagFilter) -> String {
        match filter {
            TagFilter::HasKey { key } => format!("[{}]", quote_if_necessary(key)),
            TagFilter::NotHasKey { key } => format!("[!{}]", quote_if_necessary(key)),
            TagFilter::HasTag { key, value } => {
                format!("[{} = {}]", quote_if_necessary(key), quote_if_necessary(value))
            }
            TagFilter::NotHasTag { key, value } => {
                format!("[{} != {}]", quote_if_necessary(key), quote_if_necessary(value))
            }
            TagFilter::HasTagValueLike { key, value } => format!(
                "[{} ~ {}]",
                quote_if_necessary(key),
                anchored(value.as_str())
            ),
            TagFilter::NotHasTagValueLike { key, value } => format!(
                "[{} !~ {}]",
                quote_if_necessary(key),
                anchored(value.as_str())
            ),
            TagFilter::HasKeyLike { key } => format!("[~{} ~ '.*']", anchored(key.as_str())),
            TagFilter::NotHasKeyLike { key } => format!("[!~{} ~ '.*']", anchored(key.as_str())),
            TagFilter::HasTagLike { key, value } => format!(
                "[~{} ~ {}]",
                anchored(key.as_str()),
                anchored(value.as_str())
            ),
            TagFilter::HasTagNumber { key, op, value } => format!(
                "[{}](if: number(t[{}]) {} {})",
                quote_if_necessary(key),
                quote(key),
                op.symbol(),
                format_number(*value)
            ),
            TagFilter::HasDateTag { key, op, date } => format!(
                "[{}](if: date(t[{}]) {} date('{}'))",
                quote_if_necessary(key),
                quote(key),
                op.symbol(),
                format_check_date(date.date_at(self.now))
            ),
            TagFilter::TagOlderThan { key, date } => {
                self.tag_age(key, "<", &format_check_date(date.date_at(self.now)))
            }
            TagFilter::TagNewerThan { key, date } => {
                self.tag_age(key, ">", &format_check_date(date.date_at(self.now)))
            }
            TagFilter::ElementOlderThan { date } => format!(
                "(if: date(timestamp()) < date('{}'))",
                format_check_date(date.date_at(self.now))
            ),
            TagFilter::ElementNewerThan { date } => format!(
                "(if: date(timestamp()) > date('{}'))",
                format_check_date(date.date_at(self.now))
            ),
        }
    }

    fn tag_age(&self, key: &str, operator: &str, date: &str) -> String {
        let mut dates = vec!["timestamp()".to_string()];
        dates.extend(
            last_check_date_keys(key)
                .iter()
                .map(|k| format!("t[{}]", quote(k))),
        );
        let evaluators: Vec<String> = dates
            .iter()
            .map(|d| format!("date({}) {} date('{}')", d, operator, date))
            .collect();
        format!(
            "[{}](if: {})",
            quote_if_necessary(key),
            evaluators.join(" || ")
        )
    }
}

fn set_name(element_type: &str, id: u32) -> String {
    let prefix = match element_type {
        "node" => "n",
        "way" => "w",
        "rel" => "r",
        _ => "e",
    };
    format!(".{}{}", prefix, id)
}

fn input_clause(element_type: &str, input: Option<u32>) -> String {
    input.map(|id| set_name(element_type, id)).unwrap_or_default()
}

fn output_clause(element_type: &str, output: Option<u32>) -> String {
    output
        .map(|id| format!(" -> {}", set_name(element_type, id)))
        .unwrap_or_default()
}

fn anchored(pattern: &str) -> String {
    quote_if_necessary(&format!("^({})$", pattern))
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "\\'"))
}

fn quote_if_necessary(s: &str) -> String {
    if super::is_identifier(s) {
        s.to_string()
    } else {
        quote(s)
    }
}
