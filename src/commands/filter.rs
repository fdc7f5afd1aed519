//! `accessquest filter` commands - inspect element filter expressions

use chrono::NaiveDate;

use crate::cli::OutputFormat;
use crate::commands::dispatch::CommandContext;
use accessquest_core::element::{Element, ElementType, Tags};
use accessquest_core::error::Result;
use accessquest_core::filter::ElementFilterExpression;
use accessquest_core::geo::LatLon;

/// Parse an expression and print its normalized text and Overpass QL
pub fn check(ctx: &CommandContext, expression: &str) -> Result<()> {
    let filter: ElementFilterExpression = expression.parse()?;
    let overpass = filter.to_overpass();

    match ctx.cli.format {
        OutputFormat::Json => {
            let kinds: Vec<&str> = filter.kinds().iter().map(ElementType::as_str).collect();
            let output = serde_json::json!({
                "filter": filter.to_string(),
                "kinds": kinds,
                "overpass": overpass,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Human => {
            println!("{}", filter);
            if !ctx.cli.quiet {
                println!();
                println!("{}", overpass);
            }
        }
    }
    Ok(())
}

/// Evaluate an expression against an element built from the arguments
pub fn matches(
    ctx: &CommandContext,
    expression: &str,
    tags: &[(String, String)],
    edited: Option<NaiveDate>,
    kind: ElementType,
) -> Result<()> {
    let filter: ElementFilterExpression = expression.parse()?;
    let element = build_element(tags, edited, kind);
    let matched = filter.matches(&element);

    match ctx.cli.format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "filter": filter.to_string(),
                "element": element,
                "matches": matched,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Human => {
            println!("{}", if matched { "match" } else { "no match" });
        }
    }
    Ok(())
}

fn build_element(tags: &[(String, String)], edited: Option<NaiveDate>, kind: ElementType) -> Element {
    let tags: Tags = tags.iter().cloned().collect();
    let element = match kind {
        ElementType::Node => Element::node(1, LatLon::new(0.0, 0.0), tags),
        ElementType::Way => Element::way(1, Vec::new(), tags),
        ElementType::Relation => Element::relation(1, Vec::new(), tags),
    };
    match edited.and_then(|date| date.and_hms_opt(0, 0, 0)) {
        Some(midnight) => element.with_timestamp(midnight.and_utc()),
        None => element,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_element() {
        let tags = vec![("highway".to_string(), "footway".to_string())];
        let edited = NaiveDate::from_ymd_opt(2020, 5, 1);
        let way = build_element(&tags, edited, ElementType::Way);
        assert_eq!(way.element_type(), ElementType::Way);
        assert_eq!(way.tag("highway"), Some("footway"));
        assert_eq!(
            way.timestamp.map(|t| t.date_naive()),
            NaiveDate::from_ymd_opt(2020, 5, 1)
        );

        let node = build_element(&[], None, ElementType::Node);
        assert!(node.timestamp.is_none());
    }
}
