use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use super::*;
use crate::element::{Element, Tags};
use crate::geo::LatLon;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 3, 15, 12, 0, 0).unwrap()
}

fn tags(pairs: &[(&str, &str)]) -> Tags {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn node(pairs: &[(&str, &str)]) -> Element {
    Element::node(1, LatLon::new(0.0, 0.0), tags(pairs))
}

fn way(pairs: &[(&str, &str)]) -> Element {
    Element::way(1, vec![1, 2], tags(pairs))
}

fn parse(s: &str) -> ElementFilterExpression {
    s.parse().unwrap_or_else(|e| panic!("failed to parse {:?}: {}", s, e))
}

fn matches(filter: &str, element: &Element) -> bool {
    parse(filter).matches_at(element, now())
}

fn parse_error_position(s: &str) -> usize {
    match s.parse::<ElementFilterExpression>() {
        Err(QuestError::FilterParse { position, .. }) => position,
        other => panic!("expected parse error for {:?}, got {:?}", s, other),
    }
}

// ============================================================================
// Element kinds
// ============================================================================

#[test]
fn test_element_kinds() {
    let expr = parse("nodes, ways");
    assert!(expr.includes_element_type(ElementType::Node));
    assert!(expr.includes_element_type(ElementType::Way));
    assert!(!expr.includes_element_type(ElementType::Relation));
    assert!(expr.root().is_none());
    assert!(matches("nodes", &node(&[])));
    assert!(!matches("nodes", &way(&[])));
}

#[test]
fn test_missing_kinds_default_to_all() {
    let expr = parse("highway = footway");
    assert_eq!(expr.kinds(), &ElementType::ALL);
    assert!(matches("highway = footway", &way(&[("highway", "footway")])));
    assert!(matches("with highway", &node(&[("highway", "crossing")])));
}

#[test]
fn test_duplicate_kind_is_error() {
    assert!("nodes, nodes".parse::<ElementFilterExpression>().is_err());
    assert!("nodes, areas".parse::<ElementFilterExpression>().is_err());
}

// ============================================================================
// Tag predicates
// ============================================================================

#[test]
fn test_has_key_and_not_has_key() {
    assert!(matches("nodes with name", &node(&[("name", "x")])));
    assert!(!matches("nodes with name", &node(&[])));
    assert!(matches("nodes with !name", &node(&[])));
    assert!(!matches("nodes with !name", &node(&[("name", "x")])));
}

#[test]
fn test_has_tag_and_not_has_tag() {
    let el = node(&[("highway", "residential")]);
    assert!(matches("nodes with highway = residential", &el));
    assert!(matches("nodes with highway=residential", &el));
    assert!(!matches("nodes with highway = residental", &el));
    assert!(matches("nodes with highway != primary", &el));
    assert!(matches("nodes with highway != primary", &node(&[])));
    assert!(!matches("nodes with highway != residential", &el));
}

#[test]
fn test_regex_is_anchored() {
    let el = node(&[("highway", "residential")]);
    assert!(matches("nodes with highway ~ residential|primary", &el));
    assert!(!matches("nodes with highway ~ resident", &el));
    assert!(matches("nodes with highway !~ resident", &el));
    assert!(matches("nodes with highway !~ primary", &node(&[])));
    assert!(!matches("nodes with highway !~ res.*", &el));
}

#[test]
fn test_key_like_predicates() {
    let el = node(&[("name:de", "Haus")]);
    assert!(matches("nodes with ~name:.*", &el));
    assert!(!matches("nodes with !~name:.*", &el));
    assert!(matches("nodes with ~'name:.*' ~ H.*", &el));
    assert!(!matches("nodes with ~'name:.*' ~ X.*", &el));
}

#[test]
fn test_numeric_comparison() {
    assert!(matches("nodes with width > 3", &node(&[("width", "3.5")])));
    assert!(!matches("nodes with width > 3", &node(&[("width", "3")])));
    assert!(matches("nodes with width >= 3", &node(&[("width", "3")])));
    assert!(matches("nodes with width < 3", &node(&[("width", "2.9")])));
    assert!(matches("nodes with width <= 3", &node(&[("width", "3.0")])));
    assert!(!matches("nodes with width > 3", &node(&[("width", "wide")])));
    assert!(!matches("nodes with width > 3", &node(&[])));
}

#[test]
fn test_date_tag_comparison() {
    let el = node(&[("check_date", "2000-11-11")]);
    assert!(matches("nodes with check_date <= 2000-11-11", &el));
    assert!(matches("nodes with check_date < 2000-12", &el));
    assert!(!matches("nodes with check_date > 2000-11-11", &el));
    assert!(matches("nodes with check_date < today", &el));
    assert!(!matches("nodes with check_date < today", &node(&[("check_date", "soon")])));
}

// ============================================================================
// Age predicates
// ============================================================================

#[test]
fn test_element_older_than_boundary() {
    let filter = "older today -10 days";
    let edited = |days: i64| node(&[]).with_timestamp(now() - Duration::days(days));
    assert!(matches(filter, &edited(11)));
    assert!(!matches(filter, &edited(9)));
    assert!(!matches(filter, &edited(10)));
    assert!(!matches(filter, &node(&[])));
}

#[test]
fn test_element_newer_than() {
    let el = node(&[]).with_timestamp(now() - Duration::days(1));
    assert!(matches("newer today -1 weeks", &el));
    assert!(!matches("newer 2022-01-01", &el));
}

#[test]
fn test_tag_newer_than_uses_companion_keys() {
    let filter = "nodes with opening_hours newer today -100 days";
    let old = now() - Duration::days(101);
    let new_date = (now() - Duration::days(99)).date_naive().format("%Y-%m-%d").to_string();

    let plain = node(&[("opening_hours", "24/7")]).with_timestamp(old);
    assert!(!matches(filter, &plain));

    for companion in [
        "opening_hours:check_date",
        "check_date:opening_hours",
        "opening_hours:lastcheck",
        "lastcheck:opening_hours",
        "opening_hours:last_checked",
        "last_checked:opening_hours",
    ] {
        let el = node(&[("opening_hours", "24/7"), (companion, new_date.as_str())]).with_timestamp(old);
        assert!(matches(filter, &el), "companion {} not considered", companion);
    }

    let recently_edited = node(&[("opening_hours", "24/7")]).with_timestamp(now());
    assert!(matches(filter, &recently_edited));
}

#[test]
fn test_tag_older_than_requires_key_and_most_recent_check() {
    let filter = "nodes with incline older today -8 years";
    let old = now() - Duration::days(9 * 365);
    assert!(matches(filter, &node(&[("incline", "up")]).with_timestamp(old)));
    assert!(!matches(filter, &node(&[]).with_timestamp(old)));
    let rechecked = node(&[("incline", "up"), ("check_date:incline", "2020-01-01")]).with_timestamp(old);
    assert!(!matches(filter, &rechecked));
}

// ============================================================================
// Boolean structure
// ============================================================================

#[test]
fn test_and_binds_tighter_than_or() {
    let filter = "nodes with a or b and c";
    assert!(matches(filter, &node(&[("a", "1")])));
    assert!(!matches(filter, &node(&[("b", "1")])));
    assert!(matches(filter, &node(&[("b", "1"), ("c", "1")])));
}

#[test]
fn test_brackets() {
    let filter = "nodes with (a or b) and c";
    assert!(!matches(filter, &node(&[("a", "1")])));
    assert!(matches(filter, &node(&[("a", "1"), ("c", "1")])));
    assert!(matches("nodes with((a))", &node(&[("a", "1")])));
}

#[test]
fn test_negated_group() {
    let filter = "nodes with !(a = 1 or b)";
    assert!(matches(filter, &node(&[("a", "2")])));
    assert!(!matches(filter, &node(&[("b", "x")])));
}

#[test]
fn test_nested_same_operator_is_flattened() {
    let expr = parse("nodes with (a and b) and c");
    match expr.root() {
        Some(Expression::And(children)) => assert_eq!(children.len(), 3),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_quoted_keys_and_reserved_words() {
    let el = node(&[("with", "x"), ("addr:street", "Main St")]);
    assert!(matches("nodes with 'with'", &el));
    assert!(matches("nodes with \"addr:street\" = 'Main St'", &el));
    assert!("nodes with with".parse::<ElementFilterExpression>().is_err());
    assert!("nodes with AND".parse::<ElementFilterExpression>().is_err());
}

#[test]
fn test_whitespace_insensitive() {
    let el = node(&[("a", "1"), ("b", "2")]);
    assert!(matches("nodes\twith\na = 1   and\r\nb=2", &el));
}

// ============================================================================
// Parse errors
// ============================================================================

#[test]
fn test_parse_error_positions() {
    assert_eq!(parse_error_position("nodes with a ="), 14);
    assert_eq!(parse_error_position("nodes with a = 'x"), 15);
    assert_eq!(parse_error_position("nodes with a='x'and b"), 16);
    assert_eq!(parse_error_position("nodes with a older yesterday"), 19);
    assert_eq!(parse_error_position("nodes with (a"), 11);
    assert_eq!(parse_error_position("nodes with a)"), 12);
    assert_eq!(parse_error_position("nodes foo"), 6);
}

#[test]
fn test_parse_errors() {
    for bad in [
        "",
        "nodes with",
        "nodes with a and",
        "nodes with a or or b",
        "nodes with ~a = b",
        "nodes with a > today -3 lightyears",
        "nodes with a ~ (",
        "nodes with !",
    ] {
        assert!(
            bad.parse::<ElementFilterExpression>().is_err(),
            "{:?} should not parse",
            bad
        );
    }
}

#[test]
fn test_relative_date_out_of_range_is_parse_error() {
    assert_eq!(parse_error_position("nodes with older today -1000000 years"), 24);
    assert_eq!(parse_error_position("nodes with a < today + 99999999 days"), 23);
    assert!("nodes with older today -9000 years"
        .parse::<ElementFilterExpression>()
        .is_ok());
}

#[test]
fn test_out_of_range_relative_date_matches_without_panic() {
    let expr = ElementFilterExpression::new(
        vec![ElementType::Node],
        Some(Expression::Leaf(TagFilter::ElementOlderThan {
            date: DateFilter::relative(-1_000_000.0, DateUnit::Years),
        })),
    );
    let el = node(&[]).with_timestamp(now() - Duration::days(1));
    assert!(!expr.matches_at(&el, now()));
}

// ============================================================================
// Serialization
// ============================================================================

#[test]
fn test_display_quotes_non_identifiers() {
    let expr = parse("ways with highway=footway and access!~private|no and 'sidewalk:left' older today -8 years");
    assert_eq!(
        expr.to_string(),
        "ways with highway = footway and access !~ 'private|no' and 'sidewalk:left' older today -8 years"
    );
}

#[test]
fn test_display_round_trip() {
    let samples = [
        "nodes, ways with amenity = toilets and access !~ private|customers and (!wheelchair or wheelchair != yes and wheelchair older today -4 years or wheelchair older today -8 years)",
        "ways with (highway = footway or (highway ~ path|cycleway|bridleway and foot != no)) and !level and (!conveying or conveying = no)",
        "relations with ~'name:.*' ~ 'A.*' or !~'ref:.*' or width >= 2.5 or check_date < 2020-01",
        "nodes with !(a or b) and older today -3 months",
    ];
    let elements = [
        node(&[("amenity", "toilets"), ("wheelchair", "no")]).with_timestamp(now() - Duration::days(2000)),
        way(&[("highway", "path"), ("foot", "yes")]),
        way(&[("highway", "footway"), ("level", "1")]),
        Element::relation(1, vec![], tags(&[("name:en", "Ax")])),
        Element::relation(2, vec![], tags(&[("width", "3"), ("ref:x", "1")])),
        node(&[]).with_timestamp(now() - Duration::days(200)),
    ];
    for sample in samples {
        let expr = parse(sample);
        let reparsed = parse(&expr.to_string());
        assert_eq!(expr, reparsed, "round trip changed {:?}", sample);
        for el in &elements {
            assert_eq!(expr.matches_at(el, now()), reparsed.matches_at(el, now()));
        }
    }
}

// ============================================================================
// Overpass
// ============================================================================

#[test]
fn test_overpass_single_type() {
    let expr = parse("ways with highway ~ residential|unclassified and check_date <= 2000-11-11");
    assert_eq!(
        expr.to_overpass_at(now()),
        "way[highway ~ '^(residential|unclassified)$'][check_date](if: date(t['check_date']) <= date('2000-11-11'));\n"
    );
}

#[test]
fn test_overpass_numbers_and_quoting() {
    let expr = parse("nodes with 'high:way' = residential and width > 3");
    assert_eq!(
        expr.to_overpass_at(now()),
        "node['high:way' = residential][width](if: number(t['width']) > 3);\n"
    );
}

#[test]
fn test_overpass_tag_age() {
    let expr = parse("nodes with opening_hours newer 2021-01-01");
    let oql = expr.to_overpass_at(now());
    assert!(oql.starts_with("node[opening_hours](if: date(timestamp()) > date('2021-01-01') || "));
    assert!(oql.contains("date(t['last_checked:opening_hours']) > date('2021-01-01'))"));
}

#[test]
fn test_overpass_any_of_uses_sets() {
    let expr = parse("nodes with a or b");
    assert_eq!(
        expr.to_overpass_at(now()),
        "node[a] -> .n1;\nnode[b] -> .n2;\n(.n1; .n2;);\n"
    );
}

#[test]
fn test_overpass_all_kinds() {
    assert_eq!(parse("nodes, ways, relations").to_overpass_at(now()), "nwr;\n");
    assert_eq!(
        parse("nodes, relations with a").to_overpass_at(now()),
        "node[a] -> .n1;\nrel[a] -> .r1;\n(.n1; .r1;);\n"
    );
}

#[test]
fn test_relative_date_resolution() {
    let expr = parse("nodes with check_date < today -1 years");
    let el = node(&[("check_date", "2020-03-14")]);
    assert!(expr.matches_at(&el, now()));
    assert_eq!(
        DateFilter::relative(-1.0, DateUnit::Years).date_at(now()),
        NaiveDate::from_ymd_opt(2020, 3, 15).unwrap()
    );
}
