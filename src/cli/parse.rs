//! Value parsers for command-line arguments

use accessquest_core::element::ElementType;
use accessquest_core::format::OutputFormat;
use accessquest_core::geo::BoundingBox;
use accessquest_core::quest::QuestStatus;
use chrono::NaiveDate;

pub fn parse_format(s: &str) -> Result<OutputFormat, String> {
    s.parse::<OutputFormat>().map_err(|e| e.to_string())
}

/// Parse a `key=value` tag
pub fn parse_tag(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("invalid tag '{}' (expected key=value)", s)),
    }
}

/// Parse `min_lat,min_lon,max_lat,max_lon`
pub fn parse_bbox(s: &str) -> Result<BoundingBox, String> {
    s.parse::<BoundingBox>().map_err(|e| e.to_string())
}

pub fn parse_element_type(s: &str) -> Result<ElementType, String> {
    s.parse::<ElementType>().map_err(|e| e.to_string())
}

pub fn parse_status(s: &str) -> Result<QuestStatus, String> {
    s.parse::<QuestStatus>().map_err(|e| e.to_string())
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{}' (expected YYYY-MM-DD)", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tag() {
        assert_eq!(
            parse_tag("highway=footway").unwrap(),
            ("highway".to_string(), "footway".to_string())
        );
        assert_eq!(
            parse_tag("note=a=b").unwrap(),
            ("note".to_string(), "a=b".to_string())
        );
        assert!(parse_tag("highway").is_err());
        assert!(parse_tag("=footway").is_err());
    }

    #[test]
    fn test_parse_bbox() {
        let bbox = parse_bbox("47.37,8.54,47.38,8.55").unwrap();
        assert_eq!(bbox.min_lat, 47.37);
        assert_eq!(bbox.max_lon, 8.55);
        assert!(parse_bbox("47.38,8.54,47.37,8.55").is_err());
    }

    #[test]
    fn test_parse_date() {
        assert!(parse_date("2020-02-29").is_ok());
        assert!(parse_date("2020-13-01").is_err());
        assert!(parse_date("today").is_err());
    }
}
