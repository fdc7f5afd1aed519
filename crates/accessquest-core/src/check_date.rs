//! Check-date tag conventions
//!
//! Mappers record when a tag was last verified with companion tags such as
//! `check_date:surface=2021-05-01`. Dates are `YYYY-MM-DD` or `YYYY-MM` (day 1).

use chrono::NaiveDate;

/// Prefix used when recording a fresh survey of a tag
pub const SURVEY_MARK_KEY: &str = "check_date";

/// All companion keys that record the last check of `key`
pub fn last_check_date_keys(key: &str) -> [String; 6] {
    [
        format!("{key}:check_date"),
        format!("check_date:{key}"),
        format!("{key}:lastcheck"),
        format!("lastcheck:{key}"),
        format!("{key}:last_checked"),
        format!("last_checked:{key}"),
    ]
}

/// Parse a check date value; invalid calendar dates yield `None`
pub fn parse_check_date(value: &str) -> Option<NaiveDate> {
    let mut parts = value.split('-');
    let year: i32 = digits(parts.next()?, 4)?.parse().ok()?;
    let month: u32 = digits(parts.next()?, 2)?.parse().ok()?;
    let day: u32 = match parts.next() {
        Some(d) => digits(d, 2)?.parse().ok()?,
        None => 1,
    };
    if parts.next().is_some() {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

fn digits(part: &str, width: usize) -> Option<&str> {
    (part.len() == width && part.bytes().all(|b| b.is_ascii_digit())).then_some(part)
}

pub fn format_check_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
