//! Message date resolution: Gmail `internalDate` first, `Date` header second.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use tracing::debug;

/// Best-available date for a message.
///
/// A numeric `internalDate` (epoch milliseconds) wins; otherwise the `Date`
/// header is parsed. Anything unparseable leaves the date unset.
pub fn resolve_date(internal_date: Option<&str>, date_header: Option<&str>) -> Option<DateTime<Utc>> {
    internal_date
        .and_then(parse_internal_date)
        .or_else(|| date_header.and_then(parse_date))
}

/// Parse Gmail's `internalDate` (decimal epoch milliseconds).
pub fn parse_internal_date(raw: &str) -> Option<DateTime<Utc>> {
    let ms: i64 = raw.trim().parse().ok()?;
    DateTime::from_timestamp_millis(ms)
}

/// Parse an email `Date` header in the common formats.
///
/// Supports RFC 2822 (with or without a trailing `(UTC)` comment), ISO 8601
/// and a few broken real-world variants.
pub fn parse_date(date_str: &str) -> Option<DateTime<Utc>> {
    let trimmed = strip_trailing_comment(date_str.trim());
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    let no_dow = strip_day_of_week(trimmed);
    let formats = [
        "%d %b %Y %H:%M:%S %z",
        "%d %b %Y %H:%M:%S",
        "%d %b %Y %H:%M %z",
        "%Y-%m-%d %H:%M:%S %z",
        "%Y-%m-%d %H:%M:%S",
    ];

    for candidate in [no_dow.clone(), replace_named_tz(&no_dow)] {
        for fmt in &formats {
            if let Ok(dt) = DateTime::parse_from_str(&candidate, fmt) {
                return Some(dt.with_timezone(&Utc));
            }
            if let Ok(ndt) = NaiveDateTime::parse_from_str(&candidate, fmt) {
                return Some(Utc.from_utc_datetime(&ndt));
            }
        }
    }

    if let Some(dt) = mail_parser_date(trimmed) {
        return Some(dt);
    }

    debug!(date = trimmed, "Could not parse date");
    None
}

/// Attempt to parse a date using `mail-parser`'s built-in parser.
fn mail_parser_date(input: &str) -> Option<DateTime<Utc>> {
    use mail_parser::MessageParser;

    let fake_msg = format!("Date: {input}\n\n");
    let parsed = MessageParser::default().parse(fake_msg.as_bytes())?;
    let dt = parsed.date()?.to_rfc3339();
    DateTime::parse_from_rfc3339(&dt)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Drop a trailing `(comment)` such as `(UTC)` or `(Pacific Standard Time)`.
fn strip_trailing_comment(s: &str) -> &str {
    if s.ends_with(')') {
        if let Some(open) = s.rfind('(') {
            return s[..open].trim_end();
        }
    }
    s
}

/// Strip leading day-of-week prefix (e.g. "Thu, " or "Thu ").
fn strip_day_of_week(s: &str) -> String {
    let days = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
    for day in &days {
        if let Some(rest) = s.strip_prefix(day) {
            let rest = rest.strip_prefix(',').unwrap_or(rest);
            return rest.trim().to_string();
        }
    }
    s.to_string()
}

/// Replace well-known timezone abbreviations with numeric offsets.
fn replace_named_tz(s: &str) -> String {
    let tzs = [
        ("EST", "-0500"),
        ("EDT", "-0400"),
        ("CST", "-0600"),
        ("CDT", "-0500"),
        ("MST", "-0700"),
        ("MDT", "-0600"),
        ("PST", "-0800"),
        ("PDT", "-0700"),
        ("GMT", "+0000"),
        ("UTC", "+0000"),
        ("CEST", "+0200"),
        ("CET", "+0100"),
    ];
    let mut result = s.to_string();
    for (name, offset) in &tzs {
        if result.ends_with(name) {
            let pos = result.len() - name.len();
            result.replace_range(pos.., offset);
            return result;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_date_wins() {
        let dt = resolve_date(Some("1704412800000"), Some("Mon, 01 Jan 2024 00:00:00 +0000"));
        assert_eq!(dt.unwrap().to_rfc3339(), "2024-01-05T00:00:00+00:00");
    }

    #[test]
    fn test_falls_back_to_header() {
        let dt = resolve_date(Some("not-a-number"), Some("Thu, 04 Jan 2024 10:00:00 +0000"));
        assert_eq!(dt.unwrap().format("%Y-%m-%d %H:%M").to_string(), "2024-01-04 10:00");
    }

    #[test]
    fn test_nothing_usable_is_unset() {
        assert_eq!(resolve_date(None, None), None);
        assert_eq!(resolve_date(None, Some("someday soon")), None);
        assert_eq!(resolve_date(Some(""), Some("")), None);
    }

    #[test]
    fn test_parse_date_with_comment() {
        let dt = parse_date("Thu, 4 Jan 2024 10:00:00 +0000 (UTC)");
        assert_eq!(dt.unwrap().format("%Y-%m-%d").to_string(), "2024-01-04");
    }

    #[test]
    fn test_parse_date_named_tz() {
        let dt = parse_date("Thu, 04 Jan 2024 10:00:00 EST").unwrap();
        assert_eq!(dt.format("%H").to_string(), "15");
    }

    #[test]
    fn test_parse_date_iso8601() {
        assert!(parse_date("2024-01-04T10:00:00Z").is_some());
    }

    #[test]
    fn test_strip_day_of_week() {
        assert_eq!(strip_day_of_week("Thu, 04 Jan 2024"), "04 Jan 2024");
        assert_eq!(strip_day_of_week("04 Jan 2024"), "04 Jan 2024");
    }
}
