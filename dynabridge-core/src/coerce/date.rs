//! # Date Coercion
//!
//! Date patterns are written with the familiar letter notation (`yyyy-MM-dd`,
//! `MM-dd-yyyy HH:mm:ss`, `yyyy-MM-dd'T'HH:mm:ssXXX`) and translated into `chrono`
//! format strings at parse time.
//!
//! Patterns without a zone parse as UTC, patterns without a time parse as midnight.
use crate::value::Value;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};

#[derive(Debug, thiserror::Error)]
pub enum DateError {
    #[error("Failed to parse '{input}' with pattern '{pattern}'")]
    Parse { input: String, pattern: String },
    #[error("{0}")]
    Unsupported(String),
}

/// Converts a generic value into an instant.
///
/// * Timestamps are returned as is.
/// * Integers are epoch milliseconds.
/// * Anything else is parsed from its textual form with `pattern`.
pub fn to_datetime(value: &Value, pattern: &str) -> Result<DateTime<FixedOffset>, DateError> {
    match value {
        Value::Timestamp(ts) => Ok(*ts),
        Value::Int(millis) => DateTime::from_timestamp_millis(*millis)
            .map(|ts| ts.fixed_offset())
            .ok_or_else(|| DateError::Unsupported(format!("{millis} ms is out of range"))),
        other => match other.to_text() {
            Some(text) => parse(&text, pattern),
            None => Err(DateError::Unsupported(format!(
                "cannot read a date from a {} value",
                other.kind_name()
            ))),
        },
    }
}

/// Parses `input` with a letter-notation `pattern`.
pub fn parse(input: &str, pattern: &str) -> Result<DateTime<FixedOffset>, DateError> {
    let format = to_strftime(pattern);
    let input = input.trim();

    if let Ok(ts) = DateTime::parse_from_str(input, &format) {
        return Ok(ts);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(input, &format) {
        return Ok(naive.and_utc().fixed_offset());
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, &format)
        && let Some(naive) = date.and_hms_opt(0, 0, 0)
    {
        return Ok(naive.and_utc().fixed_offset());
    }

    Err(DateError::Parse {
        input: input.to_string(),
        pattern: pattern.to_string(),
    })
}

/// Translates a letter-notation date pattern into a `chrono` format string.
pub fn to_strftime(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\'' {
            i += 1;
            // '' is an escaped quote, anything else runs until the closing quote
            if chars.get(i) == Some(&'\'') {
                out.push('\'');
                i += 1;
                continue;
            }
            while i < chars.len() {
                if chars[i] == '\'' {
                    if chars.get(i + 1) == Some(&'\'') {
                        out.push('\'');
                        i += 2;
                        continue;
                    }
                    break;
                }
                push_literal(&mut out, chars[i]);
                i += 1;
            }
            i += 1;
            continue;
        }

        if !c.is_ascii_alphabetic() {
            push_literal(&mut out, c);
            i += 1;
            continue;
        }

        let run = chars[i..].iter().take_while(|&&n| n == c).count();
        match directive(c, run) {
            Some(strftime) => out.push_str(strftime),
            None => (0..run).for_each(|_| push_literal(&mut out, c)),
        }
        i += run;
    }

    out
}

fn directive(letter: char, run: usize) -> Option<&'static str> {
    let strftime = match (letter, run) {
        ('y', 2) => "%y",
        ('y', _) => "%Y",
        ('M', 1 | 2) => "%m",
        ('M', 3) => "%b",
        ('M', _) => "%B",
        ('d', _) => "%d",
        ('D', _) => "%j",
        ('H' | 'k', _) => "%H",
        ('h' | 'K', _) => "%I",
        ('m', _) => "%M",
        ('s', _) => "%S",
        ('S', 3) => "%3f",
        ('S', 6) => "%6f",
        ('S', 9) => "%9f",
        ('S', _) => "%f",
        ('a', _) => "%p",
        ('E', 1..=3) => "%a",
        ('E', _) => "%A",
        ('Z', _) => "%z",
        ('X' | 'x', 1 | 2) => "%z",
        ('X' | 'x', _) => "%:z",
        ('z', _) => "%Z",
        _ => return None,
    };
    Some(strftime)
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_pattern_translation() {
        assert_eq!(to_strftime("yyyy-MM-dd"), "%Y-%m-%d");
        assert_eq!(to_strftime("MM-dd-yyyy"), "%m-%d-%Y");
        assert_eq!(
            to_strftime("yyyy-MM-dd'T'HH:mm:ss.SSSXXX"),
            "%Y-%m-%dT%H:%M:%S.%3f%:z"
        );
        assert_eq!(to_strftime("dd MMM yy 'at' h a"), "%d %b %y at %I %p");
        assert_eq!(to_strftime("'o''clock' 100%"), "o'clock 100%%");
    }

    #[test]
    fn test_parse_month_first_date() {
        let ts = parse("07-04-2024", "MM-dd-yyyy").unwrap();

        assert_eq!((ts.year(), ts.month(), ts.day()), (2024, 7, 4));
        assert_eq!((ts.hour(), ts.minute()), (0, 0));
        assert_eq!(ts.offset().local_minus_utc(), 0);
    }

    #[test]
    fn test_parse_rejects_other_layouts() {
        let err = parse("2024/07/04", "MM-dd-yyyy").unwrap_err();
        assert!(matches!(err, DateError::Parse { .. }));
    }

    #[test]
    fn test_parse_with_offset() {
        let ts = parse("2024-07-04 10:30:00 +0200", "yyyy-MM-dd HH:mm:ss Z").unwrap();

        assert_eq!(ts.hour(), 10);
        assert_eq!(ts.offset().local_minus_utc(), 2 * 3600);
    }

    #[test]
    fn test_integers_are_epoch_millis() {
        let ts = to_datetime(&Value::Int(1_720_051_200_000), "yyyy-MM-dd").unwrap();

        assert_eq!((ts.year(), ts.month(), ts.day()), (2024, 7, 4));
    }

    #[test]
    fn test_timestamps_pass_through() {
        let original = DateTime::parse_from_rfc3339("2020-01-01T00:00:00-05:00").unwrap();
        let ts = to_datetime(&Value::Timestamp(original), "ignored").unwrap();

        assert_eq!(ts, original);
    }
}
