//! Date format helpers.
//!
//! Field formats are usually written with single-letter tokens (`Y-m-d H:i:s`),
//! while `chrono` expects `strftime` specifiers (`%Y-%m-%d %H:%M:%S`).
//! [`to_strftime`] translates the former into the latter; a format that
//! already contains `%` is assumed to be `strftime` and returned unchanged.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

/// Translates a single-letter date format into a `strftime` format.
///
/// A backslash escapes the following character. Letters without a
/// counterpart are copied literally.
///
/// # Examples
///
/// ```
/// use formkit_core::utils::dates::to_strftime;
///
/// assert_eq!(to_strftime("Y-m-d"), "%Y-%m-%d");
/// assert_eq!(to_strftime("d/m/Y H:i"), "%d/%m/%Y %H:%M");
/// assert_eq!(to_strftime("%Y-%m-%d"), "%Y-%m-%d");
/// ```
pub fn to_strftime(format: &str) -> String {
    if format.contains('%') {
        return format.to_string();
    }

    let mut out = String::with_capacity(format.len() * 2);
    let mut chars = format.chars();
    while let Some(c) = chars.next() {
        let spec = match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
                continue;
            }
            'd' => "%d",
            'j' => "%-d",
            'D' => "%a",
            'l' => "%A",
            'N' => "%u",
            'z' => "%j",
            'm' => "%m",
            'n' => "%-m",
            'M' => "%b",
            'F' => "%B",
            'Y' => "%Y",
            'y' => "%y",
            'H' => "%H",
            'G' => "%-H",
            'h' => "%I",
            'g' => "%-I",
            'i' => "%M",
            's' => "%S",
            'u' => "%6f",
            'v' => "%3f",
            'A' => "%p",
            'a' => "%P",
            'O' => "%z",
            'P' => "%:z",
            'T' | 'e' => "%Z",
            'U' => "%s",
            'c' => "%Y-%m-%dT%H:%M:%S%:z",
            other => {
                out.push(other);
                continue;
            }
        };
        out.push_str(spec);
    }
    out
}

/// Returns `true` if a `strftime` format carries a time-of-day component.
pub fn has_time_component(strftime: &str) -> bool {
    ["%H", "%-H", "%I", "%-I", "%M", "%S", "%s", "%T", "%R"]
        .iter()
        .any(|spec| strftime.contains(spec))
}

/// Returns `true` if a `strftime` format carries a calendar date component.
pub fn has_date_component(strftime: &str) -> bool {
    [
        "%Y", "%y", "%C", "%G", "%g", "%m", "%-m", "%d", "%-d", "%e", "%j", "%b", "%B", "%h",
        "%a", "%A", "%u", "%w", "%U", "%W", "%V", "%D", "%F", "%x", "%c", "%s", "%+",
    ]
    .iter()
    .any(|spec| strftime.contains(spec))
}

/// Returns `true` if a `strftime` format carries a UTC offset.
pub fn has_offset_component(strftime: &str) -> bool {
    ["%z", "%:z", "%#z"].iter().any(|spec| strftime.contains(spec))
}

/// Parses a date or date-time string in one of the common ISO-like layouts.
///
/// Accepted: RFC 3339, `YYYY-MM-DD HH:MM[:SS]`, `YYYY-MM-DDTHH:MM[:SS]` and a
/// bare `YYYY-MM-DD` (midnight). Offsets are discarded; the local wall-clock
/// time is returned.
///
/// # Examples
///
/// ```
/// use formkit_core::utils::dates::parse_lenient;
///
/// assert!(parse_lenient("2024-02-29").is_some());
/// assert!(parse_lenient("2024-02-30").is_none());
/// assert!(parse_lenient("2024-01-01T10:30:00+02:00").is_some());
/// ```
pub fn parse_lenient(s: &str) -> Option<NaiveDateTime> {
    const LAYOUTS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(s, layout).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}
