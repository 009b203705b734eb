//! Best-effort date parsing for feed and scraped date fields.
//!
//! Feeds mostly carry RFC 2822 or RFC 3339 timestamps, while HTML detail pages
//! show whatever the site's template prints ("입력 2024.01.02. 오후 3:45",
//! "2024년 1월 2일", "Jan 2, 2024"). Anything that cannot be read becomes
//! `None` so the article simply sorts as oldest.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// Offset used for timestamps that carry no zone of their own (KST).
pub const DEFAULT_OFFSET_HOURS: i32 = 9;

/// Numeric dates, optionally followed by a (possibly 12-hour) time and a
/// trailing UTC offset.
static NUMERIC_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        (\d{4})\s*[./\-년]\s*(\d{1,2})\s*[./\-월]\s*(\d{1,2})\s*일?\.?
        (?:
            [T\s]*(?:\([^)]*\))?
            \s*(오전|오후|AM|PM|am|pm)?
            \s*(\d{1,2}):(\d{2})(?::(\d{2}))?(?:[.,]\d+)?
            \s?(Z|[+-]\d{2}(?::?\d{2})?)?
        )?",
    )
    .expect("date pattern is valid")
});

/// Formats carrying their own offset. `%#z` takes `+09`, `+0900` and `+09:00`.
const OFFSET_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M:%S%.f %#z",
];

/// Zone abbreviations that RFC 2822 parsing does not know about.
const NAMED_ZONES: &[(&str, &str)] = &[
    ("KST", "+0900"),
    ("JST", "+0900"),
    ("HKT", "+0800"),
    ("SGT", "+0800"),
    ("CET", "+0100"),
    ("CEST", "+0200"),
    ("UTC", "+0000"),
];

/// Naive formats tried against the whole string, interpreted in local time.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%B %d, %Y %H:%M",
    "%b %d, %Y %H:%M",
];

const NAIVE_DATE_FORMATS: &[&str] = &["%B %d, %Y", "%b %d, %Y", "%d %B %Y", "%d %b %Y"];

/// Parses date strings into UTC timestamps, never failing loudly.
#[derive(Debug, Clone, Copy)]
pub struct DateNormalizer {
    offset: FixedOffset,
}

impl Default for DateNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_OFFSET_HOURS)
    }
}

impl DateNormalizer {
    /// Out-of-range offsets fall back to UTC.
    pub fn new(offset_hours: i32) -> Self {
        let offset = offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix());
        Self { offset }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn normalize(&self, raw: Option<&str>) -> Option<DateTime<Utc>> {
        let raw = raw?.trim();
        if raw.is_empty() {
            return None;
        }

        if let Some(dt) = self.parse_exact(raw) {
            return Some(dt);
        }

        let zoned = replace_named_zone(raw);
        let raw = zoned.as_deref().unwrap_or(raw);
        self.parse_exact(raw).or_else(|| self.parse_numeric(raw))
    }

    fn parse_exact(&self, raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        for format in OFFSET_DATETIME_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(raw, format) {
                return Some(dt.with_timezone(&Utc));
            }
        }

        for format in NAIVE_DATETIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
                return self.localize(naive);
            }
        }
        for format in NAIVE_DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
                return self.localize(date.and_time(NaiveTime::MIN));
            }
        }

        None
    }

    /// Finds the first numeric date anywhere in the string, so leading labels
    /// like "입력" or "등록일 :" do not matter.
    fn parse_numeric(&self, raw: &str) -> Option<DateTime<Utc>> {
        let caps = NUMERIC_DATE.captures(raw)?;

        let year = caps.get(1)?.as_str().parse::<i32>().ok()?;
        let month = caps.get(2)?.as_str().parse::<u32>().ok()?;
        let day = caps.get(3)?.as_str().parse::<u32>().ok()?;
        let date = NaiveDate::from_ymd_opt(year, month, day)?;

        let offset = match caps.get(8) {
            Some(zone) => parse_offset(zone.as_str())?,
            None => self.offset,
        };
        let time = match caps.get(5) {
            Some(hour) => {
                let hour = hour.as_str().parse::<u32>().ok()?;
                let minute = caps.get(6)?.as_str().parse::<u32>().ok()?;
                let second = match caps.get(7) {
                    Some(s) => s.as_str().parse::<u32>().ok()?,
                    None => 0,
                };
                let hour = match caps.get(4).map(|m| m.as_str()) {
                    Some("오전") | Some("AM") | Some("am") => to_24h(hour, false)?,
                    Some("오후") | Some("PM") | Some("pm") => to_24h(hour, true)?,
                    _ => hour,
                };
                NaiveTime::from_hms_opt(hour, minute, second)?
            }
            None => NaiveTime::MIN,
        };

        localize(offset, date.and_time(time))
    }

    fn localize(&self, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        localize(self.offset, naive)
    }
}

fn localize(offset: FixedOffset, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// `Z`, `+09`, `+0900` or `+09:00`.
fn parse_offset(zone: &str) -> Option<FixedOffset> {
    if zone == "Z" {
        return Some(Utc.fix());
    }
    let sign = if zone.starts_with('-') { -1 } else { 1 };
    let digits: String = zone.chars().filter(|c| c.is_ascii_digit()).collect();
    let hours: i32 = digits.get(0..2)?.parse().ok()?;
    let minutes: i32 = match digits.get(2..4) {
        Some(m) => m.parse().ok()?,
        None => 0,
    };
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Rewrites a trailing zone abbreviation ("... 12:00:00 KST") as a numeric offset.
fn replace_named_zone(raw: &str) -> Option<String> {
    let (head, zone) = raw.rsplit_once(' ')?;
    NAMED_ZONES
        .iter()
        .find(|(name, _)| zone.eq_ignore_ascii_case(name))
        .map(|(_, offset)| format!("{} {}", head.trim_end(), offset))
}

fn to_24h(hour: u32, pm: bool) -> Option<u32> {
    if hour == 0 || hour > 12 {
        return None;
    }
    Some(match (hour, pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, false) => h,
        (h, true) => h + 12,
    })
}
