use chrono::{DateTime, FixedOffset, Local, SecondsFormat, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Target zone for the timestamp column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum LogTimeZone {
    Utc,
    Local,
    Fixed(FixedOffset),
    /// IANA zone such as `Europe/Paris`, offset picked per instant.
    Named(Tz),
}

impl LogTimeZone {
    /// Formats `dt` in this zone with all nine fractional digits kept.
    ///
    /// `%.f`-style formatting drops trailing zeroes, which would make the
    /// timestamp column jitter between lines.
    pub fn format(&self, dt: &DateTime<FixedOffset>) -> String {
        match self {
            LogTimeZone::Utc => dt
                .with_timezone(&Utc)
                .to_rfc3339_opts(SecondsFormat::Nanos, true),
            LogTimeZone::Local => dt
                .with_timezone(&Local)
                .to_rfc3339_opts(SecondsFormat::Nanos, true),
            LogTimeZone::Fixed(offset) => dt
                .with_timezone(offset)
                .to_rfc3339_opts(SecondsFormat::Nanos, true),
            LogTimeZone::Named(tz) => dt
                .with_timezone(tz)
                .to_rfc3339_opts(SecondsFormat::Nanos, true),
        }
    }
}

impl FromStr for LogTimeZone {
    type Err = String;

    /// Accepts `UTC`, `Z`, `Local` (case-insensitive), a `±HH[:MM]` offset or
    /// an IANA zone name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "utc" | "z" => return Ok(LogTimeZone::Utc),
            "local" => return Ok(LogTimeZone::Local),
            _ => {}
        }
        if let Some(offset) = parse_offset(s) {
            return Ok(LogTimeZone::Fixed(offset));
        }
        s.parse::<Tz>().map(LogTimeZone::Named).map_err(|_| {
            format!(
                "invalid timezone '{}': expected UTC, Local, ±HH:MM or an IANA name",
                s
            )
        })
    }
}

impl TryFrom<String> for LogTimeZone {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for LogTimeZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogTimeZone::Utc => write!(f, "UTC"),
            LogTimeZone::Local => write!(f, "Local"),
            LogTimeZone::Fixed(offset) => write!(f, "{}", offset),
            LogTimeZone::Named(tz) => write!(f, "{}", tz.name()),
        }
    }
}

fn parse_offset(s: &str) -> Option<FixedOffset> {
    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().ok()?, 0),
        4 => (
            digits[..2].parse::<i32>().ok()?,
            digits[2..].parse::<i32>().ok()?,
        ),
        _ => return None,
    };
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Parses an RFC 3339 timestamp with up to nine fractional digits.
pub fn parse_timestamp(ts: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(ts).ok()
}

/// Reformats an RFC 3339 timestamp into `tz`.
///
/// Returns `ts` untouched when no zone is requested or when it does not parse.
pub fn convert_time_zone<'a>(ts: &'a str, tz: Option<&LogTimeZone>) -> Cow<'a, str> {
    let Some(tz) = tz else {
        return Cow::Borrowed(ts);
    };
    match parse_timestamp(ts) {
        Some(dt) => Cow::Owned(tz.format(&dt)),
        None => Cow::Borrowed(ts),
    }
}
