//! Wall-clock parsing for resolution queries.
//!
//! Query times arrive as loosely formatted strings ("13:45 EDT",
//! "1:45 PM EDT", "2024-10-24T13:45:00-04:00"). They are parsed into a
//! [`LocalTime`] and later placed on the agenda's own timeline by
//! [`Agenda::localize`](crate::agenda::Agenda::localize).

use crate::error::{Result, TourpostError};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

const HOUR: i32 = 3600;

/// A point in time on the event day, as supplied by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LocalTime {
    pub time: NaiveTime,
    /// Offset the caller stated, if any. `None` means "agenda time".
    pub offset: Option<FixedOffset>,
    /// Zone abbreviation as written by the caller (`EDT`, `UTC`, ...).
    pub zone_label: Option<String>,
    /// Calendar date, only present for full date-time inputs.
    pub date: Option<NaiveDate>,
}

impl LocalTime {
    /// A bare time-of-day, interpreted in the agenda's own zone.
    pub fn at(time: NaiveTime) -> Self {
        Self {
            time,
            offset: None,
            zone_label: None,
            date: None,
        }
    }

    /// Build from hour and minute. Returns `None` for out-of-range values.
    pub fn hm(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self::at)
    }

    /// The current wall-clock time at the event.
    ///
    /// The reading carries no date: the event clock is compared by time of
    /// day only, so a server started on a different calendar day still
    /// resolves against the agenda.
    pub fn now_in(offset: FixedOffset, label: &str) -> Self {
        let now = Utc::now().with_timezone(&offset);
        let time = now.time().with_nanosecond(0).unwrap_or_else(|| now.time());
        Self {
            time,
            offset: Some(offset),
            zone_label: (!label.is_empty()).then(|| label.to_string()),
            date: None,
        }
    }

    pub fn parse(input: &str) -> Result<Self> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(TourpostError::invalid_time(input, "empty time"));
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Ok(Self {
                time: dt.time(),
                offset: Some(*dt.offset()),
                zone_label: None,
                date: Some(dt.date_naive()),
            });
        }

        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
            return Ok(Self {
                time: naive.time(),
                offset: None,
                zone_label: None,
                date: Some(naive.date()),
            });
        }

        let (clock, zone) = split_zone(raw)?;
        let time = parse_clock(input, &clock)?;
        let (offset, zone_label) = match zone {
            Some((offset, label)) => (Some(offset), Some(label)),
            None => (None, None),
        };

        Ok(Self {
            time,
            offset,
            zone_label,
            date: None,
        })
    }

    /// Machine-readable form that [`parse`](Self::parse) reads back:
    /// RFC 3339 when dated, otherwise `HH:MM:SS` and the zone.
    pub fn wire_format(&self) -> String {
        if let Some(date) = self.date {
            let naive = date.and_time(self.time);
            return match self.offset.and_then(|o| naive.and_local_timezone(o).single()) {
                Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Secs, true),
                None => naive.format("%Y-%m-%dT%H:%M:%S").to_string(),
            };
        }
        let clock = self.time.format("%H:%M:%S");
        match (&self.zone_label, self.offset) {
            (Some(label), _) => format!("{} {}", clock, label),
            (None, Some(offset)) => format!("{} {}", clock, offset),
            (None, None) => clock.to_string(),
        }
    }
}

impl fmt::Display for LocalTime {
    /// Formats like `01:45 PM EDT`, the shape the prompts were written for.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(date) = self.date {
            write!(f, "{} ", date.format("%Y-%m-%d"))?;
        }
        write!(f, "{}", self.time.format("%I:%M %p"))?;
        match (&self.zone_label, self.offset) {
            (Some(label), _) => write!(f, " {}", label),
            (None, Some(offset)) => write!(f, " {}", offset),
            (None, None) => Ok(()),
        }
    }
}

impl TryFrom<String> for LocalTime {
    type Error = TourpostError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<LocalTime> for String {
    fn from(value: LocalTime) -> Self {
        value.wire_format()
    }
}

/// Resolve a zone abbreviation or numeric offset (`+05:30`, `-0400`, `-4`).
pub fn parse_zone(label: &str) -> Option<FixedOffset> {
    let upper = label.trim().to_ascii_uppercase();
    let hours = match upper.as_str() {
        "UTC" | "GMT" | "Z" => Some(0),
        "EST" => Some(-5),
        "EDT" => Some(-4),
        "CST" => Some(-6),
        "CDT" => Some(-5),
        "MST" => Some(-7),
        "MDT" => Some(-6),
        "PST" => Some(-8),
        "PDT" => Some(-7),
        _ => None,
    };
    if let Some(h) = hours {
        return FixedOffset::east_opt(h * HOUR);
    }

    let (sign, rest) = match upper.as_bytes().first()? {
        b'+' => (1, &upper[1..]),
        b'-' => (-1, &upper[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (h, m) = match digits.len() {
        1 | 2 => (digits.parse::<i32>().ok()?, 0),
        4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
        _ => return None,
    };
    if h > 14 || m >= 60 {
        return None;
    }
    FixedOffset::east_opt(sign * (h * HOUR + m * 60))
}

/// Split a trailing zone from the clock part: `"1:45 PM EDT"`, `"13:45-04:00"`, `"13:45Z"`.
fn split_zone(raw: &str) -> Result<(String, Option<(FixedOffset, String)>)> {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    if tokens.len() > 1 {
        let last = tokens[tokens.len() - 1];
        if let Some(offset) = parse_zone(last) {
            let clock = tokens[..tokens.len() - 1].join(" ");
            return Ok((clock, Some((offset, last.to_ascii_uppercase()))));
        }
        if last.chars().all(|c| c.is_ascii_alphabetic()) && last.len() >= 3 {
            return Err(TourpostError::invalid_time(
                raw,
                format!("unknown time zone '{}'", last),
            ));
        }
    }

    if let Some(pos) = raw.find(|c: char| c == '+' || c == '-') {
        if pos > 0 {
            let (clock, zone) = raw.split_at(pos);
            let offset = parse_zone(zone).ok_or_else(|| {
                TourpostError::invalid_time(raw, format!("bad UTC offset '{}'", zone))
            })?;
            return Ok((clock.trim().to_string(), Some((offset, zone.to_string()))));
        }
    }

    if raw.len() > 1 && (raw.ends_with('Z') || raw.ends_with('z')) {
        let clock = &raw[..raw.len() - 1];
        if let Some(utc) = FixedOffset::east_opt(0) {
            return Ok((clock.trim().to_string(), Some((utc, "UTC".to_string()))));
        }
    }

    Ok((raw.to_string(), None))
}

fn parse_clock(input: &str, clock: &str) -> Result<NaiveTime> {
    let compact: String = clock
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '.')
        .collect::<String>()
        .to_ascii_uppercase();

    let (digits, pm) = if let Some(d) = compact.strip_suffix("AM") {
        (d, Some(false))
    } else if let Some(d) = compact.strip_suffix("PM") {
        (d, Some(true))
    } else {
        (compact.as_str(), None)
    };

    let time = NaiveTime::parse_from_str(digits, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(digits, "%H:%M"))
        .map_err(|_| TourpostError::invalid_time(input, "expected a time like 13:45 or 1:45 PM"))?;

    let Some(pm) = pm else {
        return Ok(time);
    };

    let hour = time.hour();
    if hour == 0 || hour > 12 {
        return Err(TourpostError::invalid_time(
            input,
            "12-hour clock times need an hour between 1 and 12",
        ));
    }
    let hour24 = match (hour, pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, false) => h,
        (h, true) => h + 12,
    };
    time.with_hour(hour24)
        .ok_or_else(|| TourpostError::invalid_time(input, "hour out of range"))
}
