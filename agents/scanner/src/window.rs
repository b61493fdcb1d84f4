//! Date/time validity windows attached to tickets (`passValidThrough`) and
//! ticket sales (`salesValidThrough`).
//!
//! Dates are stored as epoch milliseconds and compared at day granularity in
//! the offset of the evaluating clock; times are `HH:MM` wall-clock strings
//! compared at minute granularity.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, FixedOffset, Local, NaiveTime, Timelike, Utc};
use serde::de::{self, Deserializer};
use serde::Deserialize;

// ============== TIME OF DAY ==============

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeOfDay(NaiveTime);

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    pub fn minute(&self) -> u32 {
        self.0.minute()
    }

    pub fn minutes(&self) -> u32 {
        self.0.hour() * 60 + self.0.minute()
    }
}

impl FromStr for TimeOfDay {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveTime::parse_from_str(s.trim(), "%H:%M").map(Self)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

fn optional_time<'de, D>(deserializer: D) -> Result<Option<TimeOfDay>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => text
            .parse()
            .map(Some)
            .map_err(|e| de::Error::custom(format!("invalid time `{text}`: {e}"))),
    }
}

// ============== CLOCK ==============

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Local wall clock of the scanning device.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

// ============== WINDOW ==============

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidityWindow {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_date: DateTime<Utc>,
    #[serde(default, deserialize_with = "optional_time")]
    pub start_time: Option<TimeOfDay>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "optional_time")]
    pub end_time: Option<TimeOfDay>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowCheck {
    /// Door admission: the full window applies.
    Admission,
    /// "Is it over yet": only a closed window counts, not-yet-open is fine.
    EventOver,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowVerdict {
    Open,
    NotYetOpen { opens: String },
    Closed,
}

impl WindowVerdict {
    pub fn is_open(&self) -> bool {
        matches!(self, WindowVerdict::Open)
    }
}

impl fmt::Display for WindowVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowVerdict::Open => write!(f, "open"),
            WindowVerdict::NotYetOpen { opens } => write!(f, "opens at {opens}"),
            WindowVerdict::Closed => write!(f, "closed"),
        }
    }
}

impl ValidityWindow {
    pub fn evaluate(&self, now: DateTime<FixedOffset>, check: WindowCheck) -> WindowVerdict {
        let offset = *now.offset();
        let today = now.date_naive();
        let minutes = now.hour() * 60 + now.minute();

        let start_verdict = match (check, self.check_start(today, minutes, offset)) {
            (WindowCheck::EventOver, WindowVerdict::NotYetOpen { .. }) => WindowVerdict::Open,
            (_, verdict) => verdict,
        };

        let end_verdict = self.check_end(today, minutes, offset);
        if end_verdict.is_open() {
            start_verdict
        } else {
            end_verdict
        }
    }

    fn check_start(&self, today: chrono::NaiveDate, minutes: u32, offset: FixedOffset) -> WindowVerdict {
        let start_day = self.start_date.with_timezone(&offset).date_naive();

        if today < start_day {
            return self.not_yet_open(offset);
        }
        if today == start_day {
            if let Some(start) = self.start_time {
                if minutes < start.minutes() {
                    return self.not_yet_open(offset);
                }
            }
            // Single-day window: an end time with no end date closes the start day.
            if let (None, Some(end)) = (self.end_date, self.end_time) {
                if minutes > end.minutes() {
                    return WindowVerdict::Closed;
                }
            }
        }
        WindowVerdict::Open
    }

    fn check_end(&self, today: chrono::NaiveDate, minutes: u32, offset: FixedOffset) -> WindowVerdict {
        let Some(end_date) = self.end_date else {
            return WindowVerdict::Open;
        };
        let end_day = end_date.with_timezone(&offset).date_naive();

        if today > end_day {
            return WindowVerdict::Closed;
        }
        if today == end_day {
            if let Some(end) = self.end_time {
                if minutes > end.minutes() {
                    return WindowVerdict::Closed;
                }
            }
        }
        WindowVerdict::Open
    }

    fn not_yet_open(&self, offset: FixedOffset) -> WindowVerdict {
        WindowVerdict::NotYetOpen {
            opens: self.describe(offset),
        }
    }

    /// Human readable window, e.g. `Jun 3 at 10:00 - 18:00, 2024 (UTC+02:00)`.
    pub fn describe(&self, offset: FixedOffset) -> String {
        let start = self.start_date.with_timezone(&offset);
        let mut text = start.format("%b %-d").to_string();

        if let Some(start_time) = self.start_time {
            text.push_str(&format!(" at {start_time}"));
        }

        match self.end_date.map(|end| end.with_timezone(&offset)) {
            None => {
                if let Some(end_time) = self.end_time {
                    text.push_str(&format!(" ends {end_time}"));
                }
                text.push_str(&format!(", {}", start.year()));
            }
            Some(end) if end.date_naive() != start.date_naive() => {
                text.push_str(&end.format(" - %b %-d").to_string());
                if let Some(end_time) = self.end_time {
                    text.push_str(&format!(" at {end_time}"));
                }
                if end.year() == start.year() {
                    text.push_str(&format!(", {}", start.year()));
                } else {
                    text.push_str(&format!(", {} - {}", start.year(), end.year()));
                }
            }
            Some(_) => {
                if let Some(end_time) = self.end_time {
                    text.push_str(&format!(" - {end_time}"));
                }
                text.push_str(&format!(", {}", start.year()));
            }
        }

        text.push_str(&format!(" (UTC{offset})"));
        text
    }
}
