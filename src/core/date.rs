//! Puzzle Dates
//!
//! A [`PuzzleDate`] names one daily puzzle. Its seed is the integer formed by
//! the digits of `YYYYMMDD`, so `2024-03-07` seeds with `20240307`.

use std::fmt;
use std::sync::Mutex;

use chrono::{Datelike, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Calendar date of a daily puzzle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PuzzleDate(NaiveDate);

impl PuzzleDate {
    /// Wrap a calendar date.
    pub const fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Build from year/month/day, `None` if the date does not exist.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    /// Parse `YYYY-MM-DD`.
    pub fn parse(s: &str) -> Option<Self> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().map(Self)
    }

    /// Integer seed `YYYYMMDD`.
    pub fn seed(&self) -> i64 {
        let d = self.0;
        d.year() as i64 * 10_000 + d.month() as i64 * 100 + d.day() as i64
    }

    /// Underlying calendar date.
    pub fn naive(&self) -> NaiveDate {
        self.0
    }

    /// The following day.
    pub fn succ(&self) -> Option<Self> {
        self.0.succ_opt().map(Self)
    }
}

impl fmt::Display for PuzzleDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl Serialize for PuzzleDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PuzzleDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid date: {s}")))
    }
}

/// Source of "today".
pub trait Clock: Send + Sync {
    /// The puzzle date currently in effect.
    fn today(&self) -> PuzzleDate;
}

/// Wall clock shifted by a fixed UTC offset.
#[derive(Clone, Debug)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    /// Clock for the given offset from UTC in minutes.
    ///
    /// Returns `None` if the offset is outside +/- 24h.
    pub fn with_offset_minutes(minutes: i32) -> Option<Self> {
        FixedOffset::east_opt(minutes.checked_mul(60)?).map(|offset| Self { offset })
    }

    /// UTC clock.
    pub fn utc() -> Self {
        Self { offset: Utc.fix() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::utc()
    }
}

impl Clock for SystemClock {
    fn today(&self) -> PuzzleDate {
        PuzzleDate(Utc::now().with_timezone(&self.offset).date_naive())
    }
}

/// Clock that only moves when told to. Used for rollover tests and replays.
#[derive(Debug)]
pub struct ManualClock {
    today: Mutex<PuzzleDate>,
}

impl ManualClock {
    /// Clock fixed at `date`.
    pub fn new(date: PuzzleDate) -> Self {
        Self {
            today: Mutex::new(date),
        }
    }

    /// Move the clock to `date`.
    pub fn set(&self, date: PuzzleDate) {
        *self.today.lock().unwrap_or_else(|e| e.into_inner()) = date;
    }
}

impl Clock for ManualClock {
    fn today(&self) -> PuzzleDate {
        *self.today.lock().unwrap_or_else(|e| e.into_inner())
    }
}
