//! Date and time normalization for free-text task fields.
//!
//! Users type dates and times in many shapes ("10 de diciembre", "10/12/25",
//! "3 pm", "15:00"). Everything here turns that text into a canonical value
//! plus a fixed display string, or into a typed [`ParseFailure`] that the
//! dialogue layer can turn into a re-entry prompt.
//!
//! Nothing in this module reads the wall clock. Operations that need a
//! reference day ("assume the current year") take it as a parameter.

mod clock;
mod comparator;
mod date;

pub use clock::{Meridiem, TimeMode, TimeValue, normalize_time, parse_time};
pub use comparator::{
    DateWindow, chronological, instant_from_canonical, instant_with_time_text, to_instant,
};
pub use date::parse_freeform_date;

use crate::error::ParseFailure;
use serde::{Deserialize, Serialize};
use std::fmt;
use time::{Date, Month};

/// A validated calendar day.
///
/// Field order makes the derived ordering chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CanonicalDate {
    year: i32,
    month: u8,
    day: u8,
}

impl CanonicalDate {
    /// Builds a date, rejecting combinations that are not real calendar days.
    ///
    /// Never rolls over: `31/04` is an error, not `01/05`.
    pub fn new(day: u8, month: u8, year: i32) -> Result<Self, ParseFailure> {
        let invalid = || ParseFailure::InvalidCalendarDate { day, month, year };
        let month_value = Month::try_from(month).map_err(|_| invalid())?;
        let date = Date::from_calendar_date(year, month_value, day).map_err(|_| invalid())?;
        Ok(Self::from_date(date))
    }

    pub fn from_date(date: Date) -> Self {
        Self {
            year: date.year(),
            month: u8::from(date.month()),
            day: date.day(),
        }
    }

    pub fn day(&self) -> u8 {
        self.day
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// `None` only for values deserialized from a record that was edited by hand.
    pub fn to_date(&self) -> Option<Date> {
        let month = Month::try_from(self.month).ok()?;
        Date::from_calendar_date(self.year, month, self.day).ok()
    }

    /// Inverse of the `DD/MM/YYYY` rendering.
    ///
    /// Returns `None` unless the text splits into exactly three numeric parts
    /// that form a real calendar day.
    pub fn parse_display(text: &str) -> Option<Self> {
        let parts: Vec<&str> = text.trim().split('/').collect();
        if parts.len() != 3 {
            return None;
        }

        let parts: Vec<&str> = parts.iter().map(|part| part.trim()).collect();
        // `str::parse` would accept a leading sign.
        if parts
            .iter()
            .any(|part| part.is_empty() || !part.chars().all(|ch| ch.is_ascii_digit()))
        {
            return None;
        }

        let day = parts[0].parse::<u8>().ok()?;
        let month = parts[1].parse::<u8>().ok()?;
        let year = parts[2].parse::<i32>().ok()?;
        Self::new(day, month, year).ok()
    }
}

impl fmt::Display for CanonicalDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{:02}/{:04}", self.day, self.month, self.year)
    }
}

/// A fully resolved wall-clock time on a 24-hour clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CanonicalTime {
    hour: u8,
    minute: u8,
}

impl CanonicalTime {
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        if hour > 23 || minute > 59 {
            return None;
        }
        Some(Self { hour, minute })
    }

    /// Resolves a 12-hour clock reading. `hour` must be in `1..=12`.
    pub fn from_twelve_hour(hour: u8, minute: u8, meridiem: Meridiem) -> Option<Self> {
        if !(1..=12).contains(&hour) {
            return None;
        }
        let hour = match (meridiem, hour) {
            (Meridiem::Am, 12) => 0,
            (Meridiem::Am, h) => h,
            (Meridiem::Pm, 12) => 12,
            (Meridiem::Pm, h) => h + 12,
        };
        Self::new(hour, minute)
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    pub fn meridiem(&self) -> Meridiem {
        if self.hour >= 12 { Meridiem::Pm } else { Meridiem::Am }
    }

    /// `"3 pm"`, `"3:30 pm"`, `"12 am"` for midnight.
    pub fn render_twelve_hour(&self) -> String {
        let hour = match self.hour % 12 {
            0 => 12,
            h => h,
        };
        let meridiem = self.meridiem().as_str();
        if self.minute == 0 {
            format!("{hour} {meridiem}")
        } else {
            format!("{hour}:{:02} {meridiem}", self.minute)
        }
    }

    pub fn render_twenty_four_hour(&self) -> String {
        format!("{:02}:{:02}", self.hour, self.minute)
    }
}

/// Result of normalizing a user utterance's date, plus its time when known.
///
/// Only produced on success; an unparseable date is reported as a
/// [`ParseFailure`] instead of a value with a missing date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDateTime {
    pub date: CanonicalDate,
    pub time: TimeValue,
    /// Fixed `DD/MM/YYYY` rendering of `date`.
    pub display: String,
}

impl ParsedDateTime {
    pub fn from_date(date: CanonicalDate) -> Self {
        Self {
            display: date.to_string(),
            date,
            time: TimeValue::Unspecified,
        }
    }

    pub fn with_time(self, time: TimeValue) -> Self {
        Self { time, ..self }
    }
}
