use super::{CanonicalDate, ParsedDateTime};
use crate::error::ParseFailure;
use regex::{Captures, Regex};
use std::sync::OnceLock;
use time::Date;
use tracing::debug;

/// Expressions that name a day only relative to when they were said.
const RELATIVE_EXPRESSIONS: &[&str] = &[
    "hoy",
    "mañana",
    "manana",
    "pasado mañana",
    "pasado manana",
    "lunes",
    "martes",
    "miercoles",
    "miércoles",
    "jueves",
    "viernes",
    "sabado",
    "sábado",
    "domingo",
];

const MONTH_NAMES: &[(&str, u8)] = &[
    ("enero", 1),
    ("febrero", 2),
    ("marzo", 3),
    ("abril", 4),
    ("mayo", 5),
    ("junio", 6),
    ("julio", 7),
    ("agosto", 8),
    ("septiembre", 9),
    ("setiembre", 9),
    ("octubre", 10),
    ("noviembre", 11),
    ("diciembre", 12),
];

struct DatePatterns {
    // 10/12/2025, 10-12-25
    numeric: Regex,
    // 2025-12-10, 2025-12-10T12:00:00-05:00
    iso: Regex,
    // 10 de diciembre de 2025, 10 diciembre, 10 de setiembre del 25
    textual: Regex,
}

fn patterns() -> &'static DatePatterns {
    static PATTERNS: OnceLock<DatePatterns> = OnceLock::new();
    // ASCII digits only; `\d` would also accept fullwidth and Arabic-Indic digits.
    PATTERNS.get_or_init(|| DatePatterns {
        numeric: Regex::new(r"^([0-9]{1,2})[/-]([0-9]{1,2})[/-]([0-9]{2}|[0-9]{4})$")
            .expect("numeric date"),
        iso: Regex::new(
            r"^([0-9]{4})-([0-9]{2})-([0-9]{2})(?:[t ][0-9]{2}:[0-9]{2}(?::[0-9]{2}(?:\.[0-9]+)?)?(?:z|[+-][0-9]{2}:?[0-9]{2})?)?$",
        )
        .expect("iso date"),
        textual: Regex::new(
            r"^([0-9]{1,2})\s*(?:de\s+)?(\p{L}+)(?:\s+del?)?(?:\s+([0-9]{2}|[0-9]{4}))?$",
        )
        .expect("textual date"),
    })
}

/// Parses a user-supplied date into a canonical day.
///
/// Accepts `D/M/Y` or `D-M-Y` (two- or four-digit year), the platform's
/// `YYYY-MM-DD[THH:MM...]` form, and `D [de] MES [de|del] [Y]` with Spanish
/// month names. Two-digit years are read as `2000 + yy`. When the textual
/// form omits the year, the year of `today` is used, so the result depends
/// on the reference day the caller passes in.
///
/// Relative words ("hoy", "mañana", weekday names) are rejected: once stored
/// as text they stop meaning a specific day.
pub fn parse_freeform_date(text: &str, today: Date) -> Result<ParsedDateTime, ParseFailure> {
    let normalized = text.trim().to_lowercase();

    if RELATIVE_EXPRESSIONS.contains(&normalized.as_str()) {
        debug!(input = %normalized, "rejected relative date expression");
        return Err(ParseFailure::RelativeOrAmbiguousDate(normalized));
    }

    let patterns = patterns();

    if let Some(caps) = patterns.numeric.captures(&normalized) {
        let date = CanonicalDate::new(
            number(&caps, 1)?,
            number(&caps, 2)?,
            expand_year(&caps[3])?,
        )?;
        return Ok(ParsedDateTime::from_date(date));
    }

    if let Some(caps) = patterns.iso.captures(&normalized) {
        let date = CanonicalDate::new(number(&caps, 3)?, number(&caps, 2)?, expand_year(&caps[1])?)?;
        return Ok(ParsedDateTime::from_date(date));
    }

    if let Some(caps) = patterns.textual.captures(&normalized) {
        let month_name = &caps[2];
        let month = month_number(month_name)
            .ok_or_else(|| ParseFailure::UnknownMonthName(month_name.to_string()))?;
        let year = match caps.get(3) {
            Some(year) => expand_year(year.as_str())?,
            None => today.year(),
        };
        let date = CanonicalDate::new(number(&caps, 1)?, month, year)?;
        return Ok(ParsedDateTime::from_date(date));
    }

    debug!(input = %normalized, "no date pattern matched");
    Err(ParseFailure::UnrecognizedFormat(text.trim().to_string()))
}

fn month_number(name: &str) -> Option<u8> {
    MONTH_NAMES
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, month)| *month)
}

fn number(caps: &Captures<'_>, index: usize) -> Result<u8, ParseFailure> {
    caps[index]
        .parse::<u8>()
        .map_err(|_| ParseFailure::UnrecognizedFormat(caps[0].to_string()))
}

fn expand_year(digits: &str) -> Result<i32, ParseFailure> {
    let year = digits
        .parse::<i32>()
        .map_err(|_| ParseFailure::UnrecognizedFormat(digits.to_string()))?;
    if digits.len() == 2 {
        Ok(2000 + year)
    } else {
        Ok(year)
    }
}
