use super::CanonicalTime;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Meridiem {
    Am,
    Pm,
}

impl Meridiem {
    /// Accepts exactly `am` or `pm`, ignoring case and surrounding spaces.
    pub fn parse_reply(reply: &str) -> Option<Self> {
        match reply.trim().to_lowercase().as_str() {
            "am" => Some(Self::Am),
            "pm" => Some(Self::Pm),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Am => "am",
            Self::Pm => "pm",
        }
    }
}

/// How stored times are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeMode {
    /// Keep whatever the user typed.
    #[default]
    Passthrough,
    /// Render resolved times as `3 pm` / `3:30 pm`.
    TwelveHour,
}

/// Classification of a time expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeValue {
    /// No time was given.
    Unspecified,
    Resolved(CanonicalTime),
    /// An hour in `1..=12` with no am/pm and no 24-hour marker.
    AwaitingMeridiem { hour: u8, minute: u8 },
    /// Text that is not a recognizable time, kept verbatim.
    Opaque(String),
}

impl TimeValue {
    pub fn canonical(&self) -> Option<CanonicalTime> {
        match self {
            Self::Resolved(time) => Some(*time),
            _ => None,
        }
    }

    pub fn needs_meridiem(&self) -> bool {
        matches!(self, Self::AwaitingMeridiem { .. })
    }
}

struct TimePatterns {
    iso: Regex,
    twelve_hour: Regex,
    day_period: Regex,
    colon: Regex,
    hour_suffix: Regex,
    bare_hour: Regex,
}

fn patterns() -> &'static TimePatterns {
    static PATTERNS: OnceLock<TimePatterns> = OnceLock::new();
    // ASCII digits only; `\d` would also accept fullwidth and Arabic-Indic digits.
    PATTERNS.get_or_init(|| TimePatterns {
        // 2025-12-10T15:00:00-05:00
        iso: Regex::new(
            r"^[0-9]{4}-[0-9]{2}-[0-9]{2}t([0-9]{2}):([0-9]{2})(?::[0-9]{2}(?:\.[0-9]+)?)?(?:z|[+-][0-9]{2}:?[0-9]{2})?$",
        )
        .expect("iso time"),
        // 3pm, 3 pm, 3:30 p.m.
        twelve_hour: Regex::new(r"^([0-9]{1,2})(?::([0-9]{2}))?\s*(a\.?\s?m\.?|p\.?\s?m\.?)$")
            .expect("twelve hour time"),
        // 3 de la tarde
        day_period: Regex::new(
            r"^([0-9]{1,2})(?::([0-9]{2}))?\s+de\s+la\s+(mañana|madrugada|tarde|noche)$",
        )
        .expect("day period time"),
        // 15:00, 09:30, 7:30, 15:00:00, 7:30 hrs
        colon: Regex::new(r"^([0-9]{1,2}):([0-9]{2})(?::[0-9]{2})?(\s*(?:h|hs|hrs|horas))?$")
            .expect("colon time"),
        // 15h, 15 horas
        hour_suffix: Regex::new(r"^([0-9]{1,2})\s*(?:h|hs|hrs|horas)$").expect("hour suffix time"),
        bare_hour: Regex::new(r"^([0-9]{1,2})$").expect("bare hour"),
    })
}

/// Classifies a time expression.
///
/// A time is only resolved when it carries an explicit meridiem or a 24-hour
/// marker: an hour outside `1..=12`, a zero-padded hour (`07:30`), or an
/// `h`/`horas` suffix. `3` and `7:30` are never silently assigned am or pm.
pub fn parse_time(text: &str) -> TimeValue {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return TimeValue::Unspecified;
    }

    let lowered = trimmed.to_lowercase();
    let normalized = lowered
        .strip_prefix("a las ")
        .or_else(|| lowered.strip_prefix("a la "))
        .unwrap_or(&lowered)
        .trim();
    let patterns = patterns();
    let opaque = || TimeValue::Opaque(trimmed.to_string());

    if let Some(caps) = patterns.iso.captures(normalized) {
        let (Some(hour), Some(minute)) = (required(&caps, 1), minutes(&caps, 2)) else {
            return opaque();
        };
        return resolved(CanonicalTime::new(hour, minute), trimmed);
    }

    if let Some(caps) = patterns.twelve_hour.captures(normalized) {
        let (Some(hour), Some(minute)) = (required(&caps, 1), minutes(&caps, 2)) else {
            return opaque();
        };
        let meridiem = if caps[3].starts_with('a') {
            Meridiem::Am
        } else {
            Meridiem::Pm
        };
        return resolved(CanonicalTime::from_twelve_hour(hour, minute, meridiem), trimmed);
    }

    if let Some(caps) = patterns.day_period.captures(normalized) {
        let (Some(hour), Some(minute)) = (required(&caps, 1), minutes(&caps, 2)) else {
            return opaque();
        };
        let meridiem = match (&caps[3], hour) {
            ("noche", 12) => Meridiem::Am,
            ("mañana" | "madrugada", _) => Meridiem::Am,
            _ => Meridiem::Pm,
        };
        return resolved(CanonicalTime::from_twelve_hour(hour, minute, meridiem), trimmed);
    }

    if let Some(caps) = patterns.colon.captures(normalized) {
        let (Some(hour), Some(minute)) = (required(&caps, 1), minutes(&caps, 2)) else {
            return opaque();
        };
        let zero_padded = caps[1].len() == 2 && caps[1].starts_with('0');
        let has_suffix = caps.get(3).is_some();
        if (1..=12).contains(&hour) && !zero_padded && !has_suffix {
            return if minute <= 59 {
                TimeValue::AwaitingMeridiem { hour, minute }
            } else {
                opaque()
            };
        }
        return resolved(CanonicalTime::new(hour, minute), trimmed);
    }

    if let Some(caps) = patterns.hour_suffix.captures(normalized) {
        let Some(hour) = required(&caps, 1) else {
            return opaque();
        };
        return resolved(CanonicalTime::new(hour, 0), trimmed);
    }

    if let Some(caps) = patterns.bare_hour.captures(normalized) {
        let Some(hour) = required(&caps, 1) else {
            return opaque();
        };
        return match hour {
            1..=12 => TimeValue::AwaitingMeridiem { hour, minute: 0 },
            _ => resolved(CanonicalTime::new(hour, 0), trimmed),
        };
    }

    opaque()
}

/// Renders a time for storage according to `mode`.
///
/// Passthrough returns the input untouched. Twelve-hour rewrites resolved
/// times (`"15:00"` becomes `"3 pm"`) and leaves everything else as typed.
pub fn normalize_time(text: &str, mode: TimeMode) -> String {
    match mode {
        TimeMode::Passthrough => text.to_string(),
        TimeMode::TwelveHour => match parse_time(text) {
            TimeValue::Resolved(time) => time.render_twelve_hour(),
            _ => text.to_string(),
        },
    }
}

fn resolved(time: Option<CanonicalTime>, original: &str) -> TimeValue {
    match time {
        Some(time) => TimeValue::Resolved(time),
        None => TimeValue::Opaque(original.to_string()),
    }
}

fn required(caps: &Captures<'_>, index: usize) -> Option<u8> {
    caps.get(index)?.as_str().parse::<u8>().ok()
}

// An absent minutes group reads as zero.
fn minutes(caps: &Captures<'_>, index: usize) -> Option<u8> {
    match caps.get(index) {
        Some(value) => value.as_str().parse::<u8>().ok(),
        None => Some(0),
    }
}
