use super::{CanonicalDate, CanonicalTime, TimeValue, parse_time};
use time::{Date, Duration, PrimitiveDateTime, Time};

/// Derives an orderable instant from stored display strings.
///
/// The date must be `DD/MM/YYYY`. The time contributes its hour (and minute
/// when fully resolved); for an unresolved time the first integer in the text
/// is taken as the hour. An empty time means the start of the day.
///
/// Returns `None` when either part cannot be resolved. Callers exclude such
/// records from time-based views rather than reporting an error.
pub fn to_instant(date_display: &str, time_display: &str) -> Option<PrimitiveDateTime> {
    let date = CanonicalDate::parse_display(date_display)?;
    instant_with_time_text(&date, time_display)
}

/// A known day combined with a time that is only available as text.
pub fn instant_with_time_text(
    date: &CanonicalDate,
    time_display: &str,
) -> Option<PrimitiveDateTime> {
    let (hour, minute) = hour_and_minute(time_display)?;
    instant_from_canonical(date, CanonicalTime::new(hour, minute).as_ref())
}

/// Builds the instant straight from structured fields, with no text round trip.
pub fn instant_from_canonical(
    date: &CanonicalDate,
    time: Option<&CanonicalTime>,
) -> Option<PrimitiveDateTime> {
    let date = date.to_date()?;
    let time = match time {
        Some(time) => Time::from_hms(time.hour(), time.minute(), 0).ok()?,
        None => Time::MIDNIGHT,
    };
    Some(PrimitiveDateTime::new(date, time))
}

fn hour_and_minute(time_display: &str) -> Option<(u8, u8)> {
    match parse_time(time_display) {
        TimeValue::Unspecified => Some((0, 0)),
        TimeValue::Resolved(time) => Some((time.hour(), time.minute())),
        TimeValue::AwaitingMeridiem { hour, minute } => Some((hour, minute)),
        TimeValue::Opaque(text) => {
            let digits: String = text
                .chars()
                .skip_while(|ch| !ch.is_ascii_digit())
                .take_while(|ch| ch.is_ascii_digit())
                .take(2)
                .collect();
            let hour = digits.parse::<u8>().ok()?;
            (hour <= 23).then_some((hour, 0))
        }
    }
}

/// Keeps the items that resolve to an instant, ordered ascending.
///
/// The sort is stable, so items sharing an instant keep their input order.
pub fn chronological<T, F>(items: impl IntoIterator<Item = T>, instant_of: F) -> Vec<(PrimitiveDateTime, T)>
where
    F: Fn(&T) -> Option<PrimitiveDateTime>,
{
    let mut ordered: Vec<(PrimitiveDateTime, T)> = items
        .into_iter()
        .filter_map(|item| instant_of(&item).map(|instant| (instant, item)))
        .collect();
    ordered.sort_by_key(|(instant, _)| *instant);
    ordered
}

/// An inclusive range of whole days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub first: Date,
    pub last: Date,
}

impl DateWindow {
    pub fn new(first: Date, last: Date) -> Self {
        Self { first, last }
    }

    pub fn day(day: Date) -> Self {
        Self::new(day, day)
    }

    /// Monday through Sunday of the week containing `day`.
    pub fn week_of(day: Date) -> Self {
        let from_monday = i64::from(day.weekday().number_days_from_monday());
        let first = day
            .checked_sub(Duration::days(from_monday))
            .unwrap_or(day);
        let last = first.checked_add(Duration::days(6)).unwrap_or(Date::MAX);
        Self::new(first, last)
    }

    pub fn contains(&self, instant: &PrimitiveDateTime) -> bool {
        let day = instant.date();
        self.first <= day && day <= self.last
    }
}
