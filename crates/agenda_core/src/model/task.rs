use crate::datetime::{
    CanonicalDate, CanonicalTime, instant_from_canonical, instant_with_time_text, to_instant,
};
use serde::{Deserialize, Serialize};
use time::{Date, PrimitiveDateTime};

pub const PENDING_STATUS: &str = "pendiente";

const COMPLETED_STATUSES: &[&str] = &[
    "completada",
    "completado",
    "finalizada",
    "finalizado",
    "terminada",
    "terminado",
];

/// Structured form of a task's schedule, stored next to the display strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalStamp {
    pub date: CanonicalDate,
    #[serde(default)]
    pub time: Option<CanonicalTime>,
}

/// A task document as persisted in the store.
///
/// `fecha` and `hora` are display strings; `canonical` is absent on records
/// written before the structured form existed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    #[serde(rename = "tarea")]
    pub name: String,
    #[serde(rename = "fecha", default)]
    pub date: String,
    #[serde(rename = "hora", default)]
    pub time: String,
    #[serde(rename = "estado", default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical: Option<CanonicalStamp>,
}

impl Task {
    pub fn is_completed(&self) -> bool {
        is_completed_status(&self.status)
    }

    /// Orderable instant for this task, or `None` when its schedule cannot be
    /// resolved.
    pub fn instant(&self) -> Option<PrimitiveDateTime> {
        match &self.canonical {
            Some(CanonicalStamp {
                date,
                time: Some(time),
            }) => instant_from_canonical(date, Some(time)),
            // Hour stored as typed.
            Some(stamp) => instant_with_time_text(&stamp.date, &self.time),
            None => to_instant(&self.date, &self.time),
        }
    }

    /// Calendar day of the task, ignoring its time.
    pub fn day(&self) -> Option<Date> {
        match &self.canonical {
            Some(stamp) => stamp.date.to_date(),
            None => CanonicalDate::parse_display(&self.date)?.to_date(),
        }
    }

    /// `• name — fecha hora — (estado)`
    pub fn summary_line(&self) -> String {
        format!(
            "• {} — {} {} — ({})",
            self.name, self.date, self.time, self.status
        )
    }
}

pub fn is_completed_status(status: &str) -> bool {
    let normalized = status.trim().to_lowercase();
    COMPLETED_STATUSES.contains(&normalized.as_str())
}
