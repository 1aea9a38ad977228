//! Follow-up turn that asks "am or pm?" for a bare hour.
//!
//! The pending task travels inside a conversation context, so the state is
//! owned by the caller between turns: [`MeridiemPrompt::to_context`] writes
//! it out, [`MeridiemPrompt::from_context`] reads it back and
//! [`MeridiemPrompt::answer`] consumes it.
//!
//! ```text
//! AwaitingMeridiem --"am"|"pm"--> Resolved
//!        |  ^
//!        |  +--other reply, turns left--(Rejected: re-prompt)
//!        +-----other reply, no turns left--> Expired
//! ```

use super::envelope::Context;
use crate::datetime::{CanonicalDate, CanonicalTime, Meridiem, TimeMode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const MERIDIEM_CONTEXT: &str = "esperando-meridiem";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingAction {
    Create,
    Modify,
}

/// Task fields collected before the meridiem was known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTask {
    pub action: PendingAction,
    #[serde(rename = "tarea")]
    pub name: String,
    /// Display date. `None` when a modification leaves the date untouched.
    #[serde(rename = "fecha", default)]
    pub date: Option<String>,
    #[serde(default)]
    pub canonical_date: Option<CanonicalDate>,
    /// The hour as the user typed it, without am/pm.
    #[serde(rename = "hora")]
    pub hour_text: String,
    pub hour: u8,
    #[serde(default)]
    pub minute: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeridiemPrompt {
    pub pending: PendingTask,
    pub remaining_turns: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTime {
    pub pending: PendingTask,
    pub time: CanonicalTime,
    pub meridiem: Meridiem,
}

impl ResolvedTime {
    /// The stored `hora` text: `"3 pm"` for a bare `"3"` in either mode,
    /// `"7:30 pm"` for `"7:30"`.
    pub fn display(&self, mode: TimeMode) -> String {
        match mode {
            TimeMode::Passthrough => {
                format!("{} {}", self.pending.hour_text.trim(), self.meridiem.as_str())
            }
            TimeMode::TwelveHour => self.time.render_twelve_hour(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeridiemOutcome {
    Resolved(ResolvedTime),
    /// The reply was not `am`/`pm`; ask again with one turn fewer.
    Rejected(MeridiemPrompt),
    /// No turns left. The pending change is abandoned.
    Expired(PendingTask),
}

impl MeridiemPrompt {
    pub fn begin(pending: PendingTask, lifespan: u32) -> Self {
        Self {
            pending,
            remaining_turns: lifespan.max(1),
        }
    }

    pub fn answer(self, reply: &str) -> MeridiemOutcome {
        let resolved = Meridiem::parse_reply(reply).and_then(|meridiem| {
            CanonicalTime::from_twelve_hour(self.pending.hour, self.pending.minute, meridiem)
                .map(|time| (time, meridiem))
        });

        match resolved {
            Some((time, meridiem)) => MeridiemOutcome::Resolved(ResolvedTime {
                pending: self.pending,
                time,
                meridiem,
            }),
            None => {
                let remaining_turns = self.remaining_turns.saturating_sub(1);
                if remaining_turns == 0 {
                    MeridiemOutcome::Expired(self.pending)
                } else {
                    MeridiemOutcome::Rejected(Self {
                        pending: self.pending,
                        remaining_turns,
                    })
                }
            }
        }
    }

    pub fn question(&self) -> String {
        format!(
            "¿La hora {} de \"{}\" es am o pm? Responde solo \"am\" o \"pm\".",
            self.pending.hour_text.trim(),
            self.pending.name
        )
    }

    pub fn to_context(&self, name: String) -> Context {
        let mut parameters = match serde_json::to_value(&self.pending) {
            Ok(Value::Object(fields)) => fields,
            _ => serde_json::Map::new(),
        };
        parameters.insert(
            "remaining_turns".to_string(),
            Value::from(self.remaining_turns),
        );
        Context {
            name,
            lifespan_count: self.remaining_turns,
            parameters,
        }
    }

    /// Reads a prompt back from its context. The turn count stored in the
    /// parameters wins over the platform's own lifespan counter.
    pub fn from_context(context: &Context) -> Option<Self> {
        let pending: PendingTask =
            serde_json::from_value(Value::Object(context.parameters.clone())).ok()?;
        let remaining_turns = context
            .parameters
            .get("remaining_turns")
            .and_then(Value::as_u64)
            .and_then(|turns| u32::try_from(turns).ok())
            .unwrap_or(context.lifespan_count);
        if remaining_turns == 0 {
            return None;
        }
        Some(Self {
            pending,
            remaining_turns,
        })
    }
}

/// Context that ends the follow-up on the platform side.
pub fn cleared_context(name: String) -> Context {
    Context {
        name,
        lifespan_count: 0,
        parameters: serde_json::Map::new(),
    }
}
