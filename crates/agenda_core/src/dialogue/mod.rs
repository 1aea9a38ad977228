pub mod envelope;
pub mod meridiem;

pub use envelope::{Context, DialogueRequest, WebhookRequest, WebhookResponse};
pub use meridiem::{
    MERIDIEM_CONTEXT, MeridiemOutcome, MeridiemPrompt, PendingAction, PendingTask, ResolvedTime,
};
