mod task;

pub use task::{CanonicalStamp, PENDING_STATUS, Task, is_completed_status};
