mod actions;
mod evaluator;

pub use actions::{disable_reminder, dismiss_reminder, enable_reminder, rearm_reminder};
pub use evaluator::{due_reminders, Evaluation, ReminderEvaluator};

/// Due reminders surfaced per evaluation.
pub const MAX_DUE_REMINDERS: usize = 6;

/// Notes that may be armed at once across the whole store.
pub const MAX_ACTIVE_REMINDERS: i64 = 200;
