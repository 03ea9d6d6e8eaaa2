mod connection;
pub mod helpers;
mod migrations;
pub mod models;
mod repositories;

pub use connection::Database;
pub use models::{
    DailyPlaytime, FiredTriggers, GameRecord, NoteReminder, PlaySessionRecord, ReminderSchedule,
    ReminderState,
};
pub use repositories::notes::ActivationOutcome;
