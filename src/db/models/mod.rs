pub mod game;
pub mod note;
pub mod play_session;

pub use game::GameRecord;
pub use note::{FiredTriggers, NoteReminder, ReminderSchedule, ReminderState};
pub use play_session::{DailyPlaytime, PlaySessionRecord};
