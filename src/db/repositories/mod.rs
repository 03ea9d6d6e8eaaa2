pub mod games;
pub mod notes;
pub mod play_sessions;
