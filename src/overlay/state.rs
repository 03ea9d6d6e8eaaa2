use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    db::{GameRecord, NoteReminder},
    matcher::MatchTier,
    platform::{WindowInfo, WindowKey},
    session::SessionView,
};

/// Everything the presentation layer renders, published after each poll.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OverlayState {
    pub visible: bool,
    pub matched_game: Option<GameRecord>,
    pub match_tier: Option<MatchTier>,
    /// Set while the user has pinned a game manually.
    pub pinned_game_id: Option<String>,
    pub selected_window: Option<WindowKey>,
    pub windows: Vec<WindowInfo>,
    pub session: Option<SessionView>,
    pub due_reminders: Vec<NoteReminder>,
    pub last_poll_at: Option<DateTime<Utc>>,
}

impl OverlayState {
    pub fn matched_game_id(&self) -> Option<&str> {
        self.matched_game.as_ref().map(|game| game.id.as_str())
    }
}
