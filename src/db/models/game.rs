//! Game library records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A game known to the library. The matcher only reads `id`, `name` and
/// `executable_path`; the play counters are maintained by the play-history
/// recorder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub id: String,
    pub name: String,
    pub executable_path: Option<String>,
    pub play_count: u64,
    pub total_playtime_seconds: u64,
    pub last_played_at: Option<DateTime<Utc>>,
}

impl GameRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>, executable_path: Option<&str>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            executable_path: executable_path.map(str::to_string),
            play_count: 0,
            total_playtime_seconds: 0,
            last_played_at: None,
        }
    }
}
