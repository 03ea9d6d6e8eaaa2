//! Finished play sessions written by the play-history recorder.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlaySessionRecord {
    pub id: String,
    pub game_id: String,
    pub pid: Option<u32>,
    pub exe_path: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_seconds: u64,
}

/// Per-day playtime rollup for one game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyPlaytime {
    pub game_id: String,
    pub day: NaiveDate,
    pub duration_seconds: u64,
}
