use anyhow::{bail, Result};
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, to_i64, to_u64},
    models::{DailyPlaytime, PlaySessionRecord},
};

fn row_to_play_session(row: &Row) -> Result<PlaySessionRecord> {
    let started_at: String = row.get("started_at")?;
    let ended_at: String = row.get("ended_at")?;
    let duration_seconds: i64 = row.get("duration_seconds")?;

    Ok(PlaySessionRecord {
        id: row.get("id")?,
        game_id: row.get("game_id")?,
        pid: row.get("pid")?,
        exe_path: row.get("exe_path")?,
        started_at: parse_datetime(&started_at, "started_at")?,
        ended_at: parse_datetime(&ended_at, "ended_at")?,
        duration_seconds: to_u64(duration_seconds, "duration_seconds")?,
    })
}

impl Database {
    /// Persist a finished session, add it to the daily rollup of its start day
    /// and bump the game's counters, all in one transaction.
    pub async fn record_play_session(&self, session: &PlaySessionRecord) -> Result<()> {
        if session.ended_at < session.started_at {
            bail!("play session {} ends before it starts", session.id);
        }

        let record = session.clone();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let now = Utc::now().to_rfc3339();
            let duration = to_i64(record.duration_seconds)?;
            let day = record.started_at.date_naive().to_string();

            tx.execute(
                "INSERT INTO play_sessions (id, game_id, pid, exe_path, started_at, ended_at, duration_seconds, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.id,
                    record.game_id,
                    record.pid,
                    record.exe_path,
                    record.started_at.to_rfc3339(),
                    record.ended_at.to_rfc3339(),
                    duration,
                    now,
                ],
            )?;

            tx.execute(
                "INSERT INTO playtime_daily (game_id, day, duration_seconds, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(game_id, day) DO UPDATE SET
                     duration_seconds = duration_seconds + excluded.duration_seconds,
                     updated_at = excluded.updated_at",
                params![record.game_id, day, duration, now],
            )?;

            tx.execute(
                "UPDATE games
                 SET play_count = play_count + 1,
                     total_playtime_seconds = total_playtime_seconds + ?1,
                     last_played_at = ?2
                 WHERE id = ?3",
                params![duration, record.ended_at.to_rfc3339(), record.game_id],
            )?;

            tx.commit()?;
            Ok(())
        })
        .await
    }

    /// Most recent sessions first.
    pub async fn list_play_sessions(&self, game_id: &str, limit: usize) -> Result<Vec<PlaySessionRecord>> {
        let game_id = game_id.to_string();
        let limit = to_i64(u64::try_from(limit)?)?;
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, game_id, pid, exe_path, started_at, ended_at, duration_seconds
                 FROM play_sessions
                 WHERE game_id = ?1
                 ORDER BY started_at DESC
                 LIMIT ?2",
            )?;

            let mut rows = stmt.query(params![game_id, limit])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                sessions.push(row_to_play_session(row)?);
            }
            Ok(sessions)
        })
        .await
    }

    pub async fn get_daily_playtime(&self, game_id: &str) -> Result<Vec<DailyPlaytime>> {
        let game_id = game_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT game_id, day, duration_seconds
                 FROM playtime_daily
                 WHERE game_id = ?1
                 ORDER BY day ASC",
            )?;

            let mut rows = stmt.query(params![game_id])?;
            let mut days = Vec::new();
            while let Some(row) = rows.next()? {
                let day: String = row.get("day")?;
                let duration_seconds: i64 = row.get("duration_seconds")?;
                days.push(DailyPlaytime {
                    game_id: row.get("game_id")?,
                    day: NaiveDate::parse_from_str(&day, "%Y-%m-%d")?,
                    duration_seconds: to_u64(duration_seconds, "duration_seconds")?,
                });
            }
            Ok(days)
        })
        .await
    }
}
