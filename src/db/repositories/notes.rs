use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, parse_optional_datetime, parse_recurring_days},
    models::{NoteReminder, ReminderSchedule},
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

const NOTE_COLUMNS: &str = "id, game_id, title, content, is_pinned, reminder_enabled,
     remind_next_session, recurring_days, last_reminded_at, last_shown_at,
     is_dismissed, created_at, updated_at";

/// Result of a request that would make a note count toward the global cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// The note was inactive or dismissed and is now armed.
    Activated,
    /// The note was already active; its triggers were updated in place.
    Updated,
    CapacityExceeded { active: i64 },
    NotFound,
}

fn row_to_note(row: &Row) -> Result<NoteReminder> {
    let recurring_days: Option<i64> = row.get("recurring_days")?;
    let last_reminded_at: Option<String> = row.get("last_reminded_at")?;
    let last_shown_at: Option<String> = row.get("last_shown_at")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(NoteReminder {
        id: row.get("id")?,
        game_id: row.get("game_id")?,
        title: row.get("title")?,
        content: row.get("content")?,
        reminder_enabled: row.get("reminder_enabled")?,
        remind_next_session: row.get("remind_next_session")?,
        recurring_days: parse_recurring_days(recurring_days)?,
        last_reminded_at: parse_optional_datetime(last_reminded_at, "last_reminded_at")?,
        last_shown_at: parse_optional_datetime(last_shown_at, "last_shown_at")?,
        is_dismissed: row.get("is_dismissed")?,
        is_pinned: row.get("is_pinned")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

fn load_note(conn: &Connection, note_id: &str) -> Result<Option<NoteReminder>> {
    let note = conn
        .query_row(
            &format!("SELECT {NOTE_COLUMNS} FROM game_notes WHERE id = ?1"),
            params![note_id],
            |row| Ok(row_to_note(row)),
        )
        .optional()?
        .transpose()?;
    Ok(note)
}

fn count_active(conn: &Connection) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM game_notes WHERE reminder_enabled = 1 AND is_dismissed = 0",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Pinned first, then most recently updated.
fn sort_for_display(notes: &mut [NoteReminder]) {
    notes.sort_by(|a, b| {
        b.is_pinned
            .cmp(&a.is_pinned)
            .then_with(|| b.updated_at.cmp(&a.updated_at))
            .then_with(|| a.id.cmp(&b.id))
    });
}

impl Database {
    pub async fn create_note(
        &self,
        game_id: &str,
        title: &str,
        content: &str,
        is_pinned: bool,
    ) -> Result<NoteReminder> {
        let game_id = game_id.to_string();
        let title = title.to_string();
        let content = content.to_string();
        self.execute(move |conn| {
            let id = Uuid::new_v4().to_string();
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO game_notes (id, game_id, title, content, is_pinned, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                params![id, game_id, title, content, is_pinned, now],
            )?;

            load_note(conn, &id)?.ok_or_else(|| anyhow!("Note not found after insert"))
        })
        .await
    }

    pub async fn get_note(&self, note_id: &str) -> Result<Option<NoteReminder>> {
        let note_id = note_id.to_string();
        self.execute(move |conn| load_note(conn, &note_id)).await
    }

    /// Notes of `game_id` that are due at `now`, pinned first then most
    /// recently updated, at most `limit` of them. Malformed rows are logged
    /// and skipped.
    pub async fn query_due_notes(
        &self,
        game_id: &str,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<NoteReminder>> {
        let game_id = game_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {NOTE_COLUMNS} FROM game_notes
                 WHERE game_id = ?1
                   AND reminder_enabled = 1
                   AND is_dismissed = 0
                   AND (remind_next_session = 1 OR recurring_days IS NOT NULL)
                 ORDER BY is_pinned DESC, updated_at DESC"
            ))?;

            let mut rows = stmt.query(params![game_id])?;
            let mut due = Vec::new();
            while let Some(row) = rows.next()? {
                let note = match row_to_note(row) {
                    Ok(note) => note,
                    Err(err) => {
                        let id: Option<String> = row.get("id").ok();
                        log_warn!(
                            "skipping malformed reminder row {}: {err:#}",
                            id.as_deref().unwrap_or("<unknown>")
                        );
                        continue;
                    }
                };
                if note.is_due(now) {
                    due.push(note);
                }
            }

            sort_for_display(&mut due);
            due.truncate(limit);
            Ok(due)
        })
        .await
    }

    /// Mark notes as shown at `now` and consume the triggers that fired, in
    /// one transaction. Returns how many notes were updated.
    pub async fn consume_notes(&self, note_ids: Vec<String>, now: DateTime<Utc>) -> Result<usize> {
        if note_ids.is_empty() {
            return Ok(0);
        }

        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let mut consumed = 0;
            let shown_at = now.to_rfc3339();

            for note_id in &note_ids {
                let Some(note) = load_note(&tx, note_id)? else {
                    log_warn!("cannot consume missing note {note_id}");
                    continue;
                };
                let fired = note.fired_triggers(now).unwrap_or_default();

                let remind_next_session = note.remind_next_session && !fired.one_shot;
                // A spent one-shot with no recurrence leaves nothing armed.
                let reminder_enabled =
                    note.reminder_enabled && !(fired.one_shot && note.recurring_days.is_none());
                let last_reminded_at = if fired.recurring {
                    Some(shown_at.clone())
                } else {
                    note.last_reminded_at.map(|dt| dt.to_rfc3339())
                };

                consumed += tx.execute(
                    "UPDATE game_notes
                     SET last_shown_at = ?1,
                         remind_next_session = ?2,
                         reminder_enabled = ?3,
                         last_reminded_at = ?4
                     WHERE id = ?5",
                    params![
                        shown_at,
                        remind_next_session,
                        reminder_enabled,
                        last_reminded_at,
                        note_id,
                    ],
                )?;
                log_debug!(
                    "consumed note {note_id} (one_shot={}, recurring={})",
                    fired.one_shot,
                    fired.recurring
                );
            }

            tx.commit()?;
            Ok(consumed)
        })
        .await
    }

    /// Notes across the whole store that count toward the global cap.
    pub async fn count_active_reminders(&self) -> Result<i64> {
        self.execute(|conn| count_active(conn)).await
    }

    /// Arm `schedule` on a note. The cap is checked inside the same DB task so
    /// concurrent activations cannot overshoot it.
    pub async fn enable_reminder(
        &self,
        note_id: &str,
        schedule: ReminderSchedule,
        cap: i64,
    ) -> Result<ActivationOutcome> {
        let note_id = note_id.to_string();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let Some(note) = load_note(&tx, &note_id)? else {
                return Ok(ActivationOutcome::NotFound);
            };

            let was_active = note.is_active();
            if !was_active {
                let active = count_active(&tx)?;
                if active >= cap {
                    return Ok(ActivationOutcome::CapacityExceeded { active });
                }
            }

            tx.execute(
                "UPDATE game_notes
                 SET reminder_enabled = 1,
                     is_dismissed = 0,
                     remind_next_session = ?1,
                     recurring_days = ?2,
                     updated_at = ?3
                 WHERE id = ?4",
                params![
                    schedule.one_shot,
                    schedule.recurring_days,
                    Utc::now().to_rfc3339(),
                    note_id,
                ],
            )?;
            tx.commit()?;

            Ok(if was_active {
                ActivationOutcome::Updated
            } else {
                ActivationOutcome::Activated
            })
        })
        .await
    }

    /// Undo a dismissal. A note with no trigger left gets its one-shot
    /// trigger armed so it surfaces on the next session.
    pub async fn rearm_reminder(&self, note_id: &str, cap: i64) -> Result<ActivationOutcome> {
        let note_id = note_id.to_string();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let Some(note) = load_note(&tx, &note_id)? else {
                return Ok(ActivationOutcome::NotFound);
            };

            let was_active = note.is_active();
            if !was_active {
                let active = count_active(&tx)?;
                if active >= cap {
                    return Ok(ActivationOutcome::CapacityExceeded { active });
                }
            }

            tx.execute(
                "UPDATE game_notes
                 SET reminder_enabled = 1,
                     is_dismissed = 0,
                     remind_next_session = ?1,
                     updated_at = ?2
                 WHERE id = ?3",
                params![
                    note.remind_next_session || !note.has_trigger(),
                    Utc::now().to_rfc3339(),
                    note_id,
                ],
            )?;
            tx.commit()?;

            Ok(if was_active {
                ActivationOutcome::Updated
            } else {
                ActivationOutcome::Activated
            })
        })
        .await
    }

    /// "Stop forever": the note leaves evaluation until re-armed. Returns
    /// false when the note does not exist.
    pub async fn dismiss_reminder(&self, note_id: &str) -> Result<bool> {
        let note_id = note_id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE game_notes SET is_dismissed = 1, updated_at = ?1 WHERE id = ?2",
                params![Utc::now().to_rfc3339(), note_id],
            )?;
            Ok(rows_affected > 0)
        })
        .await
    }

    /// Clear every trigger and return the note to the inactive state.
    pub async fn disable_reminder(&self, note_id: &str) -> Result<bool> {
        let note_id = note_id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE game_notes
                 SET reminder_enabled = 0,
                     remind_next_session = 0,
                     recurring_days = NULL,
                     is_dismissed = 0,
                     updated_at = ?1
                 WHERE id = ?2",
                params![Utc::now().to_rfc3339(), note_id],
            )?;
            Ok(rows_affected > 0)
        })
        .await
    }
}
