use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::db::{Database, NoteReminder};

use super::MAX_DUE_REMINDERS;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// Fetch the notes due for `game_id` and consume their triggers.
pub async fn due_reminders(
    db: &Database,
    game_id: &str,
    now: DateTime<Utc>,
) -> Result<Vec<NoteReminder>> {
    let due = db
        .query_due_notes(game_id, now, MAX_DUE_REMINDERS)
        .await
        .context("failed to query due reminders")?;

    if !due.is_empty() {
        let ids = due.iter().map(|note| note.id.clone()).collect();
        db.consume_notes(ids, now)
            .await
            .context("failed to consume reminders")?;
    }

    Ok(due)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// Same game as last time; keep the published list.
    Unchanged,
    Updated(Vec<NoteReminder>),
}

/// Runs the reminder query once per change of resolved game.
pub struct ReminderEvaluator {
    db: Database,
    evaluated_for: Option<String>,
}

impl ReminderEvaluator {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            evaluated_for: None,
        }
    }

    pub async fn evaluate(&mut self, game_id: Option<&str>, now: DateTime<Utc>) -> Evaluation {
        if game_id == self.evaluated_for.as_deref() {
            return Evaluation::Unchanged;
        }

        let Some(game_id) = game_id else {
            self.evaluated_for = None;
            return Evaluation::Updated(Vec::new());
        };

        match due_reminders(&self.db, game_id, now).await {
            Ok(due) => {
                log_debug!("{} reminder(s) due for {game_id}", due.len());
                self.evaluated_for = Some(game_id.to_string());
                Evaluation::Updated(due)
            }
            Err(err) => {
                // Left unmarked so the next poll retries.
                log_warn!("reminder evaluation for {game_id} failed: {err:#}");
                Evaluation::Updated(Vec::new())
            }
        }
    }

    /// Forget the last evaluated game so the next poll evaluates again.
    pub fn reset(&mut self) {
        self.evaluated_for = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{GameRecord, ReminderSchedule};
    use crate::reminders::MAX_ACTIVE_REMINDERS;
    use crate::test_utils::setup_test_db;
    use chrono::Duration;

    async fn game_with_notes(db: &Database, game_id: &str, count: usize) -> Vec<String> {
        db.upsert_game(&GameRecord::new(game_id, game_id, None))
            .await
            .unwrap();
        let mut ids = Vec::new();
        for i in 0..count {
            let note = db
                .create_note(game_id, &format!("note {i}"), "", false)
                .await
                .unwrap();
            db.enable_reminder(&note.id, ReminderSchedule::one_shot(), MAX_ACTIVE_REMINDERS)
                .await
                .unwrap();
            ids.push(note.id);
        }
        ids
    }

    #[tokio::test]
    async fn test_one_shot_returned_once() {
        let (db, _dir) = setup_test_db();
        game_with_notes(&db, "er", 1).await;
        let now = Utc::now();

        assert_eq!(due_reminders(&db, "er", now).await.unwrap().len(), 1);
        assert!(due_reminders(&db, "er", now).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_capped_at_six_per_call() {
        let (db, _dir) = setup_test_db();
        game_with_notes(&db, "er", 8).await;
        let now = Utc::now();

        assert_eq!(due_reminders(&db, "er", now).await.unwrap().len(), 6);
        assert_eq!(due_reminders(&db, "er", now).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_recurring_due_again_after_interval() {
        let (db, _dir) = setup_test_db();
        db.upsert_game(&GameRecord::new("er", "Elden Ring", None))
            .await
            .unwrap();
        let note = db.create_note("er", "Weekly", "", false).await.unwrap();
        db.enable_reminder(&note.id, ReminderSchedule::every_days(7), MAX_ACTIVE_REMINDERS)
            .await
            .unwrap();

        let now = Utc::now();
        assert_eq!(due_reminders(&db, "er", now).await.unwrap().len(), 1);
        assert!(due_reminders(&db, "er", now + Duration::days(3))
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            due_reminders(&db, "er", now + Duration::days(8))
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_evaluates_once_per_identity_change() {
        let (db, _dir) = setup_test_db();
        game_with_notes(&db, "g1", 1).await;
        let mut evaluator = ReminderEvaluator::new(db.clone());
        let now = Utc::now();

        match evaluator.evaluate(Some("g1"), now).await {
            Evaluation::Updated(due) => assert_eq!(due.len(), 1),
            other => panic!("expected update, got {other:?}"),
        }
        assert_eq!(evaluator.evaluate(Some("g1"), now).await, Evaluation::Unchanged);

        // Leaving the game clears the list; coming back evaluates again.
        let note = db.create_note("g1", "again", "", false).await.unwrap();
        db.enable_reminder(&note.id, ReminderSchedule::one_shot(), MAX_ACTIVE_REMINDERS)
            .await
            .unwrap();
        assert_eq!(evaluator.evaluate(None, now).await, Evaluation::Updated(Vec::new()));
        match evaluator.evaluate(Some("g1"), now).await {
            Evaluation::Updated(due) => assert_eq!(due[0].id, note.id),
            other => panic!("expected update, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failed_evaluation_is_retried() {
        let (db, _dir) = setup_test_db();
        game_with_notes(&db, "g1", 1).await;
        let mut evaluator = ReminderEvaluator::new(db.clone());
        let now = Utc::now();

        db.execute(|conn| {
            conn.execute_batch("ALTER TABLE game_notes RENAME TO game_notes_offline")?;
            Ok(())
        })
        .await
        .unwrap();
        assert_eq!(evaluator.evaluate(Some("g1"), now).await, Evaluation::Updated(Vec::new()));

        db.execute(|conn| {
            conn.execute_batch("ALTER TABLE game_notes_offline RENAME TO game_notes")?;
            Ok(())
        })
        .await
        .unwrap();
        match evaluator.evaluate(Some("g1"), now).await {
            Evaluation::Updated(due) => assert_eq!(due.len(), 1),
            other => panic!("expected update, got {other:?}"),
        }
        assert_eq!(evaluator.evaluate(Some("g1"), now).await, Evaluation::Unchanged);
    }
}
