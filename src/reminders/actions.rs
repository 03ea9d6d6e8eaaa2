//! Explicit reminder actions. These are the only paths that surface
//! `CapacityExceeded` to the user.

use crate::{
    db::{ActivationOutcome, Database, NoteReminder, ReminderSchedule},
    error::OverlayError,
};

use super::MAX_ACTIVE_REMINDERS;

const ENABLE_LOGS: bool = true;

use crate::log_info;

fn validate(schedule: &ReminderSchedule) -> Result<(), OverlayError> {
    if schedule.recurring_days == Some(0) {
        return Err(OverlayError::InvalidInput {
            field: "recurring_days",
            reason: "must be at least 1".into(),
        });
    }
    if !schedule.has_trigger() {
        return Err(OverlayError::InvalidInput {
            field: "schedule",
            reason: "a reminder needs a one-shot or recurring trigger".into(),
        });
    }
    Ok(())
}

async fn finish_activation(
    db: &Database,
    note_id: &str,
    outcome: ActivationOutcome,
) -> Result<NoteReminder, OverlayError> {
    match outcome {
        ActivationOutcome::Activated | ActivationOutcome::Updated => db
            .get_note(note_id)
            .await?
            .ok_or(OverlayError::NotFound { entity: "note" }),
        ActivationOutcome::CapacityExceeded { active } => {
            log_info!("rejected reminder {note_id}: {active} already active");
            Err(OverlayError::CapacityExceeded {
                cap: MAX_ACTIVE_REMINDERS,
            })
        }
        ActivationOutcome::NotFound => Err(OverlayError::NotFound { entity: "note" }),
    }
}

pub async fn enable_reminder(
    db: &Database,
    note_id: &str,
    schedule: ReminderSchedule,
) -> Result<NoteReminder, OverlayError> {
    validate(&schedule)?;
    let outcome = db
        .enable_reminder(note_id, schedule, MAX_ACTIVE_REMINDERS)
        .await?;
    finish_activation(db, note_id, outcome).await
}

/// Bring a dismissed note back. Cap checked like a fresh enable.
pub async fn rearm_reminder(db: &Database, note_id: &str) -> Result<NoteReminder, OverlayError> {
    let outcome = db.rearm_reminder(note_id, MAX_ACTIVE_REMINDERS).await?;
    finish_activation(db, note_id, outcome).await
}

pub async fn dismiss_reminder(db: &Database, note_id: &str) -> Result<(), OverlayError> {
    if db.dismiss_reminder(note_id).await? {
        Ok(())
    } else {
        Err(OverlayError::NotFound { entity: "note" })
    }
}

pub async fn disable_reminder(db: &Database, note_id: &str) -> Result<(), OverlayError> {
    if db.disable_reminder(note_id).await? {
        Ok(())
    } else {
        Err(OverlayError::NotFound { entity: "note" })
    }
}
