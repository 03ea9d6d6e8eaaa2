//! Game notes and their reminder triggers.
//!
//! A note carries two independent triggers: a one-shot "remind me next
//! session" flag and an optional recurrence interval in days. Which of them
//! fired decides how the note is consumed once shown.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whole days between `then` and `now`, floored. Negative when `then` is in
/// the future.
pub fn days_since(now: DateTime<Utc>, then: DateTime<Utc>) -> i64 {
    (now - then).num_days()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NoteReminder {
    pub id: String,
    pub game_id: String,
    pub title: String,
    pub content: String,
    pub reminder_enabled: bool,
    pub remind_next_session: bool,
    pub recurring_days: Option<u32>,
    pub last_reminded_at: Option<DateTime<Utc>>,
    pub last_shown_at: Option<DateTime<Utc>>,
    pub is_dismissed: bool,
    pub is_pinned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Triggers that made a note due at a given instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FiredTriggers {
    pub one_shot: bool,
    pub recurring: bool,
}

/// Requested trigger set for an explicit enable action.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReminderSchedule {
    pub one_shot: bool,
    pub recurring_days: Option<u32>,
}

impl ReminderSchedule {
    pub fn one_shot() -> Self {
        Self {
            one_shot: true,
            recurring_days: None,
        }
    }

    pub fn every_days(days: u32) -> Self {
        Self {
            one_shot: false,
            recurring_days: Some(days),
        }
    }

    pub fn has_trigger(&self) -> bool {
        self.one_shot || self.recurring_days.is_some()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "state")]
pub enum ReminderState {
    Inactive,
    Armed {
        one_shot: bool,
        recurring_days: Option<u32>,
    },
    Dismissed,
}

impl NoteReminder {
    /// Counts toward the global active-reminder cap.
    pub fn is_active(&self) -> bool {
        self.reminder_enabled && !self.is_dismissed
    }

    pub fn has_trigger(&self) -> bool {
        self.remind_next_session || self.recurring_days.is_some()
    }

    pub fn recurrence_elapsed(&self, now: DateTime<Utc>) -> bool {
        match (self.recurring_days, self.last_reminded_at) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(days), Some(last)) => days_since(now, last) >= i64::from(days),
        }
    }

    /// `None` when the note is not due for its game at `now`.
    pub fn fired_triggers(&self, now: DateTime<Utc>) -> Option<FiredTriggers> {
        if !self.is_active() {
            return None;
        }

        let fired = FiredTriggers {
            one_shot: self.remind_next_session,
            recurring: self.recurrence_elapsed(now),
        };

        (fired.one_shot || fired.recurring).then_some(fired)
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.fired_triggers(now).is_some()
    }

    pub fn state(&self) -> ReminderState {
        if self.is_dismissed {
            ReminderState::Dismissed
        } else if self.reminder_enabled && self.has_trigger() {
            ReminderState::Armed {
                one_shot: self.remind_next_session,
                recurring_days: self.recurring_days,
            }
        } else {
            ReminderState::Inactive
        }
    }
}
