//! Play-session lifetime derived from the resolved game identity.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Whole seconds between `started_at` and `now`, never negative.
pub fn elapsed(now: DateTime<Utc>, started_at: DateTime<Utc>) -> u64 {
    u64::try_from((now - started_at).num_seconds()).unwrap_or(0)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub game_id: String,
    pub started_at: DateTime<Utc>,
    /// Process that was matched when the session began, if known.
    pub pid: Option<u32>,
    pub exe_path: Option<String>,
}

impl Session {
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> u64 {
        elapsed(now, self.started_at)
    }
}

/// A session that just ended, ready for the play-history recorder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedSession {
    pub session: Session,
    pub ended_at: DateTime<Utc>,
}

impl FinishedSession {
    pub fn duration_seconds(&self) -> u64 {
        elapsed(self.ended_at, self.session.started_at)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionTransition {
    Started { finished: Option<FinishedSession> },
    Cleared { finished: FinishedSession },
    Unchanged,
}

impl SessionTransition {
    pub fn finished(&self) -> Option<&FinishedSession> {
        match self {
            SessionTransition::Started { finished } => finished.as_ref(),
            SessionTransition::Cleared { finished } => Some(finished),
            SessionTransition::Unchanged => None,
        }
    }
}

/// Snapshot of the active session for publishing.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub game_id: String,
    pub started_at: DateTime<Utc>,
    pub elapsed_seconds: u64,
}

/// Optional process details attached to a newly started session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionOrigin {
    pub pid: Option<u32>,
    pub exe_path: Option<String>,
}

#[derive(Debug, Default)]
pub struct SessionTracker {
    active: Option<Session>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<&Session> {
        self.active.as_ref()
    }

    /// Feed one resolved game id. A new id replaces the running session, a
    /// missing id clears it, the same id is a no-op.
    pub fn observe(
        &mut self,
        game_id: Option<&str>,
        origin: SessionOrigin,
        now: DateTime<Utc>,
    ) -> SessionTransition {
        let current = self.active.as_ref().map(|session| session.game_id.as_str());
        match game_id {
            Some(id) if current == Some(id) => SessionTransition::Unchanged,
            Some(id) => {
                let next = Session {
                    game_id: id.to_string(),
                    started_at: now,
                    pid: origin.pid,
                    exe_path: origin.exe_path,
                };
                let finished = self.active.replace(next).map(|session| FinishedSession {
                    session,
                    ended_at: now,
                });
                SessionTransition::Started { finished }
            }
            None => match self.finish(now) {
                Some(finished) => SessionTransition::Cleared { finished },
                None => SessionTransition::Unchanged,
            },
        }
    }

    /// End the active session without a transition, e.g. on shutdown.
    pub fn finish(&mut self, now: DateTime<Utc>) -> Option<FinishedSession> {
        self.active.take().map(|session| FinishedSession {
            session,
            ended_at: now,
        })
    }

    pub fn view(&self, now: DateTime<Utc>) -> Option<SessionView> {
        self.active.as_ref().map(|session| SessionView {
            game_id: session.game_id.clone(),
            started_at: session.started_at,
            elapsed_seconds: session.elapsed_seconds(now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_reset_law() {
        let mut tracker = SessionTracker::new();
        let t0 = Utc::now();
        let sequence = [Some("g1"), Some("g1"), Some("g2"), None, Some("g1")];

        let mut starts = 0;
        let mut clears = 0;
        for (i, id) in sequence.into_iter().enumerate() {
            let now = t0 + Duration::seconds(i as i64 * 10);
            match tracker.observe(id, SessionOrigin::default(), now) {
                SessionTransition::Started { .. } => starts += 1,
                SessionTransition::Cleared { .. } => clears += 1,
                SessionTransition::Unchanged => {}
            }
        }

        assert_eq!(starts, 3);
        assert_eq!(clears, 1);
        assert_eq!(tracker.active().map(|s| s.game_id.as_str()), Some("g1"));
    }

    #[test]
    fn test_replacement_returns_finished_session() {
        let mut tracker = SessionTracker::new();
        let t0 = Utc::now();
        let origin = SessionOrigin {
            pid: Some(7),
            exe_path: Some("C:\\g1.exe".into()),
        };
        tracker.observe(Some("g1"), origin, t0);

        let transition = tracker.observe(
            Some("g2"),
            SessionOrigin::default(),
            t0 + Duration::seconds(90),
        );

        let finished = transition.finished().unwrap();
        assert_eq!(finished.session.game_id, "g1");
        assert_eq!(finished.session.pid, Some(7));
        assert_eq!(finished.duration_seconds(), 90);
    }

    #[test]
    fn test_same_id_keeps_start_time() {
        let mut tracker = SessionTracker::new();
        let t0 = Utc::now();
        tracker.observe(Some("g1"), SessionOrigin::default(), t0);
        tracker.observe(Some("g1"), SessionOrigin::default(), t0 + Duration::seconds(5));

        let view = tracker.view(t0 + Duration::seconds(12)).unwrap();
        assert_eq!(view.started_at, t0);
        assert_eq!(view.elapsed_seconds, 12);
    }

    #[test]
    fn test_clear_without_session_is_noop() {
        let mut tracker = SessionTracker::new();
        assert_eq!(
            tracker.observe(None, SessionOrigin::default(), Utc::now()),
            SessionTransition::Unchanged
        );
        assert!(tracker.view(Utc::now()).is_none());
    }

    #[test]
    fn test_elapsed_never_negative() {
        let now = Utc::now();
        assert_eq!(elapsed(now, now + Duration::seconds(30)), 0);
        assert_eq!(elapsed(now + Duration::seconds(61), now), 61);
    }
}
