use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::info;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    db::{Database, NoteReminder, ReminderSchedule},
    error::OverlayError,
    platform::{WindowKey, WindowSource},
    reminders,
    settings::OverlaySettings,
};

use super::{
    library::GameLibrary,
    loop_worker::{overlay_loop, Command, LoopContext},
    state::OverlayState,
};

const COMMAND_BUFFER: usize = 32;

/// Owns the overlay poll loop. Create one per process, `start()` it, and
/// `stop()` it on shutdown so the running session is recorded.
pub struct OverlayController {
    db: Database,
    source: Arc<dyn WindowSource>,
    library: GameLibrary,
    settings: OverlaySettings,
    state_tx: Arc<watch::Sender<OverlayState>>,
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
    commands: Option<mpsc::Sender<Command>>,
}

impl OverlayController {
    pub fn new(
        db: Database,
        source: Arc<dyn WindowSource>,
        library: GameLibrary,
        settings: OverlaySettings,
    ) -> Self {
        let (state_tx, _) = watch::channel(OverlayState::default());
        Self {
            db,
            source,
            library,
            settings,
            state_tx: Arc::new(state_tx),
            handle: None,
            cancel_token: None,
            commands: None,
        }
    }

    pub fn start(&mut self) -> Result<()> {
        if self.handle.is_some() {
            bail!("overlay controller already running");
        }

        let cancel_token = CancellationToken::new();
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let ctx = LoopContext {
            db: self.db.clone(),
            source: Arc::clone(&self.source),
            library: self.library.clone(),
            settings: self.settings.clone(),
            state_tx: Arc::clone(&self.state_tx),
        };

        self.handle = Some(tokio::spawn(overlay_loop(ctx, command_rx, cancel_token.clone())));
        self.cancel_token = Some(cancel_token);
        self.commands = Some(command_tx);
        info!(
            "Overlay controller started (poll every {}s)",
            self.settings.poll_interval().as_secs()
        );
        Ok(())
    }

    /// Cancel the loop and wait for it to record the running session.
    pub async fn stop(&mut self) -> Result<()> {
        self.commands = None;
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("overlay loop task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn subscribe(&self) -> watch::Receiver<OverlayState> {
        self.state_tx.subscribe()
    }

    pub fn state(&self) -> OverlayState {
        self.state_tx.borrow().clone()
    }

    pub fn library(&self) -> &GameLibrary {
        &self.library
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, OverlayError> {
        let commands = self.commands.as_ref().ok_or(OverlayError::ControllerStopped)?;
        let (reply_tx, reply_rx) = oneshot::channel();
        commands
            .send(build(reply_tx))
            .await
            .map_err(|_| OverlayError::ControllerStopped)?;
        reply_rx.await.map_err(|_| OverlayError::ControllerStopped)
    }

    /// Cache the foreground window, mark the overlay visible and poll now.
    pub async fn show(&self) -> Result<(), OverlayError> {
        self.request(|reply| Command::SetVisible {
            visible: true,
            reply,
        })
        .await
    }

    pub async fn hide(&self) -> Result<(), OverlayError> {
        self.request(|reply| Command::SetVisible {
            visible: false,
            reply,
        })
        .await
    }

    /// Run one poll and wait until its state is published.
    pub async fn refresh(&self) -> Result<(), OverlayError> {
        self.request(|reply| Command::Refresh { reply }).await
    }

    pub async fn select_window(&self, key: WindowKey) -> Result<(), OverlayError> {
        self.request(|reply| Command::SelectWindow { key, reply })
            .await?
    }

    /// Override the matcher with a library game, or clear the override.
    pub async fn pin_game(&self, game_id: Option<&str>) -> Result<(), OverlayError> {
        let game_id = game_id.map(str::to_string);
        self.request(|reply| Command::PinGame { game_id, reply })
            .await?
    }

    /// Stop a reminder forever and drop it from the published list.
    pub async fn dismiss_reminder(&self, note_id: &str) -> Result<(), OverlayError> {
        let note_id = note_id.to_string();
        self.request(|reply| Command::DismissReminder { note_id, reply })
            .await?
    }

    pub async fn enable_reminder(
        &self,
        note_id: &str,
        schedule: ReminderSchedule,
    ) -> Result<NoteReminder, OverlayError> {
        reminders::enable_reminder(&self.db, note_id, schedule).await
    }

    pub async fn rearm_reminder(&self, note_id: &str) -> Result<NoteReminder, OverlayError> {
        reminders::rearm_reminder(&self.db, note_id).await
    }

    pub async fn disable_reminder(&self, note_id: &str) -> Result<(), OverlayError> {
        reminders::disable_reminder(&self.db, note_id).await
    }

    /// Re-read the game list from the store and poll against it.
    pub async fn reload_library(&self) -> Result<usize, OverlayError> {
        let count = self.library.reload(&self.db).await?;
        if self.is_running() {
            self.refresh().await?;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::GameRecord;
    use crate::platform::{StaticWindowSource, WindowInfo};
    use crate::test_utils::setup_test_db;

    const ER_EXE: &str = "C:\\Games\\ELDEN RING\\Game\\eldenring.exe";
    const CELESTE_EXE: &str = "D:\\Games\\Celeste\\Celeste.exe";

    fn window(pid: u32, title: &str, exe: &str, foreground: bool) -> WindowInfo {
        WindowInfo {
            process_id: pid,
            title: title.into(),
            process_name: exe.rsplit('\\').next().unwrap_or_default().into(),
            executable_path: exe.into(),
            is_foreground: foreground,
        }
    }

    struct Harness {
        controller: OverlayController,
        source: Arc<StaticWindowSource>,
        db: Database,
        _dir: tempfile::TempDir,
    }

    /// Controller over a store holding Elden Ring and Celeste. Not started,
    /// so tests can seed notes before the first poll.
    async fn harness(windows: Vec<WindowInfo>, settings: OverlaySettings) -> Harness {
        let (db, dir) = setup_test_db();
        db.upsert_game(&GameRecord::new("er", "Elden Ring", Some(ER_EXE)))
            .await
            .unwrap();
        db.upsert_game(&GameRecord::new("celeste", "Celeste", Some(CELESTE_EXE)))
            .await
            .unwrap();

        let source = Arc::new(StaticWindowSource::new(windows));
        let library = GameLibrary::load(&db).await.unwrap();
        let controller = OverlayController::new(db.clone(), source.clone(), library, settings);

        Harness {
            controller,
            source,
            db,
            _dir: dir,
        }
    }

    fn no_min_session() -> OverlaySettings {
        OverlaySettings {
            min_recorded_session_secs: 0,
            ..OverlaySettings::default()
        }
    }

    #[tokio::test]
    async fn test_refresh_publishes_match_session_and_reminders() {
        let mut h = harness(
            vec![window(10, "ELDEN RING", ER_EXE, true)],
            OverlaySettings::default(),
        )
        .await;
        let note = h.db.create_note("er", "Varre", "", true).await.unwrap();
        h.controller
            .enable_reminder(&note.id, ReminderSchedule::one_shot())
            .await
            .unwrap();
        h.controller.start().unwrap();

        h.controller.refresh().await.unwrap();
        let state = h.controller.state();

        assert_eq!(state.matched_game_id(), Some("er"));
        assert_eq!(state.match_tier, Some(crate::matcher::MatchTier::ExactSelected));
        assert_eq!(state.session.as_ref().map(|s| s.game_id.as_str()), Some("er"));
        assert_eq!(state.due_reminders.len(), 1);

        // Same game on the next poll: list kept, no second consumption.
        h.controller.refresh().await.unwrap();
        assert_eq!(h.controller.state().due_reminders.len(), 1);
        let stored = h.db.get_note(&note.id).await.unwrap().unwrap();
        assert!(!stored.remind_next_session);
    }

    #[tokio::test]
    async fn test_game_change_records_play_history() {
        let mut h = harness(vec![window(10, "ELDEN RING", ER_EXE, true)], no_min_session()).await;
        h.controller.start().unwrap();
        h.controller.refresh().await.unwrap();

        h.source.set_windows(vec![window(11, "Celeste", CELESTE_EXE, true)]);
        h.controller.refresh().await.unwrap();
        assert_eq!(h.controller.state().matched_game_id(), Some("celeste"));

        let sessions = h.db.list_play_sessions("er", 10).await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].pid, Some(10));
        assert_eq!(sessions[0].exe_path.as_deref(), Some(ER_EXE));

        h.controller.stop().await.unwrap();
        assert_eq!(h.db.list_play_sessions("celeste", 10).await.unwrap().len(), 1);
        assert!(h.controller.state().session.is_none());
    }

    #[tokio::test]
    async fn test_short_sessions_not_recorded() {
        let mut h = harness(
            vec![window(10, "ELDEN RING", ER_EXE, true)],
            OverlaySettings::default(),
        )
        .await;
        h.controller.start().unwrap();
        h.controller.refresh().await.unwrap();
        h.source.set_windows(Vec::new());
        h.controller.refresh().await.unwrap();

        assert!(h.controller.state().session.is_none());
        assert!(h.db.list_play_sessions("er", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_failure_degrades_to_no_windows() {
        let mut h = harness(
            vec![window(10, "ELDEN RING", ER_EXE, true)],
            OverlaySettings::default(),
        )
        .await;
        h.controller.start().unwrap();
        h.controller.refresh().await.unwrap();

        h.source.set_failing(true);
        h.controller.refresh().await.unwrap();
        let state = h.controller.state();
        assert!(state.windows.is_empty());
        assert!(state.matched_game.is_none());
        assert!(state.session.is_none());

        h.source.set_failing(false);
        h.controller.refresh().await.unwrap();
        assert_eq!(h.controller.state().matched_game_id(), Some("er"));
    }

    #[tokio::test]
    async fn test_select_window_and_pin_game() {
        let er = window(10, "ELDEN RING", ER_EXE, true);
        let celeste = window(11, "Celeste", CELESTE_EXE, false);
        let mut h = harness(vec![er, celeste.clone()], OverlaySettings::default()).await;
        h.controller.start().unwrap();
        h.controller.refresh().await.unwrap();
        assert_eq!(h.controller.state().matched_game_id(), Some("er"));

        h.controller.select_window(celeste.key()).await.unwrap();
        let state = h.controller.state();
        assert_eq!(state.matched_game_id(), Some("celeste"));
        assert_eq!(state.selected_window, Some(celeste.key()));

        let missing = WindowKey {
            process_id: 99,
            title: "gone".into(),
        };
        assert!(matches!(
            h.controller.select_window(missing).await,
            Err(OverlayError::NotFound { entity: "window" })
        ));

        h.controller.pin_game(Some("er")).await.unwrap();
        let state = h.controller.state();
        assert_eq!(state.matched_game_id(), Some("er"));
        assert_eq!(state.pinned_game_id.as_deref(), Some("er"));
        assert!(state.match_tier.is_none());

        assert!(matches!(
            h.controller.pin_game(Some("nope")).await,
            Err(OverlayError::NotFound { entity: "game" })
        ));

        h.controller.pin_game(None).await.unwrap();
        assert_eq!(h.controller.state().matched_game_id(), Some("celeste"));
    }

    #[tokio::test]
    async fn test_dismiss_removes_published_reminder() {
        let mut h = harness(
            vec![window(10, "ELDEN RING", ER_EXE, true)],
            OverlaySettings::default(),
        )
        .await;
        let note = h.db.create_note("er", "Weekly", "", false).await.unwrap();
        h.controller
            .enable_reminder(&note.id, ReminderSchedule::every_days(7))
            .await
            .unwrap();
        h.controller.start().unwrap();
        h.controller.refresh().await.unwrap();
        assert_eq!(h.controller.state().due_reminders.len(), 1);

        h.controller.dismiss_reminder(&note.id).await.unwrap();

        assert!(h.controller.state().due_reminders.is_empty());
        assert_eq!(h.db.count_active_reminders().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_show_hide_and_subscribe() {
        let mut h = harness(
            vec![window(10, "ELDEN RING", ER_EXE, true)],
            OverlaySettings::default(),
        )
        .await;
        h.controller.start().unwrap();
        let mut rx = h.controller.subscribe();

        h.controller.show().await.unwrap();
        assert!(rx.borrow_and_update().visible);
        assert_eq!(
            h.source.last_foreground_window().map(|w| w.process_id),
            Some(10)
        );

        h.controller.hide().await.unwrap();
        assert!(!rx.borrow_and_update().visible);
        assert!(h.source.last_foreground_window().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_tick_advances_without_polling() {
        let settings = OverlaySettings {
            poll_interval_secs: 3600,
            ..OverlaySettings::default()
        };
        let mut h = harness(vec![window(10, "ELDEN RING", ER_EXE, true)], settings).await;
        h.controller.start().unwrap();
        h.controller.refresh().await.unwrap();
        let mut rx = h.controller.subscribe();

        tokio::time::timeout(std::time::Duration::from_secs(60), async {
            loop {
                let elapsed = rx
                    .borrow_and_update()
                    .session
                    .as_ref()
                    .map_or(0, |s| s.elapsed_seconds);
                if elapsed >= 3 {
                    break;
                }
                rx.changed().await.unwrap();
            }
        })
        .await
        .unwrap();

        // Only the startup poll and the explicit refresh ran.
        assert!(h.source.snapshots_taken() <= 2);
        assert_eq!(h.controller.state().matched_game_id(), Some("er"));
    }

    #[tokio::test]
    async fn test_reload_library_picks_up_new_games() {
        let mut h = harness(
            vec![window(12, "Hades", "E:\\Hades\\Hades.exe", true)],
            OverlaySettings::default(),
        )
        .await;
        h.controller.start().unwrap();
        h.controller.refresh().await.unwrap();
        assert!(h.controller.state().matched_game.is_none());

        h.db.upsert_game(&GameRecord::new("hades", "Hades", None))
            .await
            .unwrap();
        assert_eq!(h.controller.reload_library().await.unwrap(), 3);

        let state = h.controller.state();
        assert_eq!(state.matched_game_id(), Some("hades"));
        assert_eq!(state.match_tier, Some(crate::matcher::MatchTier::FuzzySelected));
    }

    #[tokio::test]
    async fn test_commands_fail_after_stop() {
        let mut h = harness(Vec::new(), OverlaySettings::default()).await;
        h.controller.start().unwrap();
        assert!(h.controller.start().is_err());

        h.controller.stop().await.unwrap();

        assert!(!h.controller.is_running());
        assert!(matches!(
            h.controller.refresh().await,
            Err(OverlayError::ControllerStopped)
        ));
    }
}
