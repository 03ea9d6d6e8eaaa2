use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::{
    sync::{mpsc, oneshot, watch},
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    db::{Database, PlaySessionRecord},
    error::OverlayError,
    matcher::{match_game, MatchConfig},
    platform::{WindowInfo, WindowKey, WindowSource},
    reminders::{self, Evaluation, ReminderEvaluator},
    session::{FinishedSession, SessionOrigin, SessionTracker},
    settings::OverlaySettings,
};

use super::{library::GameLibrary, state::OverlayState};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

pub(super) enum Command {
    Refresh {
        reply: oneshot::Sender<()>,
    },
    SetVisible {
        visible: bool,
        reply: oneshot::Sender<()>,
    },
    SelectWindow {
        key: WindowKey,
        reply: oneshot::Sender<Result<(), OverlayError>>,
    },
    PinGame {
        game_id: Option<String>,
        reply: oneshot::Sender<Result<(), OverlayError>>,
    },
    DismissReminder {
        note_id: String,
        reply: oneshot::Sender<Result<(), OverlayError>>,
    },
}

pub(super) struct LoopContext {
    pub db: Database,
    pub source: Arc<dyn WindowSource>,
    pub library: GameLibrary,
    pub settings: OverlaySettings,
    pub state_tx: Arc<watch::Sender<OverlayState>>,
}

struct Worker {
    ctx: LoopContext,
    match_config: MatchConfig,
    selected: Option<WindowKey>,
    pinned: Option<String>,
    tracker: SessionTracker,
    evaluator: ReminderEvaluator,
    state: OverlayState,
    /// Wall time of the last poll and the monotonic instant it was taken at.
    /// Ticks advance from here instead of reading the wall clock again.
    anchor: (DateTime<Utc>, Instant),
}

pub(super) async fn overlay_loop(
    ctx: LoopContext,
    mut commands: mpsc::Receiver<Command>,
    cancel_token: CancellationToken,
) {
    let mut poll_ticker = tokio::time::interval(ctx.settings.poll_interval());
    poll_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut session_ticker = tokio::time::interval(ctx.settings.tick_interval());
    session_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut worker = Worker::new(ctx);

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                worker.shutdown().await;
                log_info!("overlay loop shutting down");
                break;
            }
            _ = poll_ticker.tick() => worker.poll().await,
            _ = session_ticker.tick() => worker.tick(),
            command = commands.recv() => match command {
                Some(command) => worker.handle(command).await,
                None => {
                    worker.shutdown().await;
                    break;
                }
            },
        }
    }
}

impl Worker {
    fn new(ctx: LoopContext) -> Self {
        let evaluator = ReminderEvaluator::new(ctx.db.clone());
        let state = ctx.state_tx.borrow().clone();
        Self {
            ctx,
            match_config: MatchConfig::default(),
            selected: None,
            pinned: None,
            tracker: SessionTracker::new(),
            evaluator,
            state,
            anchor: (Utc::now(), Instant::now()),
        }
    }

    fn anchored_now(&self) -> DateTime<Utc> {
        let (wall, instant) = self.anchor;
        let since = chrono::Duration::from_std(instant.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        wall + since
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Refresh { reply } => {
                self.poll().await;
                let _ = reply.send(());
            }
            Command::SetVisible { visible, reply } => {
                if visible && !self.state.visible {
                    self.cache_foreground().await;
                }
                if !visible {
                    self.ctx.source.clear_foreground_window();
                }
                self.state.visible = visible;
                if visible {
                    self.poll().await;
                } else {
                    self.publish();
                }
                let _ = reply.send(());
            }
            Command::SelectWindow { key, reply } => {
                let result = if self.state.windows.iter().any(|w| w.has_key(&key)) {
                    log_debug!("window {key} selected manually");
                    self.selected = Some(key);
                    self.poll().await;
                    Ok(())
                } else {
                    Err(OverlayError::NotFound { entity: "window" })
                };
                report_rejection("select window", &result);
                let _ = reply.send(result);
            }
            Command::PinGame { game_id, reply } => {
                let known = match &game_id {
                    Some(id) => self.ctx.library.find(id).await.is_some(),
                    None => true,
                };
                let result = if known {
                    self.pinned = game_id;
                    self.poll().await;
                    Ok(())
                } else {
                    Err(OverlayError::NotFound { entity: "game" })
                };
                report_rejection("pin game", &result);
                let _ = reply.send(result);
            }
            Command::DismissReminder { note_id, reply } => {
                let result = reminders::dismiss_reminder(&self.ctx.db, &note_id).await;
                if result.is_ok() {
                    self.state.due_reminders.retain(|note| note.id != note_id);
                    self.publish();
                }
                report_rejection("dismiss reminder", &result);
                let _ = reply.send(result);
            }
        }
    }

    async fn cache_foreground(&self) {
        let source = Arc::clone(&self.ctx.source);
        if let Err(err) = tokio::task::spawn_blocking(move || source.cache_foreground_window()).await {
            log_warn!("foreground cache worker failed: {err}");
        }
    }

    async fn snapshot(&self) -> Vec<WindowInfo> {
        let source = Arc::clone(&self.ctx.source);
        let result = tokio::task::spawn_blocking(move || source.list_running_windows())
            .await
            .map_err(|err| OverlayError::SnapshotUnavailable(err.to_string()))
            .and_then(|listed| {
                listed.map_err(|err| OverlayError::SnapshotUnavailable(format!("{err:#}")))
            });

        result.unwrap_or_else(|err| {
            log_warn!("{err}");
            Vec::new()
        })
    }

    async fn poll(&mut self) {
        let now = Utc::now();
        self.anchor = (now, Instant::now());
        let windows = self.snapshot().await;
        let library = self.ctx.library.snapshot().await;
        let last_foreground = self.ctx.source.last_foreground_window();

        let outcome = match_game(
            &windows,
            &library,
            self.selected.as_ref(),
            last_foreground.as_ref(),
            &self.match_config,
        );
        if outcome.promoted() {
            log_debug!("selection promoted to {:?}", outcome.selected_key);
        }
        self.selected = outcome.selected_key.clone();

        let selected_window = self
            .selected
            .as_ref()
            .and_then(|key| windows.iter().find(|w| w.has_key(key)));

        let (game, tier, origin) = match self.pinned.as_deref() {
            Some(pinned_id) => match library.iter().find(|game| game.id == pinned_id) {
                Some(game) => (Some(game.clone()), None, SessionOrigin::default()),
                None => {
                    log_warn!("pinned game {pinned_id} left the library; unpinning");
                    self.pinned = None;
                    (outcome.game.clone(), outcome.tier, origin_of(selected_window))
                }
            },
            None => (outcome.game.clone(), outcome.tier, origin_of(selected_window)),
        };

        let game_id = game.as_ref().map(|g| g.id.clone());
        let transition = self.tracker.observe(game_id.as_deref(), origin, now);
        if let Some(finished) = transition.finished() {
            self.record(finished).await;
        }

        if let Evaluation::Updated(due) = self.evaluator.evaluate(game_id.as_deref(), now).await {
            self.state.due_reminders = due;
        }

        if self.state.matched_game_id() != game_id.as_deref() {
            match &game {
                Some(g) => log_info!("now playing {} ({})", g.name, g.id),
                None => log_info!("no game detected"),
            }
        }

        self.state.matched_game = game;
        self.state.match_tier = tier;
        self.state.pinned_game_id = self.pinned.clone();
        self.state.selected_window = self.selected.clone();
        self.state.windows = windows;
        self.state.session = self.tracker.view(now);
        self.state.last_poll_at = Some(now);
        self.publish();
    }

    fn tick(&mut self) {
        let session = self.tracker.view(self.anchored_now());
        if session != self.state.session {
            self.state.session = session;
            self.publish();
        }
    }

    async fn record(&self, finished: &FinishedSession) {
        let duration_seconds = finished.duration_seconds();
        if duration_seconds < self.ctx.settings.min_recorded_session_secs {
            log_debug!(
                "skipping {}s session of {}",
                duration_seconds,
                finished.session.game_id
            );
            return;
        }

        let record = PlaySessionRecord {
            id: Uuid::new_v4().to_string(),
            game_id: finished.session.game_id.clone(),
            pid: finished.session.pid,
            exe_path: finished.session.exe_path.clone(),
            started_at: finished.session.started_at,
            ended_at: finished.ended_at,
            duration_seconds,
        };

        if let Err(err) = self.ctx.db.record_play_session(&record).await {
            log_warn!("failed to record play session for {}: {err:#}", record.game_id);
            return;
        }
        log_info!("recorded {}s of {}", duration_seconds, record.game_id);

        if let Err(err) = self.ctx.library.reload(&self.ctx.db).await {
            log_warn!("library reload after session failed: {err:#}");
        }
    }

    async fn shutdown(&mut self) {
        let now: DateTime<Utc> = Utc::now();
        if let Some(finished) = self.tracker.finish(now) {
            self.record(&finished).await;
        }
        self.evaluator.reset();
        self.state.session = None;
        self.publish();
    }

    fn publish(&self) {
        self.ctx.state_tx.send_replace(self.state.clone());
    }
}

fn report_rejection(action: &str, result: &Result<(), OverlayError>) {
    match result {
        Err(err) if err.is_user_visible() => log_info!("{action} rejected: {err}"),
        Err(err) => log_warn!("{action} failed: {err}"),
        Ok(()) => {}
    }
}

fn origin_of(window: Option<&WindowInfo>) -> SessionOrigin {
    match window {
        Some(window) => SessionOrigin {
            pid: Some(window.process_id),
            exe_path: Some(window.executable_path.clone()).filter(|path| !path.is_empty()),
        },
        None => SessionOrigin::default(),
    }
}
