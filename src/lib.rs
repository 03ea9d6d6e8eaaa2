pub mod db;
pub mod error;
pub mod matcher;
pub mod overlay;
pub mod platform;
pub mod reminders;
pub mod session;
pub mod settings;
pub mod utils;

#[cfg(test)]
mod test_utils;

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use log::{error, info};

use db::Database;
use overlay::{GameLibrary, OverlayController, OverlayState};
use platform::NativeWindowSource;
use settings::SettingsStore;

pub use error::OverlayError;

fn log_state_change(previous: &OverlayState, current: &OverlayState) {
    if previous.matched_game_id() != current.matched_game_id() {
        match &current.matched_game {
            Some(game) => info!(
                "Detected {} (tier {})",
                game.name,
                current.match_tier.map_or(0, |tier| tier.rank())
            ),
            None => info!("No game running"),
        }
    }

    for note in &current.due_reminders {
        if !previous.due_reminders.iter().any(|n| n.id == note.id) {
            info!("Reminder: {} {}", note.title, note.content);
        }
    }
}

async fn run_headless() -> Result<()> {
    let dirs = ProjectDirs::from("com", "GameVault", "GameVault")
        .ok_or_else(|| anyhow!("could not resolve a home directory"))?;
    let data_dir = dirs.data_dir();
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create {}", data_dir.display()))?;

    let database = Database::new(data_dir.join("gamevault.sqlite3"))?;
    let settings = SettingsStore::new(data_dir.join("settings.json"))?;
    let library = GameLibrary::load(&database).await?;
    info!("Loaded {} game(s)", library.snapshot().await.len());

    let mut controller = OverlayController::new(
        database,
        Arc::new(NativeWindowSource::new()),
        library,
        settings.overlay(),
    );
    controller.start()?;
    controller.show().await?;

    let mut updates = controller.subscribe();
    let mut previous = updates.borrow_and_update().clone();
    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = updates.borrow_and_update().clone();
                log_state_change(&previous, &current);
                previous = current;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                break;
            }
        }
    }

    controller.stop().await
}

pub fn run() {
    utils::logging::init_logging();
    info!("GameVault overlay starting up...");

    let result = tokio::runtime::Runtime::new()
        .context("failed to build tokio runtime")
        .and_then(|runtime| runtime.block_on(run_headless()));

    if let Err(err) = result {
        error!("GameVault overlay exited with error: {err:#}");
        std::process::exit(1);
    }
}
