use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::RwLock;

use crate::db::{Database, GameRecord};

/// In-memory game list shared between the poll loop and callers that edit
/// the library.
#[derive(Clone, Default)]
pub struct GameLibrary {
    games: Arc<RwLock<Vec<GameRecord>>>,
}

impl GameLibrary {
    pub fn new(games: Vec<GameRecord>) -> Self {
        Self {
            games: Arc::new(RwLock::new(games)),
        }
    }

    pub async fn load(db: &Database) -> Result<Self> {
        let library = Self::default();
        library.reload(db).await?;
        Ok(library)
    }

    /// Replace the in-memory list with the stored one. Returns the game count.
    pub async fn reload(&self, db: &Database) -> Result<usize> {
        let games = db.list_games().await.context("failed to load game library")?;
        let count = games.len();
        *self.games.write().await = games;
        Ok(count)
    }

    pub async fn snapshot(&self) -> Vec<GameRecord> {
        self.games.read().await.clone()
    }

    pub async fn find(&self, game_id: &str) -> Option<GameRecord> {
        self.games
            .read()
            .await
            .iter()
            .find(|game| game.id == game_id)
            .cloned()
    }
}
