use anyhow::{anyhow, bail, Result};
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_optional_datetime, to_u64},
    models::GameRecord,
};

const GAME_COLUMNS: &str =
    "id, name, exe_path, play_count, total_playtime_seconds, last_played_at";

fn row_to_game(row: &Row) -> Result<GameRecord> {
    let play_count: i64 = row.get("play_count")?;
    let total_playtime_seconds: i64 = row.get("total_playtime_seconds")?;
    let last_played_at: Option<String> = row.get("last_played_at")?;
    let exe_path: Option<String> = row.get("exe_path")?;

    Ok(GameRecord {
        id: row.get("id")?,
        name: row.get("name")?,
        executable_path: exe_path.filter(|path| !path.trim().is_empty()),
        play_count: to_u64(play_count, "play_count")?,
        total_playtime_seconds: to_u64(total_playtime_seconds, "total_playtime_seconds")?,
        last_played_at: parse_optional_datetime(last_played_at, "last_played_at")?,
    })
}

impl Database {
    /// Insert a game or update its name and executable path. Play counters
    /// are owned by the play-history recorder and never overwritten here.
    pub async fn upsert_game(&self, game: &GameRecord) -> Result<GameRecord> {
        if game.id.trim().is_empty() {
            bail!("game id is required");
        }
        if game.name.trim().is_empty() {
            bail!("game name is required");
        }

        let record = game.clone();
        self.execute(move |conn| {
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO games (id, name, exe_path, added_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                     name = excluded.name,
                     exe_path = excluded.exe_path,
                     updated_at = excluded.updated_at",
                params![record.id, record.name, record.executable_path, now],
            )?;

            let game = conn.query_row(
                &format!("SELECT {GAME_COLUMNS} FROM games WHERE id = ?1"),
                params![record.id],
                |row| Ok(row_to_game(row)),
            )??;
            Ok(game)
        })
        .await
    }

    /// All games, in the stable order the matcher iterates them.
    pub async fn list_games(&self) -> Result<Vec<GameRecord>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {GAME_COLUMNS} FROM games ORDER BY added_at ASC, id ASC"
            ))?;

            let mut rows = stmt.query([])?;
            let mut games = Vec::new();
            while let Some(row) = rows.next()? {
                games.push(row_to_game(row)?);
            }

            Ok(games)
        })
        .await
    }

    pub async fn get_game(&self, game_id: &str) -> Result<Option<GameRecord>> {
        let game_id = game_id.to_string();
        self.execute(move |conn| {
            let game = conn
                .query_row(
                    &format!("SELECT {GAME_COLUMNS} FROM games WHERE id = ?1"),
                    params![game_id],
                    |row| Ok(row_to_game(row)),
                )
                .optional()?
                .transpose()?;
            Ok(game)
        })
        .await
    }

    /// Deleting a game cascades to its notes and play history.
    pub async fn delete_game(&self, game_id: &str) -> Result<()> {
        let game_id = game_id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn.execute("DELETE FROM games WHERE id = ?1", params![game_id])?;
            if rows_affected == 0 {
                return Err(anyhow!("Game not found"));
            }
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_test_db;

    #[tokio::test]
    async fn test_upsert_inserts_then_updates() {
        let (db, _dir) = setup_test_db();

        let mut game = GameRecord::new("er", "Elden Ring", Some("C:\\Games\\EldenRing\\eldenring.exe"));
        let inserted = db.upsert_game(&game).await.unwrap();
        assert_eq!(inserted.name, "Elden Ring");
        assert_eq!(inserted.play_count, 0);

        game.name = "ELDEN RING".into();
        game.executable_path = None;
        let updated = db.upsert_game(&game).await.unwrap();
        assert_eq!(updated.name, "ELDEN RING");
        assert_eq!(updated.executable_path, None);

        assert_eq!(db.list_games().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_blank_exe_path_reads_back_as_none() {
        let (db, _dir) = setup_test_db();

        let game = GameRecord::new("hk", "Hollow Knight", Some("   "));
        let stored = db.upsert_game(&game).await.unwrap();

        assert_eq!(stored.executable_path, None);
    }

    #[tokio::test]
    async fn test_upsert_rejects_missing_name() {
        let (db, _dir) = setup_test_db();

        let game = GameRecord::new("x", "  ", None);
        assert!(db.upsert_game(&game).await.is_err());
    }

    #[tokio::test]
    async fn test_get_and_delete_game() {
        let (db, _dir) = setup_test_db();
        db.upsert_game(&GameRecord::new("celeste", "Celeste", None))
            .await
            .unwrap();

        assert!(db.get_game("celeste").await.unwrap().is_some());
        db.delete_game("celeste").await.unwrap();
        assert!(db.get_game("celeste").await.unwrap().is_none());
        assert!(db.delete_game("celeste").await.is_err());
    }
}
