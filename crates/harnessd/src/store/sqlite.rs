//! SQLite-backed player and outcome store.
//!
//! One connection behind a mutex; every statement runs on the blocking pool.

use super::{OutcomeStore, PlayerStore};
use anyhow::Context;
use async_trait::async_trait;
use harness_common::{EntityKind, HarnessError, Outcome, PlayerState, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open or create the database file
    pub async fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create database directory")?;
        }

        info!("Opening harness database at: {}", path.display());

        let db_path = path.clone();
        let conn = tokio::task::spawn_blocking(move || -> anyhow::Result<Connection> {
            let conn = Connection::open(&db_path).context("Failed to open SQLite database")?;
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                row.get::<_, String>(0)
            })
            .context("Failed to enable WAL mode")?;
            conn.pragma_update(None, "foreign_keys", "ON")
                .context("Failed to enable foreign keys")?;
            Ok(conn)
        })
        .await??;

        Self::with_connection(conn, Some(path)).await
    }

    /// Private in-memory database (tests, dry runs)
    pub async fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .context("Failed to enable foreign keys")?;
        Self::with_connection(conn, None).await
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    async fn with_connection(conn: Connection, path: Option<PathBuf>) -> anyhow::Result<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        };
        store.initialize_schema().await?;
        Ok(store)
    }

    async fn initialize_schema(&self) -> anyhow::Result<()> {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
            let conn = conn.blocking_lock();
            conn.execute(
                "CREATE TABLE IF NOT EXISTS players (
                    player_id TEXT PRIMARY KEY,
                    condition TEXT NOT NULL,
                    updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
                )",
                [],
            )?;

            conn.execute(
                "CREATE TABLE IF NOT EXISTS question_set_outcomes (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    data_file TEXT NOT NULL UNIQUE,
                    player_id TEXT NOT NULL REFERENCES players(player_id),
                    condition TEXT NOT NULL,
                    stage_id TEXT NOT NULL,
                    question_set_id TEXT NOT NULL,
                    end_time INTEGER NOT NULL,
                    elapsed_ms INTEGER NOT NULL,
                    score INTEGER NOT NULL,
                    medal TEXT NOT NULL,
                    end_state TEXT
                )",
                [],
            )?;

            conn.execute(
                "CREATE INDEX IF NOT EXISTS idx_outcome_player
                 ON question_set_outcomes(player_id)",
                [],
            )?;

            Ok(())
        })
        .await??;

        debug!("Harness database schema ready");
        Ok(())
    }

    /// Run a closure against the connection on the blocking pool
    async fn execute<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            f(&conn)
        })
        .await
        .map_err(|e| io_error(format!("database task failed: {}", e)))?
        .map_err(|e| io_error(format!("database error: {}", e)))
    }
}

fn io_error(message: String) -> HarnessError {
    HarnessError::from(io::Error::new(io::ErrorKind::Other, message))
}

fn outcome_from_row(row: &Row<'_>) -> rusqlite::Result<Outcome> {
    Ok(Outcome {
        artifact_file_name: row.get(0)?,
        player_id: row.get(1)?,
        condition: row.get(2)?,
        stage_id: row.get(3)?,
        question_set_id: row.get(4)?,
        end_time_seconds: row.get(5)?,
        elapsed_millis: row.get::<_, i64>(6)?.max(0) as u64,
        score: row.get(7)?,
        medal: row.get(8)?,
        end_state: row.get(9)?,
    })
}

#[async_trait]
impl PlayerStore for SqliteStore {
    async fn find(&self, player_id: &str) -> Result<PlayerState> {
        let id = player_id.to_string();
        let found = self
            .execute(move |conn| {
                conn.query_row(
                    "SELECT player_id, condition FROM players WHERE player_id = ?1",
                    params![id],
                    |row| {
                        Ok(PlayerState {
                            player_id: row.get(0)?,
                            condition: row.get(1)?,
                        })
                    },
                )
                .optional()
            })
            .await?;

        found.ok_or_else(|| HarnessError::not_found(EntityKind::Player, player_id))
    }

    async fn save(&self, player: &PlayerState) -> Result<()> {
        let player = player.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO players (player_id, condition) VALUES (?1, ?2)
                 ON CONFLICT(player_id) DO UPDATE SET
                    condition = excluded.condition,
                    updated_at = CURRENT_TIMESTAMP",
                params![player.player_id, player.condition],
            )
        })
        .await?;
        Ok(())
    }
}

#[async_trait]
impl OutcomeStore for SqliteStore {
    async fn save_outcome(&self, player: &PlayerState, outcome: &Outcome) -> Result<()> {
        let player_id = player.player_id.clone();
        let outcome = outcome.clone();
        let id = player_id.clone();
        let known = self
            .execute(move |conn| {
                let known = conn
                    .query_row(
                        "SELECT 1 FROM players WHERE player_id = ?1",
                        params![player_id],
                        |_| Ok(()),
                    )
                    .optional()?
                    .is_some();
                if !known {
                    return Ok(false);
                }
                conn.execute(
                    "INSERT INTO question_set_outcomes (
                        data_file, player_id, condition, stage_id, question_set_id,
                        end_time, elapsed_ms, score, medal, end_state
                     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                    params![
                        outcome.artifact_file_name,
                        player_id,
                        outcome.condition,
                        outcome.stage_id,
                        outcome.question_set_id,
                        outcome.end_time_seconds,
                        outcome.elapsed_millis as i64,
                        outcome.score,
                        outcome.medal,
                        outcome.end_state,
                    ],
                )?;
                Ok(true)
            })
            .await?;

        if !known {
            return Err(HarnessError::not_found(EntityKind::Player, id));
        }
        Ok(())
    }

    async fn outcomes_for_player(&self, player_id: &str) -> Result<Vec<Outcome>> {
        let id = player_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT data_file, player_id, condition, stage_id, question_set_id,
                        end_time, elapsed_ms, score, medal, end_state
                 FROM question_set_outcomes
                 WHERE player_id = ?1
                 ORDER BY id",
            )?;
            let outcomes = stmt
                .query_map(params![id], outcome_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(outcomes)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn outcome(player_id: &str, artifact: &str) -> Outcome {
        Outcome {
            artifact_file_name: artifact.to_string(),
            player_id: player_id.to_string(),
            condition: "A".to_string(),
            stage_id: "s1".to_string(),
            question_set_id: "2".to_string(),
            end_time_seconds: 1_700_000_000,
            elapsed_millis: 42_000,
            score: 900,
            medal: "silver".to_string(),
            end_state: None,
        }
    }

    #[tokio::test]
    async fn test_player_round_trip() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        store.save(&PlayerState::new("p1", "A")).await.unwrap();
        store.save(&PlayerState::new("p1", "B")).await.unwrap();
        assert_eq!(store.find("p1").await.unwrap(), PlayerState::new("p1", "B"));
        assert!(store.find("p2").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_outcomes_for_player() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let player = PlayerState::new("p1", "A");
        store.save(&player).await.unwrap();

        store.save_outcome(&player, &outcome("p1", "a.xml")).await.unwrap();
        store.save_outcome(&player, &outcome("p1", "b.xml")).await.unwrap();

        let outcomes = store.outcomes_for_player("p1").await.unwrap();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0], outcome("p1", "a.xml"));
        assert_eq!(outcomes[1].artifact_file_name, "b.xml");
    }

    #[tokio::test]
    async fn test_outcome_requires_known_player() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let stranger = PlayerState::new("ghost", "A");
        let err = store
            .save_outcome(&stranger, &outcome("ghost", "c.xml"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(store.outcomes_for_player("ghost").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_database_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db").join("harness.db");
        {
            let store = SqliteStore::open(&path).await.unwrap();
            store.save(&PlayerState::new("p1", "A")).await.unwrap();
        }
        let reopened = SqliteStore::open(&path).await.unwrap();
        assert_eq!(reopened.find("p1").await.unwrap().condition, "A");
        assert_eq!(reopened.path(), Some(&path));
    }
}
