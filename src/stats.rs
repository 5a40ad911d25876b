use crate::app_dirs::AppDirs;
use crate::progress::{HistoryEntry, ProgressRecord, ProgressStore, StoreError};
use crate::rules::GameKind;
use chrono::{DateTime, Local};
use rusqlite::{params, Connection, OptionalExtension};
use std::io;
use std::path::{Path, PathBuf};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS progress (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        lifetime_points INTEGER NOT NULL DEFAULT 0,
        current_streak INTEGER NOT NULL DEFAULT 0,
        games_played INTEGER NOT NULL DEFAULT 0,
        onboarding_complete BOOLEAN NOT NULL DEFAULT 0
    );
    INSERT OR IGNORE INTO progress (id) VALUES (1);

    CREATE TABLE IF NOT EXISTS best_scores (
        game TEXT PRIMARY KEY,
        score INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS session_history (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        game TEXT NOT NULL,
        score INTEGER NOT NULL,
        earned_points INTEGER NOT NULL,
        level INTEGER NOT NULL,
        played_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_session_history_played_at ON session_history(played_at);
"#;

/// SQLite-backed progress and session history.
#[derive(Debug)]
pub struct StatsDb {
    conn: Connection,
    path: Option<PathBuf>,
}

impl StatsDb {
    /// Opens the database at the default state location, creating it if needed.
    pub fn open_default() -> Result<Self, StoreError> {
        let path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("blink_progress.db"));
        Self::open(path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        log::debug!("progress database at {}", path.display());
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn, path: None })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Most recent sessions first.
    pub fn recent_sessions(&self, limit: usize) -> Result<Vec<HistoryEntry>, StoreError> {
        self.query_history(
            "SELECT game, score, earned_points, level, played_at FROM session_history
             ORDER BY id DESC LIMIT ?1",
            limit as i64,
        )
    }

    /// Whole history, oldest first.
    pub fn history(&self) -> Result<Vec<HistoryEntry>, StoreError> {
        self.query_history(
            "SELECT game, score, earned_points, level, played_at FROM session_history
             ORDER BY id ASC LIMIT ?1",
            -1,
        )
    }

    fn query_history(&self, sql: &str, limit: i64) -> Result<Vec<HistoryEntry>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([limit], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u32>(1)?,
                row.get::<_, u32>(2)?,
                row.get::<_, u32>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (game, score, earned_points, level, played_at) = row?;
            let (Some(game), Ok(played_at)) = (
                GameKind::from_key(&game),
                DateTime::parse_from_rfc3339(&played_at),
            ) else {
                log::warn!("skipping unreadable history row for {game}");
                continue;
            };
            entries.push(HistoryEntry {
                game,
                score,
                earned_points,
                level,
                played_at: played_at.with_timezone(&Local),
            });
        }
        Ok(entries)
    }

    /// Writes the whole history as CSV with a header row. Returns the row count.
    pub fn export_history_csv<W: io::Write>(&self, writer: W) -> Result<usize, StoreError> {
        let history = self.history()?;
        let mut wtr = csv::Writer::from_writer(writer);
        for entry in &history {
            wtr.serialize(entry)?;
        }
        wtr.flush()?;
        Ok(history.len())
    }

    fn best_scores(&self) -> Result<Vec<(GameKind, u32)>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT game, score FROM best_scores")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?))
        })?;
        let mut scores = Vec::new();
        for row in rows {
            let (game, score) = row?;
            if let Some(game) = GameKind::from_key(&game) {
                scores.push((game, score));
            }
        }
        Ok(scores)
    }
}

impl ProgressStore for StatsDb {
    fn load(&self) -> Result<ProgressRecord, StoreError> {
        let (lifetime_points, current_streak, games_played, onboarding_complete) =
            self.conn.query_row(
                "SELECT lifetime_points, current_streak, games_played, onboarding_complete
                 FROM progress WHERE id = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, u32>(1)?,
                        row.get::<_, u32>(2)?,
                        row.get::<_, bool>(3)?,
                    ))
                },
            )?;

        Ok(ProgressRecord {
            lifetime_points: lifetime_points.max(0) as u64,
            best_scores: self.best_scores()?.into_iter().collect(),
            current_streak,
            games_played,
            onboarding_complete,
        })
    }

    fn save(&mut self, record: &ProgressRecord) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "UPDATE progress SET lifetime_points = ?1, current_streak = ?2,
             games_played = ?3, onboarding_complete = ?4 WHERE id = 1",
            params![
                record.lifetime_points.min(i64::MAX as u64) as i64,
                record.current_streak,
                record.games_played,
                record.onboarding_complete,
            ],
        )?;
        tx.execute("DELETE FROM best_scores", [])?;
        for (game, score) in &record.best_scores {
            tx.execute(
                "INSERT INTO best_scores (game, score) VALUES (?1, ?2)",
                params![game.key(), score],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn add_points(&mut self, points: u32) -> Result<u64, StoreError> {
        self.conn.execute(
            "UPDATE progress SET lifetime_points = lifetime_points + ?1 WHERE id = 1",
            [points],
        )?;
        let total: i64 = self.conn.query_row(
            "SELECT lifetime_points FROM progress WHERE id = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(total.max(0) as u64)
    }

    fn update_best_score(&mut self, game: GameKind, score: u32) -> Result<bool, StoreError> {
        let previous: Option<u32> = self
            .conn
            .query_row(
                "SELECT score FROM best_scores WHERE game = ?1",
                [game.key()],
                |row| row.get(0),
            )
            .optional()?;
        if previous.is_some_and(|p| score <= p) || (previous.is_none() && score == 0) {
            return Ok(false);
        }
        self.conn.execute(
            "INSERT INTO best_scores (game, score) VALUES (?1, ?2)
             ON CONFLICT(game) DO UPDATE SET score = MAX(score, excluded.score)",
            params![game.key(), score],
        )?;
        Ok(true)
    }

    fn reset_all(&mut self) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "UPDATE progress SET lifetime_points = 0, current_streak = 0, games_played = 0
             WHERE id = 1",
            [],
        )?;
        tx.execute("DELETE FROM best_scores", [])?;
        tx.execute("DELETE FROM session_history", [])?;
        tx.commit()?;
        log::info!("progress reset");
        Ok(())
    }

    fn record_session(&mut self, entry: &HistoryEntry) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO session_history (game, score, earned_points, level, played_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.game.key(),
                entry.score,
                entry.earned_points,
                entry.level,
                entry.played_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}
