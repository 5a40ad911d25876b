use crate::rules::GameKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("history export failed: {0}")]
    Csv(#[from] csv::Error),
}

/// Lifetime progress across all sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub lifetime_points: u64,
    pub best_scores: BTreeMap<GameKind, u32>,
    pub current_streak: u32,
    pub games_played: u32,
    pub onboarding_complete: bool,
}

impl ProgressRecord {
    pub fn best_score(&self, game: GameKind) -> u32 {
        self.best_scores.get(&game).copied().unwrap_or(0)
    }

    pub fn achievements(&self) -> Vec<Achievement> {
        Achievement::ALL
            .into_iter()
            .filter(|a| a.unlocked(self))
            .collect()
    }
}

/// One finished session as kept in the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub game: GameKind,
    pub score: u32,
    pub earned_points: u32,
    pub level: u32,
    pub played_at: chrono::DateTime<chrono::Local>,
}

/// Persistence collaborator. Implementors provide `load`/`save`; the
/// mutators are load-modify-save by default.
pub trait ProgressStore {
    fn load(&self) -> Result<ProgressRecord, StoreError>;
    fn save(&mut self, record: &ProgressRecord) -> Result<(), StoreError>;

    fn add_points(&mut self, points: u32) -> Result<u64, StoreError> {
        let mut record = self.load()?;
        record.lifetime_points = record.lifetime_points.saturating_add(points as u64);
        self.save(&record)?;
        Ok(record.lifetime_points)
    }

    /// Returns true when `score` became the new best.
    fn update_best_score(&mut self, game: GameKind, score: u32) -> Result<bool, StoreError> {
        let mut record = self.load()?;
        if score <= record.best_score(game) {
            return Ok(false);
        }
        record.best_scores.insert(game, score);
        self.save(&record)?;
        Ok(true)
    }

    fn increment_streak(&mut self) -> Result<u32, StoreError> {
        let mut record = self.load()?;
        record.current_streak = record.current_streak.saturating_add(1);
        self.save(&record)?;
        Ok(record.current_streak)
    }

    fn increment_games_played(&mut self) -> Result<u32, StoreError> {
        let mut record = self.load()?;
        record.games_played = record.games_played.saturating_add(1);
        self.save(&record)?;
        Ok(record.games_played)
    }

    fn complete_onboarding(&mut self) -> Result<(), StoreError> {
        let mut record = self.load()?;
        record.onboarding_complete = true;
        self.save(&record)
    }

    /// Zeroes everything except the onboarding flag.
    fn reset_all(&mut self) -> Result<(), StoreError> {
        let onboarding_complete = self.load()?.onboarding_complete;
        self.save(&ProgressRecord {
            onboarding_complete,
            ..ProgressRecord::default()
        })
    }

    fn record_session(&mut self, _entry: &HistoryEntry) -> Result<(), StoreError> {
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryProgressStore {
    record: ProgressRecord,
    history: Vec<HistoryEntry>,
}

impl MemoryProgressStore {
    pub fn new(record: ProgressRecord) -> Self {
        Self {
            record,
            history: Vec::new(),
        }
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }
}

impl ProgressStore for MemoryProgressStore {
    fn load(&self) -> Result<ProgressRecord, StoreError> {
        Ok(self.record.clone())
    }

    fn save(&mut self, record: &ProgressRecord) -> Result<(), StoreError> {
        self.record = record.clone();
        Ok(())
    }

    fn reset_all(&mut self) -> Result<(), StoreError> {
        self.record = ProgressRecord {
            onboarding_complete: self.record.onboarding_complete,
            ..ProgressRecord::default()
        };
        self.history.clear();
        Ok(())
    }

    fn record_session(&mut self, entry: &HistoryEntry) -> Result<(), StoreError> {
        self.history.push(entry.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Achievement {
    #[strum(serialize = "First Steps")]
    FirstSteps,
    Energized,
    Dedicated,
    Master,
}

impl Achievement {
    pub const ALL: [Achievement; 4] = [
        Achievement::FirstSteps,
        Achievement::Energized,
        Achievement::Dedicated,
        Achievement::Master,
    ];

    pub fn description(&self) -> &'static str {
        match self {
            Achievement::FirstSteps => "Play your first game",
            Achievement::Energized => "Earn 100 points",
            Achievement::Dedicated => "Play 10 games",
            Achievement::Master => "Earn 500 points",
        }
    }

    pub fn unlocked(&self, record: &ProgressRecord) -> bool {
        match self {
            Achievement::FirstSteps => record.games_played >= 1,
            Achievement::Energized => record.lifetime_points >= 100,
            Achievement::Dedicated => record.games_played >= 10,
            Achievement::Master => record.lifetime_points >= 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_score_only_rises() {
        let mut store = MemoryProgressStore::default();
        assert!(store.update_best_score(GameKind::PulseTap, 80).unwrap());
        assert!(!store.update_best_score(GameKind::PulseTap, 80).unwrap());
        assert!(!store.update_best_score(GameKind::PulseTap, 50).unwrap());
        assert!(store.update_best_score(GameKind::PulseTap, 81).unwrap());
        let record = store.load().unwrap();
        assert_eq!(record.best_score(GameKind::PulseTap), 81);
        assert_eq!(record.best_score(GameKind::FocusShift), 0);
    }

    #[test]
    fn counters_accumulate() {
        let mut store = MemoryProgressStore::default();
        assert_eq!(store.add_points(40).unwrap(), 40);
        assert_eq!(store.add_points(2).unwrap(), 42);
        assert_eq!(store.increment_streak().unwrap(), 1);
        assert_eq!(store.increment_games_played().unwrap(), 1);
        assert_eq!(store.increment_games_played().unwrap(), 2);
    }

    #[test]
    fn reset_keeps_onboarding() {
        let mut store = MemoryProgressStore::default();
        store.add_points(300).unwrap();
        store.update_best_score(GameKind::FocusShift, 90).unwrap();
        store.complete_onboarding().unwrap();
        store.reset_all().unwrap();
        let record = store.load().unwrap();
        assert_eq!(record.lifetime_points, 0);
        assert!(record.best_scores.is_empty());
        assert!(record.onboarding_complete);
    }

    #[test]
    fn achievements_follow_thresholds() {
        let mut record = ProgressRecord::default();
        assert!(record.achievements().is_empty());
        record.games_played = 1;
        record.lifetime_points = 120;
        assert_eq!(
            record.achievements(),
            vec![Achievement::FirstSteps, Achievement::Energized]
        );
        record.games_played = 10;
        record.lifetime_points = 500;
        assert_eq!(record.achievements().len(), 4);
        assert_eq!(Achievement::FirstSteps.to_string(), "First Steps");
    }
}
