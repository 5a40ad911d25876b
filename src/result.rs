use crate::progress::{HistoryEntry, ProgressStore, StoreError};
use crate::rules::{GameKind, Payout};
use crate::session::Session;
use serde::Serialize;

/// Summary of an ended session and what it earned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionResult {
    pub game: GameKind,
    pub score: u32,
    pub earned_points: u32,
    pub level: u32,
    pub max_combo: u32,
    pub perfect: u32,
    pub bonuses_collected: u32,
    pub rounds_completed: u32,
    /// Set by `report` when the excellence threshold was met.
    pub streak_awarded: bool,
    /// Set by `report` when the score replaced the stored best.
    pub new_best: bool,
}

pub fn earned_points(
    payout: &Payout,
    score: u32,
    max_combo: u32,
    level: u32,
    bonuses: u32,
    rounds: u32,
) -> u32 {
    score
        .saturating_add(max_combo.saturating_mul(payout.combo_weight))
        .saturating_add(level.saturating_mul(payout.level_weight))
        .saturating_add(bonuses.saturating_mul(payout.bonus_weight))
        .saturating_add(rounds.saturating_mul(payout.round_weight))
        .saturating_mul(payout.factor)
}

impl SessionResult {
    pub fn compute(session: &Session) -> Self {
        let rules = session.rules();
        let board = session.board();
        // every hit or completed sequence closes a round
        let rounds_completed = board.perfect;
        Self {
            game: rules.kind,
            score: board.score,
            earned_points: earned_points(
                &rules.payout,
                board.score,
                board.combo.max,
                session.level(),
                board.bonuses_collected,
                rounds_completed,
            ),
            level: session.level(),
            max_combo: board.combo.max,
            perfect: board.perfect,
            bonuses_collected: board.bonuses_collected,
            rounds_completed,
            streak_awarded: false,
            new_best: false,
        }
    }

    pub fn excellent(&self) -> bool {
        self.perfect >= self.game.rules().excellence_threshold
    }

    pub(crate) fn report<S: ProgressStore + ?Sized>(
        &mut self,
        store: &mut S,
    ) -> Result<(), StoreError> {
        store.add_points(self.earned_points)?;
        let rules = self.game.rules();
        if rules.tracks_best_score {
            self.new_best = store.update_best_score(self.game, self.score)?;
        }
        if rules.counts_games_played {
            store.increment_games_played()?;
        }
        if self.excellent() {
            store.increment_streak()?;
            self.streak_awarded = true;
        }
        store.record_session(&HistoryEntry {
            game: self.game,
            score: self.score,
            earned_points: self.earned_points,
            level: self.level,
            played_at: chrono::Local::now(),
        })
    }
}
