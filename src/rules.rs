use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The three mini-games the engine knows how to run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GameKind {
    /// Tap the highlighted shape among decoys.
    PulseTap,
    /// Tap the target-coloured ball while it crosses the center zone.
    FocusShift,
    /// Repeat a flashed sequence of tiles on a 3x3 grid.
    PatternRecall,
}

impl GameKind {
    pub const ALL: [GameKind; 3] = [GameKind::PulseTap, GameKind::FocusShift, GameKind::PatternRecall];

    /// Stable key used for persistence (matches `Display`).
    pub fn key(&self) -> String {
        self.to_string()
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.key() == key)
    }

    pub fn title(&self) -> &'static str {
        match self {
            GameKind::PulseTap => "Pulse Tap",
            GameKind::FocusShift => "Focus Shift",
            GameKind::PatternRecall => "Pattern Recall",
        }
    }

    pub fn rules(&self) -> GameRules {
        match self {
            GameKind::PulseTap => GameRules::pulse_tap(),
            GameKind::FocusShift => GameRules::focus_shift(),
            GameKind::PatternRecall => GameRules::pattern_recall(),
        }
    }
}

/// `min(cap, base + level * step)` shaped parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Capped<T> {
    pub base: T,
    pub step: T,
    pub cap: T,
}

impl Capped<u32> {
    pub fn at(&self, level: u32) -> u32 {
        self.base
            .saturating_add(level.saturating_mul(self.step))
            .min(self.cap)
    }
}

impl Capped<f64> {
    pub fn at(&self, level: u32) -> f64 {
        (self.base + level as f64 * self.step).min(self.cap)
    }
}

/// Obstacles appear from `from_level` on, `min(cap, level - offset)` of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObstacleRule {
    pub from_level: u32,
    pub offset: u32,
    pub cap: u32,
}

/// Reveal step of a recall sequence, shrinking toward `floor` each level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealRule {
    pub start: Duration,
    pub decrement: Duration,
    pub floor: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LadderRules {
    pub element_count: Capped<u32>,
    pub speed: Capped<f64>,
    pub obstacles: Option<ObstacleRule>,
    /// Level at which two simultaneous targets are placed.
    pub second_target_level: Option<u32>,
    pub reveal: Option<RevealRule>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelUpTrigger {
    /// Checked when a new round spawns: `score > 0 && score % n == 0`.
    ScoreMultiple(u32),
    /// Every `n` seconds of countdown, excluding the very first tick.
    Countdown(u32),
    /// Every completed round.
    RoundCompleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundStrategy {
    /// Static shapes, one or two of which are the target.
    Shapes {
        special_from_level: u32,
        /// One in `n` chance of a special target.
        special_one_in: u32,
    },
    /// Moving coloured balls bouncing inside the play area.
    MovingColors,
    /// A flashed sequence of tiles on a `grid_size` grid.
    Sequence { grid_size: usize },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub margin: f64,
    pub min_spacing: f64,
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComboRules {
    pub base: u32,
    pub special: u32,
    pub combo_bonus: u32,
    pub combo_bonus_from: u32,
    pub miss_penalty: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MultiplierRules {
    pub hit_points: u32,
    pub miss_penalty: u32,
    pub zone_radius: f64,
    pub multiplier_cap: u32,
    pub decay_after: Duration,
    pub bonus_lifetime: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceRules {
    pub per_tile: u32,
    pub miss_penalty: u32,
    pub interlude: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoringRules {
    Combo(ComboRules),
    Multiplier(MultiplierRules),
    Sequence(SequenceRules),
}

/// `(score + max_combo*combo + level*level + bonuses*bonus + rounds*round) * factor`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payout {
    pub combo_weight: u32,
    pub level_weight: u32,
    pub bonus_weight: u32,
    pub round_weight: u32,
    pub factor: u32,
}

/// Everything that distinguishes one mini-game from another.
#[derive(Debug, Clone, PartialEq)]
pub struct GameRules {
    pub kind: GameKind,
    pub duration_secs: u32,
    pub ladder: LadderRules,
    pub level_up: LevelUpTrigger,
    pub bonus_every_secs: Option<u32>,
    pub round: RoundStrategy,
    pub placement: Placement,
    pub scoring: ScoringRules,
    pub payout: Payout,
    pub excellence_threshold: u32,
    pub tracks_best_score: bool,
    /// Whether a finished session adds to the games-played counter.
    pub counts_games_played: bool,
}

impl GameRules {
    pub fn pulse_tap() -> Self {
        Self {
            kind: GameKind::PulseTap,
            duration_secs: 60,
            ladder: LadderRules {
                element_count: Capped {
                    base: 3,
                    step: 1,
                    cap: 8,
                },
                speed: Capped {
                    base: 1.0,
                    step: 0.0,
                    cap: 1.0,
                },
                obstacles: None,
                second_target_level: Some(5),
                reveal: None,
            },
            level_up: LevelUpTrigger::ScoreMultiple(100),
            bonus_every_secs: None,
            round: RoundStrategy::Shapes {
                special_from_level: 3,
                special_one_in: 5,
            },
            placement: Placement {
                margin: 50.0,
                min_spacing: 80.0,
                max_attempts: 30,
            },
            scoring: ScoringRules::Combo(ComboRules {
                base: 10,
                special: 20,
                combo_bonus: 5,
                combo_bonus_from: 5,
                miss_penalty: 5,
            }),
            payout: Payout {
                combo_weight: 2,
                level_weight: 10,
                bonus_weight: 0,
                round_weight: 0,
                factor: 2,
            },
            excellence_threshold: 10,
            tracks_best_score: true,
            counts_games_played: true,
        }
    }

    pub fn focus_shift() -> Self {
        Self {
            kind: GameKind::FocusShift,
            duration_secs: 60,
            ladder: LadderRules {
                element_count: Capped {
                    base: 4,
                    step: 1,
                    cap: 8,
                },
                speed: Capped {
                    base: 1.7,
                    step: 0.3,
                    cap: 4.0,
                },
                obstacles: Some(ObstacleRule {
                    from_level: 3,
                    offset: 2,
                    cap: 4,
                }),
                second_target_level: Some(4),
                reveal: None,
            },
            level_up: LevelUpTrigger::Countdown(15),
            bonus_every_secs: Some(10),
            round: RoundStrategy::MovingColors,
            placement: Placement {
                margin: 40.0,
                min_spacing: 80.0,
                max_attempts: 30,
            },
            scoring: ScoringRules::Multiplier(MultiplierRules {
                hit_points: 20,
                miss_penalty: 10,
                zone_radius: 70.0,
                multiplier_cap: 5,
                decay_after: Duration::from_secs(8),
                bonus_lifetime: Duration::from_secs(5),
            }),
            payout: Payout {
                combo_weight: 0,
                level_weight: 15,
                bonus_weight: 10,
                round_weight: 0,
                factor: 2,
            },
            excellence_threshold: 10,
            tracks_best_score: true,
            counts_games_played: true,
        }
    }

    pub fn pattern_recall() -> Self {
        Self {
            kind: GameKind::PatternRecall,
            duration_secs: 45,
            ladder: LadderRules {
                element_count: Capped {
                    base: 2,
                    step: 1,
                    cap: 32,
                },
                speed: Capped {
                    base: 1.0,
                    step: 0.0,
                    cap: 1.0,
                },
                obstacles: None,
                second_target_level: None,
                reveal: Some(RevealRule {
                    start: Duration::from_millis(600),
                    decrement: Duration::from_millis(50),
                    floor: Duration::from_millis(300),
                }),
            },
            level_up: LevelUpTrigger::RoundCompleted,
            bonus_every_secs: None,
            round: RoundStrategy::Sequence { grid_size: 9 },
            placement: Placement {
                margin: 0.0,
                min_spacing: 0.0,
                max_attempts: 1,
            },
            scoring: ScoringRules::Sequence(SequenceRules {
                per_tile: 10,
                miss_penalty: 10,
                interlude: Duration::from_millis(500),
            }),
            payout: Payout {
                combo_weight: 0,
                level_weight: 0,
                bonus_weight: 0,
                round_weight: 15,
                factor: 2,
            },
            excellence_threshold: 10,
            tracks_best_score: false,
            counts_games_played: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_keys_roundtrip() {
        for game in GameKind::ALL {
            assert_eq!(GameKind::from_key(&game.key()), Some(game));
        }
        assert_eq!(GameKind::PulseTap.key(), "pulse_tap");
        assert_eq!(GameKind::from_key("snake"), None);
    }

    #[test]
    fn capped_u32_stops_at_cap() {
        let c = Capped {
            base: 3,
            step: 1,
            cap: 8,
        };
        assert_eq!(c.at(1), 4);
        assert_eq!(c.at(5), 8);
        assert_eq!(c.at(50), 8);
        assert_eq!(c.at(u32::MAX), 8);
    }

    #[test]
    fn capped_f64_speed() {
        let rules = GameRules::focus_shift();
        assert!((rules.ladder.speed.at(1) - 2.0).abs() < 1e-9);
        assert!((rules.ladder.speed.at(2) - 2.3).abs() < 1e-9);
        assert_eq!(rules.ladder.speed.at(20), 4.0);
    }

    #[test]
    fn rules_match_their_kind() {
        for game in GameKind::ALL {
            assert_eq!(game.rules().kind, game);
        }
        assert!(!GameRules::pattern_recall().tracks_best_score);
        assert!(!GameRules::pattern_recall().counts_games_played);
        assert!(GameRules::pulse_tap().counts_games_played);
        assert_eq!(GameRules::pattern_recall().duration_secs, 45);
    }
}
