use crate::rules::LadderRules;
use std::time::Duration;

/// Gameplay parameters derived from the current level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifficultyParams {
    pub level: u32,
    /// Shapes / balls on screen, or sequence length for the recall game.
    pub element_count: usize,
    pub speed: f64,
    pub obstacle_count: usize,
    pub target_count: usize,
    /// Flash duration of one revealed tile; zero when the game reveals nothing.
    pub reveal_step: Duration,
}

impl DifficultyParams {
    pub fn for_level(rules: &LadderRules, level: u32) -> Self {
        let obstacle_count = rules
            .obstacles
            .filter(|o| level >= o.from_level)
            .map(|o| level.saturating_sub(o.offset).min(o.cap))
            .unwrap_or(0);

        let target_count = match rules.second_target_level {
            Some(from) if level >= from => 2,
            _ => 1,
        };

        let reveal_step = rules
            .reveal
            .map(|r| {
                let shrink = r.decrement.saturating_mul(level.saturating_sub(1));
                r.start.saturating_sub(shrink).max(r.floor)
            })
            .unwrap_or(Duration::ZERO);

        Self {
            level,
            element_count: rules.element_count.at(level) as usize,
            speed: rules.speed.at(level),
            obstacle_count: obstacle_count as usize,
            target_count,
            reveal_step,
        }
    }
}

/// Monotonic level progression. The caller decides the cadence.
#[derive(Debug, Clone)]
pub struct DifficultyLadder {
    rules: LadderRules,
    params: DifficultyParams,
}

impl DifficultyLadder {
    pub fn new(rules: LadderRules) -> Self {
        Self {
            params: DifficultyParams::for_level(&rules, 1),
            rules,
        }
    }

    pub fn level(&self) -> u32 {
        self.params.level
    }

    pub fn params(&self) -> &DifficultyParams {
        &self.params
    }

    pub fn advance(&mut self) -> &DifficultyParams {
        let next = self.params.level.saturating_add(1);
        self.params = DifficultyParams::for_level(&self.rules, next);
        log::debug!(
            "level {} -> {} elements, speed {:.2}, {} obstacles, {} targets",
            next,
            self.params.element_count,
            self.params.speed,
            self.params.obstacle_count,
            self.params.target_count
        );
        &self.params
    }

    pub fn reset(&mut self) {
        self.params = DifficultyParams::for_level(&self.rules, 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::GameRules;

    #[test]
    fn pulse_tap_ladder() {
        let mut ladder = DifficultyLadder::new(GameRules::pulse_tap().ladder);
        assert_eq!(ladder.level(), 1);
        assert_eq!(ladder.params().element_count, 4);
        assert_eq!(ladder.params().target_count, 1);

        for _ in 0..3 {
            ladder.advance();
        }
        assert_eq!(ladder.level(), 4);
        assert_eq!(ladder.params().element_count, 7);
        assert_eq!(ladder.params().target_count, 1);

        ladder.advance();
        assert_eq!(ladder.params().target_count, 2);
        assert_eq!(ladder.params().element_count, 8);

        ladder.advance();
        assert_eq!(ladder.params().element_count, 8);
    }

    #[test]
    fn focus_shift_obstacles_and_speed() {
        let mut ladder = DifficultyLadder::new(GameRules::focus_shift().ladder);
        assert_eq!(ladder.params().element_count, 5);
        assert_eq!(ladder.params().obstacle_count, 0);
        assert!((ladder.params().speed - 2.0).abs() < 1e-9);

        ladder.advance();
        assert_eq!(ladder.params().obstacle_count, 0);

        let p = *ladder.advance();
        assert_eq!(p.level, 3);
        assert_eq!(p.obstacle_count, 1);

        let p = *ladder.advance();
        assert_eq!(p.target_count, 2);
        assert_eq!(p.obstacle_count, 2);

        for _ in 0..10 {
            ladder.advance();
        }
        assert_eq!(ladder.params().obstacle_count, 4);
        assert_eq!(ladder.params().speed, 4.0);
        assert_eq!(ladder.params().element_count, 8);
    }

    #[test]
    fn recall_sequence_grows_and_reveal_speeds_up() {
        let mut ladder = DifficultyLadder::new(GameRules::pattern_recall().ladder);
        assert_eq!(ladder.params().element_count, 3);
        assert_eq!(ladder.params().reveal_step, Duration::from_millis(600));

        ladder.advance();
        assert_eq!(ladder.params().element_count, 4);
        assert_eq!(ladder.params().reveal_step, Duration::from_millis(550));

        for _ in 0..20 {
            ladder.advance();
        }
        assert_eq!(ladder.params().reveal_step, Duration::from_millis(300));
    }

    #[test]
    fn advance_is_monotonic_for_every_game() {
        for rules in [
            GameRules::pulse_tap(),
            GameRules::focus_shift(),
            GameRules::pattern_recall(),
        ] {
            let mut ladder = DifficultyLadder::new(rules.ladder);
            let mut prev = *ladder.params();
            for _ in 0..60 {
                let next = *ladder.advance();
                assert!(next.level > prev.level);
                assert!(next.element_count >= prev.element_count);
                assert!(next.speed >= prev.speed);
                assert!(next.obstacle_count >= prev.obstacle_count);
                assert!(next.target_count >= prev.target_count);
                assert!(next.reveal_step <= prev.reveal_step);
                prev = next;
            }
        }
    }

    #[test]
    fn reset_returns_to_level_one() {
        let mut ladder = DifficultyLadder::new(GameRules::focus_shift().ladder);
        ladder.advance();
        ladder.advance();
        ladder.reset();
        assert_eq!(ladder.level(), 1);
        assert_eq!(ladder.params().obstacle_count, 0);
    }
}
