use crate::geometry::Vec2;
use crate::round::{Element, Identity};
use crate::rules::{ComboRules, MultiplierRules, SequenceRules};
use serde::Serialize;

/// Consecutive correct taps; any miss drops it back to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ComboState {
    pub current: u32,
    pub max: u32,
}

impl ComboState {
    pub fn hit(&mut self) {
        self.current += 1;
        self.max = self.max.max(self.current);
    }

    pub fn miss(&mut self) {
        self.current = 0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Multiplier {
    pub value: u32,
    pub cap: u32,
}

impl Multiplier {
    pub fn new(cap: u32) -> Self {
        Self {
            value: 1,
            cap: cap.max(1),
        }
    }

    pub fn bump(&mut self) -> u32 {
        self.value = (self.value + 1).min(self.cap);
        self.value
    }

    /// One step back toward 1, only while above it.
    pub fn decay(&mut self) -> bool {
        if self.value > 1 {
            self.value -= 1;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.value = 1;
    }
}

impl Default for Multiplier {
    fn default() -> Self {
        Self::new(1)
    }
}

/// Running totals of a session. `score` never goes below zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScoreBoard {
    pub score: u32,
    pub combo: ComboState,
    pub multiplier: Multiplier,
    /// Perfect taps, hits or rounds depending on the game.
    pub perfect: u32,
    pub bonuses_collected: u32,
    pub misses: u32,
}

impl ScoreBoard {
    pub fn new(multiplier_cap: u32) -> Self {
        Self {
            multiplier: Multiplier::new(multiplier_cap),
            ..Self::default()
        }
    }

    pub fn award(&mut self, points: u32) {
        self.score = self.score.saturating_add(points);
    }

    pub fn penalize(&mut self, points: u32) {
        self.score = self.score.saturating_sub(points);
        self.misses += 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapVerdict {
    Hit { points: u32 },
    Miss { penalty: u32 },
    /// Tap had no scoring effect (e.g. target outside the center zone).
    Neutral,
}

pub fn score_shape_tap(
    rules: &ComboRules,
    board: &mut ScoreBoard,
    tapped: Identity,
    target: Option<Identity>,
) -> TapVerdict {
    if Some(tapped) == target {
        let base = if tapped.is_special() {
            rules.special
        } else {
            rules.base
        };
        let bonus = if board.combo.current >= rules.combo_bonus_from {
            rules.combo_bonus
        } else {
            0
        };
        let points = base + bonus;
        board.award(points);
        board.combo.hit();
        board.perfect += 1;
        TapVerdict::Hit { points }
    } else {
        board.penalize(rules.miss_penalty);
        board.combo.miss();
        TapVerdict::Miss {
            penalty: rules.miss_penalty,
        }
    }
}

/// A hit needs both the right colour and the element inside the center zone.
/// Wrong colours are penalized wherever they are; right colours outside the
/// zone do nothing.
pub fn score_tracking_tap(
    rules: &MultiplierRules,
    board: &mut ScoreBoard,
    tapped: &Element,
    target: Option<Identity>,
    center: Vec2,
) -> TapVerdict {
    let on_target = Some(tapped.identity) == target;
    let in_zone = tapped.position.distance(center) < rules.zone_radius;

    if on_target && in_zone {
        let points = rules.hit_points * board.multiplier.value;
        board.award(points);
        board.perfect += 1;
        TapVerdict::Hit { points }
    } else if !on_target {
        board.penalize(rules.miss_penalty);
        board.multiplier.reset();
        TapVerdict::Miss {
            penalty: rules.miss_penalty,
        }
    } else {
        TapVerdict::Neutral
    }
}

pub fn collect_bonus(board: &mut ScoreBoard) -> u32 {
    board.bonuses_collected += 1;
    board.multiplier.bump()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceVerdict {
    Advance { matched: usize },
    Complete { points: u32 },
    Mismatch { penalty: u32 },
}

/// Checks the latest tile of `input` against `expected` and scores it.
pub fn score_sequence_step(
    rules: &SequenceRules,
    board: &mut ScoreBoard,
    expected: &[usize],
    input: &[usize],
) -> SequenceVerdict {
    let idx = input.len().saturating_sub(1);
    let matches = match (input.last(), expected.get(idx)) {
        (Some(got), Some(want)) => got == want,
        _ => false,
    };

    if !matches {
        board.penalize(rules.miss_penalty);
        return SequenceVerdict::Mismatch {
            penalty: rules.miss_penalty,
        };
    }

    if input.len() == expected.len() {
        let points = rules.per_tile * expected.len() as u32;
        board.award(points);
        board.perfect += 1;
        SequenceVerdict::Complete { points }
    } else {
        SequenceVerdict::Advance {
            matched: input.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::round::{ElementId, Hue, Shape};
    use crate::rules::{GameRules, ScoringRules};
    use assert_matches::assert_matches;
    use std::time::Duration;

    fn combo_rules() -> ComboRules {
        match GameRules::pulse_tap().scoring {
            ScoringRules::Combo(r) => r,
            _ => unreachable!(),
        }
    }

    fn multiplier_rules() -> MultiplierRules {
        match GameRules::focus_shift().scoring {
            ScoringRules::Multiplier(r) => r,
            _ => unreachable!(),
        }
    }

    fn sequence_rules() -> SequenceRules {
        SequenceRules {
            per_tile: 10,
            miss_penalty: 10,
            interlude: Duration::from_millis(500),
        }
    }

    fn ball(hue: Hue, x: f64, y: f64) -> Element {
        Element {
            id: ElementId(1),
            identity: Identity::Hue(hue),
            position: Vec2::new(x, y),
            velocity: Vec2::ZERO,
        }
    }

    #[test]
    fn shape_hits_build_combo_bonus() {
        let rules = combo_rules();
        let mut board = ScoreBoard::default();
        let target = Some(Identity::Shape(Shape::Circle));

        for _ in 0..5 {
            assert_eq!(
                score_shape_tap(&rules, &mut board, Identity::Shape(Shape::Circle), target),
                TapVerdict::Hit { points: 10 }
            );
        }
        assert_eq!(board.score, 50);
        // combo is 5 before this tap, so the bonus applies
        assert_eq!(
            score_shape_tap(&rules, &mut board, Identity::Shape(Shape::Circle), target),
            TapVerdict::Hit { points: 15 }
        );
        assert_eq!(board.combo.current, 6);
        assert_eq!(board.combo.max, 6);
        assert_eq!(board.perfect, 6);
    }

    #[test]
    fn special_shapes_are_worth_twenty() {
        let rules = combo_rules();
        let mut board = ScoreBoard::default();
        let star = Identity::Shape(Shape::Star);
        assert_eq!(
            score_shape_tap(&rules, &mut board, star, Some(star)),
            TapVerdict::Hit { points: 20 }
        );
    }

    #[test]
    fn shape_miss_resets_combo_and_clamps() {
        let rules = combo_rules();
        let mut board = ScoreBoard::default();
        let target = Some(Identity::Shape(Shape::Circle));
        score_shape_tap(&rules, &mut board, Identity::Shape(Shape::Circle), target);
        score_shape_tap(&rules, &mut board, Identity::Shape(Shape::Circle), target);
        assert_matches!(
            score_shape_tap(&rules, &mut board, Identity::Shape(Shape::Square), target),
            TapVerdict::Miss { penalty: 5 }
        );
        assert_eq!(board.score, 15);
        assert_eq!(board.combo.current, 0);
        assert_eq!(board.combo.max, 2);

        for _ in 0..10 {
            score_shape_tap(&rules, &mut board, Identity::Shape(Shape::Square), target);
        }
        assert_eq!(board.score, 0);
        assert_eq!(board.misses, 11);
    }

    #[test]
    fn tracking_hit_inside_zone() {
        let rules = multiplier_rules();
        let mut board = ScoreBoard::new(rules.multiplier_cap);
        let center = Vec2::new(200.0, 400.0);
        let target = Some(Identity::Hue(Hue::Red));

        let verdict =
            score_tracking_tap(&rules, &mut board, &ball(Hue::Red, 210.0, 405.0), target, center);
        assert_eq!(verdict, TapVerdict::Hit { points: 20 });
        assert_eq!(board.perfect, 1);
    }

    #[test]
    fn tracking_miss_on_wrong_color_anywhere() {
        let rules = multiplier_rules();
        let mut board = ScoreBoard::new(rules.multiplier_cap);
        board.award(30);
        collect_bonus(&mut board);
        let center = Vec2::new(200.0, 400.0);
        let target = Some(Identity::Hue(Hue::Red));

        let verdict =
            score_tracking_tap(&rules, &mut board, &ball(Hue::Blue, 300.0, 500.0), target, center);
        assert_eq!(verdict, TapVerdict::Miss { penalty: 10 });
        assert_eq!(board.score, 20);
        assert_eq!(board.multiplier.value, 1);

        let verdict =
            score_tracking_tap(&rules, &mut board, &ball(Hue::Blue, 200.0, 400.0), target, center);
        assert_eq!(verdict, TapVerdict::Miss { penalty: 10 });
    }

    #[test]
    fn tracking_target_outside_zone_is_neutral() {
        let rules = multiplier_rules();
        let mut board = ScoreBoard::new(rules.multiplier_cap);
        let center = Vec2::new(200.0, 400.0);
        let target = Some(Identity::Hue(Hue::Red));

        let verdict =
            score_tracking_tap(&rules, &mut board, &ball(Hue::Red, 300.0, 500.0), target, center);
        assert_eq!(verdict, TapVerdict::Neutral);
        assert_eq!(board.score, 0);

        // exactly on the radius is not inside
        let verdict =
            score_tracking_tap(&rules, &mut board, &ball(Hue::Red, 270.0, 400.0), target, center);
        assert_eq!(verdict, TapVerdict::Neutral);
    }

    #[test]
    fn multiplier_scales_hits_and_caps_at_five() {
        let rules = multiplier_rules();
        let mut board = ScoreBoard::new(rules.multiplier_cap);
        for _ in 0..7 {
            collect_bonus(&mut board);
        }
        assert_eq!(board.multiplier.value, 5);
        assert_eq!(board.bonuses_collected, 7);

        let verdict = score_tracking_tap(
            &rules,
            &mut board,
            &ball(Hue::Green, 200.0, 400.0),
            Some(Identity::Hue(Hue::Green)),
            Vec2::new(200.0, 400.0),
        );
        assert_eq!(verdict, TapVerdict::Hit { points: 100 });
    }

    #[test]
    fn multiplier_decay_stops_at_one() {
        let mut m = Multiplier::new(5);
        m.bump();
        assert!(m.decay());
        assert_eq!(m.value, 1);
        assert!(!m.decay());
        assert_eq!(m.value, 1);
    }

    #[test]
    fn sequence_completes() {
        let rules = sequence_rules();
        let mut board = ScoreBoard::default();
        let expected = [2, 5, 1];
        assert_eq!(
            score_sequence_step(&rules, &mut board, &expected, &[2]),
            SequenceVerdict::Advance { matched: 1 }
        );
        assert_eq!(
            score_sequence_step(&rules, &mut board, &expected, &[2, 5]),
            SequenceVerdict::Advance { matched: 2 }
        );
        assert_eq!(
            score_sequence_step(&rules, &mut board, &expected, &[2, 5, 1]),
            SequenceVerdict::Complete { points: 30 }
        );
        assert_eq!(board.score, 30);
        assert_eq!(board.perfect, 1);
    }

    #[test]
    fn sequence_mismatch_penalizes_with_floor() {
        let rules = sequence_rules();
        let mut board = ScoreBoard::default();
        let expected = [2, 5, 1];
        score_sequence_step(&rules, &mut board, &expected, &[2]);
        assert_eq!(
            score_sequence_step(&rules, &mut board, &expected, &[2, 4]),
            SequenceVerdict::Mismatch { penalty: 10 }
        );
        assert_eq!(board.score, 0);
    }

    #[test]
    fn overlong_input_is_a_mismatch() {
        let rules = sequence_rules();
        let mut board = ScoreBoard::default();
        assert_matches!(
            score_sequence_step(&rules, &mut board, &[1], &[1, 1]),
            SequenceVerdict::Mismatch { .. }
        );
    }
}
