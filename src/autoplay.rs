use crate::config::{AutoplayConfig, Config};
use crate::geometry::Vec2;
use crate::progress::{ProgressStore, StoreError};
use crate::result::SessionResult;
use crate::round::Element;
use crate::rules::{GameRules, RoundStrategy, ScoringRules};
use crate::runtime::{SimulatedTime, TickPacer, TimeSource, PHYSICS_INTERVAL};
use crate::session::{Phase, RecallPhase, Session, SessionConfig, SessionSnapshot, Tap, TapTarget};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::time::Duration;

/// Automated player interface used by headless runs.
pub trait TapPolicy {
    fn name(&self) -> &'static str;

    /// Called every frame so the policy can watch reveals.
    fn observe(&mut self, _snapshot: &SessionSnapshot) {}

    fn decide(&mut self, snapshot: &SessionSnapshot) -> Option<TapTarget>;
}

/// Taps once per reaction interval, correctly with probability `accuracy`.
#[derive(Debug)]
pub struct AccuracyBot {
    rng: StdRng,
    accuracy: f64,
    reaction: Duration,
    next_at: Duration,
    strategy: RoundStrategy,
    zone_radius: f64,
    grid_size: usize,
    reveal_started: Option<Duration>,
    last_flash: Option<usize>,
    remembered: Vec<usize>,
}

impl AccuracyBot {
    pub fn new(rules: &GameRules, cfg: &AutoplayConfig, seed: u64) -> Self {
        let zone_radius = match rules.scoring {
            ScoringRules::Multiplier(m) => m.zone_radius,
            _ => 0.0,
        };
        let grid_size = match rules.round {
            RoundStrategy::Sequence { grid_size } => grid_size,
            _ => 0,
        };
        Self {
            rng: StdRng::seed_from_u64(seed),
            accuracy: cfg.accuracy.clamp(0.0, 1.0),
            reaction: Duration::from_millis(cfg.reaction_ms),
            next_at: Duration::ZERO,
            strategy: rules.round,
            zone_radius,
            grid_size,
            reveal_started: None,
            last_flash: None,
            remembered: Vec::new(),
        }
    }

    fn pick<'a>(&mut self, candidates: &[&'a Element]) -> Option<&'a Element> {
        candidates.choose(&mut self.rng).copied()
    }

    fn tap_shapes(&mut self, snap: &SessionSnapshot, correct: bool) -> Option<TapTarget> {
        let (targets, decoys): (Vec<&Element>, Vec<&Element>) = snap
            .elements
            .iter()
            .partition(|e| Some(e.identity) == snap.target);
        let chosen = if correct || decoys.is_empty() {
            self.pick(&targets)
        } else {
            self.pick(&decoys)
        };
        chosen.map(|e| TapTarget::Element(e.id))
    }

    fn tap_tracking(&mut self, snap: &SessionSnapshot, correct: bool) -> Option<TapTarget> {
        if let Some(bonus) = snap.bonuses.first() {
            if correct {
                return Some(TapTarget::Element(bonus.id));
            }
        }
        let center: Vec2 = snap.center;
        let in_zone: Vec<&Element> = snap
            .elements
            .iter()
            .filter(|e| Some(e.identity) == snap.target)
            .filter(|e| e.position.distance(center) < self.zone_radius)
            .collect();
        if in_zone.is_empty() {
            return None;
        }
        if correct {
            return self.pick(&in_zone).map(|e| TapTarget::Element(e.id));
        }
        let decoys: Vec<&Element> = snap
            .elements
            .iter()
            .filter(|e| Some(e.identity) != snap.target)
            .collect();
        self.pick(&decoys).map(|e| TapTarget::Element(e.id))
    }

    fn tap_sequence(&mut self, snap: &SessionSnapshot, correct: bool) -> Option<TapTarget> {
        if snap.recall != Some(RecallPhase::Input) || self.grid_size == 0 {
            return None;
        }
        let tile = match self.remembered.get(snap.sequence_progress) {
            Some(t) if correct => *t,
            Some(t) => (*t + 1) % self.grid_size,
            None => self.rng.gen_range(0..self.grid_size),
        };
        Some(TapTarget::Tile(tile))
    }
}

impl TapPolicy for AccuracyBot {
    fn name(&self) -> &'static str {
        "Accuracy"
    }

    fn observe(&mut self, snap: &SessionSnapshot) {
        let Some(RecallPhase::Revealing { started, .. }) = snap.recall else {
            self.last_flash = None;
            return;
        };
        if self.reveal_started != Some(started) {
            self.reveal_started = Some(started);
            self.remembered.clear();
            self.last_flash = None;
        }
        if let Some(tile) = snap.flashing_tile {
            if self.last_flash != Some(tile) {
                self.remembered.push(tile);
            }
        }
        self.last_flash = snap.flashing_tile;
    }

    fn decide(&mut self, snap: &SessionSnapshot) -> Option<TapTarget> {
        if snap.phase != Phase::Running || snap.now < self.next_at {
            return None;
        }
        let correct = self.rng.gen_bool(self.accuracy);
        let target = match self.strategy {
            RoundStrategy::Shapes { .. } => self.tap_shapes(snap, correct),
            RoundStrategy::MovingColors => self.tap_tracking(snap, correct),
            RoundStrategy::Sequence { .. } => self.tap_sequence(snap, correct),
        };
        if target.is_some() {
            self.next_at = snap.now + self.reaction;
        }
        target
    }
}

/// Plays one full session in simulated time with `policy` and finalizes it.
pub fn play<P: TapPolicy + ?Sized, S: ProgressStore + ?Sized>(
    session: &mut Session,
    policy: &mut P,
    store: &mut S,
) -> Result<Option<SessionResult>, StoreError> {
    let mut time = SimulatedTime::new(PHYSICS_INTERVAL);
    let mut pacer = TickPacer::new();
    session.start();
    log::debug!("autoplay with {} policy", policy.name());

    while !session.is_over() {
        let now = time.now();
        session.advance_to(now);
        let ticks = pacer.advance(now, session.phase() == Phase::Running);
        for _ in 0..ticks.physics {
            session.physics_tick();
        }
        for _ in 0..ticks.countdown {
            session.tick();
        }

        let snap = session.snapshot();
        policy.observe(&snap);
        if let Some(target) = policy.decide(&snap) {
            session.handle_tap(Tap { target, at: now });
        }
    }
    session.finalize(store)
}

/// Runs `rules` with an [`AccuracyBot`] built from `config`.
pub fn simulate<S: ProgressStore + ?Sized>(
    rules: GameRules,
    config: &Config,
    store: &mut S,
) -> Result<Option<SessionResult>, StoreError> {
    let seed = config.seed.unwrap_or_else(rand::random);
    let mut bot = AccuracyBot::new(&rules, &config.autoplay, seed);
    let mut session = Session::new(rules, SessionConfig::from(config));
    play(&mut session, &mut bot, store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::MemoryProgressStore;
    use crate::rules::GameKind;

    fn config(accuracy: f64) -> Config {
        Config {
            seed: Some(11),
            autoplay: AutoplayConfig {
                accuracy,
                reaction_ms: 400,
            },
            ..Config::default()
        }
    }

    #[test]
    fn perfect_bot_scores_in_every_game() {
        for game in GameKind::ALL {
            let mut store = MemoryProgressStore::default();
            let result = simulate(game.rules(), &config(1.0), &mut store)
                .unwrap()
                .unwrap();
            assert!(result.score > 0, "{game} scored nothing");
            let expected = u32::from(game.rules().counts_games_played);
            assert_eq!(store.load().unwrap().games_played, expected);
        }
    }

    #[test]
    fn perfect_recall_bot_remembers_sequences() {
        let mut store = MemoryProgressStore::default();
        let result = simulate(GameRules::pattern_recall(), &config(1.0), &mut store)
            .unwrap()
            .unwrap();
        assert!(result.level > 2);
        assert_eq!(result.score, store.history()[0].score);
        let record = store.load().unwrap();
        assert_eq!(record.games_played, 0);
        assert!(record.best_scores.is_empty());
        assert_eq!(record.lifetime_points, result.earned_points as u64);
    }

    #[test]
    fn hopeless_bot_never_goes_negative() {
        let mut store = MemoryProgressStore::default();
        let result = simulate(GameRules::pulse_tap(), &config(0.0), &mut store)
            .unwrap()
            .unwrap();
        assert_eq!(result.score, 0);
        assert_eq!(result.perfect, 0);
        assert!(!result.streak_awarded);
    }

    #[test]
    fn same_seed_same_result() {
        let a = simulate(GameRules::focus_shift(), &config(0.7), &mut MemoryProgressStore::default())
            .unwrap();
        let b = simulate(GameRules::focus_shift(), &config(0.7), &mut MemoryProgressStore::default())
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn bot_waits_for_reaction_time() {
        let rules = GameRules::pulse_tap();
        let mut bot = AccuracyBot::new(&rules, &AutoplayConfig::default(), 3);
        let mut session = Session::new(rules, SessionConfig::default());
        session.start();
        assert!(bot.decide(&session.snapshot()).is_some());
        assert!(bot.decide(&session.snapshot()).is_none());
    }
}
