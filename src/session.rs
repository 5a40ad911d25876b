use crate::clock::{ClockState, SessionClock};
use crate::config::Config;
use crate::difficulty::DifficultyLadder;
use crate::geometry::{advance_and_reflect, PlayArea, Vec2};
use crate::progress::{ProgressStore, StoreError};
use crate::result::SessionResult;
use crate::round::{BonusPickup, Element, ElementId, Identity, Obstacle, RoundGenerator, RoundState};
use crate::rules::{GameKind, GameRules, LevelUpTrigger, RoundStrategy, ScoringRules};
use crate::schedule::{DeferredAction, Scheduler, Timebase};
use crate::scoring::{
    collect_bonus, score_sequence_step, score_shape_tap, score_tracking_tap, ScoreBoard,
    SequenceVerdict, TapVerdict,
};
use serde::Serialize;
use std::time::Duration;

/// Pause before the first tile of a sequence flashes, and after the last.
const REVEAL_LEAD: Duration = Duration::from_millis(500);
const REVEAL_TAIL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub play_area: PlayArea,
    pub seed: Option<u64>,
    pub timebase: Timebase,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            play_area: PlayArea::default(),
            seed: None,
            timebase: Timebase::Wall,
        }
    }
}

impl From<&Config> for SessionConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            play_area: cfg.play_area,
            seed: cfg.seed,
            timebase: cfg.deferred_timebase,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Idle,
    Running,
    Paused,
    /// Countdown ran out; the session can be finalized once.
    Ended,
    /// Left early; nothing is reported.
    Exited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TapTarget {
    Element(ElementId),
    Tile(usize),
}

/// A tap forwarded by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tap {
    pub target: TapTarget,
    pub at: Duration,
}

impl Tap {
    pub fn element(id: ElementId, at: Duration) -> Self {
        Self {
            target: TapTarget::Element(id),
            at,
        }
    }

    pub fn tile(index: usize, at: Duration) -> Self {
        Self {
            target: TapTarget::Tile(index),
            at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapOutcome {
    Hit { points: u32 },
    Miss { penalty: u32 },
    /// Counted as a tap but changed nothing (target outside the zone).
    Neutral,
    Bonus { multiplier: u32 },
    Progress { matched: usize },
    Completed { points: u32 },
    /// Unknown element, wrong input kind, or the session is not accepting taps.
    Ignored,
}

impl From<TapVerdict> for TapOutcome {
    fn from(v: TapVerdict) -> Self {
        match v {
            TapVerdict::Hit { points } => TapOutcome::Hit { points },
            TapVerdict::Miss { penalty } => TapOutcome::Miss { penalty },
            TapVerdict::Neutral => TapOutcome::Neutral,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecallPhase {
    Revealing { started: Duration, step: Duration },
    Input,
    /// Short break between a completed sequence and the next one.
    Interlude,
}

#[derive(Debug, Clone)]
struct RecallState {
    sequence: Vec<usize>,
    input: Vec<usize>,
    phase: RecallPhase,
}

/// Total time a sequence of `len` tiles takes to reveal.
pub fn reveal_duration(len: usize, step: Duration) -> Duration {
    let slot = step + step / 2;
    REVEAL_LEAD + slot * len as u32 + REVEAL_TAIL
}

/// Tile lit `elapsed` after the reveal started: on for `step`, off for half of it.
pub fn reveal_frame(sequence: &[usize], step: Duration, elapsed: Duration) -> Option<usize> {
    let t = elapsed.checked_sub(REVEAL_LEAD)?;
    let slot = (step + step / 2).as_nanos();
    if slot == 0 {
        return None;
    }
    let idx = (t.as_nanos() / slot) as usize;
    let within = t.as_nanos() % slot;
    match sequence.get(idx) {
        Some(tile) if within < step.as_nanos() => Some(*tile),
        _ => None,
    }
}

fn clock_for(rules: &GameRules) -> SessionClock {
    let level_every = match rules.level_up {
        LevelUpTrigger::Countdown(n) => Some(n),
        _ => None,
    };
    SessionClock::new(rules.bonus_every_secs, level_every)
}

/// Read-only projection handed to the presentation layer every frame.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub game: GameKind,
    pub phase: Phase,
    pub now: Duration,
    pub remaining_secs: u32,
    pub level: u32,
    pub score: u32,
    pub combo: u32,
    pub multiplier: u32,
    pub target: Option<Identity>,
    pub elements: Vec<Element>,
    pub obstacles: Vec<Obstacle>,
    pub bonuses: Vec<BonusPickup>,
    pub center: Vec2,
    pub recall: Option<RecallPhase>,
    pub flashing_tile: Option<usize>,
    pub sequence_len: usize,
    pub sequence_progress: usize,
    pub accepting_input: bool,
}

/// One timed play of one game.
#[derive(Debug)]
pub struct Session {
    rules: GameRules,
    config: SessionConfig,
    clock: SessionClock,
    ladder: DifficultyLadder,
    generator: RoundGenerator,
    board: ScoreBoard,
    round: RoundState,
    obstacles: Vec<Obstacle>,
    bonuses: Vec<BonusPickup>,
    recall: Option<RecallState>,
    scheduler: Scheduler,
    generation: u64,
    phase: Phase,
    wall: Duration,
    active: Duration,
    finalized: bool,
}

impl Session {
    pub fn new(rules: GameRules, config: SessionConfig) -> Self {
        let multiplier_cap = match rules.scoring {
            ScoringRules::Multiplier(m) => m.multiplier_cap,
            _ => 1,
        };
        Self {
            clock: clock_for(&rules),
            ladder: DifficultyLadder::new(rules.ladder),
            generator: RoundGenerator::new(config.play_area, config.seed),
            board: ScoreBoard::new(multiplier_cap),
            round: RoundState::default(),
            obstacles: Vec::new(),
            bonuses: Vec::new(),
            recall: None,
            scheduler: Scheduler::new(),
            generation: 1,
            phase: Phase::Idle,
            wall: Duration::ZERO,
            active: Duration::ZERO,
            finalized: false,
            rules,
            config,
        }
    }

    pub fn for_game(game: GameKind, config: SessionConfig) -> Self {
        Self::new(game.rules(), config)
    }

    pub fn start(&mut self) -> bool {
        if self.phase != Phase::Idle {
            return false;
        }
        self.clock.start(self.rules.duration_secs);
        self.phase = Phase::Running;
        log::info!(
            "{} started: {}s, generation {}",
            self.rules.kind,
            self.rules.duration_secs,
            self.generation
        );

        match self.rules.round {
            RoundStrategy::Sequence { .. } => self.start_sequence(),
            _ => {
                self.new_round();
                self.spawn_obstacles();
            }
        }
        if self.clock.state() == ClockState::Expired {
            self.end();
        }
        true
    }

    pub fn pause(&mut self) -> bool {
        if !self.clock.pause() {
            return false;
        }
        self.phase = Phase::Paused;
        log::debug!("{} paused at {}s", self.rules.kind, self.clock.remaining());
        true
    }

    pub fn resume(&mut self) -> bool {
        if !self.clock.resume() {
            return false;
        }
        self.phase = Phase::Running;
        log::debug!("{} resumed at {}s", self.rules.kind, self.clock.remaining());
        true
    }

    pub fn toggle_pause(&mut self) -> bool {
        match self.phase {
            Phase::Running => self.pause(),
            Phase::Paused => self.resume(),
            _ => false,
        }
    }

    /// Leave without reporting anything.
    pub fn exit(&mut self) -> bool {
        if matches!(self.phase, Phase::Ended | Phase::Exited) {
            return false;
        }
        self.clock.halt();
        self.phase = Phase::Exited;
        self.teardown();
        log::info!("{} exited with score {}", self.rules.kind, self.board.score);
        true
    }

    /// Back to `Idle` with fresh state, ready for another `start()`.
    pub fn restart(&mut self) {
        self.teardown();
        let multiplier_cap = self.board.multiplier.cap;
        self.clock = clock_for(&self.rules);
        self.ladder.reset();
        self.board = ScoreBoard::new(multiplier_cap);
        self.round = RoundState::default();
        self.obstacles.clear();
        self.bonuses.clear();
        self.recall = None;
        self.phase = Phase::Idle;
        self.finalized = false;
        log::debug!("{} reset, generation {}", self.rules.kind, self.generation);
    }

    fn teardown(&mut self) {
        self.generation += 1;
        self.scheduler.cancel_all();
    }

    fn end(&mut self) {
        self.phase = Phase::Ended;
        self.teardown();
        log::info!(
            "{} ended: score {}, level {}",
            self.rules.kind,
            self.board.score,
            self.ladder.level()
        );
    }

    fn timebase_now(&self) -> Duration {
        match self.config.timebase {
            Timebase::Wall => self.wall,
            Timebase::Active => self.active,
        }
    }

    /// Moves engine time forward and fires due deferred tasks.
    /// Earlier timestamps are ignored.
    pub fn advance_to(&mut self, now: Duration) {
        if now <= self.wall {
            return;
        }
        let dt = now - self.wall;
        self.wall = now;
        if self.phase == Phase::Running {
            self.active += dt;
        }
        if !matches!(self.phase, Phase::Running | Phase::Paused) {
            return;
        }
        // a task may schedule another that is already due
        loop {
            let due = self.scheduler.drain_due(self.timebase_now(), self.generation);
            if due.is_empty() {
                break;
            }
            for (at, action) in due {
                self.apply_deferred(at, action);
            }
        }
    }

    fn apply_deferred(&mut self, at: Duration, action: DeferredAction) {
        match action {
            DeferredAction::ExpireBonus(id) => {
                let before = self.bonuses.len();
                self.bonuses.retain(|b| b.id != id);
                if self.bonuses.len() != before {
                    log::debug!("bonus {:?} expired", id);
                }
            }
            DeferredAction::DecayMultiplier => {
                if self.board.multiplier.decay() {
                    log::debug!("multiplier decayed to {}", self.board.multiplier.value);
                }
            }
            DeferredAction::EndReveal => {
                if let Some(recall) = self.recall.as_mut() {
                    if matches!(recall.phase, RecallPhase::Revealing { .. }) {
                        recall.phase = RecallPhase::Input;
                    }
                }
            }
            DeferredAction::StartNextSequence => self.start_sequence_at(at),
        }
    }

    /// Once-per-second countdown tick.
    pub fn tick(&mut self) {
        if self.phase != Phase::Running || self.is_revealing() {
            return;
        }
        let outcome = self.clock.tick();
        if outcome.expired {
            self.end();
            return;
        }
        if outcome.spawn_bonus {
            self.spawn_bonus();
        }
        if outcome.level_up {
            self.ladder.advance();
            log::info!("{} level up -> {}", self.rules.kind, self.ladder.level());
            self.new_round();
            self.spawn_obstacles();
        }
    }

    /// Fast motion tick; moving bodies freeze unless the clock runs.
    pub fn physics_tick(&mut self) {
        if self.phase != Phase::Running || !self.clock.physics_enabled() {
            return;
        }
        let area = self.config.play_area;
        if matches!(self.rules.round, RoundStrategy::MovingColors) {
            for e in self.round.elements.iter_mut() {
                advance_and_reflect(&mut e.position, &mut e.velocity, &area);
            }
        }
        for o in self.obstacles.iter_mut() {
            advance_and_reflect(&mut o.position, &mut o.velocity, &area);
        }
    }

    pub fn handle_tap(&mut self, tap: Tap) -> TapOutcome {
        self.advance_to(tap.at);
        if self.phase != Phase::Running {
            return TapOutcome::Ignored;
        }

        match (self.rules.scoring, tap.target) {
            (ScoringRules::Combo(rules), TapTarget::Element(id)) => {
                let Some(element) = self.round.element(id) else {
                    return TapOutcome::Ignored;
                };
                let verdict = score_shape_tap(&rules, &mut self.board, element.identity, self.round.target);
                if matches!(verdict, TapVerdict::Hit { .. }) {
                    self.next_shape_round();
                }
                verdict.into()
            }
            (ScoringRules::Multiplier(rules), TapTarget::Element(id)) => {
                if self.bonuses.iter().any(|b| b.id == id) {
                    self.bonuses.retain(|b| b.id != id);
                    self.scheduler.cancel(DeferredAction::ExpireBonus(id));
                    let multiplier = collect_bonus(&mut self.board);
                    let due = self.timebase_now() + rules.decay_after;
                    self.scheduler
                        .schedule(due, self.generation, DeferredAction::DecayMultiplier);
                    log::debug!("bonus collected, multiplier {multiplier}");
                    return TapOutcome::Bonus { multiplier };
                }
                let Some(element) = self.round.element(id) else {
                    return TapOutcome::Ignored;
                };
                let center = self.config.play_area.center();
                let verdict = score_tracking_tap(
                    &rules,
                    &mut self.board,
                    element,
                    self.round.target,
                    center,
                );
                if matches!(verdict, TapVerdict::Hit { .. }) {
                    self.new_round();
                    let level = self.ladder.level() as usize;
                    let wants_more = self
                        .rules
                        .ladder
                        .obstacles
                        .is_some_and(|o| self.ladder.level() >= o.from_level);
                    if wants_more && self.obstacles.len() < level.saturating_sub(1) {
                        self.spawn_obstacles();
                    }
                }
                verdict.into()
            }
            (ScoringRules::Sequence(rules), TapTarget::Tile(tile)) => {
                let grid = match self.rules.round {
                    RoundStrategy::Sequence { grid_size } => grid_size,
                    _ => 0,
                };
                let Some(recall) = self.recall.as_mut() else {
                    return TapOutcome::Ignored;
                };
                if recall.phase != RecallPhase::Input || tile >= grid {
                    return TapOutcome::Ignored;
                }
                recall.input.push(tile);
                match score_sequence_step(&rules, &mut self.board, &recall.sequence, &recall.input) {
                    SequenceVerdict::Advance { matched } => TapOutcome::Progress { matched },
                    SequenceVerdict::Mismatch { penalty } => {
                        log::debug!("sequence broken at tap {}", recall.input.len());
                        self.start_sequence();
                        TapOutcome::Miss { penalty }
                    }
                    SequenceVerdict::Complete { points } => {
                        recall.phase = RecallPhase::Interlude;
                        self.ladder.advance();
                        let due = self.timebase_now() + rules.interlude;
                        self.scheduler
                            .schedule(due, self.generation, DeferredAction::StartNextSequence);
                        TapOutcome::Completed { points }
                    }
                }
            }
            _ => TapOutcome::Ignored,
        }
    }

    fn new_round(&mut self) {
        self.round =
            self.generator
                .generate(&self.rules.round, &self.rules.placement, self.ladder.params());
    }

    fn next_shape_round(&mut self) {
        if let LevelUpTrigger::ScoreMultiple(n) = self.rules.level_up {
            let score = self.board.score;
            if n > 0 && score > 0 && score % n == 0 {
                self.ladder.advance();
                log::info!("{} level up -> {}", self.rules.kind, self.ladder.level());
            }
        }
        self.new_round();
    }

    fn spawn_obstacles(&mut self) {
        let count = self.ladder.params().obstacle_count;
        if self.rules.ladder.obstacles.is_none() {
            return;
        }
        self.obstacles = self.generator.obstacles(count);
    }

    fn spawn_bonus(&mut self) {
        let ScoringRules::Multiplier(rules) = self.rules.scoring else {
            return;
        };
        let now = self.timebase_now();
        let bonus = self.generator.bonus(now);
        self.scheduler.schedule(
            now + rules.bonus_lifetime,
            self.generation,
            DeferredAction::ExpireBonus(bonus.id),
        );
        log::debug!("bonus {:?} spawned at {:?}", bonus.id, bonus.position);
        self.bonuses.push(bonus);
    }

    fn start_sequence(&mut self) {
        self.start_sequence_at(self.timebase_now());
    }

    /// Starts a reveal anchored at `started`, which may lie behind engine
    /// time when a deferred start fired late.
    fn start_sequence_at(&mut self, started: Duration) {
        let RoundStrategy::Sequence { grid_size } = self.rules.round else {
            return;
        };
        self.scheduler.cancel(DeferredAction::EndReveal);
        let params = *self.ladder.params();
        let sequence = self.generator.sequence(params.element_count, grid_size);
        self.scheduler.schedule(
            started + reveal_duration(sequence.len(), params.reveal_step),
            self.generation,
            DeferredAction::EndReveal,
        );
        self.recall = Some(RecallState {
            sequence,
            input: Vec::new(),
            phase: RecallPhase::Revealing {
                started,
                step: params.reveal_step,
            },
        });
    }

    fn is_revealing(&self) -> bool {
        self.recall
            .as_ref()
            .is_some_and(|r| matches!(r.phase, RecallPhase::Revealing { .. }))
    }

    pub fn flashing_tile(&self) -> Option<usize> {
        let recall = self.recall.as_ref()?;
        match recall.phase {
            RecallPhase::Revealing { started, step } => reveal_frame(
                &recall.sequence,
                step,
                self.timebase_now().saturating_sub(started),
            ),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            game: self.rules.kind,
            phase: self.phase,
            now: self.wall,
            remaining_secs: self.clock.remaining(),
            level: self.ladder.level(),
            score: self.board.score,
            combo: self.board.combo.current,
            multiplier: self.board.multiplier.value,
            target: self.round.target,
            elements: self.round.elements.clone(),
            obstacles: self.obstacles.clone(),
            bonuses: self.bonuses.clone(),
            center: self.config.play_area.center(),
            recall: self.recall_phase(),
            flashing_tile: self.flashing_tile(),
            sequence_len: self.recall.as_ref().map_or(0, |r| r.sequence.len()),
            sequence_progress: self.recall.as_ref().map_or(0, |r| r.input.len()),
            accepting_input: self.phase == Phase::Running
                && self
                    .recall
                    .as_ref()
                    .map_or(true, |r| r.phase == RecallPhase::Input),
        }
    }

    /// Reports the result to `store` exactly once, and only for a session
    /// that ran out its clock. Later calls return `Ok(None)`.
    pub fn finalize<S: ProgressStore + ?Sized>(
        &mut self,
        store: &mut S,
    ) -> Result<Option<SessionResult>, StoreError> {
        if self.phase != Phase::Ended {
            log::warn!("{} finalize ignored in phase {:?}", self.rules.kind, self.phase);
            return Ok(None);
        }
        if self.finalized {
            log::warn!("{} already finalized", self.rules.kind);
            return Ok(None);
        }
        self.finalized = true;

        let mut result = SessionResult::compute(self);
        result.report(store)?;
        log::info!(
            "{} finalized: {} earned points{}",
            self.rules.kind,
            result.earned_points,
            if result.new_best { ", new best" } else { "" }
        );
        Ok(Some(result))
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_over(&self) -> bool {
        matches!(self.phase, Phase::Ended | Phase::Exited)
    }

    pub fn is_paused(&self) -> bool {
        self.phase == Phase::Paused
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn board(&self) -> &ScoreBoard {
        &self.board
    }

    pub fn score(&self) -> u32 {
        self.board.score
    }

    pub fn level(&self) -> u32 {
        self.ladder.level()
    }

    pub fn remaining_secs(&self) -> u32 {
        self.clock.remaining()
    }

    pub fn round(&self) -> &RoundState {
        &self.round
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn bonuses(&self) -> &[BonusPickup] {
        &self.bonuses
    }

    pub fn recall_phase(&self) -> Option<RecallPhase> {
        self.recall.as_ref().map(|r| r.phase)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn now(&self) -> Duration {
        self.wall
    }

    pub fn pending_tasks(&self) -> usize {
        self.scheduler.len()
    }
}
