use crate::difficulty::DifficultyParams;
use crate::geometry::{PlayArea, Vec2};
use crate::rules::{Placement, RoundStrategy};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ElementId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Shape {
    Circle,
    Square,
    Triangle,
    Diamond,
    Star,
    Heart,
}

impl Shape {
    pub const ALL: [Shape; 6] = [
        Shape::Circle,
        Shape::Square,
        Shape::Triangle,
        Shape::Diamond,
        Shape::Star,
        Shape::Heart,
    ];

    /// Special shapes are worth more and never appear as decoys.
    pub fn is_special(&self) -> bool {
        matches!(self, Shape::Star | Shape::Heart)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Hue {
    Yellow,
    Red,
    Blue,
    Green,
    Purple,
}

impl Hue {
    pub const ALL: [Hue; 5] = [Hue::Yellow, Hue::Red, Hue::Blue, Hue::Green, Hue::Purple];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Identity {
    Shape(Shape),
    Hue(Hue),
}

impl Identity {
    pub fn is_special(&self) -> bool {
        matches!(self, Identity::Shape(s) if s.is_special())
    }
}

/// A tappable element of the current round. Static shapes carry a zero velocity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Element {
    pub id: ElementId,
    pub identity: Identity,
    pub position: Vec2,
    pub velocity: Vec2,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Obstacle {
    pub id: ElementId,
    pub position: Vec2,
    pub velocity: Vec2,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BonusPickup {
    pub id: ElementId,
    pub position: Vec2,
    pub spawned_at: Duration,
}

/// Elements of one round. Replaced wholesale when a new round starts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RoundState {
    pub target: Option<Identity>,
    pub elements: Vec<Element>,
}

impl RoundState {
    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.iter().find(|e| e.id == id)
    }

    pub fn target_count(&self) -> usize {
        self.elements
            .iter()
            .filter(|e| Some(e.identity) == self.target)
            .count()
    }
}

const OBSTACLE_MARGIN: f64 = 40.0;
const OBSTACLE_SPEED: f64 = 1.5;
const BONUS_MARGIN: f64 = 60.0;
const SPEED_JITTER: f64 = 0.5;

/// Produces rounds, sequences, obstacles and bonus pickups from a seeded RNG.
#[derive(Debug)]
pub struct RoundGenerator {
    rng: StdRng,
    area: PlayArea,
    next_id: u64,
}

impl RoundGenerator {
    pub fn new(area: PlayArea, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            area,
            next_id: 0,
        }
    }

    fn next_id(&mut self) -> ElementId {
        self.next_id += 1;
        ElementId(self.next_id)
    }

    pub fn generate(
        &mut self,
        strategy: &RoundStrategy,
        placement: &Placement,
        params: &DifficultyParams,
    ) -> RoundState {
        let (target, decoys) = match *strategy {
            RoundStrategy::Shapes {
                special_from_level,
                special_one_in,
            } => self.pick_shapes(params.level, special_from_level, special_one_in),
            RoundStrategy::MovingColors => self.pick_hues(),
            RoundStrategy::Sequence { .. } => return RoundState::default(),
        };

        let moving = matches!(strategy, RoundStrategy::MovingColors);
        let positions = self.spaced_positions(params.element_count, placement);
        let targets = params.target_count.min(params.element_count);

        let mut elements: Vec<Element> = positions
            .into_iter()
            .enumerate()
            .map(|(i, position)| {
                let identity = if i < targets {
                    target
                } else {
                    *decoys.choose(&mut self.rng).unwrap_or(&target)
                };
                let velocity = if moving {
                    self.velocity(params.speed)
                } else {
                    Vec2::ZERO
                };
                Element {
                    id: self.next_id(),
                    identity,
                    position,
                    velocity,
                }
            })
            .collect();
        elements.shuffle(&mut self.rng);

        RoundState {
            target: Some(target),
            elements,
        }
    }

    fn pick_shapes(
        &mut self,
        level: u32,
        special_from_level: u32,
        special_one_in: u32,
    ) -> (Identity, Vec<Identity>) {
        let special = level >= special_from_level
            && special_one_in > 0
            && self.rng.gen_ratio(1, special_one_in);
        let pool: Vec<Shape> = Shape::ALL
            .into_iter()
            .filter(|s| s.is_special() == special)
            .collect();
        let target = *pool.choose(&mut self.rng).unwrap_or(&Shape::Circle);
        let decoys = Shape::ALL
            .into_iter()
            .filter(|s| *s != target && !s.is_special())
            .map(Identity::Shape)
            .collect();
        (Identity::Shape(target), decoys)
    }

    fn pick_hues(&mut self) -> (Identity, Vec<Identity>) {
        let target = *Hue::ALL.choose(&mut self.rng).unwrap_or(&Hue::Yellow);
        let decoys = Hue::ALL
            .into_iter()
            .filter(|h| *h != target)
            .map(Identity::Hue)
            .collect();
        (Identity::Hue(target), decoys)
    }

    /// Best-effort spacing: retry until no neighbour is closer than
    /// `min_spacing` or the attempt budget runs out, then accept the overlap.
    fn spaced_positions(&mut self, count: usize, placement: &Placement) -> Vec<Vec2> {
        let mut positions: Vec<Vec2> = Vec::with_capacity(count);
        for _ in 0..count {
            let mut attempts = 0;
            let candidate = loop {
                let p = self.area.sample(&mut self.rng, placement.margin);
                attempts += 1;
                let crowded = positions
                    .iter()
                    .any(|q| q.distance(p) < placement.min_spacing);
                if !crowded || attempts >= placement.max_attempts {
                    break p;
                }
            };
            positions.push(candidate);
        }
        positions
    }

    fn velocity(&mut self, speed: f64) -> Vec2 {
        let s = (speed + self.rng.gen_range(-SPEED_JITTER..=SPEED_JITTER)).abs();
        if s == 0.0 {
            return Vec2::ZERO;
        }
        Vec2::new(self.rng.gen_range(-s..=s), self.rng.gen_range(-s..=s))
    }

    /// Tile indices in `[0, grid_size)`, repeats allowed.
    pub fn sequence(&mut self, length: usize, grid_size: usize) -> Vec<usize> {
        if grid_size == 0 {
            return Vec::new();
        }
        (0..length)
            .map(|_| self.rng.gen_range(0..grid_size))
            .collect()
    }

    pub fn obstacles(&mut self, count: usize) -> Vec<Obstacle> {
        (0..count)
            .map(|_| {
                let position = self.area.sample(&mut self.rng, OBSTACLE_MARGIN);
                let velocity = Vec2::new(
                    self.rng.gen_range(-OBSTACLE_SPEED..=OBSTACLE_SPEED),
                    self.rng.gen_range(-OBSTACLE_SPEED..=OBSTACLE_SPEED),
                );
                Obstacle {
                    id: self.next_id(),
                    position,
                    velocity,
                }
            })
            .collect()
    }

    pub fn bonus(&mut self, now: Duration) -> BonusPickup {
        BonusPickup {
            id: self.next_id(),
            position: self.area.sample(&mut self.rng, BONUS_MARGIN),
            spawned_at: now,
        }
    }
}
