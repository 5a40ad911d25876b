use rand::Rng;
use serde::{Deserialize, Serialize};

/// Margin at which moving bodies bounce off the play area edges.
pub const BOUNCE_MARGIN: f64 = 30.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: Vec2) -> f64 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2)).sqrt()
    }
}

impl From<(f64, f64)> for Vec2 {
    fn from(v: (f64, f64)) -> Self {
        Vec2 { x: v.0, y: v.1 }
    }
}

impl From<Vec2> for (f64, f64) {
    fn from(p: Vec2) -> Self {
        (p.x, p.y)
    }
}

/// Coordinate space shared with the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayArea {
    pub width: f64,
    pub height: f64,
}

impl Default for PlayArea {
    fn default() -> Self {
        Self {
            width: 400.0,
            height: 800.0,
        }
    }
}

impl PlayArea {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    /// Uniform point inside the area shrunk by `margin` on every side.
    /// Degenerate ranges collapse to the center line.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, margin: f64) -> Vec2 {
        Vec2::new(
            sample_axis(rng, margin, self.width - margin),
            sample_axis(rng, margin, self.height - margin),
        )
    }
}

fn sample_axis<R: Rng + ?Sized>(rng: &mut R, lo: f64, hi: f64) -> f64 {
    if hi > lo {
        rng.gen_range(lo..=hi)
    } else {
        (lo + hi) / 2.0
    }
}

/// One physics step: move by velocity, then flip each axis whose coordinate
/// touched the bounce boundary. Axes are independent.
pub fn advance_and_reflect(position: &mut Vec2, velocity: &mut Vec2, area: &PlayArea) {
    position.x += velocity.x;
    position.y += velocity.y;

    if position.x <= BOUNCE_MARGIN || position.x >= area.width - BOUNCE_MARGIN {
        velocity.x = -velocity.x;
    }
    if position.y <= BOUNCE_MARGIN || position.y >= area.height - BOUNCE_MARGIN {
        velocity.y = -velocity.y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn distance_is_euclidean() {
        let a = Vec2::new(200.0, 400.0);
        assert_eq!(a.distance(Vec2::new(203.0, 404.0)), 5.0);
        assert_eq!(a.distance(a), 0.0);
    }

    #[test]
    fn center_of_default_area() {
        assert_eq!(PlayArea::default().center(), Vec2::new(200.0, 400.0));
    }

    #[test]
    fn samples_stay_inside_margin() {
        let area = PlayArea::new(300.0, 500.0);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..500 {
            let p = area.sample(&mut rng, 40.0);
            assert!((40.0..=260.0).contains(&p.x));
            assert!((40.0..=460.0).contains(&p.y));
        }
    }

    #[test]
    fn degenerate_area_samples_center() {
        let area = PlayArea::new(60.0, 60.0);
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(area.sample(&mut rng, 40.0), Vec2::new(30.0, 30.0));
    }

    #[test]
    fn free_flight_keeps_velocity() {
        let area = PlayArea::default();
        let mut pos = Vec2::new(100.0, 100.0);
        let mut vel = Vec2::new(2.0, -3.0);
        advance_and_reflect(&mut pos, &mut vel, &area);
        assert_eq!(pos, Vec2::new(102.0, 97.0));
        assert_eq!(vel, Vec2::new(2.0, -3.0));
    }

    #[test]
    fn reflection_is_axis_independent() {
        let area = PlayArea::default();
        let mut pos = Vec2::new(369.0, 200.0);
        let mut vel = Vec2::new(2.0, 1.5);
        advance_and_reflect(&mut pos, &mut vel, &area);
        // x crossed width - 30 = 370, y did not
        assert_eq!(pos, Vec2::new(371.0, 201.5));
        assert_eq!(vel, Vec2::new(-2.0, 1.5));

        advance_and_reflect(&mut pos, &mut vel, &area);
        assert_eq!(pos, Vec2::new(369.0, 203.0));
        assert_eq!(vel, Vec2::new(-2.0, 1.5));
    }

    #[test]
    fn reflection_loses_no_energy() {
        let area = PlayArea::new(100.0, 100.0);
        let mut pos = Vec2::new(31.0, 31.0);
        let mut vel = Vec2::new(-1.0, -1.0);
        advance_and_reflect(&mut pos, &mut vel, &area);
        assert_eq!(vel, Vec2::new(1.0, 1.0));
        assert_eq!(pos, Vec2::new(30.0, 30.0));
    }

    #[test]
    fn tuple_conversions() {
        let v: Vec2 = (1.0, 2.0).into();
        let t: (f64, f64) = v.into();
        assert_eq!(t, (1.0, 2.0));
    }
}
