use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClockState {
    Idle,
    Running,
    Paused,
    Expired,
}

/// What a countdown tick asks the rest of the engine to do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub expired: bool,
    pub spawn_bonus: bool,
    pub level_up: bool,
}

/// Whole-second countdown with pause/resume. Boundary signals are derived
/// from the remaining value, so each boundary fires once.
#[derive(Debug, Clone)]
pub struct SessionClock {
    duration: u32,
    remaining: u32,
    state: ClockState,
    bonus_every: Option<u32>,
    level_every: Option<u32>,
}

impl SessionClock {
    pub fn new(bonus_every: Option<u32>, level_every: Option<u32>) -> Self {
        Self {
            duration: 0,
            remaining: 0,
            state: ClockState::Idle,
            bonus_every: bonus_every.filter(|n| *n > 0),
            level_every: level_every.filter(|n| *n > 0),
        }
    }

    pub fn start(&mut self, duration_secs: u32) {
        self.duration = duration_secs;
        self.remaining = duration_secs;
        self.state = if duration_secs == 0 {
            ClockState::Expired
        } else {
            ClockState::Running
        };
    }

    /// Returns false when the clock was not running (already paused included).
    pub fn pause(&mut self) -> bool {
        if self.state != ClockState::Running {
            return false;
        }
        self.state = ClockState::Paused;
        true
    }

    pub fn resume(&mut self) -> bool {
        if self.state != ClockState::Paused {
            return false;
        }
        self.state = ClockState::Running;
        true
    }

    pub fn tick(&mut self) -> TickOutcome {
        if self.state != ClockState::Running {
            return TickOutcome::default();
        }

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.state = ClockState::Expired;
            return TickOutcome {
                expired: true,
                ..TickOutcome::default()
            };
        }

        TickOutcome {
            expired: false,
            spawn_bonus: self.bonus_every.is_some_and(|n| self.remaining % n == 0),
            level_up: self
                .level_every
                .is_some_and(|n| self.remaining % n == 0 && self.remaining != self.duration),
        }
    }

    /// Moving bodies only advance while the countdown runs.
    pub fn physics_enabled(&self) -> bool {
        self.state == ClockState::Running
    }

    /// Stop the clock for good (exit or teardown).
    pub fn halt(&mut self) {
        self.state = ClockState::Expired;
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn elapsed(&self) -> u32 {
        self.duration - self.remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_down_to_expiry() {
        let mut clock = SessionClock::new(None, None);
        clock.start(3);
        assert_eq!(clock.tick(), TickOutcome::default());
        assert_eq!(clock.tick(), TickOutcome::default());
        let last = clock.tick();
        assert!(last.expired);
        assert_eq!(clock.state(), ClockState::Expired);
        assert_eq!(clock.remaining(), 0);

        // nothing after expiry
        assert_eq!(clock.tick(), TickOutcome::default());
        assert_eq!(clock.remaining(), 0);
    }

    #[test]
    fn ticks_before_start_are_ignored() {
        let mut clock = SessionClock::new(Some(10), Some(15));
        assert_eq!(clock.tick(), TickOutcome::default());
        assert_eq!(clock.state(), ClockState::Idle);
    }

    #[test]
    fn pause_freezes_and_resume_continues() {
        let mut clock = SessionClock::new(None, None);
        clock.start(10);
        clock.tick();
        assert!(clock.pause());
        assert!(!clock.physics_enabled());
        for _ in 0..5 {
            clock.tick();
        }
        assert_eq!(clock.remaining(), 9);
        assert!(clock.resume());
        clock.tick();
        assert_eq!(clock.remaining(), 8);
    }

    #[test]
    fn double_pause_is_a_no_op() {
        let mut clock = SessionClock::new(None, None);
        clock.start(10);
        clock.tick();
        assert!(clock.pause());
        assert!(!clock.pause());
        assert_eq!(clock.state(), ClockState::Paused);
        assert_eq!(clock.remaining(), 9);
        assert!(clock.resume());
        assert!(!clock.resume());
        assert_eq!(clock.remaining(), 9);
    }

    #[test]
    fn boundary_signals_over_a_full_minute() {
        let mut clock = SessionClock::new(Some(10), Some(15));
        clock.start(60);
        let mut bonus_at = Vec::new();
        let mut level_at = Vec::new();
        while clock.state() == ClockState::Running {
            let out = clock.tick();
            if out.spawn_bonus {
                bonus_at.push(clock.remaining());
            }
            if out.level_up {
                level_at.push(clock.remaining());
            }
        }
        assert_eq!(bonus_at, vec![50, 40, 30, 20, 10]);
        assert_eq!(level_at, vec![45, 30, 15]);
        assert_eq!(clock.elapsed(), 60);
    }

    #[test]
    fn zero_duration_expires_immediately() {
        let mut clock = SessionClock::new(None, None);
        clock.start(0);
        assert_eq!(clock.state(), ClockState::Expired);
    }

    #[test]
    fn halt_stops_ticking() {
        let mut clock = SessionClock::new(None, None);
        clock.start(10);
        clock.halt();
        assert_eq!(clock.tick(), TickOutcome::default());
        assert_eq!(clock.remaining(), 10);
    }
}
