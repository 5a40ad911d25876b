use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use crate::session::{Phase, Session, Tap, TapOutcome, TapTarget};

pub const COUNTDOWN_INTERVAL: Duration = Duration::from_secs(1);
pub const PHYSICS_INTERVAL: Duration = Duration::from_millis(33);
/// Physics steps replayed at most per advance after a stall.
const MAX_PHYSICS_CATCHUP: u32 = 30;

/// Unified event type consumed by the session driver
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameEvent {
    Tap(TapTarget),
    TogglePause,
    Exit,
    Tick,
}

/// Source of player input forwarded by the presentation layer
pub trait GameEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError>;
}

/// Event source fed through an mpsc channel
pub struct ChannelEventSource {
    rx: Receiver<GameEvent>,
}

impl ChannelEventSource {
    pub fn new(rx: Receiver<GameEvent>) -> Self {
        Self { rx }
    }

    pub fn channel() -> (Sender<GameEvent>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self::new(rx))
    }
}

impl GameEventSource for ChannelEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Runner that yields one event at a time
pub struct Runner<E: GameEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: GameEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Blocks up to tick interval and returns the next event, or Tick on timeout
    pub fn step(&self) -> GameEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => GameEvent::Tick,
        }
    }
}

/// Engine time as seen by the driver.
pub trait TimeSource {
    fn now(&mut self) -> Duration;
}

#[derive(Debug, Clone, Copy)]
pub struct MonotonicTime {
    start: Instant,
}

impl MonotonicTime {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for MonotonicTime {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicTime {
    fn now(&mut self) -> Duration {
        self.start.elapsed()
    }
}

/// Advances by a fixed frame on every read.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedTime {
    now: Duration,
    frame: Duration,
}

impl SimulatedTime {
    pub fn new(frame: Duration) -> Self {
        Self {
            now: Duration::ZERO,
            frame,
        }
    }
}

impl TimeSource for SimulatedTime {
    fn now(&mut self) -> Duration {
        self.now += self.frame;
        self.now
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PacedTicks {
    pub countdown: u32,
    pub physics: u32,
}

/// Turns elapsed engine time into countdown and physics ticks.
/// While paused nothing accumulates, and the partial countdown second is
/// dropped so a resumed clock waits a full second before its next tick.
#[derive(Debug, Clone, Default)]
pub struct TickPacer {
    last: Option<Duration>,
    was_running: bool,
    countdown_acc: Duration,
    physics_acc: Duration,
}

impl TickPacer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, now: Duration, running: bool) -> PacedTicks {
        let last = self.last.replace(now).unwrap_or(now);
        let was_running = std::mem::replace(&mut self.was_running, running);
        if !running {
            self.countdown_acc = Duration::ZERO;
            self.physics_acc = Duration::ZERO;
            return PacedTicks::default();
        }
        let dt = if was_running {
            now.saturating_sub(last)
        } else {
            Duration::ZERO
        };
        self.countdown_acc += dt;
        self.physics_acc += dt;

        let mut ticks = PacedTicks::default();
        while self.countdown_acc >= COUNTDOWN_INTERVAL {
            self.countdown_acc -= COUNTDOWN_INTERVAL;
            ticks.countdown += 1;
        }
        while self.physics_acc >= PHYSICS_INTERVAL {
            self.physics_acc -= PHYSICS_INTERVAL;
            ticks.physics += 1;
        }
        if ticks.physics > MAX_PHYSICS_CATCHUP {
            log::debug!("dropping {} physics ticks", ticks.physics - MAX_PHYSICS_CATCHUP);
            ticks.physics = MAX_PHYSICS_CATCHUP;
        }
        ticks
    }
}

/// Drives one session single-threaded: input, deferred tasks, then ticks.
pub struct SessionDriver<E: GameEventSource, T: Ticker, C: TimeSource> {
    runner: Runner<E, T>,
    time: C,
    pacer: TickPacer,
}

impl<E: GameEventSource, T: Ticker, C: TimeSource> SessionDriver<E, T, C> {
    pub fn new(runner: Runner<E, T>, time: C) -> Self {
        Self {
            runner,
            time,
            pacer: TickPacer::new(),
        }
    }

    /// Handles at most one event. Returns the tap outcome when the event was a tap.
    pub fn step(&mut self, session: &mut Session) -> Option<TapOutcome> {
        let event = self.runner.step();
        let now = self.time.now();
        session.advance_to(now);

        let outcome = match event {
            GameEvent::Tap(target) => Some(session.handle_tap(Tap { target, at: now })),
            GameEvent::TogglePause => {
                session.toggle_pause();
                None
            }
            GameEvent::Exit => {
                session.exit();
                None
            }
            GameEvent::Tick => None,
        };

        let ticks = self.pacer.advance(now, session.phase() == Phase::Running);
        for _ in 0..ticks.physics {
            session.physics_tick();
        }
        for _ in 0..ticks.countdown {
            session.tick();
        }
        outcome
    }

    /// Steps until the session ends or exits, or `max_steps` is used up.
    pub fn run(&mut self, session: &mut Session, max_steps: usize) -> Phase {
        for _ in 0..max_steps {
            if session.is_over() {
                break;
            }
            self.step(session);
        }
        session.phase()
    }
}
