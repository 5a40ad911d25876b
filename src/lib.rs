// Library surface for the engine, persistence and headless runs.
// The `blink` binary in main.rs is a thin CLI over it.
pub mod app_dirs;
pub mod autoplay;
pub mod clock;
pub mod config;
pub mod difficulty;
pub mod geometry;
pub mod progress;
pub mod result;
pub mod round;
pub mod rules;
pub mod runtime;
pub mod schedule;
pub mod scoring;
pub mod session;
pub mod stats;
pub mod util;

pub use rules::{GameKind, GameRules};
pub use session::{Session, SessionConfig, SessionSnapshot, Tap, TapOutcome, TapTarget};
