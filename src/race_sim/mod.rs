//! Race Simulation Module
//!
//! Track geometry, racer physics, opponent heuristics and the race state
//! machine. Headless: callers feed input and read snapshots.

pub mod control;
pub mod director;
pub mod error;
pub mod motion;
pub mod opponent;
pub mod race;
pub mod track;

pub use control::{ControlContext, ControlIntent, ControlSource, HumanControl};
pub use director::{DirectorStats, FrameClock, GameState, RaceDirector, RaceSnapshot};
pub use error::RaceError;
pub use motion::{MotionModel, MotionParams, RacerSnapshot, RacerState};
pub use opponent::{OpponentPolicy, OpponentProfile, OpponentRaceTimers, PolicyControl};
pub use race::{compute_placements, rank_by_progress, Placement, Race, RaceConfig, Racer, TickOutcome};
pub use track::{Point, TrackPosition, TrackSpec};
