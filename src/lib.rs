//! Oval Racer - Headless racing simulation
//!
//! A player and computer opponents race one lap of an oval track. The
//! library owns the simulation; drawing, raw input capture and window
//! management belong to whoever embeds it.

pub mod race_sim;

pub use race_sim::{
    ControlIntent, GameState, MotionParams, Placement, RaceConfig, RaceDirector, RaceError,
    RaceSnapshot, TrackSpec,
};
