//! Error - Setup and configuration failures
//!
//! The simulation itself never fails at runtime; these errors surface while
//! building a race or loading its configuration.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RaceError {
    #[error("Invalid lane {lane}: track has {lane_count} lanes")]
    InvalidLane { lane: usize, lane_count: usize },

    #[error("Too many racers: {racers} racers for {lanes} lanes")]
    TooManyRacers { racers: usize, lanes: usize },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
