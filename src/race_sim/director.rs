//! Director - Game state machine and frame loop
//!
//! Sequences menu, countdown, racing and results, turns wall-clock frame
//! timestamps into clamped tick lengths, and produces read-only snapshots
//! for the presentation layer.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::race_sim::control::{ControlIntent, ControlSource};
use crate::race_sim::error::RaceError;
use crate::race_sim::motion::RacerSnapshot;
use crate::race_sim::race::{Placement, Race, RaceConfig};

/// Overall game state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameState {
    Loading,
    Menu,
    Countdown,
    Racing,
    Finished,
}

/// Director statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectorStats {
    pub tick_count: u64,
    pub avg_tick_time_ms: f32,
    pub racer_count: u32,
    pub game_state: GameState,
    pub paused: bool,
}

/// Read-only view of the whole race after a tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceSnapshot {
    pub state: GameState,
    pub countdown: f32,
    pub elapsed_time: f32,
    pub track_length: f32,
    pub racers: Vec<RacerSnapshot>,
    pub placements: Option<Vec<Placement>>,
    pub paused: bool,
}

/// Turns frame timestamps into bounded tick lengths
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Option<Instant>,
    max_dt: f32,
}

impl FrameClock {
    pub fn new(max_dt: f32) -> Self {
        Self { last: None, max_dt }
    }

    /// Seconds since the previous frame, clamped to `[0, max_dt]`. The first
    /// frame after construction or a reset yields zero.
    pub fn delta(&mut self, now: Instant) -> f32 {
        let dt = match self.last {
            Some(last) => now.saturating_duration_since(last).as_secs_f32(),
            None => 0.0,
        };
        self.last = Some(now);
        dt.min(self.max_dt)
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Owns the race and drives it one frame at a time
pub struct RaceDirector {
    state: GameState,
    race: Race,
    clock: FrameClock,
    max_frame_dt: f32,
    paused: bool,
    /// Forward was held on the previous tick; restarting from results needs a fresh press
    forward_held: bool,
    tick_count: u64,
    tick_times: Vec<f32>,
}

impl RaceDirector {
    const TICK_HISTORY: usize = 60;

    pub fn new(config: RaceConfig) -> Result<Self, RaceError> {
        let max_frame_dt = config.max_frame_dt;
        let race = Race::new(config)?;
        log::info!("Race director created with {} racers", race.racers().len());

        Ok(Self {
            state: GameState::Loading,
            race,
            clock: FrameClock::new(max_frame_dt),
            max_frame_dt,
            paused: false,
            forward_held: false,
            tick_count: 0,
            tick_times: Vec::with_capacity(Self::TICK_HISTORY),
        })
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn race(&self) -> &Race {
        &self.race
    }

    pub fn placements(&self) -> Option<&[Placement]> {
        self.race.placements()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Latest intent from the human input collaborator
    pub fn set_player_intent(&mut self, intent: ControlIntent) {
        if let Some(human) = self.race.player_mut().human_mut() {
            human.set(intent);
        }
    }

    /// Input focus left the window
    pub fn focus_lost(&mut self) {
        if let Some(human) = self.race.player_mut().human_mut() {
            human.focus_lost();
        }
    }

    fn player_intent(&self) -> ControlIntent {
        match self.race.player().control() {
            ControlSource::Human(human) => human.current(),
            ControlSource::Policy(_) => ControlIntent::IDLE,
        }
    }

    /// Rebuild the track for a new viewport
    pub fn resize(&mut self, width: f32, height: f32) {
        self.race.resize(width, height);
    }

    /// Advance by the wall-clock time since the last frame
    pub fn frame(&mut self, now: Instant) -> RaceSnapshot {
        let dt = self.clock.delta(now);
        self.tick(dt);
        self.snapshot()
    }

    /// Advance by `dt` seconds, clamped to the configured frame limit
    pub fn tick(&mut self, dt: f32) -> GameState {
        if self.paused {
            return self.state;
        }
        let tick_start = Instant::now();
        let dt = if dt.is_finite() {
            dt.clamp(0.0, self.max_frame_dt)
        } else {
            0.0
        };

        let forward = self.player_intent().forward;
        let pressed = forward && !self.forward_held;
        self.forward_held = forward;

        match self.state {
            GameState::Loading => self.enter(GameState::Menu),

            GameState::Menu => {
                if forward {
                    self.begin_countdown();
                }
            }

            GameState::Countdown => {
                if self.race.update_countdown(dt) {
                    self.enter(GameState::Racing);
                }
            }

            GameState::Racing => {
                let outcome = self.race.advance(dt);

                if outcome.player_finished && self.race.placements().is_none() {
                    let place = self
                        .race
                        .lock_placements()
                        .iter()
                        .find(|p| p.is_player)
                        .map(|p| p.place)
                        .unwrap_or_default();
                    log::info!(
                        "Player finished in place {} at {:.2}s",
                        place,
                        self.race.elapsed_time()
                    );
                    self.enter(GameState::Finished);
                }

                if outcome.all_finished && self.state == GameState::Racing {
                    self.race.lock_placements();
                    self.enter(GameState::Finished);
                }
            }

            GameState::Finished => {
                if pressed {
                    self.race.reset();
                    log::info!("Race restarted");
                    self.begin_countdown();
                } else if !self.race.all_finished() {
                    // Remaining racers run out the lap behind the results view
                    self.race.advance(dt);
                }
            }
        }

        self.record_tick(tick_start);
        self.state
    }

    fn begin_countdown(&mut self) {
        self.race.start_countdown();
        self.enter(GameState::Countdown);
    }

    fn enter(&mut self, next: GameState) {
        log::info!("Game state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn record_tick(&mut self, tick_start: Instant) {
        self.tick_count += 1;
        self.tick_times.push(tick_start.elapsed().as_secs_f32() * 1000.0);
        if self.tick_times.len() > Self::TICK_HISTORY {
            self.tick_times.remove(0);
        }
    }

    /// Pause the simulation
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            log::info!("Race paused");
        }
    }

    /// Resume the simulation without integrating the paused interval
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.clock.reset();
            log::info!("Race resumed");
        }
    }

    pub fn snapshot(&self) -> RaceSnapshot {
        RaceSnapshot {
            state: self.state,
            countdown: self.race.countdown(),
            elapsed_time: self.race.elapsed_time(),
            track_length: self.race.track().total_length(),
            racers: self.race.racer_snapshots(),
            placements: self.race.placements().map(|p| p.to_vec()),
            paused: self.paused,
        }
    }

    /// Live ranking while the race is running
    pub fn standings(&self) -> Vec<Placement> {
        self.race.standings()
    }

    pub fn stats(&self) -> DirectorStats {
        let avg_tick_time_ms = if self.tick_times.is_empty() {
            0.0
        } else {
            self.tick_times.iter().sum::<f32>() / self.tick_times.len() as f32
        };

        DirectorStats {
            tick_count: self.tick_count,
            avg_tick_time_ms,
            racer_count: self.race.racers().len() as u32,
            game_state: self.state,
            paused: self.paused,
        }
    }
}
