//! Motion - Per-racer longitudinal physics and stamina
//!
//! Every racer, player or opponent, moves with the same rules. Speed and
//! stamina are clamped on every assignment so variable frame times can't
//! push them out of range.

use serde::{Deserialize, Serialize};

use crate::race_sim::control::ControlIntent;

/// Physical limits for one racer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionParams {
    /// Top speed without boost (units/s)
    pub normal_max_speed: f32,
    /// Top speed while boosting with stamina left (units/s)
    pub boost_max_speed: f32,
    /// Speed gained per second while pressing forward
    pub acceleration: f32,
    /// Speed lost per second while coasting
    pub deceleration: f32,
    pub max_stamina: f32,
    /// Stamina spent per second of boost
    pub stamina_drain_rate: f32,
    /// Stamina regained per second without boost
    pub stamina_recovery_rate: f32,
}

impl Default for MotionParams {
    fn default() -> Self {
        Self {
            normal_max_speed: 300.0,
            boost_max_speed: 450.0,
            acceleration: 200.0,
            deceleration: 300.0,
            max_stamina: 100.0,
            stamina_drain_rate: 25.0,
            stamina_recovery_rate: 10.0,
        }
    }
}

impl MotionParams {
    /// Describe the first out-of-range field, if any
    pub fn problem(&self) -> Option<String> {
        let fields = [
            ("normal_max_speed", self.normal_max_speed),
            ("boost_max_speed", self.boost_max_speed),
            ("acceleration", self.acceleration),
            ("deceleration", self.deceleration),
            ("max_stamina", self.max_stamina),
            ("stamina_drain_rate", self.stamina_drain_rate),
            ("stamina_recovery_rate", self.stamina_recovery_rate),
        ];
        if let Some((name, value)) = fields.iter().find(|(_, v)| !v.is_finite() || *v < 0.0) {
            return Some(format!("{name} must be a non-negative number, got {value}"));
        }
        if self.boost_max_speed < self.normal_max_speed {
            return Some(format!(
                "boost_max_speed ({}) is below normal_max_speed ({})",
                self.boost_max_speed, self.normal_max_speed
            ));
        }
        None
    }
}

/// Kinematic state of one racer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RacerState {
    /// Cumulative centerline distance, never wrapped
    pub distance: f32,
    /// Lane index, lane 0 innermost
    pub lane: usize,
    pub speed: f32,
    pub stamina: f32,
    /// Latches true once the racer crosses the finish distance
    pub finished: bool,
    /// Race clock reading when the racer finished
    pub finish_time: Option<f32>,
}

impl RacerState {
    pub fn new(lane: usize, max_stamina: f32) -> Self {
        Self {
            distance: 0.0,
            lane,
            speed: 0.0,
            stamina: max_stamina,
            finished: false,
            finish_time: None,
        }
    }

    /// Back to the start line with a full tank
    pub fn reset(&mut self, max_stamina: f32) {
        self.distance = 0.0;
        self.speed = 0.0;
        self.stamina = max_stamina;
        self.finished = false;
        self.finish_time = None;
    }
}

/// Longitudinal motion rules
pub struct MotionModel;

impl MotionModel {
    /// Advance one racer by `dt` seconds.
    ///
    /// `finish_distance` is the current lap length; a racer finishes the
    /// moment its distance reaches it. Finished racers ignore all input.
    /// Returns true on the tick the racer finishes.
    pub fn step(
        state: &mut RacerState,
        intent: ControlIntent,
        params: &MotionParams,
        dt: f32,
        finish_distance: f32,
    ) -> bool {
        if state.finished {
            return false;
        }
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        if intent.forward {
            let boosting = intent.boost && state.stamina > 0.0;
            let target = if boosting {
                params.boost_max_speed
            } else {
                params.normal_max_speed
            };
            state.speed = (state.speed + params.acceleration * dt).clamp(0.0, target);

            if boosting {
                state.stamina = (state.stamina - params.stamina_drain_rate * dt)
                    .clamp(0.0, params.max_stamina);
            }
        } else {
            state.speed = (state.speed - params.deceleration * dt).max(0.0);
        }

        if !intent.boost {
            state.stamina = (state.stamina + params.stamina_recovery_rate * dt)
                .clamp(0.0, params.max_stamina);
        }

        state.distance += state.speed * dt;

        if finish_distance > 0.0 && state.distance >= finish_distance {
            state.finished = true;
            return true;
        }
        false
    }
}

/// Compact racer state for the presentation layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RacerSnapshot {
    pub id: u32,
    pub name: String,
    pub is_player: bool,
    pub x: f32,
    pub y: f32,
    pub heading: f32,
    pub lane: usize,
    pub speed: f32,
    pub stamina: f32,
    /// Stamina as a 0-1 fraction for HUD bars
    pub stamina_fraction: f32,
    pub progress: f32,
    pub finished: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(acceleration: f32, max_speed: f32) -> MotionParams {
        MotionParams {
            normal_max_speed: max_speed,
            boost_max_speed: max_speed * 1.5,
            acceleration,
            ..MotionParams::default()
        }
    }

    #[test]
    fn test_ramp_up_is_clamped() {
        let params = params(200.0, 500.0);
        let mut state = RacerState::new(0, 100.0);
        let dt = 1.0 / 60.0;

        for _ in 0..150 {
            MotionModel::step(&mut state, ControlIntent::CRUISE, &params, dt, 1000.0);
        }

        assert!((state.speed - 500.0).abs() < 1e-2);
        // 625 for a continuous ramp, plus one frame of explicit-Euler overshoot
        assert!((state.distance - 625.0).abs() < 10.0, "distance {}", state.distance);
        assert!(!state.finished);
    }

    #[test]
    fn test_large_dt_never_overshoots() {
        let params = params(200.0, 500.0);
        let mut state = RacerState::new(0, 100.0);
        MotionModel::step(&mut state, ControlIntent::CRUISE, &params, 60.0, 1e9);
        assert_eq!(state.speed, 500.0);
    }

    #[test]
    fn test_boost_runs_out_of_stamina() {
        let params = MotionParams {
            normal_max_speed: 300.0,
            boost_max_speed: 450.0,
            acceleration: 1000.0,
            stamina_drain_rate: 25.0,
            max_stamina: 100.0,
            ..MotionParams::default()
        };
        let mut state = RacerState::new(0, 100.0);
        let dt = 0.25;

        // 4 seconds of boosting drains exactly 100 stamina
        for _ in 0..16 {
            MotionModel::step(&mut state, ControlIntent::BOOST, &params, dt, 1e9);
            assert!(state.speed <= 450.0);
        }
        assert_eq!(state.stamina, 0.0);
        assert_eq!(state.speed, 450.0);

        MotionModel::step(&mut state, ControlIntent::BOOST, &params, dt, 1e9);
        assert_eq!(state.speed, 300.0);
        assert_eq!(state.stamina, 0.0);
    }

    #[test]
    fn test_stamina_recovers_while_cruising_and_coasting() {
        let params = MotionParams::default();
        let mut state = RacerState::new(0, 100.0);
        state.stamina = 50.0;

        MotionModel::step(&mut state, ControlIntent::CRUISE, &params, 1.0, 1e9);
        assert_eq!(state.stamina, 60.0);

        MotionModel::step(&mut state, ControlIntent::IDLE, &params, 1.0, 1e9);
        assert_eq!(state.stamina, 70.0);

        MotionModel::step(&mut state, ControlIntent::IDLE, &params, 10.0, 1e9);
        assert_eq!(state.stamina, 100.0);
    }

    #[test]
    fn test_boost_without_forward_does_not_recover() {
        let params = MotionParams::default();
        let mut state = RacerState::new(0, 100.0);
        state.stamina = 40.0;
        let intent = ControlIntent { forward: false, boost: true };

        MotionModel::step(&mut state, intent, &params, 1.0, 1e9);
        assert_eq!(state.stamina, 40.0);
    }

    #[test]
    fn test_coasting_reaches_exactly_zero() {
        let params = MotionParams::default();
        let mut state = RacerState::new(0, 100.0);
        state.speed = 290.0;

        let mut ticks = 0;
        while state.speed > 0.0 {
            MotionModel::step(&mut state, ControlIntent::IDLE, &params, 0.1, 1e9);
            ticks += 1;
            assert!(ticks <= 10);
        }
        assert_eq!(state.speed, 0.0);

        let distance = state.distance;
        MotionModel::step(&mut state, ControlIntent::IDLE, &params, 0.1, 1e9);
        assert_eq!(state.speed, 0.0);
        assert_eq!(state.distance, distance);
    }

    #[test]
    fn test_finish_latches() {
        let params = MotionParams::default();
        let mut state = RacerState::new(0, 100.0);
        state.distance = 990.0;
        state.speed = 300.0;

        assert!(MotionModel::step(&mut state, ControlIntent::CRUISE, &params, 0.1, 1000.0));
        assert!(state.finished);
        let distance = state.distance;

        assert!(!MotionModel::step(&mut state, ControlIntent::BOOST, &params, 0.1, 1000.0));
        assert!(state.finished);
        assert_eq!(state.distance, distance);
    }

    #[test]
    fn test_degenerate_track_never_finishes() {
        let params = MotionParams::default();
        let mut state = RacerState::new(0, 100.0);
        MotionModel::step(&mut state, ControlIntent::CRUISE, &params, 0.1, 0.0);
        assert!(!state.finished);
    }

    #[test]
    fn test_negative_dt_is_ignored() {
        let params = MotionParams::default();
        let mut state = RacerState::new(0, 100.0);
        state.speed = 100.0;
        MotionModel::step(&mut state, ControlIntent::CRUISE, &params, -1.0, 1e9);
        assert_eq!(state.speed, 100.0);
        assert_eq!(state.distance, 0.0);
    }

    #[test]
    fn test_params_validation() {
        assert!(MotionParams::default().problem().is_none());

        let slow_boost = MotionParams { boost_max_speed: 100.0, ..MotionParams::default() };
        assert!(slow_boost.problem().is_some());

        let negative = MotionParams { deceleration: -1.0, ..MotionParams::default() };
        assert!(negative.problem().unwrap().contains("deceleration"));
    }

    #[test]
    fn test_reset_restores_start() {
        let mut state = RacerState::new(2, 100.0);
        state.distance = 500.0;
        state.speed = 200.0;
        state.stamina = 3.0;
        state.finished = true;
        state.finish_time = Some(12.0);

        state.reset(100.0);
        assert_eq!(state, RacerState::new(2, 100.0));
    }
}
