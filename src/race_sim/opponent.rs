//! Opponent - Computer-driven racers
//!
//! An opponent's personality ([`OpponentProfile`]) is rolled once when it is
//! created and survives restarts. Its per-race bookkeeping
//! ([`OpponentRaceTimers`]) is cleared at every restart. The policy turns
//! both plus the current race state into the same [`ControlIntent`] a human
//! would produce.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::race_sim::control::{ControlContext, ControlIntent};
use crate::race_sim::motion::MotionParams;

/// Fixed per-opponent parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpponentProfile {
    pub max_speed: f32,
    pub boost_max_speed: f32,
    pub acceleration: f32,
    pub deceleration: f32,
    /// Chance of an opportunistic boost per 60 Hz frame
    pub boost_probability: f32,
    /// Progress fractions where a boost is attempted once per race
    pub checkpoints: Vec<f32>,
    /// Below this stamina no new boost starts before the final stretch
    pub conserve_threshold: f32,
    pub max_stamina: f32,
    pub stamina_drain_rate: f32,
    pub stamina_recovery_rate: f32,
}

impl OpponentProfile {
    const MAX_SPEED_RANGE: (f32, f32) = (280.0, 330.0);
    const BOOST_FACTOR_RANGE: (f32, f32) = (1.4, 1.6);
    const ACCELERATION_RANGE: (f32, f32) = (170.0, 230.0);
    const BOOST_PROBABILITY_RANGE: (f32, f32) = (0.002, 0.006);
    const CONSERVE_RANGE: (f32, f32) = (25.0, 40.0);
    const CHECKPOINT_RANGES: [(f32, f32); 2] = [(0.20, 0.40), (0.50, 0.70)];
    const DECELERATION: f32 = 300.0;
    const MAX_STAMINA: f32 = 100.0;
    const STAMINA_DRAIN_RATE: f32 = 25.0;
    const STAMINA_RECOVERY_RATE: f32 = 10.0;

    /// Roll a new personality from bounded ranges
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let max_speed = roll(rng, Self::MAX_SPEED_RANGE);
        let boost_factor = roll(rng, Self::BOOST_FACTOR_RANGE);
        let acceleration = roll(rng, Self::ACCELERATION_RANGE);
        let boost_probability = roll(rng, Self::BOOST_PROBABILITY_RANGE);
        let conserve_threshold = roll(rng, Self::CONSERVE_RANGE);
        let checkpoints = Self::CHECKPOINT_RANGES
            .iter()
            .map(|&range| roll(rng, range))
            .collect();

        Self {
            max_speed,
            boost_max_speed: max_speed * boost_factor,
            acceleration,
            deceleration: Self::DECELERATION,
            boost_probability,
            checkpoints,
            conserve_threshold,
            max_stamina: Self::MAX_STAMINA,
            stamina_drain_rate: Self::STAMINA_DRAIN_RATE,
            stamina_recovery_rate: Self::STAMINA_RECOVERY_RATE,
        }
    }

    /// Motion limits this personality races with
    pub fn motion_params(&self) -> MotionParams {
        MotionParams {
            normal_max_speed: self.max_speed,
            boost_max_speed: self.boost_max_speed,
            acceleration: self.acceleration,
            deceleration: self.deceleration,
            max_stamina: self.max_stamina,
            stamina_drain_rate: self.stamina_drain_rate,
            stamina_recovery_rate: self.stamina_recovery_rate,
        }
    }
}

fn roll<R: Rng + ?Sized>(rng: &mut R, (low, high): (f32, f32)) -> f32 {
    rng.gen_range(low..high)
}

/// Per-race opponent bookkeeping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpponentRaceTimers {
    /// Seconds left in the current boost window
    pub boost_timer: f32,
    /// One flag per profile checkpoint
    pub checkpoints_used: Vec<bool>,
}

impl OpponentRaceTimers {
    pub fn new(profile: &OpponentProfile) -> Self {
        Self {
            boost_timer: 0.0,
            checkpoints_used: vec![false; profile.checkpoints.len()],
        }
    }

    pub fn reset(&mut self) {
        self.boost_timer = 0.0;
        self.checkpoints_used.iter_mut().for_each(|used| *used = false);
    }

    pub fn is_boosting(&self) -> bool {
        self.boost_timer > 0.0
    }
}

/// Boost decision heuristic
pub struct OpponentPolicy;

impl OpponentPolicy {
    /// Length of one boost window (seconds)
    pub const BOOST_DURATION: f32 = 1.5;
    /// Progress after which the final-stretch rules apply
    pub const FINAL_STRETCH: f32 = 0.85;
    /// Width of a checkpoint's trigger window in progress
    const CHECKPOINT_WINDOW: f32 = 0.1;
    const CHECKPOINT_MIN_STAMINA: f32 = 40.0;
    const RANDOM_BOOST_MIN_STAMINA: f32 = 30.0;
    const FINAL_STRETCH_MIN_STAMINA: f32 = 20.0;
    /// Frame rate the boost probability is expressed against
    const REFERENCE_FPS: f32 = 60.0;

    /// Decide this tick's intent. Always drives forward; only the boost flag
    /// varies.
    pub fn decide<R: Rng + ?Sized>(
        profile: &OpponentProfile,
        timers: &mut OpponentRaceTimers,
        ctx: &ControlContext,
        rng: &mut R,
    ) -> ControlIntent {
        let mut boost = Self::choose_boost(profile, timers, ctx, rng);

        if ctx.progress > Self::FINAL_STRETCH && ctx.stamina > Self::FINAL_STRETCH_MIN_STAMINA {
            boost = true;
        }

        ControlIntent { forward: true, boost }
    }

    fn choose_boost<R: Rng + ?Sized>(
        profile: &OpponentProfile,
        timers: &mut OpponentRaceTimers,
        ctx: &ControlContext,
        rng: &mut R,
    ) -> bool {
        if timers.boost_timer > 0.0 {
            timers.boost_timer = (timers.boost_timer - ctx.dt).max(0.0);
            if timers.boost_timer > 0.0 {
                return true;
            }
        }

        if ctx.stamina < profile.conserve_threshold && ctx.progress <= Self::FINAL_STRETCH {
            return false;
        }

        if ctx.stamina > Self::CHECKPOINT_MIN_STAMINA {
            let hit = profile
                .checkpoints
                .iter()
                .zip(timers.checkpoints_used.iter_mut())
                .find(|(checkpoint, used)| {
                    !**used
                        && ctx.progress >= **checkpoint
                        && ctx.progress <= **checkpoint + Self::CHECKPOINT_WINDOW
                });
            if let Some((checkpoint, used)) = hit {
                *used = true;
                timers.boost_timer = Self::BOOST_DURATION;
                log::debug!("Opponent boosting at checkpoint {:.2}", checkpoint);
                return true;
            }
        }

        let chance = profile.boost_probability * ctx.dt * Self::REFERENCE_FPS;
        if rng.gen::<f32>() < chance && ctx.stamina > Self::RANDOM_BOOST_MIN_STAMINA {
            timers.boost_timer = Self::BOOST_DURATION;
            log::debug!("Opponent opportunistic boost at progress {:.2}", ctx.progress);
            return true;
        }

        false
    }
}

/// Control source wrapping an opponent's profile and timers
#[derive(Debug, Clone)]
pub struct PolicyControl {
    profile: OpponentProfile,
    timers: OpponentRaceTimers,
}

impl PolicyControl {
    pub fn new(profile: OpponentProfile) -> Self {
        let timers = OpponentRaceTimers::new(&profile);
        Self { profile, timers }
    }

    pub fn profile(&self) -> &OpponentProfile {
        &self.profile
    }

    pub fn timers(&self) -> &OpponentRaceTimers {
        &self.timers
    }

    pub fn decide(&mut self, ctx: &ControlContext, rng: &mut dyn RngCore) -> ControlIntent {
        OpponentPolicy::decide(&self.profile, &mut self.timers, ctx, rng)
    }

    /// Clear race timers, keep the personality
    pub fn reset(&mut self) {
        self.timers.reset();
    }
}
