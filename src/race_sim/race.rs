//! Race - Race configuration, racers and placement
//!
//! Owns the track, every racer and the random stream opponents draw from.
//! Sequencing between menu, countdown, racing and results lives in the
//! director; this module only knows how to run and rank a race.

use std::path::Path;

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::race_sim::control::{ControlContext, ControlSource, HumanControl};
use crate::race_sim::error::RaceError;
use crate::race_sim::motion::{MotionModel, MotionParams, RacerSnapshot, RacerState};
use crate::race_sim::opponent::{OpponentProfile, PolicyControl};
use crate::race_sim::track::TrackSpec;

/// Race configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    /// Lanes on the track; each racer gets its own
    pub lane_count: usize,
    /// Number of computer opponents
    pub opponent_count: usize,
    /// Countdown before the start (seconds)
    pub countdown_secs: f32,
    /// Longest frame the simulation will integrate in one tick (seconds)
    pub max_frame_dt: f32,
    /// Seed for opponent personalities and decisions
    pub seed: u64,
    pub viewport_width: f32,
    pub viewport_height: f32,
    /// Player motion limits
    pub player: MotionParams,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            lane_count: 4,
            opponent_count: 3,
            countdown_secs: 3.0,
            max_frame_dt: 0.1,
            seed: 42,
            viewport_width: 800.0,
            viewport_height: 600.0,
            player: MotionParams::default(),
        }
    }
}

impl RaceConfig {
    pub fn validate(&self) -> Result<(), RaceError> {
        if self.lane_count == 0 {
            return Err(RaceError::InvalidConfig("lane_count must be at least 1".into()));
        }
        let racers = self.opponent_count + 1;
        if racers > self.lane_count {
            return Err(RaceError::TooManyRacers { racers, lanes: self.lane_count });
        }
        if !self.countdown_secs.is_finite() || self.countdown_secs <= 0.0 {
            return Err(RaceError::InvalidConfig(format!(
                "countdown_secs must be positive, got {}",
                self.countdown_secs
            )));
        }
        if !self.max_frame_dt.is_finite() || self.max_frame_dt <= 0.0 {
            return Err(RaceError::InvalidConfig(format!(
                "max_frame_dt must be positive, got {}",
                self.max_frame_dt
            )));
        }
        if !self.viewport_width.is_finite() || !self.viewport_height.is_finite() {
            return Err(RaceError::InvalidConfig("viewport size must be finite".into()));
        }
        if let Some(problem) = self.player.problem() {
            return Err(RaceError::InvalidConfig(format!("player: {problem}")));
        }
        Ok(())
    }

    /// Parse and validate a JSON config; missing fields take defaults
    pub fn from_json_str(json: &str) -> Result<Self, RaceError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, RaceError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

/// A competing entity, player or opponent
#[derive(Debug, Clone)]
pub struct Racer {
    pub id: u32,
    pub name: String,
    state: RacerState,
    params: MotionParams,
    control: ControlSource,
}

impl Racer {
    /// Create a racer on the start line, rejecting lanes the track doesn't
    /// have and motion limits the physics can't integrate
    pub fn new(
        id: u32,
        name: String,
        lane: usize,
        params: MotionParams,
        control: ControlSource,
        track: &TrackSpec,
    ) -> Result<Self, RaceError> {
        if !track.contains_lane(lane) {
            return Err(RaceError::InvalidLane { lane, lane_count: track.lane_count() });
        }
        if let Some(problem) = params.problem() {
            return Err(RaceError::InvalidConfig(format!("{name}: {problem}")));
        }
        Ok(Self {
            id,
            name,
            state: RacerState::new(lane, params.max_stamina),
            params,
            control,
        })
    }

    pub fn state(&self) -> &RacerState {
        &self.state
    }

    pub fn params(&self) -> &MotionParams {
        &self.params
    }

    pub fn control(&self) -> &ControlSource {
        &self.control
    }

    pub fn is_player(&self) -> bool {
        self.control.is_human()
    }

    pub fn human_mut(&mut self) -> Option<&mut HumanControl> {
        match &mut self.control {
            ControlSource::Human(human) => Some(human),
            ControlSource::Policy(_) => None,
        }
    }

    pub fn progress(&self, track: &TrackSpec) -> f32 {
        track.progress_of(self.state.distance)
    }

    /// Gather this tick's intent and integrate. Returns true on the tick the
    /// racer crosses the line.
    pub fn update(&mut self, dt: f32, track: &TrackSpec, rng: &mut dyn RngCore, clock: f32) -> bool {
        if self.state.finished {
            return false;
        }

        let ctx = ControlContext {
            progress: self.progress(track),
            stamina: self.state.stamina,
            dt,
        };
        let intent = self.control.next_intent(&ctx, rng);

        let crossed = MotionModel::step(&mut self.state, intent, &self.params, dt, track.total_length());
        if crossed {
            self.state.finish_time = Some(clock);
            log::debug!("{} finished at {:.2}s", self.name, clock);
        }
        crossed
    }

    /// Back to the start line; personality is kept
    pub fn reset(&mut self) {
        self.state.reset(self.params.max_stamina);
        self.control.reset();
    }

    pub fn snapshot(&self, track: &TrackSpec) -> RacerSnapshot {
        let position = track.position_at(self.state.distance, self.state.lane);
        let stamina_fraction = if self.params.max_stamina > 0.0 {
            self.state.stamina / self.params.max_stamina
        } else {
            0.0
        };

        RacerSnapshot {
            id: self.id,
            name: self.name.clone(),
            is_player: self.is_player(),
            x: position.x,
            y: position.y,
            heading: position.heading,
            lane: self.state.lane,
            speed: self.state.speed,
            stamina: self.state.stamina,
            stamina_fraction,
            progress: self.progress(track),
            finished: self.state.finished,
        }
    }
}

/// Final or live ranking entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub racer_id: u32,
    pub name: String,
    /// 1-based, contiguous and unique
    pub place: u32,
    pub progress: f32,
    pub finish_time: Option<f32>,
    pub is_player: bool,
}

/// Indices ordered by descending progress. The sort is stable, so equal
/// progress keeps enumeration order.
pub fn rank_by_progress(progress: &[f32]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..progress.len()).collect();
    order.sort_by(|&a, &b| progress[b].total_cmp(&progress[a]));
    order
}

/// Rank racers by progress at this moment
pub fn compute_placements(racers: &[Racer], track: &TrackSpec) -> Vec<Placement> {
    let progress: Vec<f32> = racers.iter().map(|r| r.progress(track)).collect();

    rank_by_progress(&progress)
        .into_iter()
        .enumerate()
        .map(|(rank, index)| {
            let racer = &racers[index];
            Placement {
                racer_id: racer.id,
                name: racer.name.clone(),
                place: rank as u32 + 1,
                progress: progress[index],
                finish_time: racer.state.finish_time,
                is_player: racer.is_player(),
            }
        })
        .collect()
}

/// What happened during one racing tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub player_finished: bool,
    pub all_finished: bool,
}

/// Complete race state
#[derive(Debug, Clone)]
pub struct Race {
    config: RaceConfig,
    track: TrackSpec,
    racers: Vec<Racer>,
    player_index: usize,
    rng: ChaCha8Rng,
    /// Race clock, running only while racing (seconds)
    elapsed_time: f32,
    /// Countdown remaining (seconds)
    countdown: f32,
    /// Frozen ranking, set once per race
    placements: Option<Vec<Placement>>,
}

impl Race {
    const PLAYER_NAME: &'static str = "Player";

    /// Build a race from a validated config, rolling every opponent's
    /// personality from the seeded stream
    pub fn new(config: RaceConfig) -> Result<Self, RaceError> {
        config.validate()?;

        let track = TrackSpec::from_viewport(
            config.viewport_width,
            config.viewport_height,
            config.lane_count,
        );
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

        let mut racers = Vec::with_capacity(config.opponent_count + 1);
        racers.push(Racer::new(
            0,
            Self::PLAYER_NAME.to_string(),
            0,
            config.player,
            ControlSource::Human(HumanControl::new()),
            &track,
        )?);

        for i in 1..=config.opponent_count {
            let profile = OpponentProfile::generate(&mut rng);
            let params = profile.motion_params();
            racers.push(Racer::new(
                i as u32,
                format!("Rival {}", i),
                i,
                params,
                ControlSource::Policy(PolicyControl::new(profile)),
                &track,
            )?);
        }

        Ok(Self {
            countdown: config.countdown_secs,
            config,
            track,
            racers,
            player_index: 0,
            rng,
            elapsed_time: 0.0,
            placements: None,
        })
    }

    pub fn config(&self) -> &RaceConfig {
        &self.config
    }

    pub fn track(&self) -> &TrackSpec {
        &self.track
    }

    pub fn racers(&self) -> &[Racer] {
        &self.racers
    }

    pub fn player(&self) -> &Racer {
        &self.racers[self.player_index]
    }

    pub fn player_mut(&mut self) -> &mut Racer {
        &mut self.racers[self.player_index]
    }

    pub fn elapsed_time(&self) -> f32 {
        self.elapsed_time
    }

    pub fn countdown(&self) -> f32 {
        self.countdown
    }

    pub fn placements(&self) -> Option<&[Placement]> {
        self.placements.as_deref()
    }

    pub fn all_finished(&self) -> bool {
        self.racers.iter().all(|r| r.state.finished)
    }

    /// Rebuild the track for a new viewport. Distances are untouched.
    pub fn resize(&mut self, width: f32, height: f32) {
        self.track = TrackSpec::from_viewport(width, height, self.config.lane_count);
        if self.track.is_degenerate() {
            log::warn!("Viewport {}x{} leaves no room for a track", width, height);
        } else {
            log::info!(
                "Track resized to {}x{}, lap length {:.1}",
                width,
                height,
                self.track.total_length()
            );
        }
    }

    /// Start countdown
    pub fn start_countdown(&mut self) {
        self.countdown = self.config.countdown_secs;
    }

    /// Run the countdown; true once it has elapsed
    pub fn update_countdown(&mut self, dt: f32) -> bool {
        self.countdown -= dt;
        if self.countdown <= 0.0 {
            self.countdown = 0.0;
            return true;
        }
        false
    }

    /// Advance every unfinished racer by one tick
    pub fn advance(&mut self, dt: f32) -> TickOutcome {
        self.elapsed_time += dt;

        let mut outcome = TickOutcome::default();
        for (index, racer) in self.racers.iter_mut().enumerate() {
            let crossed = racer.update(dt, &self.track, &mut self.rng, self.elapsed_time);
            if crossed && index == self.player_index {
                outcome.player_finished = true;
            }
        }
        outcome.all_finished = self.all_finished();
        outcome
    }

    /// Freeze the ranking if it hasn't been frozen yet
    pub fn lock_placements(&mut self) -> &[Placement] {
        let placements = self
            .placements
            .get_or_insert_with(|| compute_placements(&self.racers, &self.track));
        placements.as_slice()
    }

    /// Live ranking, recomputed on every call
    pub fn standings(&self) -> Vec<Placement> {
        compute_placements(&self.racers, &self.track)
    }

    /// Get current leader
    pub fn leader(&self) -> Option<&Racer> {
        let progress: Vec<f32> = self.racers.iter().map(|r| r.progress(&self.track)).collect();
        rank_by_progress(&progress).first().map(|&i| &self.racers[i])
    }

    pub fn racer_snapshots(&self) -> Vec<RacerSnapshot> {
        self.racers.iter().map(|r| r.snapshot(&self.track)).collect()
    }

    /// Clear racer state, opponent timers and placements for a rerun
    pub fn reset(&mut self) {
        for racer in &mut self.racers {
            racer.reset();
        }
        self.placements = None;
        self.elapsed_time = 0.0;
        self.countdown = self.config.countdown_secs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::race_sim::control::ControlIntent;

    fn small_race() -> Race {
        Race::new(RaceConfig::default()).unwrap()
    }

    #[test]
    fn test_rank_by_progress_descending() {
        assert_eq!(rank_by_progress(&[1.02, 1.00, 0.95]), vec![0, 1, 2]);
        assert_eq!(rank_by_progress(&[0.2, 0.9, 0.5]), vec![1, 2, 0]);
    }

    #[test]
    fn test_rank_ties_keep_enumeration_order() {
        assert_eq!(rank_by_progress(&[0.5, 0.7, 0.5, 0.7]), vec![1, 3, 0, 2]);
    }

    #[test]
    fn test_new_race_layout() {
        let race = small_race();
        assert_eq!(race.racers().len(), 4);
        assert!(race.player().is_player());
        assert_eq!(race.racers().iter().filter(|r| r.is_player()).count(), 1);

        let lanes: Vec<usize> = race.racers().iter().map(|r| r.state().lane).collect();
        assert_eq!(lanes, vec![0, 1, 2, 3]);
        assert!(race.racers().iter().all(|r| r.state().stamina == r.params().max_stamina));
    }

    #[test]
    fn test_too_many_racers_rejected() {
        let config = RaceConfig { lane_count: 2, opponent_count: 3, ..RaceConfig::default() };
        assert!(matches!(
            Race::new(config),
            Err(RaceError::TooManyRacers { racers: 4, lanes: 2 })
        ));
    }

    #[test]
    fn test_invalid_lane_rejected() {
        let track = TrackSpec::from_viewport(800.0, 600.0, 2);
        let result = Racer::new(
            0,
            "Stray".into(),
            2,
            MotionParams::default(),
            ControlSource::Human(HumanControl::new()),
            &track,
        );
        assert!(matches!(result, Err(RaceError::InvalidLane { lane: 2, lane_count: 2 })));
    }

    #[test]
    fn test_invalid_motion_params_rejected() {
        let track = TrackSpec::from_viewport(800.0, 600.0, 2);
        for params in [
            MotionParams { max_stamina: -1.0, ..MotionParams::default() },
            MotionParams { boost_max_speed: f32::NAN, ..MotionParams::default() },
            MotionParams { normal_max_speed: -5.0, ..MotionParams::default() },
        ] {
            let result = Racer::new(
                0,
                "Broken".into(),
                0,
                params,
                ControlSource::Human(HumanControl::new()),
                &track,
            );
            assert!(matches!(result, Err(RaceError::InvalidConfig(_))));
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(RaceConfig::default().validate().is_ok());
        assert!(RaceConfig { lane_count: 0, ..RaceConfig::default() }.validate().is_err());
        assert!(RaceConfig { countdown_secs: 0.0, ..RaceConfig::default() }.validate().is_err());
        assert!(RaceConfig { max_frame_dt: f32::NAN, ..RaceConfig::default() }.validate().is_err());
    }

    #[test]
    fn test_config_from_partial_json() {
        let config = RaceConfig::from_json_str(r#"{ "opponent_count": 1, "seed": 9 }"#).unwrap();
        assert_eq!(config.opponent_count, 1);
        assert_eq!(config.seed, 9);
        assert_eq!(config.lane_count, 4);
        assert_eq!(config.player, MotionParams::default());

        assert!(matches!(
            RaceConfig::from_json_str(r#"{ "opponent_count": 9 }"#),
            Err(RaceError::TooManyRacers { .. })
        ));
        assert!(matches!(RaceConfig::from_json_str("{"), Err(RaceError::Json(_))));
    }

    #[test]
    fn test_countdown_elapses() {
        let mut race = small_race();
        race.start_countdown();
        assert!(!race.update_countdown(1.0));
        assert!(!race.update_countdown(1.5));
        assert!(race.update_countdown(0.5));
        assert_eq!(race.countdown(), 0.0);
    }

    #[test]
    fn test_player_finish_reported_once() {
        let mut race = small_race();
        race.player_mut().human_mut().unwrap().set(ControlIntent::BOOST);

        let mut finishes = 0;
        for _ in 0..2000 {
            if race.advance(0.05).player_finished {
                finishes += 1;
            }
        }
        assert_eq!(finishes, 1);
        assert!(race.player().state().finished);
        assert!(race.player().state().finish_time.is_some());
    }

    #[test]
    fn test_lock_placements_freezes() {
        let mut race = small_race();
        for racer in race.racers.iter_mut() {
            racer.state.distance = 10.0 * racer.id as f32;
        }
        let first = race.lock_placements().to_vec();
        assert_eq!(first[0].racer_id, 3);
        assert!(first.last().unwrap().is_player);

        race.racers[0].state.distance = 1e6;
        assert_eq!(race.lock_placements(), first.as_slice());
        assert_eq!(race.standings()[0].racer_id, 0);
        assert_eq!(race.leader().unwrap().id, 0);
    }

    #[test]
    fn test_reset_keeps_profiles() {
        let mut race = small_race();
        let profiles: Vec<OpponentProfile> = race
            .racers()
            .iter()
            .filter_map(|r| r.control().as_policy().map(|p| p.profile().clone()))
            .collect();

        for _ in 0..200 {
            race.advance(0.05);
        }
        race.lock_placements();
        race.reset();

        assert!(race.placements().is_none());
        assert_eq!(race.elapsed_time(), 0.0);
        for racer in race.racers() {
            assert_eq!(racer.state().distance, 0.0);
            assert!(!racer.state().finished);
        }
        let after: Vec<OpponentProfile> = race
            .racers()
            .iter()
            .filter_map(|r| r.control().as_policy().map(|p| p.profile().clone()))
            .collect();
        assert_eq!(profiles, after);
    }

    #[test]
    fn test_resize_keeps_distances() {
        let mut race = small_race();
        race.player_mut().human_mut().unwrap().set(ControlIntent::CRUISE);
        for _ in 0..20 {
            race.advance(0.05);
        }
        let distances: Vec<f32> = race.racers().iter().map(|r| r.state().distance).collect();

        race.resize(1600.0, 1200.0);
        let after: Vec<f32> = race.racers().iter().map(|r| r.state().distance).collect();
        assert_eq!(distances, after);
        assert!(race.track().total_length() > 0.0);
    }

    #[test]
    fn test_degenerate_track_snapshots_are_finite() {
        let mut race = small_race();
        race.resize(0.0, 0.0);
        race.player_mut().human_mut().unwrap().set(ControlIntent::CRUISE);
        let outcome = race.advance(0.1);
        assert!(!outcome.player_finished);

        for snapshot in race.racer_snapshots() {
            assert_eq!(snapshot.progress, 0.0);
            assert!(snapshot.x.is_finite() && snapshot.heading.is_finite());
        }
    }
}
