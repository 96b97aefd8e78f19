//! Oval Racer - Headless race runner
//!
//! Runs one race at a fixed frame rate with a scripted player and prints the
//! final placements.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use oval_racer_lib::race_sim::OpponentPolicy;
use oval_racer_lib::{ControlIntent, GameState, Placement, RaceConfig, RaceDirector};

#[derive(Parser, Debug)]
#[command(name = "oval-racer")]
#[command(about = "Race a scripted player against computer opponents", long_about = None)]
struct Cli {
    /// JSON race config; missing fields take defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for opponent personalities and decisions
    #[arg(long)]
    seed: Option<u64>,

    /// Number of computer opponents
    #[arg(long)]
    opponents: Option<usize>,

    /// Number of lanes on the track
    #[arg(long)]
    lanes: Option<usize>,

    /// Simulated frames per second
    #[arg(long, default_value_t = 60.0)]
    fps: f32,

    /// Give up after this much simulated time
    #[arg(long, default_value_t = 120.0)]
    max_seconds: f32,

    /// Player boosts while stamina is above this
    #[arg(long, default_value_t = 50.0)]
    boost_threshold: f32,

    /// Print placements as JSON
    #[arg(long)]
    json: bool,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = build_config(&cli)?;
    let mut director = RaceDirector::new(config).context("failed to set up race")?;

    let placements = run_race(&mut director, &cli);
    print_placements(&placements, cli.json)?;

    let stats = director.stats();
    log::info!(
        "{} ticks, {:.3} ms average tick",
        stats.tick_count,
        stats.avg_tick_time_ms
    );
    Ok(())
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn build_config(cli: &Cli) -> Result<RaceConfig> {
    anyhow::ensure!(
        cli.fps.is_finite() && cli.fps > 0.0,
        "--fps must be a positive number, got {}",
        cli.fps
    );
    anyhow::ensure!(
        cli.max_seconds.is_finite() && cli.max_seconds >= 0.0,
        "--max-seconds must be a non-negative number, got {}",
        cli.max_seconds
    );

    let mut config = match &cli.config {
        Some(path) => RaceConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => RaceConfig::default(),
    };

    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if let Some(opponents) = cli.opponents {
        config.opponent_count = opponents;
    }
    if let Some(lanes) = cli.lanes {
        config.lane_count = lanes;
    }
    config.validate().context("invalid race config")?;
    Ok(config)
}

/// Forward always; boost while stamina allows, and flat out on the final stretch
fn autopilot(director: &RaceDirector, boost_threshold: f32) -> ControlIntent {
    let race = director.race();
    let player = race.player();
    let stamina = player.state().stamina;
    let progress = player.progress(race.track());

    let final_stretch = progress > OpponentPolicy::FINAL_STRETCH && stamina > 0.0;
    ControlIntent {
        forward: true,
        boost: stamina > boost_threshold || final_stretch,
    }
}

/// Tick length and tick budget. The director integrates at most
/// `max_frame_dt` per tick, so the budget counts clamped ticks.
fn tick_plan(cli: &Cli, max_frame_dt: f32) -> (f32, u64) {
    let dt = (1.0 / cli.fps).min(max_frame_dt);
    (dt, (cli.max_seconds / dt).ceil() as u64)
}

fn run_race(director: &mut RaceDirector, cli: &Cli) -> Vec<Placement> {
    let (dt, max_ticks) = tick_plan(cli, director.race().config().max_frame_dt);

    // Loading collapses to the menu with no keys held
    director.tick(dt);

    for _ in 0..max_ticks {
        if director.state() == GameState::Finished {
            break;
        }
        let intent = autopilot(director, cli.boost_threshold);
        director.set_player_intent(intent);
        director.tick(dt);
    }

    match director.placements() {
        Some(placements) => placements.to_vec(),
        None => {
            log::warn!(
                "Race still running after {:.0}s, reporting live standings",
                cli.max_seconds
            );
            director.standings()
        }
    }
}

fn print_placements(placements: &[Placement], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(placements)?);
        return Ok(());
    }

    for placement in placements {
        let time = placement
            .finish_time
            .map(|t| format!("{:.2}s", t))
            .unwrap_or_else(|| "-".to_string());
        let marker = if placement.is_player { " (you)" } else { "" };
        println!(
            "{}. {:<10} progress {:.3}  time {}{}",
            placement.place, placement.name, placement.progress, time, marker
        );
    }
    Ok(())
}
