//! Suika headless runner
//!
//! Drops bodies on a fixed schedule with the built-in physics world and logs
//! every merge. Useful for soak-testing a tier catalog or settings file.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use suika_core::sim::{SimEvent, Simulation, SpawnRequest, TierCatalog};
use suika_core::{MergeResult, Settings};

/// Steps between automatic drops (half a second at 60 Hz)
const DROP_INTERVAL: u64 = 30;

/// Run the merge simulation without a window and print the final bodies as JSON.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Settings file (JSON); defaults are used when omitted
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,
    /// Tier catalog file (JSON); the fruit catalog is used when omitted
    #[arg(long, value_name = "FILE")]
    catalog: Option<PathBuf>,
    /// Number of bodies to drop
    #[arg(long, value_name = "COUNT", default_value_t = 40)]
    drops: u32,
    /// Number of fixed steps to run
    #[arg(
        long,
        value_name = "COUNT",
        default_value_t = 3600,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    steps: u32,
}

fn run(args: &Args) -> MergeResult<()> {
    let settings = match &args.settings {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    let catalog = match &args.catalog {
        Some(path) => TierCatalog::load(path)?,
        None => TierCatalog::default(),
    };

    let area = settings.play_area;
    let mut sim = Simulation::new(settings, catalog)?;

    // Sweep drops back and forth across the container
    let mut dropped = 0;
    let mut merges = 0;
    for step in 0..u64::from(args.steps) {
        if dropped < args.drops && step % DROP_INTERVAL == 0 {
            let t = (dropped as f32 * 0.37).fract();
            let x = area.min.x + t * area.width();
            sim.enqueue_spawn(SpawnRequest::at(x, area.min.y));
            dropped += 1;
        }

        let report = sim.step();
        for event in &report.events {
            if let SimEvent::Merged { into, tier, .. } = event {
                merges += 1;
                log::info!("Step {}: merged into {} (tier {})", report.step, into, tier);
            }
        }
    }

    let catalog = sim.catalog();
    for tier in catalog.tiers() {
        log::info!(
            "{:>12}: {} alive",
            tier.name,
            sim.registry().live_count_of(tier.index)
        );
    }
    log::info!(
        "Done: {} steps, {} drops, {} merges, {} bodies alive, {} retired",
        sim.step_count(),
        dropped,
        merges,
        sim.registry().live_count(),
        sim.registry().retired_count()
    );
    println!("{}", sim.snapshot_json()?);
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_defaults_and_flags() {
        let args = Args::try_parse_from(["suika-headless"]).unwrap();
        assert_eq!(args.drops, 40);
        assert_eq!(args.steps, 3600);
        assert!(args.settings.is_none());

        let args = Args::try_parse_from([
            "suika-headless",
            "--catalog",
            "tiers.json",
            "--drops",
            "5",
            "--steps",
            "120",
        ])
        .unwrap();
        assert_eq!(args.catalog, Some(PathBuf::from("tiers.json")));
        assert_eq!(args.drops, 5);
        assert_eq!(args.steps, 120);
    }

    #[test]
    fn test_rejects_zero_steps_and_unknown_flags() {
        assert!(Args::try_parse_from(["suika-headless", "--steps", "0"]).is_err());
        assert!(Args::try_parse_from(["suika-headless", "--speed", "2"]).is_err());
    }
}
