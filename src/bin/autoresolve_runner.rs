//! Headless Auto-Resolve Runner
//!
//! Resolves one scenario and prints the outcome as JSON or text.

use autoresolve::autoresolve::AutoResolveEngine;
use autoresolve::contrast::ContrastTable;
use autoresolve::core::{AutoResolveConfig, SyncRandom};
use autoresolve::scenario::{BattleSummary, Scenario};
use autoresolve::units::UnitTypeRegistry;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// Auto-Resolve Runner - resolve a battle scenario without playing it out
#[derive(Parser, Debug)]
#[command(name = "autoresolve_runner")]
#[command(about = "Resolve a battle scenario and report the outcome")]
struct Args {
    /// Scenario file (TOML)
    scenario: PathBuf,

    /// Unit type definitions
    #[arg(long, default_value = "data/units.toml")]
    units: PathBuf,

    /// Contrast weights and terrain effectiveness
    #[arg(long, default_value = "data/contrast.toml")]
    contrast: PathBuf,

    /// Engine tuning overrides
    #[arg(long)]
    config: Option<PathBuf>,

    /// Random seed; falls back to the scenario's seed, then to a random one
    #[arg(long)]
    seed: Option<u64>,

    /// Skip the display pacing and resolve on the first round
    #[arg(long)]
    instant: bool,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut units = UnitTypeRegistry::new();
    units.load_file(&args.units)?;
    let contrast = ContrastTable::load_or_default(&args.contrast, &units);

    let config = match &args.config {
        Some(path) => AutoResolveConfig::load(path)?,
        None => AutoResolveConfig::default(),
    };
    config.validate()?;

    let scenario = Scenario::load(&args.scenario)?;
    let seed = args
        .seed
        .or(scenario.seed)
        .unwrap_or_else(rand::random);

    let mut engine = AutoResolveEngine::new(
        Arc::new(contrast),
        Arc::new(units),
        config,
        SyncRandom::seed_from_u64(seed),
    );
    let summary = scenario.run(&mut engine, args.instant)?;

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_text(&summary, seed);
    }
    Ok(())
}

fn print_text(summary: &BattleSummary, seed: u64) {
    println!("=== {} ({:?}, seed {}) ===", summary.scenario, summary.domain, seed);
    match summary.winner {
        Some(winner) => println!("Winner: {}", winner),
        None => println!("Winner: none"),
    }
    if let Some(retreated) = summary.retreated {
        println!("Retreated: {}", retreated);
    }
    println!(
        "Rounds: {}  Destroyed: {}  Evacuated: {}",
        summary.rounds, summary.destroyed, summary.evacuated
    );
    for (unit, count) in &summary.killed {
        println!("  {:>3} x {}", count, unit);
    }
    for event in &summary.events {
        println!("  [{}] {}", event.frame, event.description);
    }
}
