//! Runs one simulation from a raw combat state file.
//!
//! ```text
//! brawl-cli <state.json> [config.json]
//! ```
//!
//! Logs go to stderr (filtered by `RUST_LOG`, default `info`); the aggregated
//! result is printed to stdout as JSON.

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use brawl_core::card::CardTable;
use brawl_core::config::SimulationConfig;
use brawl_core::error::ErrorState;
use brawl_core::simulation::{RunParameters, SimulationRunner};
use brawl_core::snapshot::{RawCombatState, SnapshotBuilder};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let Some(state_path) = args.next() else {
        bail!("usage: brawl-cli <state.json> [config.json]");
    };
    let config = match args.next() {
        Some(path) => {
            let json = read(Path::new(&path))?;
            SimulationConfig::from_json(&json)
                .with_context(|| format!("invalid config in {path}"))?
        }
        None => SimulationConfig::default(),
    };

    let json = read(Path::new(&state_path))?;
    let raw: RawCombatState = serde_json::from_str(&json)
        .with_context(|| format!("invalid combat state in {state_path}"))?;

    let table = CardTable::standard();
    let snapshot = match SnapshotBuilder::new(&table).build(&raw) {
        Ok(snapshot) => snapshot,
        Err(err) => {
            let state = ErrorState::from(&err);
            bail!("{state}: {err}");
        }
    };

    let params = RunParameters::from_config(&config, &snapshot);
    info!(
        trials = params.max_trials,
        workers = params.worker_count,
        seed = params.seed,
        "Running simulation"
    );
    let result = SimulationRunner::from_config(&config).run(&snapshot, &params);

    let state = ErrorState::from(result.exit_condition);
    if !state.is_none() {
        warn!(exit = result.exit_condition.label(), "{state}");
    }
    info!(
        win = %format!("{:.1}%", result.win_rate() * 100.0),
        tie = %format!("{:.1}%", result.tie_rate() * 100.0),
        loss = %format!("{:.1}%", result.loss_rate() * 100.0),
        trials = result.total(),
        elapsed_ms = result.elapsed_ms,
        "Simulation finished"
    );

    let output = serde_json::to_string_pretty(&result).context("failed to serialize result")?;
    println!("{output}");
    Ok(())
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}
