//! # Brawl Core
//!
//! Monte Carlo combat outcome simulator for autobattler boards.
//!
//! Given a frozen snapshot of two boards about to fight, the engine replays
//! thousands of randomized combats in parallel under a wall-clock budget and
//! reduces them into win/tie/loss rates, lethal rates and a damage
//! distribution.
//!
//! ## Architecture
//!
//! Data flows one way:
//!
//! - **Snapshot**: immutable board state, built from the log layer's raw state
//!   by evaluating a declarative [`card::CardTable`]
//! - **Resolver**: replays one combat for a snapshot and a seed
//! - **Scheduler**: fans trials out over a worker pool until the trial cap or
//!   the deadline
//! - **Aggregator**: folds trial outcomes into an [`aggregate::AggregatedResult`]
//! - **Orchestrator**: per-match, per-turn invocation state, re-runs and
//!   validation against observed combats
//!
//! ## Usage
//!
//! ```
//! use brawl_core::config::SimulationConfig;
//! use brawl_core::simulation::{RunParameters, SimulationRunner};
//! use brawl_core::snapshot::{BoardSnapshot, MinionSnapshot, SideSnapshot};
//!
//! let config = SimulationConfig::from_json(r#"{ "iterations": 500, "seed": 3 }"#).unwrap();
//! let snapshot = BoardSnapshot::new(
//!     SideSnapshot::new(vec![MinionSnapshot::vanilla("ogre", 5, 5)]),
//!     SideSnapshot::new(vec![MinionSnapshot::vanilla("wisp", 1, 1)]),
//! );
//!
//! let params = RunParameters::from_config(&config, &snapshot);
//! let result = SimulationRunner::from_config(&config).run(&snapshot, &params);
//! assert_eq!(result.win_rate(), 1.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod aggregate;
pub mod board;
pub mod card;
pub mod config;
pub mod error;
pub mod invoker;
pub mod outcome;
pub mod resolver;
pub mod simulation;
pub mod snapshot;

pub use aggregate::{AggregatedResult, ExitCondition};
pub use config::SimulationConfig;
pub use error::ErrorState;
pub use invoker::{Invocation, Orchestrator};
pub use snapshot::BoardSnapshot;

#[cfg(test)]
mod tests;
