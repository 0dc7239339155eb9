//! Crate-level tests of the simulation pipeline.
//!
//! - `determinism.rs`: same seeds give identical trials and aggregates
//! - `integration.rs`: raw state to aggregated result, end to end
//! - `helpers.rs`: raw-state and snapshot factories shared with unit tests

pub(crate) mod helpers;
mod integration;
