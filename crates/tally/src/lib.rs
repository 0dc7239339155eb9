//! # Tally
//!
//! Mergeable statistics for Monte Carlo runs.
//!
//! Every type in this crate is built to be filled independently on each worker
//! thread and then combined with `merge`. Merging is associative and
//! commutative, so the final summary does not depend on how samples were
//! partitioned across workers or in which order partial results arrive.
//!
//! - [`ScalarStats`]: running mean, variance, min and max
//! - [`Histogram`]: frequency table over integer keys
//! - [`Proportion`]: success count over trials with a Wilson interval
//!
//! ## Quick Start
//!
//! ```
//! use tally::{Histogram, Proportion, ScalarStats};
//!
//! let mut left = ScalarStats::empty();
//! left.push(4.0);
//! let mut right = ScalarStats::empty();
//! right.push(8.0);
//! let merged = ScalarStats::merge(&left, &right);
//! assert!((merged.mean - 6.0).abs() < 1e-9);
//!
//! let mut damage = Histogram::new();
//! damage.record(5);
//! damage.record(5);
//! assert_eq!(damage.count(5), 2);
//!
//! let wins = Proportion::new(75, 100);
//! let (low, high) = wins.wilson_interval(1.96);
//! assert!(low < 0.75 && 0.75 < high);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod histogram;
pub mod proportion;
pub mod stats;

pub use histogram::Histogram;
pub use proportion::Proportion;
pub use stats::ScalarStats;
