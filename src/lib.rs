//! fitsim
//!
//! Simulator for classic contiguous placement strategies, used to compare
//! where each strategy puts processes and how much fragmentation it causes.
//!
//! # Overview
//!
//! This crate provides:
//!
//! - **Unit map**: bit-per-unit occupancy with range allocate/free and
//!   free-run enumeration
//! - **Block list**: fixed, never-split partition with owner tracking and an
//!   exact-size Quick Fit index
//! - **Strategies**: First, Next, Best, Quick and Worst Fit over either model
//! - **Fragmentation**: external fragmentation vs. exhaustion diagnosis
//! - **Simulation**: seeded, reproducible workloads with per-event snapshots
//! - **Report**: plain-text rendering of runs and comparisons
//!
//! # Examples
//!
//! ```rust
//! use fitsim::process::ProcessId;
//! use fitsim::strategy::Strategy;
//! use fitsim::unit_map::UnitMap;
//!
//! let mut memory = UnitMap::new(32).unwrap();
//!
//! let start = Strategy::FirstFit.place(&mut memory, 5).unwrap();
//! memory.allocate(start, 5, ProcessId::new(1)).unwrap();
//!
//! let next = Strategy::FirstFit.place(&mut memory, 8).unwrap();
//! assert_eq!(next, 5);
//! ```
//!
//! # Guarantees
//!
//! - Occupied plus free units always equals capacity
//! - Resident processes never share a unit or a block
//! - Allocating into occupied memory or freeing free memory is an `Err`,
//!   never silent corruption

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::uninlined_format_args)]

pub mod block_list;
pub mod error;
pub mod fragmentation;
pub mod process;
pub mod report;
pub mod simulation;
pub mod strategy;
pub mod unit_map;

pub use error::{Error, Result};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
