//! Experiment driver: runs seeded episodes of each world under the engine and
//! aggregates them per α, optionally against an ungated baseline agent.
//!
//! This module is organized into submodules:
//! - `config`: experiment configuration and TOML loading
//! - `run`: the decide/apply loop, run log and per-run records
//! - `summary`: per-α aggregation of run records

mod config;
mod run;
mod summary;


pub use config::{Agent, ExperimentConfig, ExperimentError, SweepConfig, Variant};
pub use run::{
    run_baseline, run_snake, run_to_end, run_to_end_with, run_vacuum, sweep, RunLogEntry,
    RunLogKind, RunRecord, RunReport, RunTrace, DEFAULT_DEADLOCK_WINDOW,
};
pub use summary::{summarize, AlphaSummary, SummaryDelta};
