//! Risk-gated navigation for grid agents.
//!
//! An agent navigates toward a goal while a structural risk score, a smoothed
//! stress signal and an α-scaled threshold policy decide when it stops
//! chasing the goal and escapes instead.

pub mod experiment;
pub mod geometry;
pub mod navigator;
pub mod world;

pub use geometry::{Action, Direction, GridDims, GridError, GridPos};
pub use navigator::{
    ActionSource, ConfigError, Decision, EngineConfig, HungerPricing, Mode, NavigationEngine,
    ObstacleMap, PanicEpisode, StressPricing, ThresholdPolicy, Thresholds, WorldSnapshot,
};
pub use world::{DeathReason, GridWorld, SnakeWorld, VacuumWorld};

pub use experiment::{
    run_baseline, run_snake, run_to_end, run_vacuum, summarize, sweep, Agent, AlphaSummary,
    ExperimentConfig, ExperimentError, RunRecord, RunReport, Variant,
};
