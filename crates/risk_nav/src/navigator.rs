//! Risk-gated navigation engine.
//!
//! This module is organized into submodules:
//! - `planner`: grid search (shortest path, reachable area, best-reach move)
//! - `risk`: StructGate risk assessor and the trajectory window
//! - `stress`: LPI stress monitor
//! - `pricing`: Coasean threshold policies
//! - `panic`: mode state machine, episodes, rescue accounting
//! - `engine`: per-tick decision composition
//! - `config`: engine configuration and errors

mod config;
mod engine;
mod panic;
mod planner;
mod pricing;
mod risk;
mod stress;

#[cfg(test)]
mod tests;

pub use config::{ConfigError, EngineConfig};
pub use engine::{
    greedy_toward, ActionSource, Decision, EscapeTarget, NavigationConfig, NavigationEngine,
    ResourceKind, ResourceReading, SnapshotError, WorldSnapshot,
};
pub use panic::{
    EpisodeLog, MachineInput, Mode, PanicConfig, PanicEpisode, PanicStateMachine, RescueRule,
    RescueStatus, ResolvedRescue, Transition,
};
pub use planner::{
    best_reach_move, best_reach_move_within, reachable_area, reachable_area_within,
    shortest_path, ObstacleMap,
};
pub use pricing::{
    HungerPricing, HungerPricingConfig, PricingInput, StressPricing, StressPricingConfig,
    ThresholdPolicy, ThresholdRange, Thresholds,
};
pub use risk::{
    shape_entropy, RiskAssessment, RiskConfig, StructGate, TrajectorySource, TrajectoryWindow,
    SHAPE_EPSILON,
};
pub use stress::{StressConfig, StressMonitor, StressSample, StressSignal};
