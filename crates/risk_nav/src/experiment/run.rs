use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::config::{Agent, ExperimentConfig, ExperimentError, Variant};
use crate::geometry::Action;
use crate::navigator::{
    EngineConfig, HungerPricing, Mode, NavigationEngine, PanicEpisode, RescueStatus,
    ResolvedRescue, SnapshotError, StressPricing, ThresholdPolicy,
};
use crate::world::{DeathReason, GridWorld, SnakeWorld, VacuumWorld};

pub const DEFAULT_DEADLOCK_WINDOW: usize = 12;

// ============================================================================
// Run Log
// ============================================================================

/// A log entry for run events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunLogEntry {
    /// The step at which this event occurred.
    pub step: u64,
    /// The event.
    pub kind: RunLogKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RunLogKind {
    ModeChanged { from: Mode, to: Mode, risk: f64 },
    PanicStarted { episode: u64, risk: f64, risk_threshold: f64 },
    RescueEvaluated { episode: u64, start_step: u64, status: RescueStatus },
    Terminated { death: DeathReason },
    StepLimitReached { max_steps: u64 },
}

// ============================================================================
// Run Loop
// ============================================================================

/// Counters collected while driving one world to its end.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunTrace {
    /// Steps applied to the world.
    pub steps: u64,
    /// One action per applied step.
    pub actions: Vec<Action>,
    pub log: Vec<RunLogEntry>,
    pub normal_steps: u64,
    pub panic_steps: u64,
    pub survival_steps: u64,
    /// Steps that changed the agent's position.
    pub moved_steps: u64,
    /// Steps that closed a full window of unmoved steps.
    pub deadlock_steps: u64,
    /// Sum of the per-step risk thresholds, for the run mean.
    pub risk_threshold_sum: f64,
}

impl RunTrace {
    pub fn ratio(&self, count: u64) -> f64 {
        count as f64 / self.steps.max(1) as f64
    }

    pub fn mean_risk_threshold(&self) -> f64 {
        if self.actions.is_empty() {
            return 0.0;
        }
        self.risk_threshold_sum / self.actions.len() as f64
    }

    fn log_rescues(&mut self, step: u64, resolved: &[ResolvedRescue]) {
        for rescue in resolved {
            self.log.push(RunLogEntry {
                step,
                kind: RunLogKind::RescueEvaluated {
                    episode: rescue.seq,
                    start_step: rescue.start_step,
                    status: rescue.status,
                },
            });
        }
    }
}

pub fn run_to_end<W, P>(
    world: &mut W,
    engine: &mut NavigationEngine<P>,
    max_steps: u64,
) -> Result<RunTrace, SnapshotError>
where
    W: GridWorld,
    P: ThresholdPolicy,
{
    run_to_end_with(world, engine, max_steps, DEFAULT_DEADLOCK_WINDOW)
}

/// Alternates decide and apply until the world terminates or `max_steps`
/// steps have been applied, then settles outstanding rescues.
pub fn run_to_end_with<W, P>(
    world: &mut W,
    engine: &mut NavigationEngine<P>,
    max_steps: u64,
    deadlock_window: usize,
) -> Result<RunTrace, SnapshotError>
where
    W: GridWorld,
    P: ThresholdPolicy,
{
    let deadlock_window = deadlock_window.max(1);
    let mut trace = RunTrace::default();
    let mut moved_history: VecDeque<bool> = VecDeque::with_capacity(deadlock_window);

    while !world.is_terminated() && world.steps() < max_steps {
        let decision = {
            let snapshot = world.snapshot()?;
            engine.decide(&snapshot)
        };
        let step = decision.step;

        trace.log_rescues(step, &decision.transition.resolved);
        if decision.transition.changed() {
            trace.log.push(RunLogEntry {
                step,
                kind: RunLogKind::ModeChanged {
                    from: decision.transition.from,
                    to: decision.transition.to,
                    risk: decision.risk.score,
                },
            });
        }
        if let Some(episode) = decision.transition.episode_started {
            trace.log.push(RunLogEntry {
                step,
                kind: RunLogKind::PanicStarted {
                    episode,
                    risk: decision.risk.score,
                    risk_threshold: decision.thresholds.risk,
                },
            });
        }
        match decision.mode {
            Mode::Normal => trace.normal_steps += 1,
            Mode::Panic => trace.panic_steps += 1,
            Mode::Survival => trace.survival_steps += 1,
        }
        trace.risk_threshold_sum += decision.thresholds.risk;
        trace.actions.push(decision.action);

        let outcome = world.apply(decision.action);
        if outcome.moved {
            trace.moved_steps += 1;
        }
        if moved_history.len() == deadlock_window {
            moved_history.pop_front();
        }
        moved_history.push_back(outcome.moved);
        if moved_history.len() == deadlock_window && moved_history.iter().all(|moved| !moved) {
            trace.deadlock_steps += 1;
        }
    }

    trace.steps = world.steps();
    let terminated = world.is_terminated();
    match world.death() {
        Some(death) => trace.log.push(RunLogEntry {
            step: trace.steps,
            kind: RunLogKind::Terminated { death },
        }),
        None => trace.log.push(RunLogEntry {
            step: trace.steps,
            kind: RunLogKind::StepLimitReached { max_steps },
        }),
    }
    let resolved = engine.conclude(trace.steps, terminated);
    trace.log_rescues(trace.steps, &resolved);
    Ok(trace)
}

// ============================================================================
// Run Records
// ============================================================================

/// Outcome of one seeded run, flat enough for a JSON line or a table row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub variant: Variant,
    pub agent: Agent,
    /// World-generation seed.
    pub seed: u64,
    /// Sensitivity the thresholds were priced with; 0 for the baseline.
    pub alpha: f64,
    /// Steps applied before termination or the step limit.
    pub steps: u64,
    pub terminated: bool,
    /// Cause of termination; `None` when the run hit the step limit.
    pub death: Option<DeathReason>,
    /// Panic episodes started during the run.
    pub panic_events: u64,
    /// Episodes judged rescued by the configured rule.
    pub rescued: u64,
    /// `rescued / panic_events`, 0 without episodes.
    pub rescue_rate: f64,
    /// Episodes whose rescue window elapsed before the run ended.
    pub risk_drop_checks: u64,
    /// Of those, the episodes whose risk fell by the diagnostic margin.
    pub risk_drops: u64,
    /// Steps spent in panic.
    pub panic_steps: u64,
    /// Share of steps spent in panic.
    pub panic_ratio: f64,
    /// Share of steps spent goal seeking.
    pub normal_ratio: f64,
    /// Share of steps that changed the agent's position.
    pub moved_ratio: f64,
    /// Steps that closed a full window without movement.
    pub deadlock_steps: u64,
    /// Visits to the dock that topped up a partial battery. Robot only.
    pub recharge_cycles: u64,
    /// Dirty cells cleaned. Robot only.
    pub cells_cleaned: u64,
    /// Snake body length at the end; 1 for the robot.
    pub final_length: usize,
    /// Mean risk threshold over the applied steps.
    pub mean_risk_threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub record: RunRecord,
    pub actions: Vec<Action>,
    /// Episodes still retained by the engine's bounded log.
    pub episodes: Vec<PanicEpisode>,
    pub log: Vec<RunLogEntry>,
}

struct RunLabel {
    variant: Variant,
    agent: Agent,
    seed: u64,
}

struct WorldStats {
    recharge_cycles: u64,
    cells_cleaned: u64,
    final_length: usize,
}

fn finish_report<W, P>(
    label: RunLabel,
    world: &W,
    mut engine: NavigationEngine<P>,
    trace: RunTrace,
    stats: WorldStats,
) -> RunReport
where
    W: GridWorld,
    P: ThresholdPolicy,
{
    let RunLabel {
        variant,
        agent,
        seed,
    } = label;
    let log = engine.episode_log();
    let record = RunRecord {
        variant,
        agent,
        seed,
        alpha: engine.policy().alpha(),
        steps: trace.steps,
        terminated: world.is_terminated(),
        death: world.death(),
        panic_events: log.panic_events(),
        rescued: log.rescued(),
        rescue_rate: log.rescue_rate(),
        risk_drop_checks: log.risk_drop_checks(),
        risk_drops: log.risk_drops(),
        panic_steps: trace.panic_steps,
        panic_ratio: trace.ratio(trace.panic_steps),
        normal_ratio: trace.ratio(trace.normal_steps),
        moved_ratio: trace.ratio(trace.moved_steps),
        deadlock_steps: trace.deadlock_steps,
        recharge_cycles: stats.recharge_cycles,
        cells_cleaned: stats.cells_cleaned,
        final_length: stats.final_length,
        mean_risk_threshold: trace.mean_risk_threshold(),
    };
    tracing::info!(
        variant = variant.label(),
        agent = agent.label(),
        seed,
        alpha = record.alpha,
        steps = record.steps,
        death = record.death.map(|death| death.label()),
        panic_events = record.panic_events,
        rescued = record.rescued,
        "run finished"
    );
    RunReport {
        record,
        episodes: engine.drain_episodes(),
        actions: trace.actions,
        log: trace.log,
    }
}

/// Gated snake run at `alpha`.
pub fn run_snake(
    seed: u64,
    alpha: f64,
    config: &ExperimentConfig,
) -> Result<RunReport, ExperimentError> {
    let engine = config.engine_snake.clone();
    snake_run(Agent::Gated, seed, alpha, engine, config)
}

/// Gated robot run at `alpha`.
pub fn run_vacuum(
    seed: u64,
    alpha: f64,
    config: &ExperimentConfig,
) -> Result<RunReport, ExperimentError> {
    let engine = config.engine_vacuum.clone();
    vacuum_run(Agent::Gated, seed, alpha, engine, config)
}

/// The variant's engine with the risk gate and stress monitor switched off,
/// on the same world as the gated runs of `seed`.
pub fn run_baseline(
    variant: Variant,
    seed: u64,
    config: &ExperimentConfig,
) -> Result<RunReport, ExperimentError> {
    match variant {
        Variant::Snake => {
            let engine = config.engine_snake.clone().baseline();
            snake_run(Agent::Baseline, seed, 0.0, engine, config)
        }
        Variant::Vacuum => {
            let engine = config.engine_vacuum.clone().baseline();
            vacuum_run(Agent::Baseline, seed, 0.0, engine, config)
        }
    }
}

fn snake_run(
    agent: Agent,
    seed: u64,
    alpha: f64,
    engine: EngineConfig,
    config: &ExperimentConfig,
) -> Result<RunReport, ExperimentError> {
    let policy = HungerPricing::new(config.snake_pricing.clone(), alpha);
    let mut engine = NavigationEngine::new(engine, policy)?;
    let mut world = SnakeWorld::new(&config.snake, seed)?;
    let trace = run_to_end_with(
        &mut world,
        &mut engine,
        config.sweep.max_steps,
        config.sweep.deadlock_window,
    )?;
    let label = RunLabel {
        variant: Variant::Snake,
        agent,
        seed,
    };
    let stats = WorldStats {
        recharge_cycles: 0,
        cells_cleaned: 0,
        final_length: world.length(),
    };
    Ok(finish_report(label, &world, engine, trace, stats))
}

fn vacuum_run(
    agent: Agent,
    seed: u64,
    alpha: f64,
    engine: EngineConfig,
    config: &ExperimentConfig,
) -> Result<RunReport, ExperimentError> {
    let mut world = VacuumWorld::new(&config.vacuum, seed)?;
    let policy = match &config.vacuum_pricing {
        Some(pricing) => StressPricing::new(pricing.clone(), alpha),
        None => StressPricing::for_battery(world.battery_max() as f64, alpha),
    };
    let mut engine = NavigationEngine::new(engine, policy)?;
    let trace = run_to_end_with(
        &mut world,
        &mut engine,
        config.sweep.max_steps,
        config.sweep.deadlock_window,
    )?;
    let label = RunLabel {
        variant: Variant::Vacuum,
        agent,
        seed,
    };
    let stats = WorldStats {
        recharge_cycles: world.recharge_cycles(),
        cells_cleaned: world.cells_cleaned(),
        final_length: 1,
    };
    Ok(finish_report(label, &world, engine, trace, stats))
}

/// Runs every α against every seed of the configured variant, α-major. With
/// `sweep.baseline` set, the baseline runs of every seed come first.
pub fn sweep(config: &ExperimentConfig) -> Result<Vec<RunRecord>, ExperimentError> {
    let sweep = &config.sweep;
    let seeds = sweep.seed_start..sweep.seed_start + sweep.seeds;
    let mut records = Vec::with_capacity((sweep.alphas.len() + 1) * sweep.seeds as usize);
    if sweep.baseline {
        for seed in seeds.clone() {
            records.push(run_baseline(config.variant, seed, config)?.record);
        }
        tracing::info!(
            variant = config.variant.label(),
            seeds = sweep.seeds,
            "baseline finished"
        );
    }
    for &alpha in &sweep.alphas {
        for seed in seeds.clone() {
            let report = match config.variant {
                Variant::Snake => run_snake(seed, alpha, config)?,
                Variant::Vacuum => run_vacuum(seed, alpha, config)?,
            };
            records.push(report.record);
        }
        tracing::info!(
            variant = config.variant.label(),
            alpha,
            seeds = sweep.seeds,
            "alpha finished"
        );
    }
    Ok(records)
}
