//! NavigationEngine: one decision per tick, composed over an injected
//! threshold policy.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::config::{ConfigError, EngineConfig};
use super::panic::{
    EpisodeLog, MachineInput, Mode, PanicEpisode, PanicStateMachine, ResolvedRescue, Transition,
};
use super::planner::{best_reach_move_within, shortest_path, ObstacleMap};
use super::pricing::{PricingInput, ThresholdPolicy, Thresholds};
use super::risk::{RiskAssessment, StructGate, TrajectorySource, TrajectoryWindow};
use super::stress::{StressMonitor, StressSample, StressSignal};
use crate::geometry::{Action, Direction, GridPos};

// ============================================================================
// Resource Reading
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Steps since the last meal; grows towards the budget.
    Hunger,
    /// Remaining charge; shrinks towards zero.
    Battery,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceReading {
    pub kind: ResourceKind,
    /// Steps since food, or remaining charge.
    pub level: f64,
    /// Starvation budget, or full charge.
    pub capacity: f64,
}

impl ResourceReading {
    pub fn hunger(steps_since_food: u64, budget: u64) -> Self {
        Self {
            kind: ResourceKind::Hunger,
            level: steps_since_food as f64,
            capacity: budget as f64,
        }
    }

    pub fn battery(level: i64, capacity: i64) -> Self {
        Self {
            kind: ResourceKind::Battery,
            level: level as f64,
            capacity: capacity as f64,
        }
    }

    /// Scarcity in [0, 1]: hunger ratio or battery pressure.
    pub fn scarcity(&self) -> f64 {
        if self.capacity <= 0.0 {
            return 0.0;
        }
        let ratio = self.level / self.capacity;
        match self.kind {
            ResourceKind::Hunger => ratio.clamp(0.0, 1.0),
            ResourceKind::Battery => (1.0 - ratio).clamp(0.0, 1.0),
        }
    }
}

// ============================================================================
// World Snapshot
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    EmptyBody,
    BodyOutOfBounds { index: usize, pos: GridPos },
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::EmptyBody => write!(f, "agent body is empty"),
            SnapshotError::BodyOutOfBounds { index, pos } => {
                write!(f, "body cell {index} at {pos} is outside the grid")
            }
        }
    }
}

impl std::error::Error for SnapshotError {}

/// Read-only view of the world for one decision.
#[derive(Debug, Clone, Copy)]
pub struct WorldSnapshot<'a> {
    step: u64,
    terrain: &'a ObstacleMap,
    body: &'a [GridPos],
    goal: Option<GridPos>,
    safe_point: Option<GridPos>,
    resource: ResourceReading,
}

impl<'a> WorldSnapshot<'a> {
    /// `body` is head first. `terrain` holds the static obstacles only.
    pub fn new(
        step: u64,
        terrain: &'a ObstacleMap,
        body: &'a [GridPos],
        resource: ResourceReading,
    ) -> Result<Self, SnapshotError> {
        if body.is_empty() {
            return Err(SnapshotError::EmptyBody);
        }
        let dims = terrain.dims();
        if let Some((index, pos)) = body.iter().enumerate().find(|(_, pos)| !dims.contains(**pos)) {
            return Err(SnapshotError::BodyOutOfBounds { index, pos: *pos });
        }
        Ok(Self {
            step,
            terrain,
            body,
            goal: None,
            safe_point: None,
            resource,
        })
    }

    pub fn with_goal(mut self, goal: Option<GridPos>) -> Self {
        self.goal = goal;
        self
    }

    pub fn with_safe_point(mut self, safe_point: Option<GridPos>) -> Self {
        self.safe_point = safe_point;
        self
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn terrain(&self) -> &'a ObstacleMap {
        self.terrain
    }

    pub fn body(&self) -> &'a [GridPos] {
        self.body
    }

    pub fn head(&self) -> GridPos {
        self.body[0]
    }

    pub fn tail(&self) -> GridPos {
        self.body[self.body.len() - 1]
    }

    pub fn goal(&self) -> Option<GridPos> {
        self.goal
    }

    pub fn safe_point(&self) -> Option<GridPos> {
        self.safe_point
    }

    pub fn resource(&self) -> ResourceReading {
        self.resource
    }
}

// ============================================================================
// Navigation Configuration
// ============================================================================

/// Where a panicking agent runs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscapeTarget {
    /// Chase the own tail: the cell that frees up next.
    Tail,
    /// Head for the designated safe point.
    SafePoint,
    /// Take the move that opens onto the most free space.
    OpenSpace,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    pub escape_target: EscapeTarget,
    /// Expansion budget of the open-space search; `None` floods the whole
    /// region.
    pub reach_budget: Option<usize>,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            escape_target: EscapeTarget::Tail,
            reach_budget: None,
        }
    }
}

// ============================================================================
// Decision
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionSource {
    Goal,
    Escape,
    Survival,
    OpenSpace,
    /// Boxed in: nothing but the no-op was legal.
    Idle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Step of the snapshot this decision answers.
    pub step: u64,
    pub action: Action,
    /// Mode the action was chosen in.
    pub mode: Mode,
    /// Which rule produced the action.
    pub source: ActionSource,
    /// The mode's own rule produced nothing and the motor floor was used.
    pub fallback: bool,
    pub risk: RiskAssessment,
    pub thresholds: Thresholds,
    /// Present when the engine runs the LPI monitor.
    pub stress: Option<StressSample>,
    pub transition: Transition,
}

struct Selection {
    action: Action,
    source: ActionSource,
    fallback: bool,
}

// ============================================================================
// Navigation Engine
// ============================================================================

/// Risk-gated navigation for one agent in one run.
///
/// Per tick: risk → stress → thresholds → mode → action. The engine holds no
/// randomness, so equal snapshot sequences give equal decisions.
#[derive(Debug, Clone)]
pub struct NavigationEngine<P: ThresholdPolicy> {
    gate: StructGate,
    trajectory: TrajectoryWindow,
    stress: Option<StressMonitor>,
    policy: P,
    machine: PanicStateMachine,
    navigation: NavigationConfig,
    last_escape_forced: bool,
}

impl<P: ThresholdPolicy> NavigationEngine<P> {
    pub fn new(config: EngineConfig, policy: P) -> Result<Self, ConfigError> {
        config.validate()?;
        let config = config.sanitized();
        Ok(Self {
            trajectory: TrajectoryWindow::new(config.risk.window),
            gate: StructGate::new(config.risk),
            stress: config.stress.map(StressMonitor::new),
            policy,
            machine: PanicStateMachine::new(config.panic),
            navigation: config.navigation,
            last_escape_forced: false,
        })
    }

    pub fn decide(&mut self, snapshot: &WorldSnapshot<'_>) -> Decision {
        let head = snapshot.head();
        let body = snapshot.body();
        let obstacles = snapshot.terrain().with_body(body);
        self.trajectory.push(head);

        let risk = match self.gate.config().trajectory {
            TrajectorySource::Body => self.gate.assess(body, head, body.len(), &obstacles),
            TrajectorySource::Window => {
                let points = self.trajectory.to_vec();
                self.gate.assess(&points, head, body.len(), &obstacles)
            }
        };

        let forced_escape = self.last_escape_forced;
        let stress = self.stress.as_mut().map(|monitor| {
            monitor.update(StressSignal {
                risk: risk.score,
                at_safe_point: snapshot.safe_point() == Some(head),
                forced_escape,
            })
        });

        let resource = snapshot.resource();
        let thresholds = self.policy.thresholds(&PricingInput {
            scarcity: resource.scarcity(),
            stress: stress.map_or(0.0, |sample| sample.stress),
            resource_level: resource.level,
        });

        let transition = self.machine.transition(MachineInput {
            step: snapshot.step(),
            risk: risk.score,
            resource_level: resource.level,
            thresholds,
        });
        let mode = transition.to;
        let selection = self.select(mode, snapshot, &obstacles);
        self.last_escape_forced = mode == Mode::Panic && selection.fallback;

        tracing::trace!(
            step = snapshot.step(),
            mode = mode.label(),
            action = selection.action.label(),
            risk = risk.score,
            "decision"
        );

        Decision {
            step: snapshot.step(),
            action: selection.action,
            mode,
            source: selection.source,
            fallback: selection.fallback,
            risk,
            thresholds,
            stress,
            transition,
        }
    }

    pub fn current_mode(&self) -> Mode {
        self.machine.mode()
    }

    pub fn episode_log(&self) -> &EpisodeLog {
        self.machine.log()
    }

    pub fn drain_episodes(&mut self) -> Vec<PanicEpisode> {
        self.machine.log_mut().drain()
    }

    pub fn panic_steps(&self) -> u64 {
        self.machine.panic_steps()
    }

    /// Settles outstanding rescue evaluations at the end of a run.
    pub fn conclude(&mut self, final_step: u64, terminated: bool) -> Vec<ResolvedRescue> {
        self.machine.conclude(final_step, terminated)
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn stress_monitor(&self) -> Option<&StressMonitor> {
        self.stress.as_ref()
    }

    pub fn trajectory(&self) -> &TrajectoryWindow {
        &self.trajectory
    }

    fn select(
        &self,
        mode: Mode,
        snapshot: &WorldSnapshot<'_>,
        obstacles: &ObstacleMap,
    ) -> Selection {
        let head = snapshot.head();
        let planned = match mode {
            Mode::Normal => snapshot
                .goal()
                .and_then(|goal| shortest_path(head, goal, obstacles))
                .map(|direction| (direction, ActionSource::Goal)),
            Mode::Panic => match self.navigation.escape_target {
                EscapeTarget::Tail => shortest_path(head, snapshot.tail(), obstacles)
                    .map(|direction| (direction, ActionSource::Escape)),
                EscapeTarget::SafePoint => snapshot
                    .safe_point()
                    .and_then(|safe| shortest_path(head, safe, obstacles))
                    .map(|direction| (direction, ActionSource::Escape)),
                EscapeTarget::OpenSpace => self
                    .open_space_move(head, obstacles)
                    .map(|direction| (direction, ActionSource::OpenSpace)),
            },
            Mode::Survival => snapshot
                .safe_point()
                .and_then(|safe| greedy_toward(head, safe, obstacles))
                .map(|direction| (direction, ActionSource::Survival)),
        };

        if let Some((direction, source)) = planned {
            return Selection {
                action: Action::Move(direction),
                source,
                fallback: false,
            };
        }

        // Motor floor shared by every mode.
        match self.open_space_move(head, obstacles) {
            Some(direction) => Selection {
                action: Action::Move(direction),
                source: ActionSource::OpenSpace,
                fallback: true,
            },
            None => Selection {
                action: Action::Stay,
                source: ActionSource::Idle,
                fallback: true,
            },
        }
    }

    fn open_space_move(&self, head: GridPos, obstacles: &ObstacleMap) -> Option<Direction> {
        best_reach_move_within(head, obstacles, self.navigation.reach_budget)
    }
}

/// First legal move, in exploration order, that shortens the Manhattan
/// distance to `target`.
pub fn greedy_toward(head: GridPos, target: GridPos, obstacles: &ObstacleMap) -> Option<Direction> {
    let distance = head.manhattan(target);
    Direction::ALL.into_iter().find(|direction| {
        let next = head.step(*direction);
        next.manhattan(target) < distance && obstacles.is_open(next)
    })
}
