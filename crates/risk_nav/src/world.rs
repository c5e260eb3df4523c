//! Grid worlds driven by the navigation engine.
//!
//! - `snake`: Snake survival game (hunger budget, growing body)
//! - `vacuum`: battery-constrained cleaning robot with a charging dock

mod snake;
mod vacuum;


use serde::{Deserialize, Serialize};

use crate::geometry::{Action, GridPos};
use crate::navigator::{SnapshotError, WorldSnapshot};

pub use snake::{SnakeWorld, SnakeWorldConfig};
pub use vacuum::{VacuumWorld, VacuumWorldConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathReason {
    /// Hit a wall, an obstacle or the own body.
    Collision,
    /// Went too long without food.
    Starvation,
    BatteryDepleted,
}

impl DeathReason {
    pub fn label(&self) -> &'static str {
        match self {
            DeathReason::Collision => "collision",
            DeathReason::Starvation => "starvation",
            DeathReason::BatteryDepleted => "battery_depleted",
        }
    }
}

/// Result of applying one action.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    /// Head position after the step.
    pub position: GridPos,
    /// Hunger or battery level after the step.
    pub resource_level: f64,
    /// Whether the head changed cells. A blocked move or `Stay` does not.
    pub moved: bool,
    /// The step ended the run.
    pub terminated: bool,
    /// Set together with `terminated`.
    pub death: Option<DeathReason>,
}

/// The environment side of the decide/apply loop.
pub trait GridWorld {
    fn snapshot(&self) -> Result<WorldSnapshot<'_>, SnapshotError>;

    fn apply(&mut self, action: Action) -> StepOutcome;

    /// Steps applied so far.
    fn steps(&self) -> u64;

    fn is_terminated(&self) -> bool;

    fn death(&self) -> Option<DeathReason>;
}
