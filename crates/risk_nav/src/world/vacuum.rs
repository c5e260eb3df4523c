use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::{DeathReason, GridWorld, StepOutcome};
use crate::geometry::{Action, GridDims, GridError, GridPos};
use crate::navigator::{ObstacleMap, ResourceReading, SnapshotError, WorldSnapshot};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VacuumWorldConfig {
    pub width: i32,
    pub height: i32,
    /// Share of cells turned into obstacles.
    pub obstacle_density: f64,
    pub battery_max: i64,
    pub dock: GridPos,
    /// Steps after which an unreached cleaning target is replaced.
    pub retarget_after: u64,
}

impl Default for VacuumWorldConfig {
    fn default() -> Self {
        Self {
            width: 12,
            height: 12,
            obstacle_density: 0.25,
            battery_max: 60,
            dock: GridPos::new(0, 0),
            retarget_after: 40,
        }
    }
}

impl VacuumWorldConfig {
    pub fn sanitized(mut self) -> Self {
        self.obstacle_density = if self.obstacle_density.is_finite() {
            self.obstacle_density.clamp(0.0, 1.0)
        } else {
            0.0
        };
        if self.battery_max < 1 {
            self.battery_max = 1;
        }
        if self.retarget_after == 0 {
            self.retarget_after = 1;
        }
        self
    }
}

/// Cleaning robot on a grid with static obstacles and a charging dock.
///
/// Every step off the dock costs one unit of battery; ending a step on the
/// dock recharges to full.
#[derive(Debug, Clone)]
pub struct VacuumWorld {
    dims: GridDims,
    terrain: ObstacleMap,
    dock: GridPos,
    pos: GridPos,
    battery: i64,
    battery_max: i64,
    steps: u64,
    recharge_cycles: u64,
    dirty: Vec<bool>,
    cells_cleaned: u64,
    target: Option<GridPos>,
    target_age: u64,
    retarget_after: u64,
    death: Option<DeathReason>,
    rng: ChaCha8Rng,
}

impl VacuumWorld {
    pub fn new(config: &VacuumWorldConfig, seed: u64) -> Result<Self, GridError> {
        let config = config.clone().sanitized();
        let dims = GridDims::new(config.width, config.height)?;
        if !dims.contains(config.dock) {
            return Err(GridError::OutOfBounds {
                pos: config.dock,
                width: dims.width(),
                height: dims.height(),
            });
        }
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        // Keep room for the dock and a spawn cell.
        let cells = dims.cell_count();
        let wanted = (cells as f64 * config.obstacle_density) as usize;
        let obstacle_count = wanted.min(cells.saturating_sub(2));
        let mut terrain = ObstacleMap::empty(dims);
        while terrain.blocked_count() < obstacle_count {
            let pos = random_cell(&mut rng, dims);
            if pos != config.dock {
                terrain.block(pos);
            }
        }

        let dock = config.dock;
        let pos = pick_cell(&mut rng, dims, |cell| terrain.is_open(cell) && cell != dock)
            .unwrap_or(dock);

        let dirty = dims.cells().map(|cell| terrain.is_open(cell)).collect();
        let mut world = Self {
            dims,
            terrain,
            dock,
            pos,
            battery: config.battery_max,
            battery_max: config.battery_max,
            steps: 0,
            recharge_cycles: 0,
            dirty,
            cells_cleaned: 0,
            target: None,
            target_age: 0,
            retarget_after: config.retarget_after,
            death: None,
            rng,
        };
        world.clean(pos);
        world.retarget();
        Ok(world)
    }

    pub fn dims(&self) -> GridDims {
        self.dims
    }

    pub fn terrain(&self) -> &ObstacleMap {
        &self.terrain
    }

    pub fn position(&self) -> GridPos {
        self.pos
    }

    pub fn dock(&self) -> GridPos {
        self.dock
    }

    pub fn battery(&self) -> i64 {
        self.battery
    }

    pub fn battery_max(&self) -> i64 {
        self.battery_max
    }

    pub fn recharge_cycles(&self) -> u64 {
        self.recharge_cycles
    }

    pub fn cells_cleaned(&self) -> u64 {
        self.cells_cleaned
    }

    pub fn target(&self) -> Option<GridPos> {
        self.target
    }

    pub fn is_dirty(&self, pos: GridPos) -> bool {
        self.dims.index(pos).map(|index| self.dirty[index]).unwrap_or(false)
    }

    fn clean(&mut self, pos: GridPos) -> bool {
        match self.dims.index(pos) {
            Some(index) if self.dirty[index] => {
                self.dirty[index] = false;
                self.cells_cleaned += 1;
                true
            }
            _ => false,
        }
    }

    fn retarget(&mut self) {
        if !self.dirty.iter().any(|dirty| *dirty) {
            // Everything is clean: dust settles again everywhere but here.
            for cell in self.dims.cells() {
                if let Some(index) = self.dims.index(cell) {
                    self.dirty[index] = self.terrain.is_open(cell) && cell != self.pos;
                }
            }
        }
        let dims = self.dims;
        let dirty = &self.dirty;
        self.target = pick_cell(&mut self.rng, dims, |cell| {
            dims.index(cell).map(|index| dirty[index]).unwrap_or(false)
        });
        self.target_age = 0;
    }

    fn outcome(&self, moved: bool) -> StepOutcome {
        StepOutcome {
            position: self.pos,
            resource_level: self.battery as f64,
            moved,
            terminated: self.death.is_some(),
            death: self.death,
        }
    }
}

impl GridWorld for VacuumWorld {
    fn snapshot(&self) -> Result<WorldSnapshot<'_>, SnapshotError> {
        let resource = ResourceReading::battery(self.battery, self.battery_max);
        let body = std::slice::from_ref(&self.pos);
        Ok(WorldSnapshot::new(self.steps, &self.terrain, body, resource)?
            .with_goal(self.target)
            .with_safe_point(Some(self.dock)))
    }

    fn apply(&mut self, action: Action) -> StepOutcome {
        if self.death.is_some() {
            return self.outcome(false);
        }
        self.steps += 1;

        let next = self.pos.apply(action);
        let moved = next != self.pos && self.terrain.is_open(next);
        if moved {
            self.pos = next;
        }
        self.clean(self.pos);

        if self.pos == self.dock {
            if self.battery < self.battery_max {
                self.recharge_cycles += 1;
            }
            self.battery = self.battery_max;
        } else {
            self.battery -= 1;
        }
        if self.battery <= 0 {
            self.death = Some(DeathReason::BatteryDepleted);
        }

        self.target_age += 1;
        let reached = self.target.map_or(true, |target| !self.is_dirty(target));
        if reached || self.target_age >= self.retarget_after {
            self.retarget();
        }
        self.outcome(moved)
    }

    fn steps(&self) -> u64 {
        self.steps
    }

    fn is_terminated(&self) -> bool {
        self.death.is_some()
    }

    fn death(&self) -> Option<DeathReason> {
        self.death
    }
}

fn random_cell(rng: &mut ChaCha8Rng, dims: GridDims) -> GridPos {
    GridPos::new(rng.gen_range(0..dims.width()), rng.gen_range(0..dims.height()))
}

/// Rejection-samples a cell matching `accept`, then falls back to a scan so
/// the result is always seeded and never loops forever.
fn pick_cell<F>(rng: &mut ChaCha8Rng, dims: GridDims, accept: F) -> Option<GridPos>
where
    F: Fn(GridPos) -> bool,
{
    for _ in 0..dims.cell_count() * 4 {
        let pos = random_cell(rng, dims);
        if accept(pos) {
            return Some(pos);
        }
    }
    dims.cells().find(|cell| accept(*cell))
}
