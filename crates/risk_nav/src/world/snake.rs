use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::{DeathReason, GridWorld, StepOutcome};
use crate::geometry::{Action, GridDims, GridError, GridPos};
use crate::navigator::{ObstacleMap, ResourceReading, SnapshotError, WorldSnapshot};

const FOOD_SPAWN_ATTEMPTS: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnakeWorldConfig {
    pub width: i32,
    pub height: i32,
    /// Hunger budget: the snake starves when this many steps pass without food.
    pub max_steps_without_food: u64,
}

impl Default for SnakeWorldConfig {
    fn default() -> Self {
        Self {
            width: 20,
            height: 20,
            max_steps_without_food: 200,
        }
    }
}

/// Snake game. The body is stored head first.
#[derive(Debug, Clone)]
pub struct SnakeWorld {
    dims: GridDims,
    terrain: ObstacleMap,
    body: Vec<GridPos>,
    food: Option<GridPos>,
    max_steps_without_food: u64,
    steps_since_food: u64,
    steps: u64,
    foods_eaten: u64,
    death: Option<DeathReason>,
    rng: ChaCha8Rng,
}

impl SnakeWorld {
    pub fn new(config: &SnakeWorldConfig, seed: u64) -> Result<Self, GridError> {
        let dims = GridDims::new(config.width, config.height)?;
        Self::with_body(config, seed, vec![dims.center()])
    }

    /// Starts from an explicit body, head first. An empty body spawns at the
    /// centre.
    pub fn with_body(
        config: &SnakeWorldConfig,
        seed: u64,
        mut body: Vec<GridPos>,
    ) -> Result<Self, GridError> {
        let dims = GridDims::new(config.width, config.height)?;
        if body.is_empty() {
            body.push(dims.center());
        }
        if let Some(pos) = body.iter().find(|pos| !dims.contains(**pos)) {
            return Err(GridError::OutOfBounds {
                pos: *pos,
                width: dims.width(),
                height: dims.height(),
            });
        }
        let mut world = Self {
            dims,
            terrain: ObstacleMap::empty(dims),
            body,
            food: None,
            max_steps_without_food: config.max_steps_without_food.max(1),
            steps_since_food: 0,
            steps: 0,
            foods_eaten: 0,
            death: None,
            rng: ChaCha8Rng::seed_from_u64(seed),
        };
        world.food = world.spawn_food();
        Ok(world)
    }

    pub fn dims(&self) -> GridDims {
        self.dims
    }

    pub fn body(&self) -> &[GridPos] {
        &self.body
    }

    pub fn head(&self) -> GridPos {
        self.body[0]
    }

    pub fn length(&self) -> usize {
        self.body.len()
    }

    pub fn food(&self) -> Option<GridPos> {
        self.food
    }

    /// Places food explicitly; used to stage scenarios.
    pub fn set_food(&mut self, food: Option<GridPos>) {
        self.food = food.filter(|pos| self.dims.contains(*pos));
    }

    pub fn steps_since_food(&self) -> u64 {
        self.steps_since_food
    }

    pub fn foods_eaten(&self) -> u64 {
        self.foods_eaten
    }

    fn spawn_food(&mut self) -> Option<GridPos> {
        for _ in 0..FOOD_SPAWN_ATTEMPTS {
            let pos = GridPos::new(
                self.rng.gen_range(0..self.dims.width()),
                self.rng.gen_range(0..self.dims.height()),
            );
            if !self.body.contains(&pos) {
                return Some(pos);
            }
        }
        // Crowded board: take the first free cell so placement stays seeded.
        self.dims.cells().find(|pos| !self.body.contains(pos))
    }

    fn outcome(&self, moved: bool) -> StepOutcome {
        StepOutcome {
            position: self.body[0],
            resource_level: self.steps_since_food as f64,
            moved,
            terminated: self.death.is_some(),
            death: self.death,
        }
    }
}

impl GridWorld for SnakeWorld {
    fn snapshot(&self) -> Result<WorldSnapshot<'_>, SnapshotError> {
        let resource = ResourceReading::hunger(self.steps_since_food, self.max_steps_without_food);
        let snapshot = WorldSnapshot::new(self.steps, &self.terrain, &self.body, resource)?;
        Ok(snapshot.with_goal(self.food))
    }

    fn apply(&mut self, action: Action) -> StepOutcome {
        if self.death.is_some() {
            return self.outcome(false);
        }
        self.steps += 1;
        self.steps_since_food += 1;

        let head = self.body[0];
        let next = head.apply(action);
        let without_tail = &self.body[..self.body.len() - 1];
        if !self.dims.contains(next) || without_tail.contains(&next) {
            self.death = Some(DeathReason::Collision);
            return self.outcome(false);
        }

        self.body.insert(0, next);
        if self.food == Some(next) {
            self.steps_since_food = 0;
            self.foods_eaten += 1;
            self.food = self.spawn_food();
        } else {
            self.body.pop();
        }

        if self.steps_since_food >= self.max_steps_without_food {
            self.death = Some(DeathReason::Starvation);
        }
        self.outcome(next != head)
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
