//! Grid search primitives shared by navigation and risk assessment.
//!
//! Every query runs against an [`ObstacleMap`], and the engine builds exactly
//! one map per step through [`ObstacleMap::with_body`], so the path query and
//! the flood fill can never disagree about which body cells are passable.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::geometry::{Direction, GridDims, GridPos};

// ============================================================================
// Obstacle Map
// ============================================================================

/// Dense blocked-cell flags for one grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObstacleMap {
    dims: GridDims,
    blocked: Vec<bool>,
    blocked_count: usize,
}

impl ObstacleMap {
    pub fn empty(dims: GridDims) -> Self {
        Self {
            dims,
            blocked: vec![false; dims.cell_count()],
            blocked_count: 0,
        }
    }

    /// Cells outside the grid are ignored.
    pub fn from_cells<I>(dims: GridDims, cells: I) -> Self
    where
        I: IntoIterator<Item = GridPos>,
    {
        let mut map = Self::empty(dims);
        for cell in cells {
            map.block(cell);
        }
        map
    }

    pub fn dims(&self) -> GridDims {
        self.dims
    }

    /// Marks a cell as blocked. Returns false if the cell is outside the grid
    /// or already blocked.
    pub fn block(&mut self, pos: GridPos) -> bool {
        match self.dims.index(pos) {
            Some(index) if !self.blocked[index] => {
                self.blocked[index] = true;
                self.blocked_count += 1;
                true
            }
            _ => false,
        }
    }

    pub fn unblock(&mut self, pos: GridPos) -> bool {
        match self.dims.index(pos) {
            Some(index) if self.blocked[index] => {
                self.blocked[index] = false;
                self.blocked_count -= 1;
                true
            }
            _ => false,
        }
    }

    pub fn is_blocked(&self, pos: GridPos) -> bool {
        self.dims
            .index(pos)
            .map(|index| self.blocked[index])
            .unwrap_or(false)
    }

    /// In bounds and not blocked: a cell the agent may step onto.
    pub fn is_open(&self, pos: GridPos) -> bool {
        self.dims
            .index(pos)
            .map(|index| !self.blocked[index])
            .unwrap_or(false)
    }

    pub fn blocked_count(&self) -> usize {
        self.blocked_count
    }

    pub fn open_count(&self) -> usize {
        self.dims.cell_count() - self.blocked_count
    }

    pub fn blocked_cells(&self) -> impl Iterator<Item = GridPos> + '_ {
        self.dims.cells().filter(|cell| self.is_blocked(*cell))
    }

    /// The shared obstacle-set builder: static terrain plus the agent's body
    /// without its tail, since the tail vacates on the same tick the head
    /// moves. A one-cell body adds nothing.
    pub fn with_body(&self, body: &[GridPos]) -> ObstacleMap {
        let mut map = self.clone();
        let keep = body.len().saturating_sub(1);
        for cell in &body[..keep] {
            map.block(*cell);
        }
        map
    }

    /// Directions from `pos` that land on an open cell, in exploration order.
    pub fn open_moves(&self, pos: GridPos) -> impl Iterator<Item = Direction> + '_ {
        Direction::ALL
            .into_iter()
            .filter(move |direction| self.is_open(pos.step(*direction)))
    }
}

// ============================================================================
// Queries
// ============================================================================

/// First move of a shortest `start -> goal` path, or `None` when the goal is
/// unreachable or already reached.
pub fn shortest_path(start: GridPos, goal: GridPos, obstacles: &ObstacleMap) -> Option<Direction> {
    let dims = obstacles.dims();
    let start_index = dims.index(start)?;
    if start == goal {
        return None;
    }

    let mut visited = vec![false; dims.cell_count()];
    let mut first_move: Vec<Option<Direction>> = vec![None; dims.cell_count()];
    let mut queue = VecDeque::with_capacity(dims.cell_count());
    visited[start_index] = true;
    queue.push_back(start);

    while let Some(cell) = queue.pop_front() {
        let via_cell = dims.index(cell).and_then(|index| first_move[index]);
        for direction in Direction::ALL {
            let next = cell.step(direction);
            let Some(next_index) = dims.index(next) else {
                continue;
            };
            if visited[next_index] || obstacles.is_blocked(next) {
                continue;
            }
            visited[next_index] = true;
            let via = via_cell.unwrap_or(direction);
            if next == goal {
                return Some(via);
            }
            first_move[next_index] = Some(via);
            queue.push_back(next);
        }
    }
    None
}

/// Size of the connected open region containing `start`, start included.
pub fn reachable_area(start: GridPos, obstacles: &ObstacleMap) -> usize {
    reachable_area_within(start, obstacles, None)
}

/// Flood fill that stops expanding after `budget` cells have been expanded.
/// Returns every cell discovered so far, so a budgeted search still sees the
/// frontier of the last expanded cell.
pub fn reachable_area_within(
    start: GridPos,
    obstacles: &ObstacleMap,
    budget: Option<usize>,
) -> usize {
    let dims = obstacles.dims();
    let Some(start_index) = dims.index(start) else {
        return 0;
    };

    let mut visited = vec![false; dims.cell_count()];
    let mut queue = VecDeque::new();
    visited[start_index] = true;
    queue.push_back(start);
    let mut discovered = 1;
    let mut expanded = 0;

    while let Some(cell) = queue.pop_front() {
        if budget.is_some_and(|limit| expanded >= limit) {
            break;
        }
        expanded += 1;
        for direction in Direction::ALL {
            let next = cell.step(direction);
            let Some(next_index) = dims.index(next) else {
                continue;
            };
            if visited[next_index] || obstacles.is_blocked(next) {
                continue;
            }
            visited[next_index] = true;
            discovered += 1;
            queue.push_back(next);
        }
    }
    discovered
}

/// The move whose landing cell opens onto the largest region. First direction
/// wins ties. `None` only when all four neighbours are blocked or off-grid.
pub fn best_reach_move(head: GridPos, obstacles: &ObstacleMap) -> Option<Direction> {
    best_reach_move_within(head, obstacles, None)
}

pub fn best_reach_move_within(
    head: GridPos,
    obstacles: &ObstacleMap,
    budget: Option<usize>,
) -> Option<Direction> {
    let mut best: Option<(Direction, usize)> = None;
    for direction in obstacles.open_moves(head) {
        let area = reachable_area_within(head.step(direction), obstacles, budget);
        if best.map_or(true, |(_, best_area)| area > best_area) {
            best = Some((direction, area));
        }
    }
    best.map(|(direction, _)| direction)
}
