//! StructGate: structural risk from trajectory shape and topological freedom.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::planner::{reachable_area, ObstacleMap};
use crate::geometry::GridPos;

/// Added to the largest singular value so a fully collapsed point set yields
/// entropy 0 instead of NaN.
pub const SHAPE_EPSILON: f64 = 1e-8;

// ============================================================================
// Configuration
// ============================================================================

/// Which point set the geometric term analyses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrajectorySource {
    /// The occupied body, head first (snake).
    Body,
    /// The last `window` head positions (single-cell robot).
    Window,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Weight of the confinement term. Must sum to 1 with `geom_weight`.
    pub topo_weight: f64,
    /// Weight of the trajectory-shape term.
    pub geom_weight: f64,
    /// Maps spread entropy onto geometric risk: `1 - entropy * scale`.
    pub entropy_scale: f64,
    pub trajectory: TrajectorySource,
    /// Capacity of the trajectory window.
    pub window: usize,
    /// Below this many points no risk is reported.
    pub min_points: usize,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            topo_weight: 0.7,
            geom_weight: 0.3,
            entropy_scale: 5.0,
            trajectory: TrajectorySource::Body,
            window: 10,
            min_points: 3,
        }
    }
}

impl RiskConfig {
    /// Robot preset: a one-cell body never confines itself, so the score is
    /// the trajectory shape alone, and only once the window is full.
    pub fn windowed() -> Self {
        Self {
            topo_weight: 0.0,
            geom_weight: 1.0,
            entropy_scale: 5.0,
            trajectory: TrajectorySource::Window,
            window: 10,
            min_points: 10,
        }
    }

    pub fn sanitized(mut self) -> Self {
        if self.topo_weight < 0.0 {
            self.topo_weight = 0.0;
        }
        if self.geom_weight < 0.0 {
            self.geom_weight = 0.0;
        }
        if self.entropy_scale < 0.0 {
            self.entropy_scale = 0.0;
        }
        if self.window == 0 {
            self.window = 1;
        }
        if self.trajectory == TrajectorySource::Window && self.min_points > self.window {
            self.min_points = self.window;
        }
        self
    }
}

// ============================================================================
// Trajectory Window
// ============================================================================

/// Most recent positions, oldest evicted first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrajectoryWindow {
    points: VecDeque<GridPos>,
    capacity: usize,
}

impl TrajectoryWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, pos: GridPos) {
        if self.points.len() >= self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(pos);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.points.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &GridPos> {
        self.points.iter()
    }

    pub fn to_vec(&self) -> Vec<GridPos> {
        self.points.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }
}

// ============================================================================
// Assessment
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Shape term: 1 for a line or a collapsed loop.
    pub geometric: f64,
    /// Confinement term: 1 when the reachable area is smaller than the body.
    pub topological: f64,
    /// Weighted combination, in [0, 1].
    pub score: f64,
}

/// Ratio of the second to the first singular value of the centred point set:
/// about 0 for a line or a collapsed loop, 1 for an isotropic spread.
///
/// Returns `None` when fewer than two points are given or the decomposition
/// does not produce finite values.
pub fn shape_entropy(points: &[GridPos]) -> Option<f64> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.x as f64).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.y as f64).sum::<f64>() / n;
    let centred = DMatrix::from_fn(points.len(), 2, |row, col| {
        let point = points[row];
        if col == 0 {
            point.x as f64 - mean_x
        } else {
            point.y as f64 - mean_y
        }
    });
    if centred.iter().all(|value| value.abs() < SHAPE_EPSILON) {
        return Some(0.0);
    }

    let svd = centred.try_svd(false, false, f64::EPSILON, 0)?;
    let values = &svd.singular_values;
    if values.len() < 2 {
        return None;
    }
    let largest = values.iter().copied().fold(f64::MIN, f64::max);
    let smallest = values.iter().copied().fold(f64::MAX, f64::min);
    if !largest.is_finite() || !smallest.is_finite() {
        return None;
    }
    Some((smallest / (largest + SHAPE_EPSILON)).clamp(0.0, 1.0))
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructGate {
    config: RiskConfig,
}

impl StructGate {
    pub fn new(config: RiskConfig) -> Self {
        Self {
            config: config.sanitized(),
        }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// `clamp(1 - entropy * scale)`; a failed decomposition counts as no risk.
    pub fn geometric_risk(&self, points: &[GridPos]) -> f64 {
        match shape_entropy(points) {
            Some(entropy) => (1.0 - entropy * self.config.entropy_scale).clamp(0.0, 1.0),
            None => 0.0,
        }
    }

    /// Open area around the head compared with the body length.
    pub fn topological_risk(&self, head: GridPos, body_len: usize, obstacles: &ObstacleMap) -> f64 {
        let area = reachable_area(head, obstacles) as f64;
        (1.0 - area / body_len.max(1) as f64).clamp(0.0, 1.0)
    }

    pub fn assess(
        &self,
        trajectory: &[GridPos],
        head: GridPos,
        body_len: usize,
        obstacles: &ObstacleMap,
    ) -> RiskAssessment {
        if trajectory.len() < self.config.min_points {
            return RiskAssessment::default();
        }

        let geometric = self.geometric_risk(trajectory);
        let topological = if self.config.topo_weight > 0.0 {
            self.topological_risk(head, body_len, obstacles)
        } else {
            0.0
        };
        let score = (self.config.topo_weight * topological + self.config.geom_weight * geometric)
            .clamp(0.0, 1.0);
        RiskAssessment {
            geometric,
            topological,
            score,
        }
    }
}
