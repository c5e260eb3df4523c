//! Tests for the navigator module.

use super::*;
use crate::geometry::{Action, Direction, GridDims, GridPos};

fn pos(x: i32, y: i32) -> GridPos {
    GridPos::new(x, y)
}

fn dims(width: i32, height: i32) -> GridDims {
    GridDims::new(width, height).expect("valid dims")
}

/// Thresholds that ignore every input.
struct FixedPolicy(Thresholds);

impl ThresholdPolicy for FixedPolicy {
    fn alpha(&self) -> f64 {
        0.0
    }

    fn thresholds(&self, _input: &PricingInput) -> Thresholds {
        self.0
    }
}

fn fixed_risk(risk: f64) -> FixedPolicy {
    FixedPolicy(Thresholds {
        risk,
        resource_alarm: None,
    })
}

mod engine;
mod panic;
mod risk;
