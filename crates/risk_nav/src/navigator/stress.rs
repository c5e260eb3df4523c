//! LPI stress monitor: exponentially smoothed health damage.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StressConfig {
    /// EMA inertia: `stress = rho * stress + (1 - rho) * raw`.
    pub rho: f64,
    /// Health lost every step.
    pub step_decay: f64,
    /// Health lost per unit of risk.
    pub collapse_decay: f64,
    /// Health regained on a step spent at the safe point.
    pub recovery_gain: f64,
    /// Health lost on a step after an escape had no safe path.
    pub forced_penalty: f64,
    /// Weight of damage in the raw stress signal.
    pub damage_gain: f64,
    /// Weight of risk in the raw stress signal.
    pub risk_gain: f64,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            rho: 0.75,
            step_decay: 0.001,
            collapse_decay: 0.04,
            recovery_gain: 0.06,
            forced_penalty: 0.1,
            damage_gain: 2.0,
            risk_gain: 0.0,
        }
    }
}

impl StressConfig {
    pub fn sanitized(mut self) -> Self {
        self.rho = self.rho.clamp(0.0, 1.0);
        if self.step_decay < 0.0 {
            self.step_decay = 0.0;
        }
        if self.collapse_decay < 0.0 {
            self.collapse_decay = 0.0;
        }
        if self.recovery_gain < 0.0 {
            self.recovery_gain = 0.0;
        }
        if self.forced_penalty < 0.0 {
            self.forced_penalty = 0.0;
        }
        if self.damage_gain < 0.0 {
            self.damage_gain = 0.0;
        }
        if self.risk_gain < 0.0 {
            self.risk_gain = 0.0;
        }
        self
    }
}

/// One monitor update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StressSample {
    pub health: f64,
    pub damage: f64,
    pub stress: f64,
}

/// What the monitor needs to know about the current step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StressSignal {
    pub risk: f64,
    pub at_safe_point: bool,
    pub forced_escape: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressMonitor {
    config: StressConfig,
    health: f64,
    stress: f64,
}

impl StressMonitor {
    pub fn new(config: StressConfig) -> Self {
        Self {
            config: config.sanitized(),
            health: 1.0,
            stress: 0.0,
        }
    }

    pub fn health(&self) -> f64 {
        self.health
    }

    pub fn stress(&self) -> f64 {
        self.stress
    }

    pub fn update(&mut self, signal: StressSignal) -> StressSample {
        let config = &self.config;
        let risk = signal.risk.clamp(0.0, 1.0);
        let previous = self.health;

        let mut delta = -config.step_decay - config.collapse_decay * risk;
        if signal.forced_escape {
            delta -= config.forced_penalty;
        }
        if signal.at_safe_point {
            delta += config.recovery_gain;
        }
        self.health = (previous + delta).clamp(0.0, 1.0);

        // Only losses feed stress; recovery just stops the bleeding.
        let damage = (previous - self.health).max(0.0);
        let raw = config.damage_gain * damage + config.risk_gain * risk;
        self.stress = config.rho * self.stress + (1.0 - config.rho) * raw;

        StressSample {
            health: self.health,
            damage,
            stress: self.stress,
        }
    }

    pub fn reset(&mut self) {
        self.health = 1.0;
        self.stress = 0.0;
    }
}
